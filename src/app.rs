use crate::cache::{
  ensure_secure_origin, CacheRequest, CacheStorage, Gateway, HttpTransport, SqliteStorage,
};
use crate::config::Config;
use crate::import::Importer;
use crate::inventory::client::InventoryClient;
use crate::inventory::types::StockCountDetail;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;
use url::Url;

/// Runs the CLI commands against one configuration.
pub struct App {
  config: Config,
  /// Application origin parsed from the server base URL
  origin: Url,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let origin = config.server.origin()?;
    Ok(Self { config, origin })
  }

  fn storage(&self) -> Result<Arc<SqliteStorage>> {
    Ok(Arc::new(SqliteStorage::open()?))
  }

  fn transport(&self) -> Result<Arc<HttpTransport>> {
    Ok(Arc::new(HttpTransport::new(self.origin.clone())?))
  }

  fn seed_urls(&self) -> Result<Vec<String>> {
    self.config.gateway.resolved_seed_urls(&self.origin)
  }

  /// Install and activate the configured cache version.
  pub async fn register(&self) -> Result<()> {
    if let Err(e) = ensure_secure_origin(&self.origin) {
      warn!(origin = %self.origin, "Offline cache registration refused");
      return Err(e);
    }

    let seeds = self.seed_urls()?;
    let seed_count = seeds.len();
    let gateway = Gateway::new(
      self.storage()?,
      self.transport()?,
      self.config.gateway.version.clone(),
      seeds,
    );

    let evicted = gateway.register().await?;

    println!(
      "Offline cache {} is active ({} seed URLs)",
      gateway.version(),
      seed_count
    );
    for name in evicted {
      println!("  evicted {}", name);
    }

    Ok(())
  }

  /// Send one request through the gateway and report where it was served from.
  pub async fn fetch(&self, target: &str, method: &str, print_body: bool) -> Result<()> {
    let url = self
      .origin
      .join(target)
      .map_err(|e| eyre!("Invalid URL {}: {}", target, e))?;
    let request = CacheRequest::new(method, url.as_str());

    let storage = self.storage()?;
    let transport = self.transport()?;
    let seeds = self.seed_urls()?;

    let result = match Gateway::resume(storage.clone(), transport.clone(), seeds.clone())? {
      Some(gateway) => {
        let result = gateway.fetch(request).await;
        gateway.settle().await;
        result?
      }
      // Nothing registered yet: the request is not controlled
      None => {
        Gateway::new(storage, transport, self.config.gateway.version.clone(), seeds)
          .fetch(request)
          .await?
      }
    };

    println!(
      "{} {} {} ({} bytes, from {})",
      result.data.status,
      method.to_uppercase(),
      url,
      result.data.body.len(),
      result.source
    );

    if print_body {
      std::io::stdout()
        .write_all(&result.data.body)
        .wrap_err("Failed to write response body")?;
    }

    Ok(())
  }

  /// Show cache generations and the active version.
  pub fn status(&self) -> Result<()> {
    let storage = self.storage()?;
    let active = storage.active_version()?;

    println!("Configured version: {}", self.config.gateway.version);
    println!("Active version:     {}", active.as_deref().unwrap_or("none"));

    let generations = storage.generations()?;
    if generations.is_empty() {
      println!("No cache generations");
    }
    for generation in generations {
      println!(
        "  {:<32} {:>5} entries  created {}",
        generation.name,
        generation.entries,
        generation.created_at.format("%Y-%m-%d %H:%M:%S")
      );
    }

    Ok(())
  }

  /// Import counted quantities from a spreadsheet into a stock count.
  pub async fn import(&self, file: Option<&Path>, count_id: u64) -> Result<()> {
    let client = InventoryClient::new(&self.config)?;
    let importer = Importer::new(client.clone(), &self.config.import);

    let report = importer
      .decode_and_reconcile(file, count_id)
      .await
      .wrap_err("Import stopped before any update was sent")?;

    print!(
      "{}",
      report.summary.render(self.config.import.max_displayed_errors)
    );

    if let Some(delay) = report.reload_after {
      println!("Refreshing stock count in {:.1}s...", delay.as_secs_f32());
      tokio::time::sleep(delay).await;

      let detail = client.get_stock_count(count_id).await?;
      print!("{}", render_stock_count(&detail));
    }

    Ok(())
  }
}

/// Plain-text view of a stock count and its items.
pub fn render_stock_count(detail: &StockCountDetail) -> String {
  let count = &detail.count;
  let mut out = String::new();

  let _ = writeln!(
    out,
    "{} #{} [{}] {} {} - {} items, {} with variance",
    count.count_number,
    count.id,
    count.warehouse.as_deref().unwrap_or("-"),
    count.count_type.as_deref().unwrap_or("-"),
    count.status,
    count.total_items,
    count.variance_items
  );
  let _ = writeln!(
    out,
    "{:<16} {:<24} {:<6} {:>8} {:>8} {:>8}  NOTES",
    "PART", "NAME", "UNIT", "SYSTEM", "COUNTED", "VARIANCE"
  );

  for item in &detail.items {
    let counted = item
      .counted_quantity
      .map(|q| q.to_string())
      .unwrap_or_else(|| "-".to_string());
    let variance = item
      .variance_quantity
      .map(|v| format!("{:+}", v))
      .unwrap_or_else(|| "-".to_string());

    let _ = writeln!(
      out,
      "{:<16} {:<24} {:<6} {:>8} {:>8} {:>8}  {}",
      item.part_number,
      item.part_name,
      item.unit.as_deref().unwrap_or("-"),
      item.system_quantity,
      counted,
      variance,
      item.notes.as_deref().unwrap_or("")
    );
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::inventory::types::{StockCount, StockCountItem};

  #[test]
  fn test_render_stock_count() {
    let detail = StockCountDetail {
      count: StockCount {
        id: 7,
        count_number: "SC-20240101-1234".to_string(),
        warehouse: Some("Main".to_string()),
        status: "in_progress".to_string(),
        count_type: Some("full".to_string()),
        total_items: 2,
        variance_items: 1,
      },
      items: vec![
        StockCountItem {
          part_number: "P-001".to_string(),
          part_name: "Bolt".to_string(),
          unit: Some("pcs".to_string()),
          system_quantity: 10,
          counted_quantity: Some(9),
          variance_quantity: Some(-1),
          notes: Some("shelf B".to_string()),
        },
        StockCountItem {
          part_number: "P-002".to_string(),
          part_name: "Nut".to_string(),
          unit: None,
          system_quantity: 4,
          counted_quantity: None,
          variance_quantity: None,
          notes: None,
        },
      ],
    };

    let rendered = render_stock_count(&detail);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "SC-20240101-1234 #7 [Main] full in_progress - 2 items, 1 with variance");
    assert!(lines[2].starts_with("P-001"));
    assert!(lines[2].contains("      -1  shelf B"));
    assert!(lines[3].contains("       -        -"));
  }

  #[test]
  fn test_app_rejects_bad_base_url() {
    let config: Config = serde_yaml::from_str("server:\n  base_url: not a url\n").unwrap();
    assert!(App::new(config).is_err());
  }
}
