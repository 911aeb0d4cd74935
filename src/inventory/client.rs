use crate::config::Config;
use crate::inventory::api_types::{ApiStockCountResponse, ApiUpdateByPartRequest, ApiUpdateResponse};
use crate::inventory::types::{ImportRow, StockCountDetail, UpdateResponse};
use color_eyre::{eyre::eyre, Result};
use futures::future::BoxFuture;
use tracing::debug;
use url::Url;

/// Applies one counted-quantity update to a stock count.
///
/// `Ok` carries the server verdict, which may itself be a rejection. `Err`
/// means the call did not produce a readable verdict at all.
pub trait CountUpdater: Send + Sync {
  fn update_by_part<'a>(
    &'a self,
    count_id: u64,
    row: &'a ImportRow,
  ) -> BoxFuture<'a, Result<UpdateResponse>>;
}

/// Inventory API client
#[derive(Clone)]
pub struct InventoryClient {
  http: reqwest::Client,
  base_url: Url,
}

impl InventoryClient {
  pub fn new(config: &Config) -> Result<Self> {
    let base_url = config.server.origin()?;

    let http = reqwest::Client::builder()
      .user_agent(concat!("stockroom/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base_url })
  }

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base_url
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }

  /// Set the counted quantity of the count item for one part number
  pub async fn update_count_item_by_part(
    &self,
    count_id: u64,
    row: &ImportRow,
  ) -> Result<UpdateResponse> {
    let url = self.endpoint(&format!(
      "/api/inventory/stock-counts/{}/items/update-by-part",
      count_id
    ))?;

    let body = ApiUpdateByPartRequest {
      part_number: &row.part_number,
      counted_quantity: row.counted_quantity,
      notes: &row.notes,
    };

    // Error statuses still carry a JSON `error`, so the body is read either way
    let response: ApiUpdateResponse = self
      .http
      .post(url)
      .json(&body)
      .send()
      .await
      .map_err(|e| eyre!("Failed to send update: {}", e))?
      .json()
      .await
      .map_err(|e| eyre!("Failed to read update response: {}", e))?;

    debug!(
      part = %row.part_number,
      success = response.success,
      message = ?response.message,
      "Count item update answered"
    );

    Ok(response.into())
  }

  /// Get a stock count with all its items
  pub async fn get_stock_count(&self, count_id: u64) -> Result<StockCountDetail> {
    let url = self.endpoint(&format!("/api/inventory/stock-counts/{}", count_id))?;

    let response: ApiStockCountResponse = self
      .http
      .get(url)
      .send()
      .await
      .and_then(|r| r.error_for_status())
      .map_err(|e| eyre!("Failed to get stock count {}: {}", count_id, e))?
      .json()
      .await
      .map_err(|e| eyre!("Failed to parse stock count {}: {}", count_id, e))?;

    Ok(response.into())
  }
}

impl CountUpdater for InventoryClient {
  fn update_by_part<'a>(
    &'a self,
    count_id: u64,
    row: &'a ImportRow,
  ) -> BoxFuture<'a, Result<UpdateResponse>> {
    Box::pin(self.update_count_item_by_part(count_id, row))
  }
}
