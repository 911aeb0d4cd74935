use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub server: ServerConfig,
  #[serde(default)]
  pub gateway: GatewayConfig,
  #[serde(default)]
  pub import: ImportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Application origin, e.g. "https://warehouse.local:5000"
  pub base_url: String,
}

impl ServerConfig {
  pub fn origin(&self) -> Result<Url> {
    Url::parse(&self.base_url)
      .map_err(|e| eyre!("Invalid server.base_url '{}': {}", self.base_url, e))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
  /// Cache version token. Bumping it invalidates every cached entry.
  #[serde(default = "default_version")]
  pub version: String,
  /// URLs fetched into the cache at install time. Relative URLs resolve
  /// against the server base URL.
  #[serde(default = "default_seed_urls")]
  pub seed_urls: Vec<String>,
}

impl Default for GatewayConfig {
  fn default() -> Self {
    Self {
      version: default_version(),
      seed_urls: default_seed_urls(),
    }
  }
}

impl GatewayConfig {
  /// Seed URLs as absolute URL strings.
  pub fn resolved_seed_urls(&self, origin: &Url) -> Result<Vec<String>> {
    self
      .seed_urls
      .iter()
      .map(|s| {
        origin
          .join(s)
          .map(String::from)
          .map_err(|e| eyre!("Invalid seed URL '{}': {}", s, e))
      })
      .collect()
  }
}

fn default_version() -> String {
  "inventory-management-v1".to_string()
}

fn default_seed_urls() -> Vec<String> {
  [
    "/",
    "/static/css/style.css",
    "/static/js/app.js",
    "/inventory",
    "/part_lookup",
    "/inventory/stock-in",
    "/inventory/stock-out",
    "https://cdn.jsdelivr.net/npm/bootstrap@5.1.3/dist/css/bootstrap.min.css",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css",
  ]
  .into_iter()
  .map(String::from)
  .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
  /// Delay before refreshing the stock count after a partly successful import
  #[serde(default = "default_reload_delay_ms")]
  pub reload_delay_ms: u64,
  /// How many failure messages to show before collapsing the rest
  #[serde(default = "default_max_displayed_errors")]
  pub max_displayed_errors: usize,
}

impl Default for ImportConfig {
  fn default() -> Self {
    Self {
      reload_delay_ms: default_reload_delay_ms(),
      max_displayed_errors: default_max_displayed_errors(),
    }
  }
}

impl ImportConfig {
  pub fn reload_delay(&self) -> Duration {
    Duration::from_millis(self.reload_delay_ms)
  }
}

fn default_reload_delay_ms() -> u64 {
  3000
}

fn default_max_displayed_errors() -> usize {
  20
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./stockroom.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/stockroom/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/stockroom/config.yaml\n\
                 with at least `server.base_url` set."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("stockroom.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("stockroom").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    Ok(config)
  }
}
