mod app;
mod cache;
mod config;
mod import;
mod inventory;
mod logging;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "stockroom")]
#[command(about = "Offline cache gateway and stock-count importer for the warehouse app")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/stockroom/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Install and activate the configured offline cache version
  Register,

  /// Send a request through the offline cache
  Fetch {
    /// Absolute URL or path relative to the server base URL
    url: String,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Write the response body to stdout
    #[arg(long)]
    body: bool,
  },

  /// Show cache generations and the active version
  Status,

  /// Import counted quantities from an Excel file into a stock count
  Import {
    /// Spreadsheet to import (.xlsx or .xls)
    file: Option<PathBuf>,

    /// Stock count to update
    #[arg(short = 'n', long = "count")]
    count_id: u64,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Held until exit so buffered log lines are flushed
  let _log_guard = logging::init()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let app = app::App::new(config)?;
  match args.command {
    Command::Register => app.register().await?,
    Command::Fetch { url, method, body } => app.fetch(&url, &method, body).await?,
    Command::Status => app.status()?,
    Command::Import { file, count_id } => app.import(file.as_deref(), count_id).await?,
  }

  Ok(())
}
