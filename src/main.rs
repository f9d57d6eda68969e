use chrono::{Local, NaiveDate};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

mod api;
mod config;
mod expand;
mod index;
mod order;
mod status;
mod table;

use api::{ApiClient, OrderApi, RemoteCallError};
use config::{Config, ConfigError};
use index::PagePolicy;
use order::OrderError;
use table::TableError;

/// Export the orders placed on the delivery platform on a given day to CSV.
#[derive(Parser)]
struct Args {
    /// Reference date (YYYY-MM-DD); defaults to today.
    #[arg(long = "dt_ref")]
    dt_ref: Option<NaiveDate>,

    /// Also request the last listing page, which older exports never fetched.
    #[arg(long)]
    fetch_last_page: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Remote(#[from] RemoteCallError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("order listed for unknown account {0:?}")]
    UnknownAccount(String),
    #[error(transparent)]
    Table(#[from] TableError),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let start = Instant::now();

    let reference_date = args.dt_ref.unwrap_or_else(|| Local::now().date_naive());
    let page_policy = if args.fetch_last_page {
        PagePolicy::Complete
    } else {
        PagePolicy::Legacy
    };

    let result = config::load_env_file(None)
        .and_then(|()| Config::from_env(reference_date, page_policy))
        .map_err(ExportError::from)
        .and_then(|config| run(&ApiClient::new(config.base_url.as_str()), &config));
    match result {
        Ok(path) => {
            log::info!("{}", path.display());
            log::info!("total time: {:.2} seconds", start.elapsed().as_secs_f64());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run the whole export and return the path of the written file.
///
/// Nothing is written unless every listing and detail call succeeded.
fn run(api: &impl OrderApi, config: &Config) -> Result<PathBuf, ExportError> {
    log::info!("searching orders for {}...", config.reference_date);
    let refs = index::fetch_all_order_ids(
        api,
        &config.accounts,
        config.reference_date,
        config.page_policy,
    )?;

    log::info!("searching items of {} orders...", refs.len());
    let rows = expand::expand(api, &refs, &config.accounts)?;

    log::info!("saving {} rows...", rows.len());
    let path = config.output_path();
    table::write(&rows, &path)?;

    log::info!("data exported successfully");
    Ok(path)
}
