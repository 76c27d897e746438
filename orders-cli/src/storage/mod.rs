//! Storage backends for the orders table
//!
//! Every backend reads the whole sheet as a raw string grid (the ingest
//! module turns it into a table) and overwrites the whole sheet on write,
//! header row included.

pub mod csv_file;
pub mod excel;
pub mod sheets;

#[cfg(test)]
pub mod memory;

use std::path::Path;

use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::config::StorageConfig;
use crate::records::Table;

pub use csv_file::CsvStorage;
pub use excel::ExcelStorage;
pub use sheets::GoogleSheetsStorage;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Human-readable location, used in messages
    fn describe(&self) -> String;

    /// Read the whole sheet as rows of cell strings
    async fn read_grid(&self) -> Result<Vec<Vec<String>>>;

    /// Replace the sheet contents with `table` (header row included)
    async fn write_table(&self, table: &Table) -> Result<()>;
}

/// Open the configured backend. Remote backends connect here, so an
/// unreachable or misconfigured sheet fails before any command runs.
pub async fn open_storage(config: &StorageConfig, http: &reqwest::Client) -> Result<Box<dyn Storage>> {
    match config {
        StorageConfig::Local { path, sheet } => open_local(path, sheet.clone()),
        StorageConfig::GoogleSheets(sheets_config) => {
            let storage = GoogleSheetsStorage::connect(sheets_config, http.clone()).await?;
            Ok(Box::new(storage))
        }
    }
}

fn open_local(path: &Path, sheet: Option<String>) -> Result<Box<dyn Storage>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" => Ok(Box::new(ExcelStorage::new(path, sheet))),
        "csv" => {
            if sheet.is_some() {
                log::warn!("'sheet' is ignored for CSV storage {}", path.display());
            }
            Ok(Box::new(CsvStorage::new(path)))
        }
        _ => bail!(
            "Unsupported storage file '{}': expected .xlsx, .xlsm or .csv",
            path.display()
        ),
    }
}
