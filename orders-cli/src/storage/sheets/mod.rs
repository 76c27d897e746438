//! Google Sheets storage
//!
//! The orders live on one tab of a spreadsheet, picked by gid, by title, or
//! the first tab. A write resizes the tab to the table and replaces every
//! value with raw (unparsed) input in a single request.

pub mod auth;
pub mod client;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::{Value, json};

use self::auth::{ServiceAccountAuth, ServiceAccountKey, TokenSource};
use self::client::{SheetProperties, SheetsClient, sheet_range};
use super::Storage;
use crate::config::GoogleSheetsConfig;
use crate::records::{Column, Table};

pub struct GoogleSheetsStorage {
    client: SheetsClient,
    sheet: SheetProperties,
}

impl GoogleSheetsStorage {
    /// Authenticate with the configured service account and resolve the tab
    pub async fn connect(config: &GoogleSheetsConfig, http: reqwest::Client) -> Result<Self> {
        let key = ServiceAccountKey::load(config)?;
        let auth = ServiceAccountAuth::new(key)?;
        log::debug!("Authenticating to Google Sheets as {}", auth.client_email());
        Self::with_token_source(config, http, Box::new(auth)).await
    }

    pub async fn with_token_source(
        config: &GoogleSheetsConfig,
        http: reqwest::Client,
        auth: Box<dyn TokenSource>,
    ) -> Result<Self> {
        let client = SheetsClient::new(http, &config.api_base, &config.spreadsheet_id, auth);
        let sheets = client.sheet_properties().await?;
        let sheet = select_sheet(sheets, config)?;
        log::info!(
            "Using worksheet '{}' (gid {}) of spreadsheet {}",
            sheet.title,
            sheet.sheet_id,
            config.spreadsheet_id
        );
        Ok(Self { client, sheet })
    }
}

fn select_sheet(sheets: Vec<SheetProperties>, config: &GoogleSheetsConfig) -> Result<SheetProperties> {
    if let Some(gid) = config.worksheet_gid {
        return match sheets.into_iter().find(|s| s.sheet_id == gid) {
            Some(sheet) => Ok(sheet),
            None => bail!("Worksheet with gid {} not found in spreadsheet", gid),
        };
    }
    if let Some(ref title) = config.worksheet {
        return match sheets.into_iter().find(|s| &s.title == title) {
            Some(sheet) => Ok(sheet),
            None => bail!("Worksheet '{}' not found in spreadsheet", title),
        };
    }
    match sheets.into_iter().min_by_key(|s| s.index) {
        Some(sheet) => Ok(sheet),
        None => bail!("Spreadsheet has no worksheets"),
    }
}

/// Header plus records as JSON cells; flags go out as numbers
fn table_values(table: &Table) -> Vec<Vec<Value>> {
    let mut rows = Vec::with_capacity(table.len() + 1);
    rows.push(Column::ALL.iter().map(|c| json!(c.name())).collect());
    for record in &table.records {
        rows.push(
            Column::ALL
                .iter()
                .map(|column| match column.parasite() {
                    Some(p) => json!(record.flag(p)),
                    None => json!(record.text(*column).unwrap_or("")),
                })
                .collect(),
        );
    }
    rows
}

#[async_trait]
impl Storage for GoogleSheetsStorage {
    fn describe(&self) -> String {
        format!(
            "Google Sheets {} [{}]",
            self.client.spreadsheet_id(),
            self.sheet.title
        )
    }

    async fn read_grid(&self) -> Result<Vec<Vec<String>>> {
        let grid = self
            .client
            .read_values(&sheet_range(&self.sheet.title, None))
            .await?;
        log::debug!("Read {} row(s) from worksheet '{}'", grid.len(), self.sheet.title);
        Ok(grid)
    }

    async fn write_table(&self, table: &Table) -> Result<()> {
        self.client
            .replace_sheet(self.sheet.sheet_id, table_values(table))
            .await?;
        log::info!(
            "Wrote {} record(s) to worksheet '{}'",
            table.len(),
            self.sheet.title
        );
        Ok(())
    }
}
