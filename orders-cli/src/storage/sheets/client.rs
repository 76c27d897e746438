//! Minimal Google Sheets v4 REST client

use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use super::auth::TokenSource;

static PLAIN_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

/// Tab metadata returned by `spreadsheets.get`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    #[serde(default)]
    pub index: i64,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// A1 range for a whole tab, quoting titles that need it
pub fn sheet_range(title: &str, cells: Option<&str>) -> String {
    let quoted = if PLAIN_TITLE.is_match(title) {
        title.to_string()
    } else {
        format!("'{}'", title.replace('\'', "''"))
    };
    match cells {
        Some(cells) => format!("{}!{}", quoted, cells),
        None => quoted,
    }
}

pub struct SheetsClient {
    http: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    auth: Box<dyn TokenSource>,
}

impl SheetsClient {
    pub fn new(
        http: reqwest::Client,
        api_base: &str,
        spreadsheet_id: &str,
        auth: Box<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            auth,
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/v4/spreadsheets/{}", self.api_base, self.spreadsheet_id)
    }

    async fn token(&self) -> Result<String> {
        self.auth.access_token(&self.http).await
    }

    /// Properties of every tab in the spreadsheet
    pub async fn sheet_properties(&self) -> Result<Vec<SheetProperties>> {
        let response = self
            .http
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties")])
            .bearer_auth(self.token().await?)
            .send()
            .await
            .context("Failed to reach Google Sheets")?;

        let meta: SpreadsheetMeta = check(response)
            .await?
            .json()
            .await
            .context("Failed to parse spreadsheet metadata")?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Formatted cell values of `range`, row-major, as strings
    pub async fn read_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let url = format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        );
        let response = self
            .http
            .get(url)
            .query(&[
                ("majorDimension", "ROWS"),
                ("valueRenderOption", "FORMATTED_VALUE"),
            ])
            .bearer_auth(self.token().await?)
            .send()
            .await
            .context("Failed to reach Google Sheets")?;

        let values: ValueRange = check(response)
            .await?
            .json()
            .await
            .context("Failed to parse sheet values")?;

        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(value_to_string).collect())
            .collect())
    }

    /// Resize a tab to exactly `rows` and replace its contents in one atomic
    /// `batchUpdate`. Strings are stored as given; empty cells are cleared.
    pub async fn replace_sheet(&self, sheet_id: i64, rows: Vec<Vec<Value>>) -> Result<()> {
        let body = replace_sheet_body(sheet_id, rows);
        self.post(&format!("{}:batchUpdate", self.spreadsheet_url()), &body)
            .await
            .context("Failed to write worksheet")
    }

    async fn post(&self, url: &str, body: &Value) -> Result<()> {
        let response = self
            .http
            .post(url)
            .bearer_auth(self.token().await?)
            .json(body)
            .send()
            .await
            .context("Failed to reach Google Sheets")?;
        check(response).await?;
        Ok(())
    }
}

/// Turn API error responses into readable errors
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or(body);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => bail!(
            "Google Sheets denied access ({}): {} - is the sheet shared with the service account?",
            status,
            message
        ),
        StatusCode::NOT_FOUND => bail!("Spreadsheet or range not found ({}): {}", status, message),
        _ => bail!("Google Sheets API error ({}): {}", status, message),
    }
}

pub(super) fn replace_sheet_body(sheet_id: i64, rows: Vec<Vec<Value>>) -> Value {
    let row_count = rows.len().max(1);
    let column_count = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let rows: Vec<Value> = rows
        .into_iter()
        .map(|row| json!({ "values": row.into_iter().map(cell_data).collect::<Vec<_>>() }))
        .collect();

    json!({
        "requests": [
            {
                "updateSheetProperties": {
                    "properties": {
                        "sheetId": sheet_id,
                        "gridProperties": {
                            "rowCount": row_count,
                            "columnCount": column_count,
                        }
                    },
                    "fields": "gridProperties(rowCount,columnCount)"
                }
            },
            {
                "updateCells": {
                    "start": { "sheetId": sheet_id, "rowIndex": 0, "columnIndex": 0 },
                    "rows": rows,
                    "fields": "userEnteredValue"
                }
            }
        ]
    })
}

/// `CellData` for one value; an empty object clears the cell
fn cell_data(value: Value) -> Value {
    match value {
        Value::Number(n) => json!({ "userEnteredValue": { "numberValue": n } }),
        Value::Bool(b) => json!({ "userEnteredValue": { "boolValue": b } }),
        Value::String(s) if !s.is_empty() => json!({ "userEnteredValue": { "stringValue": s } }),
        _ => json!({}),
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sheet_range_quoting() {
        assert_eq!(sheet_range("Orders", None), "Orders");
        assert_eq!(sheet_range("Orders", Some("A1")), "Orders!A1");
        assert_eq!(sheet_range("Arkusz 1", Some("A1")), "'Arkusz 1'!A1");
        assert_eq!(sheet_range("Kate's", None), "'Kate''s'");
        assert_eq!(sheet_range("Zamówienia", None), "'Zamówienia'");
    }

    #[test]
    fn test_cell_data_keeps_strings_raw() {
        assert_eq!(
            cell_data(json!("00-950")),
            json!({ "userEnteredValue": { "stringValue": "00-950" } })
        );
        assert_eq!(
            cell_data(json!(1)),
            json!({ "userEnteredValue": { "numberValue": 1 } })
        );
        assert_eq!(cell_data(json!("")), json!({}));
    }

    #[test]
    fn test_replace_sheet_body_resizes_before_writing() {
        let body = replace_sheet_body(5, vec![vec![json!("a"), json!("b")], vec![json!("c")]]);
        let requests = body["requests"].as_array().unwrap();
        assert_eq!(requests.len(), 2);

        let grid = &requests[0]["updateSheetProperties"]["properties"]["gridProperties"];
        assert_eq!(grid["rowCount"], 2);
        assert_eq!(grid["columnCount"], 2);

        let cells = &requests[1]["updateCells"];
        assert_eq!(cells["start"]["sheetId"], 5);
        assert_eq!(cells["rows"].as_array().unwrap().len(), 2);
        assert_eq!(cells["fields"], "userEnteredValue");
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(Value::Null), "");
        assert_eq!(value_to_string(json!("00-950")), "00-950");
        assert_eq!(value_to_string(json!(1)), "1");
    }
}
