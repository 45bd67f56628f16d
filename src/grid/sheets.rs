use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::a1::CellRange;

use super::auth::{ServiceAccountKey, TokenSource, SHEETS_SCOPE};
use super::{Grid, GridError, NewSheet, Row};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Sheets v4 REST backend. Stores are spreadsheets, sheets are tabs.
pub struct SheetsGrid {
    http: Client,
    tokens: TokenSource,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

impl SheetsGrid {
    /// Loads the service-account key and fetches a first token so bad
    /// credentials fail here rather than on the first data call.
    pub fn connect(credentials: &Path) -> Result<Self, GridError> {
        let key = ServiceAccountKey::load(credentials)?;
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("edumind-store/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let tokens = TokenSource::new(key, SHEETS_SCOPE);
        tokens.bearer(&http)?;
        let base = Url::parse(SHEETS_API).map_err(|err| GridError::Decode(err.to_string()))?;
        Ok(Self { http, tokens, base })
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, GridError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| GridError::Decode(format!("base url {} cannot take a path", self.base)))?
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn send<T: for<'de> Deserialize<'de>>(&self, request: RequestBuilder) -> Result<T, GridError> {
        let bearer = self.tokens.bearer(&self.http)?;
        let response = request.bearer_auth(bearer).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(GridError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .map_err(|err| GridError::Decode(err.to_string()))
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl Grid for SheetsGrid {
    fn create_store(&self, title: &str) -> Result<String, GridError> {
        let url = self.url(&[], &[])?;
        let body = json!({ "properties": { "title": title }, "sheets": [] });
        let created: CreatedSpreadsheet = self.send(self.http.post(url).json(&body))?;
        Ok(created.spreadsheet_id)
    }

    fn sheet_titles(&self, store_id: &str) -> Result<Vec<String>, GridError> {
        let url = self.url(&[store_id], &[("fields", "sheets.properties.title")])?;
        let meta: SpreadsheetMeta = self.send(self.http.get(url))?;
        Ok(meta
            .sheets
            .into_iter()
            .map(|sheet| sheet.properties.title)
            .collect())
    }

    fn add_sheets(&self, store_id: &str, sheets: &[NewSheet]) -> Result<(), GridError> {
        let requests: Vec<Value> = sheets
            .iter()
            .map(|sheet| {
                json!({
                    "addSheet": {
                        "properties": {
                            "title": sheet.title,
                            "gridProperties": {
                                "rowCount": sheet.row_count,
                                "columnCount": sheet.column_count,
                            }
                        }
                    }
                })
            })
            .collect();
        let url = self.url(&[&format!("{store_id}:batchUpdate")], &[])?;
        let _: Value = self.send(self.http.post(url).json(&json!({ "requests": requests })))?;
        Ok(())
    }

    fn read(&self, store_id: &str, range: &CellRange) -> Result<Vec<Row>, GridError> {
        let a1 = range.to_string();
        debug!(range = %a1, "sheets read");
        let url = self.url(&[store_id, "values", &a1], &[])?;
        let values: ValueRange = self.send(self.http.get(url))?;
        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    fn append(&self, store_id: &str, range: &CellRange, rows: &[Row]) -> Result<(), GridError> {
        let a1 = range.to_string();
        debug!(range = %a1, rows = rows.len(), "sheets append");
        let url = self.url(
            &[store_id, "values", &format!("{a1}:append")],
            &[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")],
        )?;
        let _: Value = self.send(self.http.post(url).json(&json!({ "values": rows })))?;
        Ok(())
    }

    fn write(&self, store_id: &str, range: &CellRange, rows: &[Row]) -> Result<(), GridError> {
        let a1 = range.to_string();
        debug!(range = %a1, rows = rows.len(), "sheets write");
        let url = self.url(&[store_id, "values", &a1], &[("valueInputOption", "RAW")])?;
        let _: Value = self.send(
            self.http
                .put(url)
                .json(&json!({ "range": a1, "majorDimension": "ROWS", "values": rows })),
        )?;
        Ok(())
    }
}
