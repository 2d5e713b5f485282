//! Google Sheets worksheet
//!
//! The spreadsheet is found by document name through the Drive API and its
//! first sheet is used. Lookup happens on first use and is retried on the
//! next call if it fails.

use super::auth::{ServiceAccountKey, TokenSource};
use super::{Record, SheetError, Worksheet};
use crate::config::ConfigError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::sync::OnceCell;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Resolved spreadsheet and first-sheet identity
#[derive(Debug, Clone)]
struct SheetTarget {
    spreadsheet_id: String,
    sheet_id: i64,
    title: String,
}

pub struct GoogleSheet {
    client: Client,
    tokens: TokenSource,
    document_name: String,
    target: OnceCell<SheetTarget>,
}

impl GoogleSheet {
    /// Load the service account key and prepare the client.
    ///
    /// No network traffic happens here; a missing or malformed key file is
    /// reported immediately.
    pub fn open(
        credentials_path: &Path,
        document_name: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let key = ServiceAccountKey::load(credentials_path)?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        let tokens = TokenSource::new(client.clone(), &key, credentials_path, SCOPES)?;

        tracing::info!(
            account = %key.client_email,
            document = %document_name,
            "Spreadsheet client ready"
        );

        Ok(Self {
            client,
            tokens,
            document_name: document_name.to_string(),
            target: OnceCell::new(),
        })
    }

    async fn target(&self) -> Result<&SheetTarget, SheetError> {
        self.target.get_or_try_init(|| self.resolve()).await
    }

    async fn resolve(&self) -> Result<SheetTarget, SheetError> {
        let files: DriveFileList = self
            .send(self.client.get(DRIVE_FILES_API).query(&[
                ("q", drive_query(&self.document_name).as_str()),
                ("fields", "files(id,name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]))
            .await?;

        let spreadsheet_id = files
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| {
                SheetError::new(format!("spreadsheet '{}' not found", self.document_name))
            })?;

        let url = spreadsheet_url(&spreadsheet_id, None)?;
        let meta: SpreadsheetMeta = self
            .send(
                self.client
                    .get(url)
                    .query(&[("fields", "sheets.properties(sheetId,title,index)")]),
            )
            .await?;

        let first = first_sheet(meta).ok_or_else(|| SheetError::new("spreadsheet has no sheets"))?;

        tracing::info!(
            spreadsheet_id = %spreadsheet_id,
            sheet = %first.title,
            "Resolved expense sheet"
        );

        Ok(SheetTarget {
            spreadsheet_id,
            sheet_id: first.sheet_id,
            title: first.title,
        })
    }

    /// Authorize, send, and decode a JSON response
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SheetError> {
        let token = self.tokens.token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SheetError::new(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SheetError::new(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(SheetError::new(api_error_message(status.as_u16(), &body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| SheetError::new(format!("unexpected response: {e}")))
    }
}

#[async_trait]
impl Worksheet for GoogleSheet {
    async fn append_row(&self, cells: &[String]) -> Result<(), SheetError> {
        let target = self.target().await?;
        let url = values_url(&target.spreadsheet_id, &quote_title(&target.title), Some("append"))?;
        let _: Value = self
            .send(
                self.client
                    .post(url)
                    .query(&[
                        ("valueInputOption", "RAW"),
                        ("insertDataOption", "INSERT_ROWS"),
                    ])
                    .json(&json!({ "values": [cells] })),
            )
            .await?;
        Ok(())
    }

    async fn delete_row(&self, row: usize) -> Result<(), SheetError> {
        let target = self.target().await?;
        let url = spreadsheet_url(&target.spreadsheet_id, Some("batchUpdate"))?;
        let _: Value = self
            .send(self.client.post(url).json(&delete_row_request(target.sheet_id, row)))
            .await?;
        Ok(())
    }

    async fn get_all_values(&self) -> Result<Vec<Record>, SheetError> {
        let target = self.target().await?;
        let url = values_url(&target.spreadsheet_id, &quote_title(&target.title), None)?;
        let range: ValueRange = self.send(self.client.get(url)).await?;
        Ok(range.values)
    }

    async fn update_row(&self, row: usize, cells: &[String]) -> Result<(), SheetError> {
        let target = self.target().await?;
        let url = values_url(&target.spreadsheet_id, &row_range(&target.title, row), None)?;
        let _: Value = self
            .send(
                self.client
                    .put(url)
                    .query(&[("valueInputOption", "RAW")])
                    .json(&json!({ "majorDimension": "ROWS", "values": [cells] })),
            )
            .await?;
        Ok(())
    }
}

/// The sheet with the lowest index, which is the leftmost tab
fn first_sheet(meta: SpreadsheetMeta) -> Option<SheetProperties> {
    meta.sheets
        .into_iter()
        .map(|s| s.properties)
        .min_by_key(|p| p.index)
}

/// Sheet titles are always quoted in A1 notation; inner quotes double
fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn row_range(title: &str, row: usize) -> String {
    format!("{}!A{row}:C{row}", quote_title(title))
}

fn drive_query(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
    format!("name = '{escaped}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false")
}

fn delete_row_request(sheet_id: i64, row: usize) -> Value {
    json!({
        "requests": [{
            "deleteDimension": {
                "range": {
                    "sheetId": sheet_id,
                    "dimension": "ROWS",
                    "startIndex": row - 1,
                    "endIndex": row,
                }
            }
        }]
    })
}

/// `{SHEETS_API}/{id}` or `{SHEETS_API}/{id}:{method}`
fn spreadsheet_url(spreadsheet_id: &str, method: Option<&str>) -> Result<Url, SheetError> {
    let segment = match method {
        Some(m) => format!("{spreadsheet_id}:{m}"),
        None => spreadsheet_id.to_string(),
    };
    build_url(&[&segment])
}

/// `{SHEETS_API}/{id}/values/{range}` with an optional `:{method}` suffix
fn values_url(spreadsheet_id: &str, range: &str, method: Option<&str>) -> Result<Url, SheetError> {
    let segment = match method {
        Some(m) => format!("{range}:{m}"),
        None => range.to_string(),
    };
    build_url(&[spreadsheet_id, "values", &segment])
}

fn build_url(segments: &[&str]) -> Result<Url, SheetError> {
    let mut url = Url::parse(SHEETS_API).map_err(|e| SheetError::new(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| SheetError::new("invalid sheets base URL"))?
        .extend(segments);
    Ok(url)
}

fn api_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(resp) => format!("HTTP {status}: {}", resp.error.message),
        Err(_) => format!("HTTP {status}: {body}"),
    }
}

// Google API types

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: i64,
}

/// Missing `values` means the range is empty
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
}
