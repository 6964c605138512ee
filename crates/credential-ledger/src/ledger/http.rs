//! Spreadsheet REST plumbing shared by both strategies.
//!
//! [`SheetsApi`] wraps one spreadsheet and one bearer token. Every call goes
//! through the same send path: bearer header, JSON in/out, and non-success
//! responses turned into [`SyncError::UpstreamRequest`] with the most
//! specific message the upstream body offers.

use crate::errors::SyncError;
use common::secret::{ExposeSecret, SecretString};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument, trace, warn};

/// Default REST base of the spreadsheet API.
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Default per-request timeout for every outbound call.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the HTTP client shared by the token exchange and the API calls.
///
/// # Errors
///
/// Returns `SyncError::UpstreamRequest` if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, SyncError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .build()
        .map_err(|e| SyncError::UpstreamRequest {
            status: None,
            message: format!("Failed to build HTTP client: {e}"),
        })
}

/// Message for a non-success upstream response.
///
/// Prefers `error.message` (API error envelope), then `error_description`
/// (OAuth error response), then the status line, e.g. `403 Forbidden`.
pub fn upstream_error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    parsed
        .as_ref()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| {
                    v.get("error_description")
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                })
        })
        .map_or_else(|| status_line(status), ToString::to_string)
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}

// =============================================================================
// Response types
// =============================================================================

/// Spreadsheet metadata, filtered to sheet properties.
#[derive(Debug, Default, Deserialize)]
pub struct SpreadsheetMetadata {
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SheetEntry {
    #[serde(default)]
    pub properties: SheetProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: Option<i64>,
    #[serde(default)]
    pub title: String,
}

impl SpreadsheetMetadata {
    /// Properties of the sheet titled `title`, if any.
    pub fn find(&self, title: &str) -> Option<&SheetProperties> {
        self.sheets
            .iter()
            .map(|s| &s.properties)
            .find(|p| p.title == title)
    }
}

/// Structural batch-update response.
#[derive(Debug, Default, Deserialize)]
pub struct BatchUpdateResponse {
    #[serde(default)]
    pub replies: Vec<Value>,
}

impl BatchUpdateResponse {
    /// `sheetId` assigned by the first `addSheet` reply.
    pub fn added_sheet_id(&self) -> Option<i64> {
        self.replies.iter().find_map(|reply| {
            reply
                .get("addSheet")?
                .get("properties")?
                .get("sheetId")?
                .as_i64()
        })
    }
}

// =============================================================================
// Client
// =============================================================================

/// Authorized handle on one spreadsheet.
#[derive(Clone)]
pub struct SheetsApi {
    http: reqwest::Client,
    api_base: Url,
    store_id: String,
    bearer: SecretString,
}

impl std::fmt::Debug for SheetsApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsApi")
            .field("api_base", &self.api_base.as_str())
            .field("store_id", &self.store_id)
            .field("bearer", &"[REDACTED]")
            .finish()
    }
}

impl SheetsApi {
    pub fn new(
        http: reqwest::Client,
        api_base: Url,
        store_id: impl Into<String>,
        bearer: SecretString,
    ) -> Self {
        Self {
            http,
            api_base,
            store_id: store_id.into(),
            bearer,
        }
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    /// `GET spreadsheets/{id}?fields=...`
    ///
    /// # Errors
    ///
    /// `UpstreamRequest` on transport or status failure, `InvalidResponse` on an unreadable body.
    #[instrument(skip_all, fields(fields = %fields))]
    pub async fn get_metadata(&self, fields: &str) -> Result<SpreadsheetMetadata, SyncError> {
        let url = self.spreadsheet_url(&[])?;
        let request = self.http.get(url).query(&[("fields", fields)]);
        self.send_typed(request, "metadata").await
    }

    /// `POST spreadsheets/{id}:batchUpdate` with `requests`.
    ///
    /// # Errors
    ///
    /// `UpstreamRequest` on transport or status failure, `InvalidResponse` on an unreadable body.
    #[instrument(skip_all)]
    pub async fn batch_update(&self, requests: Vec<Value>) -> Result<BatchUpdateResponse, SyncError> {
        let mut url = self.spreadsheet_url(&[])?;
        let last = format!("{}:batchUpdate", self.store_id);
        url.path_segments_mut()
            .map_err(|()| invalid_base(&self.api_base))?
            .pop()
            .push(&last);

        let request = self.http.post(url).json(&json!({ "requests": requests }));
        self.send_typed(request, "batch_update").await
    }

    /// `PUT spreadsheets/{id}/values/{range}?valueInputOption=RAW`
    ///
    /// # Errors
    ///
    /// `UpstreamRequest` on transport or status failure.
    #[instrument(skip_all, fields(range = %range))]
    pub async fn put_values(&self, range: &str, values: Vec<Vec<String>>) -> Result<(), SyncError> {
        let url = self.spreadsheet_url(&["values", range])?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        let request = self
            .http
            .put(url)
            .query(&[("valueInputOption", "RAW")])
            .json(&body);
        self.send(request, "put_values").await.map(|_| ())
    }

    fn spreadsheet_url(&self, tail: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| invalid_base(&self.api_base))?;
            segments.pop_if_empty().push("spreadsheets").push(&self.store_id);
            segments.extend(tail);
        }
        Ok(url)
    }

    async fn send_typed<T: DeserializeOwned + Default>(
        &self,
        request: RequestBuilder,
        operation: &'static str,
    ) -> Result<T, SyncError> {
        let value = self.send(request, operation).await?;
        if value.is_null() {
            return Ok(T::default());
        }
        serde_json::from_value(value).map_err(|e| {
            warn!(target: "credential_ledger.ledger.http", operation, error = %e, "Unexpected response shape");
            SyncError::InvalidResponse(format!("{operation}: {e}"))
        })
    }

    async fn send(&self, request: RequestBuilder, operation: &'static str) -> Result<Value, SyncError> {
        let response = request
            .bearer_auth(self.bearer.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!(target: "credential_ledger.ledger.http", operation, error = %e, "Request failed");
                SyncError::transport(&e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| SyncError::transport(&e))?;

        if !status.is_success() {
            let message = upstream_error_message(status, &body);
            warn!(
                target: "credential_ledger.ledger.http",
                operation,
                status = %status,
                message = %message,
                "Upstream rejected request"
            );
            trace!(target: "credential_ledger.ledger.http", body = %body, "Upstream error body");
            return Err(SyncError::UpstreamRequest {
                status: Some(status.as_u16()),
                message,
            });
        }

        debug!(target: "credential_ledger.ledger.http", operation, status = %status, "Request succeeded");

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| SyncError::InvalidResponse(format!("{operation}: {e}")))
    }
}

fn invalid_base(base: &Url) -> SyncError {
    SyncError::UpstreamRequest {
        status: None,
        message: format!("API base URL cannot carry a path: {base}"),
    }
}
