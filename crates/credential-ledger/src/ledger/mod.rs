//! Ledger synchronizer.
//!
//! Records the most recent credential into a named table of an external
//! spreadsheet store: one header row and one record row, overwritten on
//! every run.
//!
//! # Flow
//!
//! ```text
//! target absent ──► Skipped
//! target present ─► [ClientLibraryAuth] ─► session ─► upsert ─► Written
//!                        │ unavailable / failed
//!                        ▼
//!                   [DirectProtocolAuth] ─► session ─► upsert ─► Written
//!                        │ failed
//!                        ▼
//!                      error
//! ```
//!
//! Each strategy yields a [`session::LedgerSession`]; the metadata read,
//! table creation and record write are shared between strategies in
//! [`synchronizer::upsert_record`].

pub mod auth;
pub mod date;
pub mod grid_client;
pub mod http;
pub mod mock;
pub mod oauth;
pub mod rest_session;
pub mod session;
pub mod synchronizer;

pub use auth::{Authenticator, ClientLibraryAuth, DirectProtocolAuth, SpreadsheetClient};
pub use synchronizer::{LedgerSynchronizer, SyncOutcome};

use crate::errors::SyncError;
use common::jwt::normalize_pem;
use common::secret::{ExposeSecret, SecretString};
use reqwest::Url;
use serde::de::Error as _;
use serde::Deserialize;
use std::time::Duration;

/// Default named table.
pub const DEFAULT_TABLE_TITLE: &str = "token";

/// Default label of the issue-date header cell.
pub const DEFAULT_ISSUE_DATE_LABEL: &str = "발행일";

/// Zero-based row index of the header row.
pub const HEADER_ROW_INDEX: u32 = 0;

/// Zero-based row index of the record row, directly beneath the header.
pub const RECORD_ROW_INDEX: u32 = 1;

// =============================================================================
// Target and principal
// =============================================================================

/// Service principal used to obtain delegated access to the store.
///
/// Deserializes from the provider's service-account key document; fields
/// other than the ones below are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicePrincipal {
    pub client_email: String,
    pub private_key: SecretString,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServicePrincipal {
    /// Parse a service-account key document.
    ///
    /// Escaped `\n` sequences in `private_key` are turned back into line breaks.
    ///
    /// # Errors
    ///
    /// Returns a `serde_json::Error` when the document is not JSON, lacks
    /// `client_email`/`private_key`, or either is empty.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut principal: ServicePrincipal = serde_json::from_str(raw)?;

        if principal.client_email.trim().is_empty() {
            return Err(serde_json::Error::custom("client_email is empty"));
        }
        if principal.private_key.expose_secret().trim().is_empty() {
            return Err(serde_json::Error::custom("private_key is empty"));
        }

        principal.private_key =
            SecretString::from(normalize_pem(principal.private_key.expose_secret()));
        principal.private_key_id = principal.private_key_id.filter(|id| !id.is_empty());
        Ok(principal)
    }
}

/// Store coordinates. Their absence disables sync.
#[derive(Debug, Clone)]
pub struct LedgerTarget {
    pub store_id: String,
    pub principal: ServicePrincipal,
}

// =============================================================================
// Table layout and record
// =============================================================================

/// Where the record lives: table title and header labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    pub title: String,
    pub issue_date_label: String,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            title: DEFAULT_TABLE_TITLE.to_string(),
            issue_date_label: DEFAULT_ISSUE_DATE_LABEL.to_string(),
        }
    }
}

impl TableLayout {
    /// The two-column header row.
    pub fn header(&self) -> Vec<String> {
        vec![self.issue_date_label.clone(), "token".to_string()]
    }

    /// A1 range of the header row, e.g. `'token'!A1:B1`.
    pub fn header_range(&self) -> String {
        self.row_range(HEADER_ROW_INDEX)
    }

    /// A1 range of the record row, e.g. `'token'!A2:B2`.
    pub fn record_range(&self) -> String {
        self.row_range(RECORD_ROW_INDEX)
    }

    /// The title is always quoted; embedded quotes are doubled.
    fn row_range(&self, row_index: u32) -> String {
        let row = row_index + 1;
        let title = self.title.replace('\'', "''");
        format!("'{title}'!A{row}:B{row}")
    }
}

/// The persisted row: localized issue date and the credential.
#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub issue_date: String,
    pub token: SecretString,
}

impl LedgerRecord {
    pub fn new(issued_on: chrono::DateTime<chrono::Utc>, token: &SecretString) -> Self {
        Self {
            issue_date: date::format_issue_date(issued_on),
            token: token.clone(),
        }
    }

    /// Cell values in column order.
    pub fn values(&self) -> Vec<String> {
        vec![
            self.issue_date.clone(),
            self.token.expose_secret().to_string(),
        ]
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Endpoints, timeouts and layout used to build the synchronizer.
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub api_base: Url,
    pub token_url: String,
    pub http_timeout: Duration,
    pub layout: TableLayout,
}

/// Sync inputs as read from the environment, unparsed.
///
/// Nothing here is validated at startup: a broken key document or endpoint
/// must not stop the credential from being issued and written. Parsing
/// happens in [`SyncInputs::resolve`], once sync is actually attempted.
#[derive(Debug, Clone, Default)]
pub struct SyncInputs {
    pub store_id: Option<String>,
    pub service_account_json: Option<SecretString>,
    pub token_url: Option<String>,
    pub api_base: Option<String>,
    pub http_timeout: Option<String>,
    pub layout: TableLayout,
}

/// Parsed sync inputs, ready for [`LedgerSynchronizer::from_settings`].
#[derive(Debug, Clone)]
pub struct ResolvedSync {
    pub settings: LedgerSettings,
    pub target: LedgerTarget,
}

impl SyncInputs {
    /// Both store coordinates are present.
    pub fn is_enabled(&self) -> bool {
        self.store_id.is_some() && self.service_account_json.is_some()
    }

    /// Parse the sync inputs.
    ///
    /// Returns `Ok(None)` when either store coordinate is absent; the other
    /// inputs are not looked at in that case. The token URL comes from
    /// `token_url`, then the key document's `token_uri`, then the default.
    ///
    /// # Errors
    ///
    /// `SyncError::Configuration` naming the offending input.
    pub fn resolve(&self) -> Result<Option<ResolvedSync>, SyncError> {
        let (Some(store_id), Some(key_document)) = (&self.store_id, &self.service_account_json)
        else {
            return Ok(None);
        };

        let principal = ServicePrincipal::from_json(key_document.expose_secret())
            .map_err(|e| sync_input_error("SERVICE_ACCOUNT_JSON", e))?;

        let token_url = self
            .token_url
            .clone()
            .or_else(|| principal.token_uri.clone())
            .unwrap_or_else(|| oauth::DEFAULT_TOKEN_URL.to_string());
        Url::parse(&token_url).map_err(|e| sync_input_error("OAUTH_TOKEN_URL", e))?;

        let api_base = Url::parse(self.api_base.as_deref().unwrap_or(http::DEFAULT_SHEETS_API_BASE))
            .map_err(|e| sync_input_error("SHEETS_API_BASE", e))?;
        if api_base.cannot_be_a_base() {
            return Err(sync_input_error("SHEETS_API_BASE", "not a hierarchical URL"));
        }

        let http_timeout = match &self.http_timeout {
            Some(raw) => parse_timeout(raw)?,
            None => http::DEFAULT_HTTP_TIMEOUT,
        };

        Ok(Some(ResolvedSync {
            settings: LedgerSettings {
                api_base,
                token_url,
                http_timeout,
                layout: self.layout.clone(),
            },
            target: LedgerTarget {
                store_id: store_id.clone(),
                principal,
            },
        }))
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, SyncError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(sync_input_error("HTTP_TIMEOUT_SECONDS", "must be greater than zero")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(sync_input_error("HTTP_TIMEOUT_SECONDS", e)),
    }
}

fn sync_input_error(name: &str, reason: impl std::fmt::Display) -> SyncError {
    SyncError::Configuration(format!("{name}: {reason}"))
}
