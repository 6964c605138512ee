//! Authentication strategies.
//!
//! An [`Authenticator`] turns a [`LedgerTarget`] into an authorized
//! [`LedgerSession`]. Strategies are tried in a fixed order by the
//! synchronizer; returning [`SyncError::AuthStrategyUnavailable`] means
//! "skip me" rather than "failed".

use super::http::SheetsApi;
use super::oauth::TokenExchange;
use super::rest_session::RestSession;
use super::session::LedgerSession;
use super::LedgerTarget;
use crate::errors::SyncError;
use reqwest::Url;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Marker reason when a client exposes no usable entry point.
pub const NO_AUTH_METHOD: &str = "no-auth-method";

/// One way of obtaining an authorized session.
#[async_trait::async_trait]
pub trait Authenticator: Send + Sync {
    /// Strategy name used in logs and in [`super::SyncOutcome::Written`].
    fn name(&self) -> &'static str;

    async fn authenticate(&self, target: &LedgerTarget) -> Result<Box<dyn LedgerSession>, SyncError>;
}

/// A spreadsheet client library and its authentication entry points.
///
/// Both entry points default to "unavailable", so a client only overrides
/// the ones it actually supports.
#[async_trait::async_trait]
pub trait SpreadsheetClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Native service-account authentication.
    async fn use_service_account_auth(
        &self,
        _target: &LedgerTarget,
    ) -> Result<Box<dyn LedgerSession>, SyncError> {
        Err(SyncError::AuthStrategyUnavailable(format!(
            "{} has no service account entry point",
            self.name()
        )))
    }

    /// Authentication through an injected OAuth2 authorizer.
    async fn use_oauth2_client(
        &self,
        _target: &LedgerTarget,
        _authorizer: &TokenExchange,
    ) -> Result<Box<dyn LedgerSession>, SyncError> {
        Err(SyncError::AuthStrategyUnavailable(format!(
            "{} has no OAuth2 client entry point",
            self.name()
        )))
    }
}

// =============================================================================
// Strategy A
// =============================================================================

/// Client-library strategy: native entry point first, then OAuth2 injection.
pub struct ClientLibraryAuth {
    client: Arc<dyn SpreadsheetClient>,
    authorizer: TokenExchange,
}

impl ClientLibraryAuth {
    pub fn new(client: Arc<dyn SpreadsheetClient>, authorizer: TokenExchange) -> Self {
        Self { client, authorizer }
    }
}

#[async_trait::async_trait]
impl Authenticator for ClientLibraryAuth {
    fn name(&self) -> &'static str {
        "client-library"
    }

    #[instrument(skip_all)]
    async fn authenticate(&self, target: &LedgerTarget) -> Result<Box<dyn LedgerSession>, SyncError> {
        let client = self.client.name();

        match self.client.use_service_account_auth(target).await {
            Err(SyncError::AuthStrategyUnavailable(reason)) => {
                debug!(target: "credential_ledger.ledger.auth", client, reason = %reason, "Native entry point absent");
            }
            other => return other,
        }

        match self.client.use_oauth2_client(target, &self.authorizer).await {
            Err(SyncError::AuthStrategyUnavailable(reason)) => {
                debug!(target: "credential_ledger.ledger.auth", client, reason = %reason, "OAuth2 entry point absent");
                Err(SyncError::AuthStrategyUnavailable(NO_AUTH_METHOD.to_string()))
            }
            other => other,
        }
    }
}

// =============================================================================
// Strategy B
// =============================================================================

/// Direct-protocol strategy: JWT-bearer exchange, then the raw values API.
pub struct DirectProtocolAuth {
    http: reqwest::Client,
    api_base: Url,
    exchange: TokenExchange,
}

impl DirectProtocolAuth {
    pub fn new(http: reqwest::Client, api_base: Url, exchange: TokenExchange) -> Self {
        Self {
            http,
            api_base,
            exchange,
        }
    }
}

#[async_trait::async_trait]
impl Authenticator for DirectProtocolAuth {
    fn name(&self) -> &'static str {
        "direct-protocol"
    }

    #[instrument(skip_all)]
    async fn authenticate(&self, target: &LedgerTarget) -> Result<Box<dyn LedgerSession>, SyncError> {
        let bearer = self.exchange.access_token(&target.principal).await?;
        Ok(Box::new(RestSession::new(SheetsApi::new(
            self.http.clone(),
            self.api_base.clone(),
            target.store_id.clone(),
            bearer,
        ))))
    }
}
