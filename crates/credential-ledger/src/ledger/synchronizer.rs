//! Strategy selection and the shared upsert sequence.

use super::auth::{Authenticator, ClientLibraryAuth, DirectProtocolAuth};
use super::grid_client::GridClient;
use super::http::build_http_client;
use super::oauth::TokenExchange;
use super::session::LedgerSession;
use super::{LedgerRecord, LedgerSettings, LedgerTarget, TableLayout};
use crate::errors::SyncError;
use chrono::{DateTime, Utc};
use common::secret::SecretString;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Result of a sync run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// No store coordinates configured; nothing was contacted.
    Skipped,
    /// The record row was written.
    Written {
        strategy: &'static str,
        table_created: bool,
    },
}

/// Check for the named table, create it if absent, then overwrite the record row.
///
/// Returns whether the table was created by this call.
///
/// # Errors
///
/// The first error from the session; later steps are not attempted.
pub async fn upsert_record(
    session: &dyn LedgerSession,
    layout: &TableLayout,
    record: &LedgerRecord,
) -> Result<bool, SyncError> {
    let created = if session.table_exists(layout).await? {
        false
    } else {
        session.create_table(layout).await?;
        true
    };
    session.write_record(layout, record).await?;
    Ok(created)
}

/// Records credentials into the ledger table using an ordered strategy list.
pub struct LedgerSynchronizer {
    strategies: Vec<Box<dyn Authenticator>>,
    layout: TableLayout,
}

impl LedgerSynchronizer {
    pub fn new(strategies: Vec<Box<dyn Authenticator>>, layout: TableLayout) -> Self {
        Self { strategies, layout }
    }

    /// Production strategy list: grid client first, then the direct protocol.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::UpstreamRequest` if the HTTP client cannot be built.
    pub fn from_settings(settings: &LedgerSettings) -> Result<Self, SyncError> {
        let http = build_http_client(settings.http_timeout)?;
        let exchange = TokenExchange::new(http.clone(), settings.token_url.clone());
        let grid = GridClient::new(http.clone(), settings.api_base.clone());

        let strategies: Vec<Box<dyn Authenticator>> = vec![
            Box::new(ClientLibraryAuth::new(Arc::new(grid), exchange.clone())),
            Box::new(DirectProtocolAuth::new(
                http,
                settings.api_base.clone(),
                exchange,
            )),
        ];
        Ok(Self::new(strategies, settings.layout.clone()))
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Record `token`, dated by its issue time, into the store named by `target`.
    ///
    /// `None` disables sync and returns [`SyncOutcome::Skipped`] without any
    /// network activity.
    ///
    /// # Errors
    ///
    /// See [`LedgerSynchronizer::sync_record`].
    pub async fn sync(
        &self,
        token: &SecretString,
        issued_at: DateTime<Utc>,
        target: Option<&LedgerTarget>,
    ) -> Result<SyncOutcome, SyncError> {
        let Some(target) = target else {
            info!(target: "credential_ledger.ledger.sync", "Ledger sync disabled: store coordinates not configured");
            return Ok(SyncOutcome::Skipped);
        };

        let record = LedgerRecord::new(issued_at, token);
        self.sync_record(target, &record).await
    }

    /// Try each strategy in order until one writes `record`.
    ///
    /// An unavailable strategy is skipped silently; a failing one is logged
    /// and the next is tried.
    ///
    /// # Errors
    ///
    /// The error of the last strategy that actually failed, or
    /// `SyncError::AuthFailure` when no strategy was available at all.
    #[instrument(skip_all, fields(store_id = %target.store_id, table = %self.layout.title))]
    pub async fn sync_record(
        &self,
        target: &LedgerTarget,
        record: &LedgerRecord,
    ) -> Result<SyncOutcome, SyncError> {
        let mut last_error: Option<SyncError> = None;
        let total = self.strategies.len();

        for (index, strategy) in self.strategies.iter().enumerate() {
            let remaining = total - index - 1;

            let attempt = match strategy.authenticate(target).await {
                Ok(session) => upsert_record(session.as_ref(), &self.layout, record).await,
                Err(SyncError::AuthStrategyUnavailable(reason)) => {
                    info!(
                        target: "credential_ledger.ledger.sync",
                        strategy = strategy.name(),
                        reason = %reason,
                        "Authentication strategy unavailable, trying next"
                    );
                    continue;
                }
                Err(e) => Err(e),
            };

            match attempt {
                Ok(table_created) => {
                    info!(
                        target: "credential_ledger.ledger.sync",
                        strategy = strategy.name(),
                        table_created,
                        "Ledger record written"
                    );
                    return Ok(SyncOutcome::Written {
                        strategy: strategy.name(),
                        table_created,
                    });
                }
                Err(e) => {
                    warn!(
                        target: "credential_ledger.ledger.sync",
                        strategy = strategy.name(),
                        error = %e,
                        remaining,
                        "Ledger sync strategy failed"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SyncError::AuthFailure("no authentication strategy available".to_string())
        }))
    }
}
