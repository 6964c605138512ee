//! Hand-rolled mocks for the ledger seams.
//!
//! Used by unit tests here and by integration tests that need a
//! synchronizer without a network.

use super::auth::{Authenticator, SpreadsheetClient};
use super::oauth::TokenExchange;
use super::session::LedgerSession;
use super::{LedgerRecord, LedgerTarget, TableLayout};
use crate::errors::SyncError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Session step a [`MockSession`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStep {
    TableExists,
    CreateTable,
    WriteRecord,
}

/// A successful call recorded by [`MockSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    TableExists(String),
    CreateTable(String),
    WriteRecord { title: String, values: Vec<String> },
}

/// In-memory session. `create_table` makes the table exist for later calls.
pub struct MockSession {
    table_present: AtomicBool,
    fail_on: Mutex<Option<MockStep>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockSession {
    /// Session whose store already has the table.
    pub fn with_table() -> Arc<Self> {
        Arc::new(Self::new(true))
    }

    /// Session whose store lacks the table.
    pub fn without_table() -> Arc<Self> {
        Arc::new(Self::new(false))
    }

    fn new(table_present: bool) -> Self {
        Self {
            table_present: AtomicBool::new(table_present),
            fail_on: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make `step` fail with a 500 until [`MockSession::clear_failure`].
    #[must_use]
    pub fn failing_on(self: Arc<Self>, step: MockStep) -> Arc<Self> {
        if let Ok(mut fail_on) = self.fail_on.try_lock() {
            *fail_on = Some(step);
        }
        self
    }

    pub async fn clear_failure(&self) {
        *self.fail_on.lock().await = None;
    }

    /// Successful calls in order.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }

    /// Values of every successful record write.
    pub async fn written_values(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                MockCall::WriteRecord { values, .. } => Some(values.clone()),
                _ => None,
            })
            .collect()
    }

    async fn check(&self, step: MockStep) -> Result<(), SyncError> {
        if *self.fail_on.lock().await == Some(step) {
            return Err(SyncError::UpstreamRequest {
                status: Some(500),
                message: format!("mock failure at {step:?}"),
            });
        }
        Ok(())
    }

    async fn record(&self, call: MockCall) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait::async_trait]
impl LedgerSession for Arc<MockSession> {
    async fn table_exists(&self, layout: &TableLayout) -> Result<bool, SyncError> {
        self.check(MockStep::TableExists).await?;
        self.record(MockCall::TableExists(layout.title.clone())).await;
        Ok(self.table_present.load(Ordering::SeqCst))
    }

    async fn create_table(&self, layout: &TableLayout) -> Result<(), SyncError> {
        self.check(MockStep::CreateTable).await?;
        self.table_present.store(true, Ordering::SeqCst);
        self.record(MockCall::CreateTable(layout.title.clone())).await;
        Ok(())
    }

    async fn write_record(&self, layout: &TableLayout, record: &LedgerRecord) -> Result<(), SyncError> {
        self.check(MockStep::WriteRecord).await?;
        self.record(MockCall::WriteRecord {
            title: layout.title.clone(),
            values: record.values(),
        })
        .await;
        Ok(())
    }
}

// =============================================================================
// Authenticator
// =============================================================================

enum MockAuthBehavior {
    Succeed(Arc<MockSession>),
    Unavailable,
    Fail(SyncError),
}

/// Authenticator with a fixed outcome.
pub struct MockAuthenticator {
    name: &'static str,
    behavior: MockAuthBehavior,
    call_count: AtomicUsize,
}

impl MockAuthenticator {
    /// Always hands out `session`.
    pub fn succeeding(name: &'static str, session: Arc<MockSession>) -> Self {
        Self::with_behavior(name, MockAuthBehavior::Succeed(session))
    }

    /// Always reports its entry point as missing.
    pub fn unavailable(name: &'static str) -> Self {
        Self::with_behavior(name, MockAuthBehavior::Unavailable)
    }

    /// Always fails with `error`.
    pub fn failing(name: &'static str, error: SyncError) -> Self {
        Self::with_behavior(name, MockAuthBehavior::Fail(error))
    }

    fn with_behavior(name: &'static str, behavior: MockAuthBehavior) -> Self {
        Self {
            name,
            behavior,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Authenticator for Arc<MockAuthenticator> {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn authenticate(&self, _target: &LedgerTarget) -> Result<Box<dyn LedgerSession>, SyncError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockAuthBehavior::Succeed(session) => Ok(Box::new(Arc::clone(session))),
            MockAuthBehavior::Unavailable => Err(SyncError::AuthStrategyUnavailable(format!(
                "{} is not available",
                self.name
            ))),
            MockAuthBehavior::Fail(error) => Err(error.clone()),
        }
    }
}

// =============================================================================
// Spreadsheet client
// =============================================================================

/// Behaviour of one [`MockSpreadsheetClient`] entry point.
pub enum MockEntry {
    /// The client does not offer this entry point.
    Absent,
    Session(Arc<MockSession>),
    Fail(SyncError),
}

impl MockEntry {
    fn resolve(&self, entry_point: &str) -> Result<Box<dyn LedgerSession>, SyncError> {
        match self {
            MockEntry::Absent => Err(SyncError::AuthStrategyUnavailable(format!(
                "mock client has no {entry_point} entry point"
            ))),
            MockEntry::Session(session) => Ok(Box::new(Arc::clone(session))),
            MockEntry::Fail(error) => Err(error.clone()),
        }
    }
}

/// Client library double with configurable entry points.
pub struct MockSpreadsheetClient {
    native: MockEntry,
    oauth2: MockEntry,
    native_calls: AtomicUsize,
    oauth2_calls: AtomicUsize,
}

impl MockSpreadsheetClient {
    pub fn new(native: MockEntry, oauth2: MockEntry) -> Self {
        Self {
            native,
            oauth2,
            native_calls: AtomicUsize::new(0),
            oauth2_calls: AtomicUsize::new(0),
        }
    }

    pub fn native_calls(&self) -> usize {
        self.native_calls.load(Ordering::SeqCst)
    }

    pub fn oauth2_calls(&self) -> usize {
        self.oauth2_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpreadsheetClient for MockSpreadsheetClient {
    fn name(&self) -> &'static str {
        "mock-client"
    }

    async fn use_service_account_auth(
        &self,
        _target: &LedgerTarget,
    ) -> Result<Box<dyn LedgerSession>, SyncError> {
        self.native_calls.fetch_add(1, Ordering::SeqCst);
        self.native.resolve("service account")
    }

    async fn use_oauth2_client(
        &self,
        _target: &LedgerTarget,
        _authorizer: &TokenExchange,
    ) -> Result<Box<dyn LedgerSession>, SyncError> {
        self.oauth2_calls.fetch_add(1, Ordering::SeqCst);
        self.oauth2.resolve("OAuth2 client")
    }
}
