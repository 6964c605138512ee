//! The data-plane seam shared by every authentication strategy.

use super::{LedgerRecord, TableLayout};
use crate::errors::SyncError;

/// An authorized connection to one spreadsheet store.
///
/// Implementations only talk to the store; sequencing (check, create,
/// write) lives in [`super::synchronizer::upsert_record`].
#[async_trait::async_trait]
pub trait LedgerSession: Send + Sync {
    /// Whether the named table of `layout` exists. Always asks the store.
    async fn table_exists(&self, layout: &TableLayout) -> Result<bool, SyncError>;

    /// Create the named table and write its header row.
    async fn create_table(&self, layout: &TableLayout) -> Result<(), SyncError>;

    /// Overwrite the record row with `record`.
    async fn write_record(&self, layout: &TableLayout, record: &LedgerRecord) -> Result<(), SyncError>;
}
