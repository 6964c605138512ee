//! Sheet-oriented spreadsheet client used by the client-library strategy.
//!
//! Unlike the values API, the grid client addresses tables by numeric
//! `sheetId`: it learns ids from metadata or from the `addSheet` reply and
//! writes rows with `updateCells`.

use super::auth::SpreadsheetClient;
use super::http::{SheetsApi, SpreadsheetMetadata};
use super::oauth::{self_signed_access_token, TokenExchange};
use super::session::LedgerSession;
use super::{LedgerRecord, LedgerTarget, TableLayout, HEADER_ROW_INDEX, RECORD_ROW_INDEX};
use crate::errors::SyncError;
use reqwest::Url;
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Field mask of the metadata read; includes ids.
pub const METADATA_FIELDS: &str = "sheets.properties(sheetId,title)";

/// Spreadsheet client with two authentication entry points.
#[derive(Debug, Clone)]
pub struct GridClient {
    http: reqwest::Client,
    api_base: Url,
    audience: String,
}

impl GridClient {
    pub fn new(http: reqwest::Client, api_base: Url) -> Self {
        let audience = format!("{}/", api_base.origin().ascii_serialization());
        Self {
            http,
            api_base,
            audience,
        }
    }

    /// Audience of self-signed bearer tokens (API origin with trailing slash).
    pub fn audience(&self) -> &str {
        &self.audience
    }

    fn session(&self, target: &LedgerTarget, bearer: common::secret::SecretString) -> GridSession {
        GridSession::new(SheetsApi::new(
            self.http.clone(),
            self.api_base.clone(),
            target.store_id.clone(),
            bearer,
        ))
    }
}

#[async_trait::async_trait]
impl SpreadsheetClient for GridClient {
    fn name(&self) -> &'static str {
        "grid-client"
    }

    #[instrument(skip_all)]
    async fn use_service_account_auth(
        &self,
        target: &LedgerTarget,
    ) -> Result<Box<dyn LedgerSession>, SyncError> {
        let bearer = self_signed_access_token(
            &target.principal,
            &self.audience,
            chrono::Utc::now().timestamp(),
        )?;
        Ok(Box::new(self.session(target, bearer)))
    }

    #[instrument(skip_all)]
    async fn use_oauth2_client(
        &self,
        target: &LedgerTarget,
        authorizer: &TokenExchange,
    ) -> Result<Box<dyn LedgerSession>, SyncError> {
        let bearer = authorizer.access_token(&target.principal).await?;
        Ok(Box::new(self.session(target, bearer)))
    }
}

/// Grid-client session. Caches `title -> sheetId` learned during the run.
#[derive(Debug)]
pub struct GridSession {
    api: SheetsApi,
    sheet_ids: RwLock<HashMap<String, i64>>,
}

impl GridSession {
    pub fn new(api: SheetsApi) -> Self {
        Self {
            api,
            sheet_ids: RwLock::new(HashMap::new()),
        }
    }

    /// Read metadata and cache the ids it carries. Sheets without an id are
    /// still returned but cannot be written by this client.
    async fn refresh_sheet_ids(&self) -> Result<SpreadsheetMetadata, SyncError> {
        let metadata = self.api.get_metadata(METADATA_FIELDS).await?;
        let mut ids = self.sheet_ids.write().await;
        ids.clear();
        for sheet in &metadata.sheets {
            if let Some(id) = sheet.properties.sheet_id {
                ids.insert(sheet.properties.title.clone(), id);
            }
        }
        Ok(metadata)
    }

    async fn sheet_id(&self, title: &str) -> Result<i64, SyncError> {
        if let Some(id) = self.sheet_ids.read().await.get(title) {
            return Ok(*id);
        }
        self.refresh_sheet_ids().await?;
        self.sheet_ids
            .read()
            .await
            .get(title)
            .copied()
            .ok_or_else(|| SyncError::InvalidResponse(format!("table '{title}' has no sheetId")))
    }

    async fn update_row(&self, sheet_id: i64, row_index: u32, values: Vec<String>) -> Result<(), SyncError> {
        self.api
            .batch_update(vec![update_cells_request(sheet_id, row_index, &values)])
            .await
            .map(|_| ())
    }
}

fn update_cells_request(sheet_id: i64, row_index: u32, values: &[String]) -> Value {
    let cells: Vec<Value> = values
        .iter()
        .map(|v| json!({ "userEnteredValue": { "stringValue": v } }))
        .collect();

    json!({
        "updateCells": {
            "start": { "sheetId": sheet_id, "rowIndex": row_index, "columnIndex": 0 },
            "rows": [{ "values": cells }],
            "fields": "userEnteredValue"
        }
    })
}

#[async_trait::async_trait]
impl LedgerSession for GridSession {
    #[instrument(skip_all, fields(table = %layout.title))]
    async fn table_exists(&self, layout: &TableLayout) -> Result<bool, SyncError> {
        let metadata = self.refresh_sheet_ids().await?;
        let exists = metadata.find(&layout.title).is_some();
        debug!(target: "credential_ledger.ledger.grid", exists, "Table lookup");
        Ok(exists)
    }

    #[instrument(skip_all, fields(table = %layout.title))]
    async fn create_table(&self, layout: &TableLayout) -> Result<(), SyncError> {
        let response = self
            .api
            .batch_update(vec![json!({
                "addSheet": {
                    "properties": {
                        "title": layout.title,
                        "gridProperties": { "frozenRowCount": 1 }
                    }
                }
            })])
            .await?;

        let sheet_id = response.added_sheet_id().ok_or_else(|| {
            SyncError::InvalidResponse("addSheet reply without sheetId".to_string())
        })?;
        self.sheet_ids
            .write()
            .await
            .insert(layout.title.clone(), sheet_id);

        self.update_row(sheet_id, HEADER_ROW_INDEX, layout.header()).await?;

        info!(target: "credential_ledger.ledger.grid", sheet_id, "Table created");
        Ok(())
    }

    #[instrument(skip_all, fields(table = %layout.title))]
    async fn write_record(&self, layout: &TableLayout, record: &LedgerRecord) -> Result<(), SyncError> {
        let sheet_id = self.sheet_id(&layout.title).await?;
        self.update_row(sheet_id, RECORD_ROW_INDEX, record.values()).await
    }
}
