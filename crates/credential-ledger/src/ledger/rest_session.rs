//! Values-API session used by the direct-protocol strategy.

use super::http::SheetsApi;
use super::session::LedgerSession;
use super::{LedgerRecord, TableLayout};
use crate::errors::SyncError;
use serde_json::json;
use tracing::{debug, info, instrument};

/// Field mask of the existence check.
pub const METADATA_FIELDS: &str = "sheets.properties.title";

/// Session over the raw REST values API.
#[derive(Debug)]
pub struct RestSession {
    api: SheetsApi,
}

impl RestSession {
    pub fn new(api: SheetsApi) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl LedgerSession for RestSession {
    #[instrument(skip_all, fields(table = %layout.title))]
    async fn table_exists(&self, layout: &TableLayout) -> Result<bool, SyncError> {
        let metadata = self.api.get_metadata(METADATA_FIELDS).await?;
        let exists = metadata.find(&layout.title).is_some();
        debug!(target: "credential_ledger.ledger.rest", exists, "Table lookup");
        Ok(exists)
    }

    #[instrument(skip_all, fields(table = %layout.title))]
    async fn create_table(&self, layout: &TableLayout) -> Result<(), SyncError> {
        self.api
            .batch_update(vec![json!({
                "addSheet": { "properties": { "title": layout.title } }
            })])
            .await?;

        // Header goes through the values API; the structural request only adds the table.
        self.api
            .put_values(&layout.header_range(), vec![layout.header()])
            .await?;

        info!(target: "credential_ledger.ledger.rest", store_id = %self.api.store_id(), "Table created");
        Ok(())
    }

    #[instrument(skip_all, fields(table = %layout.title))]
    async fn write_record(&self, layout: &TableLayout, record: &LedgerRecord) -> Result<(), SyncError> {
        self.api
            .put_values(&layout.record_range(), vec![record.values()])
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::ledger::http::{build_http_client, DEFAULT_HTTP_TIMEOUT};
    use common::secret::SecretString;
    use ledger_test_utils::sheets_mock::{
        add_sheet_reply, api_base, api_error_body, batch_update, body_json, metadata_error,
        request_log, rest_metadata, values_put, TEST_ACCESS_TOKEN,
    };
    use serde_json::json;
    use wiremock::MockServer;

    const STORE: &str = "sheet-123";

    fn session(server: &MockServer) -> RestSession {
        RestSession::new(SheetsApi::new(
            build_http_client(DEFAULT_HTTP_TIMEOUT).unwrap(),
            reqwest::Url::parse(&api_base(server)).unwrap(),
            STORE,
            SecretString::from(TEST_ACCESS_TOKEN),
        ))
    }

    #[tokio::test]
    async fn test_table_exists_matches_exact_title() {
        let server = MockServer::start().await;
        rest_metadata(STORE, &["Sheet1", "tokens"]).mount(&server).await;

        let exists = session(&server)
            .table_exists(&TableLayout::default())
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_create_table_adds_sheet_then_writes_header() {
        let server = MockServer::start().await;
        batch_update(STORE, add_sheet_reply(9, "token"))
            .expect(1)
            .mount(&server)
            .await;
        values_put(STORE, "'token'!A1:B1").expect(1).mount(&server).await;

        session(&server)
            .create_table(&TableLayout::default())
            .await
            .unwrap();

        assert_eq!(
            request_log(&server).await,
            vec![
                "POST /v4/spreadsheets/sheet-123:batchUpdate".to_string(),
                "PUT /v4/spreadsheets/sheet-123/values/'token'!A1:B1".to_string(),
            ]
        );

        let requests = server.received_requests().await.unwrap();
        assert_eq!(
            body_json(&requests[0]),
            json!({ "requests": [{ "addSheet": { "properties": { "title": "token" } } }] })
        );
        assert_eq!(body_json(&requests[1])["values"], json!([["발행일", "token"]]));
    }

    #[tokio::test]
    async fn test_metadata_failure_surfaces_upstream_message() {
        let server = MockServer::start().await;
        metadata_error(STORE, 404, api_error_body(404, "Requested entity was not found.", "NOT_FOUND"))
            .mount(&server)
            .await;

        let err = session(&server)
            .table_exists(&TableLayout::default())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::UpstreamRequest {
                status: Some(404),
                message: "Requested entity was not found.".to_string(),
            }
        );
    }
}
