//! `wiremock` building blocks for the token endpoint and the spreadsheet API.
//!
//! Every helper returns an unmounted [`Mock`] so tests can attach call-count
//! expectations before mounting:
//!
//! ```rust,ignore
//! let server = MockServer::start().await;
//! token_exchange_ok("ya29.test").expect(1).mount(&server).await;
//! values_put("sheet-123", "token!A2:B2").expect(1).mount(&server).await;
//! ```

use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Path of the mocked OAuth token endpoint.
pub const TOKEN_PATH: &str = "/token";

/// Path prefix of the mocked spreadsheet API.
pub const API_PREFIX: &str = "/v4";

/// Access token handed out by [`token_exchange_ok`] in most tests.
pub const TEST_ACCESS_TOKEN: &str = "ya29.test-access-token";

/// Field mask used by the values-API metadata read.
pub const REST_METADATA_FIELDS: &str = "sheets.properties.title";

/// Field mask used by the grid client metadata read.
pub const GRID_METADATA_FIELDS: &str = "sheets.properties(sheetId,title)";

/// Token endpoint URL on `server`.
pub fn token_url(server: &MockServer) -> String {
    format!("{}{TOKEN_PATH}", server.uri())
}

/// Spreadsheet API base URL on `server`.
pub fn api_base(server: &MockServer) -> String {
    format!("{}{API_PREFIX}", server.uri())
}

/// `Authorization` header value for [`TEST_ACCESS_TOKEN`].
pub fn bearer(access_token: &str) -> String {
    format!("Bearer {access_token}")
}

/// Successful JWT-bearer exchange returning `access_token`.
pub fn token_exchange_ok(access_token: &str) -> Mock {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains(
            "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
        ))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
}

/// Token endpoint rejecting the assertion with `status` and `body`.
pub fn token_exchange_error(status: u16, body: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
}

/// Values-API metadata read listing `titles`.
pub fn rest_metadata(store_id: &str, titles: &[&str]) -> Mock {
    let sheets: Vec<Value> = titles
        .iter()
        .map(|title| json!({ "properties": { "title": title } }))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/spreadsheets/{store_id}")))
        .and(query_param("fields", REST_METADATA_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sheets": sheets })))
}

/// Grid-client metadata read listing `(sheetId, title)` pairs.
pub fn grid_metadata(store_id: &str, sheets: &[(i64, &str)]) -> Mock {
    let sheets: Vec<Value> = sheets
        .iter()
        .map(|(id, title)| json!({ "properties": { "sheetId": id, "title": title } }))
        .collect();

    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/spreadsheets/{store_id}")))
        .and(query_param("fields", GRID_METADATA_FIELDS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sheets": sheets })))
}

/// Metadata read (either field mask) failing with `status` and `body`.
pub fn metadata_error(store_id: &str, status: u16, body: Value) -> Mock {
    Mock::given(method("GET"))
        .and(path(format!("{API_PREFIX}/spreadsheets/{store_id}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
}

/// Structural batch update answering with `replies`.
pub fn batch_update(store_id: &str, replies: Value) -> Mock {
    Mock::given(method("POST"))
        .and(path(format!("{API_PREFIX}/spreadsheets/{store_id}:batchUpdate")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": store_id,
            "replies": replies
        })))
}

/// Reply body of an `addSheet` request that created `title` as `sheet_id`.
pub fn add_sheet_reply(sheet_id: i64, title: &str) -> Value {
    json!([{ "addSheet": { "properties": { "sheetId": sheet_id, "title": title } } }])
}

/// Values write on `range` (e.g. `token!A2:B2`) with `valueInputOption=RAW`.
pub fn values_put(store_id: &str, range: &str) -> Mock {
    Mock::given(method("PUT"))
        .and(path(format!("{API_PREFIX}/spreadsheets/{store_id}/values/{range}")))
        .and(query_param("valueInputOption", "RAW"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": store_id,
            "updatedRange": range,
            "updatedRows": 1,
            "updatedColumns": 2,
            "updatedCells": 2
        })))
}

/// Values write on `range` failing with `status` and `body`.
pub fn values_put_error(store_id: &str, range: &str, status: u16, body: Value) -> Mock {
    Mock::given(method("PUT"))
        .and(path(format!("{API_PREFIX}/spreadsheets/{store_id}/values/{range}")))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
}

/// The API's error envelope: `{"error": {"code", "message", "status"}}`.
pub fn api_error_body(code: u16, message: &str, status: &str) -> Value {
    json!({ "error": { "code": code, "message": message, "status": status } })
}

/// Parse a received request body as JSON.
pub fn body_json(request: &Request) -> Value {
    serde_json::from_slice(&request.body).unwrap_or(Value::Null)
}

/// Short `METHOD path` description of each received request, in arrival order.
pub async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}
