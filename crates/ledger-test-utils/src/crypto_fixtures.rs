//! Fixed RSA key material for tests
//!
//! Two independent 2048-bit key pairs are checked in under `fixtures/`:
//! one plays the application's credential signing key, the other the
//! service principal used by the ledger sync path. Keeping them distinct lets
//! tests prove that each token was signed with the right key.

use serde_json::json;

/// Client email of the test service principal.
pub const SERVICE_ACCOUNT_EMAIL: &str = "ledger-sync@test-project.iam.gserviceaccount.com";

/// `private_key_id` of the test service principal.
pub const SERVICE_ACCOUNT_KEY_ID: &str = "0123456789abcdef0123456789abcdef01234567";

const APP_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/app_private.pem");
const APP_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/app_public.pem");
const SA_PRIVATE_KEY_PEM: &str = include_str!("../fixtures/service_account_private.pem");
const SA_PUBLIC_KEY_PEM: &str = include_str!("../fixtures/service_account_public.pem");

/// PKCS#8 PEM private key used to sign application credentials.
pub fn app_private_key_pem() -> String {
    APP_PRIVATE_KEY_PEM.to_string()
}

/// SPKI PEM public key matching [`app_private_key_pem`].
pub fn app_public_key_pem() -> String {
    APP_PUBLIC_KEY_PEM.to_string()
}

/// The application key as a single line with escaped `\n`, the way it
/// usually arrives through an environment variable.
pub fn app_private_key_escaped() -> String {
    APP_PRIVATE_KEY_PEM.replace('\n', "\\n")
}

/// PKCS#8 PEM private key of the test service principal.
pub fn service_account_private_key_pem() -> String {
    SA_PRIVATE_KEY_PEM.to_string()
}

/// SPKI PEM public key matching [`service_account_private_key_pem`].
pub fn service_account_public_key_pem() -> String {
    SA_PUBLIC_KEY_PEM.to_string()
}

/// A service-account key document in the provider's download format.
pub fn service_account_json() -> String {
    json!({
        "type": "service_account",
        "project_id": "test-project",
        "private_key_id": SERVICE_ACCOUNT_KEY_ID,
        "private_key": SA_PRIVATE_KEY_PEM,
        "client_email": SERVICE_ACCOUNT_EMAIL,
        "client_id": "100000000000000000001",
    })
    .to_string()
}

/// Same as [`service_account_json`] but pointing `token_uri` at `token_uri`.
pub fn service_account_json_with_token_uri(token_uri: &str) -> String {
    json!({
        "type": "service_account",
        "project_id": "test-project",
        "private_key_id": SERVICE_ACCOUNT_KEY_ID,
        "private_key": SA_PRIVATE_KEY_PEM,
        "client_email": SERVICE_ACCOUNT_EMAIL,
        "token_uri": token_uri,
    })
    .to_string()
}
