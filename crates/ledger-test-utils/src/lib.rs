//! Test utilities for the credential ledger workspace.
//!
//! - [`crypto_fixtures`]: fixed 2048-bit RSA key pairs and service-account JSON
//! - [`sheets_mock`]: `wiremock` mocks for the OAuth token endpoint and the spreadsheet API

pub mod crypto_fixtures;
pub mod sheets_mock;
