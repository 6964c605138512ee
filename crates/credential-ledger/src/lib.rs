//! Credential Ledger Library
//!
//! Issues a short-lived RS256 credential for the communications platform API
//! and records it, with its issue date, in a spreadsheet-backed ledger.
//!
//! # Architecture
//!
//! ```text
//! config.rs -> issuer/ -> artifact.rs -> ledger/synchronizer.rs
//!                                           ├─ ClientLibraryAuth (grid_client.rs)
//!                                           └─ DirectProtocolAuth (rest_session.rs)
//! ```
//!
//! # Modules
//!
//! - `config` - Process configuration from environment
//! - `errors` - Error types per concern
//! - `issuer` - Claim set construction and signing
//! - `artifact` - Local token file
//! - `ledger` - Authentication strategies and the record upsert
//! - `run` - The issue, persist, sync sequence

pub mod artifact;
pub mod config;
pub mod errors;
pub mod issuer;
pub mod ledger;
pub mod observability;
pub mod run;
