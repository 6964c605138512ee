//! Common utilities shared across the credential ledger crates.

#![warn(clippy::pedantic)]

/// Module for common configuration
pub mod config;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for RS256 JWT signing and verification
pub mod jwt;
