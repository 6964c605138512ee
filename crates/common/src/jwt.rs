//! RS256 JWT utilities shared by the credential issuer and the ledger sync path.
//!
//! Both outbound token types in this workspace are RS256 JWTs signed with a
//! PEM-encoded RSA private key:
//! - the application credential handed to the communications platform
//! - the service-account assertion exchanged for a spreadsheet access token
//!
//! # Security
//!
//! - Private keys are only accepted as `SecretString` and never logged
//! - Signed tokens are returned as `SecretString`
//! - Tokens are size-checked BEFORE verification
//! - Only RS256 is produced or accepted
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{sign_rs256, verify_rs256};
//!
//! let token = sign_rs256(&claims, &private_key, None)?;
//! let decoded: MyClaims = verify_rs256(token.expose_secret(), public_key_pem, None)?;
//! ```

use crate::secret::{ExposeSecret, SecretString};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

// =============================================================================
// Constants
// =============================================================================

/// Maximum accepted JWT size in bytes (8KB).
///
/// RS256 tokens with 2048-bit keys carry a 342-byte signature segment; the
/// claim sets signed here stay well under 1KB. Anything larger is rejected
/// before base64 decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// The only algorithm this crate signs or verifies with.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while signing or verifying a JWT.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtError {
    /// The PEM key could not be parsed as an RSA key.
    #[error("Invalid RSA key: {0}")]
    InvalidKey(String),

    /// Encoding the claim set or computing the signature failed.
    #[error("JWT signing failed: {0}")]
    Signing(String),

    /// Signature, structure, expiry or audience check failed.
    #[error("JWT verification failed: {0}")]
    Verification(String),
}

// =============================================================================
// Functions
// =============================================================================

/// Restore real line breaks in a PEM that was stored with escaped `\n` sequences.
///
/// Service-account JSON documents and single-line environment variables both
/// commonly carry the key this way. PEMs that already contain line breaks are
/// returned unchanged apart from surrounding whitespace.
#[must_use]
pub fn normalize_pem(raw: &str) -> String {
    raw.trim().replace("\\n", "\n")
}

/// Sign `claims` as a compact RS256 JWT.
///
/// The header is `{"alg":"RS256","typ":"JWT"}` plus `kid` when `key_id` is given.
///
/// # Errors
///
/// - `JwtError::InvalidKey` - `private_key_pem` is not an RSA private key (PKCS#1 or PKCS#8)
/// - `JwtError::Signing` - claim serialization or signing failed
#[instrument(skip_all)]
pub fn sign_rs256<T: Serialize>(
    claims: &T,
    private_key_pem: &SecretString,
    key_id: Option<&str>,
) -> Result<SecretString, JwtError> {
    let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.expose_secret().as_bytes())
        .map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Failed to parse RSA private key");
            JwtError::InvalidKey(e.to_string())
        })?;

    let mut header = Header::new(SIGNING_ALGORITHM);
    header.typ = Some("JWT".to_string());
    header.kid = key_id.map(ToString::to_string);

    let token = encode(&header, claims, &encoding_key)
        .map_err(|e| JwtError::Signing(e.to_string()))?;

    Ok(SecretString::from(token))
}

/// Verify an RS256 JWT against a PEM public key and decode its claims.
///
/// `exp` is always validated. When `audience` is `None` the `aud` claim is
/// not checked.
///
/// # Errors
///
/// - `JwtError::Verification` - token too large, malformed, badly signed, expired,
///   or issued for another audience
/// - `JwtError::InvalidKey` - `public_key_pem` is not an RSA public key
#[instrument(skip_all)]
pub fn verify_rs256<T: DeserializeOwned>(
    token: &str,
    public_key_pem: &str,
    audience: Option<&str>,
) -> Result<T, JwtError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtError::Verification("token too large".to_string()));
    }

    let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
        .map_err(|e| JwtError::InvalidKey(e.to_string()))?;

    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.validate_exp = true;
    match audience {
        Some(aud) => validation.set_audience(&[aud]),
        None => validation.validate_aud = false,
    }

    let data = decode::<T>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Token verification failed");
        JwtError::Verification(e.to_string())
    })?;

    Ok(data.claims)
}

// =============================================================================
// Tests
// =============================================================================
