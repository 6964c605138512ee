//! Credential issuer.
//!
//! Builds the claim set for the communications platform and signs it with
//! the application's RSA private key (RS256). Every call produces a fresh
//! `iat`/`exp` pair and a fresh random `jti`; nothing is cached between calls.
//!
//! # Claim set
//!
//! ```json
//! {
//!   "application_id": "app-123",
//!   "iat": 1757460600,
//!   "exp": 1757547000,
//!   "jti": "1b4e28ba-2fa1-41d2-883f-0016d3cca427",
//!   "sub": "",
//!   "acl": ""
//! }
//! ```
//!
//! `acl` is either the empty string or `{"paths": {...}}`; which one is a
//! per-deployment choice made in configuration, see [`AccessControl`].

use crate::errors::IssueError;
use common::jwt::{sign_rs256, JwtError};
use common::secret::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Default credential validity (24 hours).
pub const DEFAULT_VALIDITY: Duration = Duration::from_secs(86_400);

// =============================================================================
// Access control
// =============================================================================

/// Structured access scope: permitted resource path patterns.
///
/// Each pattern maps to an (optionally empty) filter object, e.g.
/// `{"paths": {"/*/users/**": {}, "/*/conversations/**": {}}}`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AclSpec {
    pub paths: BTreeMap<String, serde_json::Value>,
}

impl AclSpec {
    /// Build a spec granting each pattern with an empty filter.
    pub fn from_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths = patterns
            .into_iter()
            .map(|p| (p.into(), serde_json::Value::Object(serde_json::Map::new())))
            .collect();
        Self { paths }
    }
}

/// The `acl` claim.
///
/// The two representations are alternative policies, not a union: a
/// deployment picks one through configuration. `Unrestricted` serializes as
/// the empty string, `Paths` as the structured object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "AccessControlRepr", into = "AccessControlRepr")]
pub enum AccessControl {
    #[default]
    Unrestricted,
    Paths(AclSpec),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AccessControlRepr {
    Text(String),
    Scoped(AclSpec),
}

impl From<AccessControl> for AccessControlRepr {
    fn from(value: AccessControl) -> Self {
        match value {
            AccessControl::Unrestricted => AccessControlRepr::Text(String::new()),
            AccessControl::Paths(spec) => AccessControlRepr::Scoped(spec),
        }
    }
}

impl TryFrom<AccessControlRepr> for AccessControl {
    type Error = String;

    fn try_from(value: AccessControlRepr) -> Result<Self, Self::Error> {
        match value {
            AccessControlRepr::Text(s) if s.is_empty() => Ok(AccessControl::Unrestricted),
            AccessControlRepr::Text(s) => Err(format!("unexpected acl string: {s:?}")),
            AccessControlRepr::Scoped(spec) => Ok(AccessControl::Paths(spec)),
        }
    }
}

// =============================================================================
// Claims and output
// =============================================================================

/// Claim set signed into the credential. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    pub application_id: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    pub sub: String,
    pub acl: AccessControl,
}

/// Issuance knobs other than the application id and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOptions {
    pub validity: Duration,
    pub subject: String,
    pub access_control: AccessControl,
}

impl Default for IssueOptions {
    fn default() -> Self {
        Self {
            validity: DEFAULT_VALIDITY,
            subject: String::new(),
            access_control: AccessControl::Unrestricted,
        }
    }
}

/// A signed credential together with the claims it was built from.
///
/// The compact token is kept as a `SecretString`; `Debug` never shows it.
#[derive(Debug, Clone)]
pub struct SignedCredential {
    token: SecretString,
    claims: CredentialClaims,
}

impl SignedCredential {
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn claims(&self) -> &CredentialClaims {
        &self.claims
    }

    /// The `iat` claim as a timestamp.
    pub fn issued_at(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::<chrono::Utc>::from_timestamp(self.claims.iat, 0).unwrap_or_default()
    }
}

// =============================================================================
// Issuance
// =============================================================================

/// Issue a credential valid from now for `options.validity`.
///
/// # Errors
///
/// - `IssueError::Configuration` - empty application id or key, zero validity
/// - `IssueError::Signing` - the key is not a usable RSA key or signing failed
pub fn issue(
    application_id: &str,
    private_key: &SecretString,
    options: &IssueOptions,
) -> Result<SignedCredential, IssueError> {
    issue_at(
        application_id,
        private_key,
        options,
        chrono::Utc::now().timestamp(),
    )
}

/// Issue a credential as if the current time were `now` (Unix seconds).
///
/// # Errors
///
/// Same as [`issue`].
#[instrument(skip_all)]
pub fn issue_at(
    application_id: &str,
    private_key: &SecretString,
    options: &IssueOptions,
    now: i64,
) -> Result<SignedCredential, IssueError> {
    if application_id.trim().is_empty() {
        return Err(IssueError::Configuration(
            "application id is required".to_string(),
        ));
    }
    if private_key.expose_secret().trim().is_empty() {
        return Err(IssueError::Configuration(
            "private signing key is required".to_string(),
        ));
    }

    let validity_secs = i64::try_from(options.validity.as_secs())
        .ok()
        .filter(|secs| *secs > 0)
        .ok_or_else(|| {
            IssueError::Configuration("validity must be a positive number of seconds".into())
        })?;
    let exp = now.checked_add(validity_secs).ok_or_else(|| {
        IssueError::Configuration("validity overflows the expiry timestamp".into())
    })?;

    let claims = CredentialClaims {
        application_id: application_id.to_string(),
        iat: now,
        exp,
        jti: Uuid::new_v4().to_string(),
        sub: options.subject.clone(),
        acl: options.access_control.clone(),
    };

    let token = sign_rs256(&claims, private_key, None).map_err(|e| match e {
        JwtError::InvalidKey(reason) => {
            IssueError::Signing(format!("private key is not a valid RSA key: {reason}"))
        }
        other => IssueError::Signing(other.to_string()),
    })?;

    info!(
        target: "credential_ledger.issuer",
        jti = %claims.jti,
        exp = claims.exp,
        "Credential issued"
    );

    Ok(SignedCredential { token, claims })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use common::jwt::verify_rs256;
    use ledger_test_utils::crypto_fixtures::{
        app_private_key_pem, app_public_key_pem, service_account_public_key_pem,
    };
    use serde_json::json;

    fn key() -> SecretString {
        SecretString::from(app_private_key_pem())
    }

    #[test]
    fn test_expiry_is_issued_at_plus_validity() {
        let credential = issue("app-123", &key(), &IssueOptions::default()).unwrap();
        let claims = credential.claims();

        assert_eq!(claims.exp - claims.iat, 86_400);
        assert_eq!(claims.application_id, "app-123");
    }

    #[test]
    fn test_custom_validity() {
        let options = IssueOptions {
            validity: Duration::from_secs(900),
            ..IssueOptions::default()
        };
        let credential = issue_at("app-123", &key(), &options, 1_000).unwrap();
        assert_eq!(credential.claims().iat, 1_000);
        assert_eq!(credential.claims().exp, 1_900);
    }

    #[test]
    fn test_issued_at_matches_iat_claim() {
        let credential =
            issue_at("app-123", &key(), &IssueOptions::default(), 1_757_460_600).unwrap();
        assert_eq!(
            credential.issued_at().to_rfc3339(),
            "2025-09-09T23:30:00+00:00"
        );
    }

    #[test]
    fn test_payload_matches_platform_shape() {
        let credential = issue("app-123", &key(), &IssueOptions::default()).unwrap();

        let payload: serde_json::Value =
            verify_rs256(credential.token().expose_secret(), &app_public_key_pem(), None)
                .unwrap();
        let claims = credential.claims();

        assert_eq!(
            payload,
            json!({
                "application_id": "app-123",
                "iat": claims.iat,
                "exp": claims.iat + 86_400,
                "jti": claims.jti,
                "sub": "",
                "acl": ""
            })
        );
        assert!(Uuid::parse_str(&claims.jti).is_ok());
    }

    #[test]
    fn test_round_trip_decodes_to_same_claims() {
        let options = IssueOptions {
            subject: "alice".to_string(),
            ..IssueOptions::default()
        };
        let credential = issue("app-123", &key(), &options).unwrap();

        let decoded: CredentialClaims =
            verify_rs256(credential.token().expose_secret(), &app_public_key_pem(), None)
                .unwrap();
        assert_eq!(&decoded, credential.claims());
    }

    #[test]
    fn test_header_is_rs256() {
        let credential = issue("app-123", &key(), &IssueOptions::default()).unwrap();
        let header = jsonwebtoken::decode_header(credential.token().expose_secret()).unwrap();
        assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_successive_issues_differ_only_in_fresh_fields() {
        let first = issue_at("app-123", &key(), &IssueOptions::default(), 1_000).unwrap();
        let second = issue_at("app-123", &key(), &IssueOptions::default(), 1_005).unwrap();

        assert_ne!(first.claims().jti, second.claims().jti);
        assert_ne!(first.claims().iat, second.claims().iat);
        assert_ne!(first.claims().exp, second.claims().exp);
        assert_eq!(first.claims().application_id, second.claims().application_id);
        assert_eq!(first.claims().acl, second.claims().acl);
        assert_eq!(first.claims().sub, second.claims().sub);
    }

    #[test]
    fn test_same_clock_still_yields_fresh_jti() {
        let first = issue_at("app-123", &key(), &IssueOptions::default(), 1_000).unwrap();
        let second = issue_at("app-123", &key(), &IssueOptions::default(), 1_000).unwrap();
        assert_ne!(first.claims().jti, second.claims().jti);
        assert_ne!(
            first.token().expose_secret(),
            second.token().expose_secret()
        );
    }

    #[test]
    fn test_token_is_not_verifiable_with_other_key() {
        let credential = issue("app-123", &key(), &IssueOptions::default()).unwrap();
        let result: Result<CredentialClaims, _> = verify_rs256(
            credential.token().expose_secret(),
            &service_account_public_key_pem(),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_application_id_is_configuration_error() {
        let result = issue("", &key(), &IssueOptions::default());
        assert!(matches!(result, Err(IssueError::Configuration(_))));

        let result = issue("   ", &key(), &IssueOptions::default());
        assert!(matches!(result, Err(IssueError::Configuration(_))));
    }

    #[test]
    fn test_empty_key_is_configuration_error() {
        let result = issue("app-123", &SecretString::from(""), &IssueOptions::default());
        assert!(matches!(result, Err(IssueError::Configuration(_))));
    }

    #[test]
    fn test_zero_validity_is_configuration_error() {
        let options = IssueOptions {
            validity: Duration::ZERO,
            ..IssueOptions::default()
        };
        let result = issue("app-123", &key(), &options);
        assert!(matches!(result, Err(IssueError::Configuration(_))));
    }

    #[test]
    fn test_garbage_key_is_signing_error() {
        let result = issue(
            "app-123",
            &SecretString::from("not a pem"),
            &IssueOptions::default(),
        );
        assert!(matches!(result, Err(IssueError::Signing(_))));
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let credential = issue("app-123", &key(), &IssueOptions::default()).unwrap();
        let debug = format!("{credential:?}");
        assert!(!debug.contains(credential.token().expose_secret()));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_structured_acl_policy() {
        let options = IssueOptions {
            access_control: AccessControl::Paths(AclSpec::from_patterns([
                "/*/users/**",
                "/*/conversations/**",
            ])),
            ..IssueOptions::default()
        };
        let credential = issue("app-123", &key(), &options).unwrap();

        let payload: serde_json::Value =
            verify_rs256(credential.token().expose_secret(), &app_public_key_pem(), None)
                .unwrap();
        assert_eq!(
            payload["acl"],
            json!({ "paths": { "/*/users/**": {}, "/*/conversations/**": {} } })
        );
    }

    #[test]
    fn test_access_control_serde() {
        assert_eq!(
            serde_json::to_value(AccessControl::Unrestricted).unwrap(),
            json!("")
        );

        let parsed: AccessControl = serde_json::from_value(json!("")).unwrap();
        assert_eq!(parsed, AccessControl::Unrestricted);

        let parsed: AccessControl =
            serde_json::from_value(json!({ "paths": { "/*/rtc/**": {} } })).unwrap();
        assert_eq!(
            parsed,
            AccessControl::Paths(AclSpec::from_patterns(["/*/rtc/**"]))
        );

        let rejected: Result<AccessControl, _> = serde_json::from_value(json!("admin"));
        assert!(rejected.is_err());
    }
}
