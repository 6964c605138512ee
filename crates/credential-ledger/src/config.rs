use crate::issuer::{AccessControl, AclSpec, IssueOptions, DEFAULT_VALIDITY};
use crate::ledger::{SyncInputs, TableLayout, DEFAULT_ISSUE_DATE_LABEL, DEFAULT_TABLE_TITLE};
use common::jwt::normalize_pem;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Local artifact path used when `JWT_OUTPUT_PATH` is unset.
pub const DEFAULT_OUTPUT_PATH: &str = "jwt.txt";

/// Process configuration.
///
/// Only issuance inputs are validated here. Sync inputs are carried raw in
/// [`SyncInputs`] and parsed after the credential has been written.
///
/// `Debug` is safe to log: key material is held in `SecretString`.
#[derive(Debug, Clone)]
pub struct Config {
    pub application_id: String,
    pub private_key: SecretString,
    pub issue: IssueOptions,
    pub output_path: PathBuf,
    pub ledger: SyncInputs,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let application_id = required(vars, "APPLICATION_ID")?.trim().to_string();
        let private_key = SecretString::from(normalize_pem(&required(vars, "PRIVATE_KEY")?));

        let validity = match optional(vars, "JWT_VALIDITY_SECONDS") {
            Some(raw) => Duration::from_secs(positive_seconds("JWT_VALIDITY_SECONDS", &raw)?),
            None => DEFAULT_VALIDITY,
        };

        let access_control = match optional(vars, "JWT_ACL_PATHS") {
            Some(raw) => {
                let patterns: Vec<&str> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                if patterns.is_empty() {
                    return Err(invalid("JWT_ACL_PATHS", "no path patterns given"));
                }
                AccessControl::Paths(AclSpec::from_patterns(patterns))
            }
            None => AccessControl::Unrestricted,
        };

        let issue = IssueOptions {
            validity,
            subject: vars.get("JWT_SUBJECT").cloned().unwrap_or_default(),
            access_control,
        };

        let output_path = PathBuf::from(
            optional(vars, "JWT_OUTPUT_PATH").unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string()),
        );

        // Kept raw: a broken sync input must not block issuance.
        let ledger = SyncInputs {
            store_id: optional(vars, "SPREADSHEET_ID"),
            service_account_json: optional(vars, "SERVICE_ACCOUNT_JSON").map(SecretString::from),
            token_url: optional(vars, "OAUTH_TOKEN_URL"),
            api_base: optional(vars, "SHEETS_API_BASE"),
            http_timeout: optional(vars, "HTTP_TIMEOUT_SECONDS"),
            layout: TableLayout {
                title: optional(vars, "LEDGER_TABLE_TITLE")
                    .unwrap_or_else(|| DEFAULT_TABLE_TITLE.to_string()),
                issue_date_label: optional(vars, "LEDGER_ISSUE_DATE_LABEL")
                    .unwrap_or_else(|| DEFAULT_ISSUE_DATE_LABEL.to_string()),
            },
        };

        Ok(Config {
            application_id,
            private_key,
            issue,
            output_path,
            ledger,
        })
    }
}

/// Present and not blank.
fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name).filter(|v| !v.trim().is_empty()).cloned()
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    optional(vars, name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn positive_seconds(name: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(invalid(name, "must be greater than zero")),
        Ok(secs) => Ok(secs),
        Err(e) => Err(invalid(name, e.to_string())),
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name: name.to_string(),
        reason: reason.into(),
    }
}
