//! Common configuration types for the credential ledger crates.

use std::collections::HashMap;

/// Filter applied when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "credential_ledger=info,common=info";

/// Observability configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive string (e.g. `credential_ledger=debug`)
    pub log_filter: String,
    /// Emit JSON-formatted log lines instead of human-readable text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// Load from the process environment.
    ///
    /// Never fails, so logging can come up before the rest of the
    /// configuration is validated.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Load from `RUST_LOG` and `LOG_FORMAT` (`json` or `text`).
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let log_filter = vars
            .get("RUST_LOG")
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let json_logs = vars
            .get("LOG_FORMAT")
            .is_some_and(|v| v.eq_ignore_ascii_case("json"));

        Self {
            log_filter,
            json_logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let config = ObservabilityConfig::from_vars(&HashMap::new());
        assert_eq!(config, ObservabilityConfig::default());
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_from_env_reads_process_environment() {
        let vars: HashMap<String, String> = std::env::vars().collect();
        assert_eq!(
            ObservabilityConfig::from_env(),
            ObservabilityConfig::from_vars(&vars)
        );
    }

    #[test]
    fn test_json_format_is_case_insensitive() {
        let vars = HashMap::from([("LOG_FORMAT".to_string(), "JSON".to_string())]);
        assert!(ObservabilityConfig::from_vars(&vars).json_logs);
    }

    #[test]
    fn test_custom_filter_and_blank_filter() {
        let vars = HashMap::from([(
            "RUST_LOG".to_string(),
            "credential_ledger=debug".to_string(),
        )]);
        assert_eq!(
            ObservabilityConfig::from_vars(&vars).log_filter,
            "credential_ledger=debug"
        );

        let blank = HashMap::from([("RUST_LOG".to_string(), "  ".to_string())]);
        assert_eq!(
            ObservabilityConfig::from_vars(&blank).log_filter,
            DEFAULT_LOG_FILTER
        );
    }
}
