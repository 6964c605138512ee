use thiserror::Error;

/// Errors raised while building and signing a credential.
///
/// Both variants are fatal for the run: nothing is persisted and no sync is
/// attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IssueError {
    /// A required issuance input is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The signer rejected the key or failed to sign.
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Errors raised by the ledger synchronizer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The strategy's authentication entry point does not exist. Triggers
    /// fallback to the next strategy and is never surfaced to the caller.
    #[error("Authentication strategy unavailable: {0}")]
    AuthStrategyUnavailable(String),

    /// No usable credential or bearer token could be obtained.
    #[error("Authentication failed: {0}")]
    AuthFailure(String),

    /// The store's API answered with a non-success status, or the request
    /// never completed (`status` is `None` for transport failures).
    #[error("Upstream request failed: {message}")]
    UpstreamRequest {
        status: Option<u16>,
        message: String,
    },

    /// The store's API answered successfully with a body we cannot use.
    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),

    /// A sync-only input (key document, endpoint, timeout) is unusable.
    /// Raised before any strategy runs; the issued credential is unaffected.
    #[error("Invalid sync configuration: {0}")]
    Configuration(String),
}

impl SyncError {
    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        SyncError::UpstreamRequest {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Errors raised while writing the local credential artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to write credential to {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_error_display() {
        let err = IssueError::Configuration("APPLICATION_ID is empty".to_string());
        assert_eq!(err.to_string(), "Configuration error: APPLICATION_ID is empty");

        let err = IssueError::Signing("bad key".to_string());
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::UpstreamRequest {
            status: Some(403),
            message: "The caller does not have permission".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream request failed: The caller does not have permission"
        );

        let err = SyncError::AuthFailure("invalid_grant".to_string());
        assert!(err.to_string().contains("invalid_grant"));

        let err = SyncError::AuthStrategyUnavailable("no-auth-method".to_string());
        assert!(err.to_string().contains("unavailable"));

        let err = SyncError::Configuration("HTTP_TIMEOUT_SECONDS: invalid digit".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid sync configuration: HTTP_TIMEOUT_SECONDS: invalid digit"
        );
    }

    #[test]
    fn test_artifact_error_keeps_source() {
        let err = ArtifactError::Write {
            path: "/nope/jwt.txt".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing dir"),
        };
        assert!(err.to_string().contains("/nope/jwt.txt"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
