//! Local credential artifact.

use crate::errors::ArtifactError;
use crate::issuer::SignedCredential;
use common::secret::ExposeSecret;
use std::path::Path;
use tracing::{info, instrument};

/// Overwrite `path` with the bare compact token (no trailing newline).
///
/// # Errors
///
/// Returns `ArtifactError::Write` if the file cannot be written.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn write_token(path: &Path, credential: &SignedCredential) -> Result<(), ArtifactError> {
    tokio::fs::write(path, credential.token().expose_secret().as_bytes())
        .await
        .map_err(|source| ArtifactError::Write {
            path: path.display().to_string(),
            source,
        })?;

    info!(
        target: "credential_ledger.artifact",
        path = %path.display(),
        jti = %credential.claims().jti,
        "Credential written"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::issuer::{issue, IssueOptions};
    use common::secret::SecretString;
    use ledger_test_utils::crypto_fixtures::app_private_key_pem;

    fn credential() -> SignedCredential {
        issue(
            "app-123",
            &SecretString::from(app_private_key_pem()),
            &IssueOptions::default(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_write_token_overwrites_with_bare_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jwt.txt");
        tokio::fs::write(&path, "stale contents that are longer than nothing")
            .await
            .unwrap();

        let credential = credential();
        write_token(&path, &credential).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, credential.token().expose_secret());
        assert!(!written.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_write_token_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("jwt.txt");

        let err = write_token(&path, &credential()).await.unwrap_err();
        let ArtifactError::Write { path: reported, .. } = err;
        assert!(reported.ends_with("jwt.txt"));
    }
}
