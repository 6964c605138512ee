//! One complete run: issue, persist, sync.

use crate::artifact::write_token;
use crate::config::Config;
use crate::errors::{ArtifactError, IssueError, SyncError};
use crate::issuer::{issue, SignedCredential};
use crate::ledger::{LedgerSynchronizer, SyncInputs, SyncOutcome};
use thiserror::Error;
use tracing::{error, info, instrument};

/// Failures that abort a run before sync.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Issue(#[from] IssueError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// What a run produced. The credential is valid whatever `sync` says.
#[derive(Debug)]
pub struct RunReport {
    pub credential: SignedCredential,
    pub sync: Result<SyncOutcome, SyncError>,
}

impl RunReport {
    /// Whether the process should exit successfully.
    pub fn succeeded(&self) -> bool {
        self.sync.is_ok()
    }
}

/// Issue the credential, write it to `config.output_path`, then record it in the ledger.
///
/// # Errors
///
/// Issuance and artifact failures abort the run. Sync failures do not; they
/// are reported in [`RunReport::sync`].
#[instrument(skip_all)]
pub async fn run(config: &Config) -> Result<RunReport, RunError> {
    let credential = issue(&config.application_id, &config.private_key, &config.issue)?;
    write_token(&config.output_path, &credential).await?;

    let sync = record_credential(&config.ledger, &credential).await;

    match &sync {
        Ok(SyncOutcome::Skipped) => {
            info!(target: "credential_ledger.run", "Run complete, ledger sync skipped");
        }
        Ok(SyncOutcome::Written { strategy, .. }) => {
            info!(target: "credential_ledger.run", strategy = *strategy, "Run complete");
        }
        Err(e) => {
            error!(
                target: "credential_ledger.run",
                error = %e,
                "Ledger sync failed; local credential remains valid"
            );
        }
    }

    Ok(RunReport { credential, sync })
}

/// Parse the sync inputs and record `credential`. Runs after the artifact is written.
async fn record_credential(
    inputs: &SyncInputs,
    credential: &SignedCredential,
) -> Result<SyncOutcome, SyncError> {
    let Some(resolved) = inputs.resolve()? else {
        info!(target: "credential_ledger.run", "Ledger sync disabled: store coordinates not configured");
        return Ok(SyncOutcome::Skipped);
    };

    let synchronizer = LedgerSynchronizer::from_settings(&resolved.settings)?;
    synchronizer
        .sync(
            credential.token(),
            credential.issued_at(),
            Some(&resolved.target),
        )
        .await
}
