use common::config::ObservabilityConfig;
use credential_ledger::config::Config;
use credential_ledger::observability::init_tracing;
use credential_ledger::run::run;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Tracing comes up before config validation so config errors are logged.
    init_tracing(&ObservabilityConfig::from_env());

    info!(target: "credential_ledger", "Starting credential ledger");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(target: "credential_ledger", error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(
        target: "credential_ledger",
        output_path = %config.output_path.display(),
        sync_enabled = config.ledger.is_enabled(),
        "Configuration loaded successfully"
    );

    match run(&config).await {
        Ok(report) if report.succeeded() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!(target: "credential_ledger", error = %e, "Credential issuance failed");
            ExitCode::FAILURE
        }
    }
}
