//! Entry point: loads the config file named on the command line (or
//! `validator.toml` in the working directory), starts the orchestrator and
//! runs until a shutdown signal arrives.

use std::path::PathBuf;

use anyhow::Result;
use tracing::error;
use validator_node::config::ValidatorConfig;
use validator_node::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("validator.toml"));

    let config = ValidatorConfig::load(&config_path)?;

    let orchestrator = match Orchestrator::start(config).await {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            eprintln!("failed to start validator node: {e:#}");
            std::process::exit(1);
        }
    };

    if let Err(e) = orchestrator.run_until_shutdown().await {
        error!(error = %e, "validator node exited with an error");
        std::process::exit(1);
    }

    Ok(())
}
