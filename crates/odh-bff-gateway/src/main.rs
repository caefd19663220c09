use std::process::ExitCode;

use odh_bff_core::EnvConfig;
use odh_bff_gateway::logging::init_tracing;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // .env is a development convenience; absence is fine.
    dotenvy::dotenv().ok();

    let config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _guard = match init_tracing(&config.log_level, config.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match odh_bff_gateway::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
