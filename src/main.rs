use std::process::ExitCode;

use log::{error, info, LevelFilter};
use thiserror::Error;

const LOG_CONFIG: &str = "log4rs.yaml";

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
enum LaunchError {
    #[error("Failed to ignite: {0}")]
    Ignite(#[source] rocket::Error),
    #[error("Server stopped unexpectedly: {0}")]
    Launch(#[source] rocket::Error),
}

async fn serve() -> Result<(), LaunchError> {
    let rocket = egov_backend::build()
        .ignite()
        .await
        .map_err(LaunchError::Ignite)?;
    info!("Server configured with {} routes", rocket.routes().count());

    // Rocket's own logger is only useful while starting up.
    log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    rocket.launch().await.map_err(LaunchError::Launch)?;
    Ok(())
}

#[rocket::main]
async fn main() -> ExitCode {
    if let Err(e) = log4rs::init_file(LOG_CONFIG, log4rs_dynamic_filters::default_deserializers()) {
        eprintln!("Failed to initialise logging from {LOG_CONFIG}: {e}");
        return ExitCode::FAILURE;
    }

    match serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            error!("Critical failure, shutting down");
            ExitCode::FAILURE
        }
    }
}
