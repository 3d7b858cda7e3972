use std::process::ExitCode;

use clap::Parser;

use kule_server::{
    config::{Cli, GatewayConfig},
    dispatch::Resources,
    server, telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match GatewayConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("kule: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = telemetry::init_tracing(&config.log) {
        eprintln!("kule: {e}");
        return ExitCode::FAILURE;
    }

    match server::run(config, Resources::new()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gateway stopped");
            ExitCode::FAILURE
        }
    }
}
