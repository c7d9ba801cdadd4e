mod app;
mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Args, is_config_command};
use matchday_relay::{AppError, Config};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    if args.list_config {
        return commands::handle_list_config_command().await;
    }
    if is_config_command(&args) {
        return commands::handle_config_update_command(&args).await;
    }

    let mut config = Config::load().await?;
    commands::apply_cli_overrides(&mut config, &args);
    config.validate()?;

    let (log_file, _guard) = logging::setup_logging(&args, &config).await?;
    info!(
        "matchday_relay {} starting, logging to {}",
        env!("CARGO_PKG_VERSION"),
        log_file
    );

    if let Err(e) = app::run_server(config).await {
        error!("Relay stopped: {}", e);
        return Err(e);
    }
    Ok(())
}
