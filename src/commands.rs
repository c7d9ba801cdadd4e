use crate::cli::Args;
use matchday_relay::config::Config;
use matchday_relay::error::AppError;

/// Handles the --list-config command.
pub async fn handle_list_config_command() -> Result<(), AppError> {
    println!("matchday_relay {}", env!("CARGO_PKG_VERSION"));
    Config::display().await
}

/// Handles configuration update commands (--set-log-file, --clear-log-file).
///
/// Only the file-backed settings are written; credentials stay in the environment.
pub async fn handle_config_update_command(args: &Args) -> Result<(), AppError> {
    let config_path = Config::get_config_path();
    let mut config = if std::path::Path::new(&config_path).exists() {
        Config::load_from_path(&config_path).await?
    } else {
        Config::default()
    };

    apply_log_file_update(&mut config, args);
    config.validate()?;
    config.save().await?;
    println!("Config updated successfully!");

    Ok(())
}

fn apply_log_file_update(config: &mut Config, args: &Args) {
    if let Some(new_log_path) = &args.new_log_file_path {
        config.log_file_path = Some(new_log_path.clone());
    } else if args.clear_log_file_path {
        config.log_file_path = None;
        println!("Custom log file path cleared. Using default location.");
    }
}

/// Applies per-run CLI overrides on top of the loaded config.
pub fn apply_cli_overrides(config: &mut Config, args: &Args) {
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(interval) = args.notify_interval {
        config.notify_interval_seconds = interval;
    }
    if let Some(log_file) = &args.log_file {
        config.log_file_path = Some(log_file.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        let args = Args {
            port: Some(9000),
            notify_interval: Some(45),
            log_file: Some("/tmp/relay.log".to_string()),
            ..Args::default()
        };

        apply_cli_overrides(&mut config, &args);

        assert_eq!(config.port, 9000);
        assert_eq!(config.notify_interval_seconds, 45);
        assert_eq!(config.log_file_path.as_deref(), Some("/tmp/relay.log"));
    }

    #[test]
    fn test_cli_overrides_keep_config_when_absent() {
        let mut config = Config {
            port: 4000,
            ..Config::default()
        };
        apply_cli_overrides(&mut config, &Args::default());
        assert_eq!(config.port, 4000);
    }

    #[test]
    fn test_log_file_update() {
        let mut config = Config::default();
        let set = Args {
            new_log_file_path: Some("/var/log/relay.log".to_string()),
            ..Args::default()
        };
        apply_log_file_update(&mut config, &set);
        assert_eq!(config.log_file_path.as_deref(), Some("/var/log/relay.log"));

        let clear = Args {
            clear_log_file_path: true,
            ..Args::default()
        };
        apply_log_file_update(&mut config, &clear);
        assert_eq!(config.log_file_path, None);
    }
}
