use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// Whether the invocation only inspects or edits configuration and exits
pub fn is_config_command(args: &Args) -> bool {
    args.list_config || args.new_log_file_path.is_some() || args.clear_log_file_path
}

/// Football fixtures relay
///
/// Serves a JSON API over a football fixtures provider, caching responses and
/// keeping upstream usage under the provider quota. A background job watches
/// today's fixtures and sends Web Push alerts for goals and published lineups
/// to subscribers following the teams involved.
///
/// The upstream API key is read from FOOTBALL_API_KEY (a .env file in the
/// working directory is honored).
#[derive(Parser, Debug, Default)]
#[command(about, long_about = None, version)]
#[command(styles = get_styles())]
pub struct Args {
    /// Port to listen on. Overrides PORT and the config file.
    #[arg(short = 'p', long = "port", help_heading = "Server")]
    pub port: Option<u16>,

    /// Seconds between notification scans. Overrides MATCHDAY_NOTIFY_INTERVAL.
    #[arg(long = "notify-interval", help_heading = "Server")]
    pub notify_interval: Option<u64>,

    /// List current configuration settings with secrets masked
    #[arg(long = "list-config", short = 'l', help_heading = "Configuration")]
    pub list_config: bool,

    /// Update log file path in config. This sets a persistent custom log file location.
    #[arg(long = "set-log-file", help_heading = "Configuration")]
    pub new_log_file_path: Option<String>,

    /// Clear the custom log file path from config, reverting to the default location.
    #[arg(long = "clear-log-file", help_heading = "Configuration")]
    pub clear_log_file_path: bool,

    /// Enable debug logging for the relay.
    #[arg(long = "debug", help_heading = "Debug")]
    pub debug: bool,

    /// Specify a custom log file path for this run.
    #[arg(long = "log-file", help_heading = "Debug")]
    pub log_file: Option<String>,
}
