use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::settings::DEFAULT_SETTINGS_PATH;

#[derive(Parser, Debug)]
#[command(
    version = env!("CARGO_PKG_VERSION"),
    about = "Provision this host by running its flowers",
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, default_value = "info", ignore_case = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Initialize every flower and show what it ships
    List,

    /// Install every flower on this host
    Install,

    /// Configure every installed flower from the settings file
    Configure(ConfigureArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ConfigureArgs {
    /// Path to the JSON settings file
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    pub settings: Utf8PathBuf,
}

/// Represents log levels for controlling the verbosity of logging output.
///
/// Each variant maps to the `tracing` level of the same name. Child process
/// output is logged at `Debug`, so `--log-level debug` shows it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}
