pub mod apt;
pub mod archive;
pub mod assets;
pub mod cache;
pub mod cli;
pub mod env;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod files;
pub mod flower;
pub mod flowers;
pub mod provisioner;
pub mod registry;
pub mod settings;
pub mod systemd;
pub mod template;
pub mod users;

pub use error::FloristError;

use anyhow::{Context, Result};
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(filter)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .context("failed to set global default tracing subscriber")
}
