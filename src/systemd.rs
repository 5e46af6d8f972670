//! Thin wrappers over `systemctl`.

use anyhow::Result;
use tracing::info;

use crate::executor::{CommandExecutor, CommandSpec, run};

fn systemctl(executor: &dyn CommandExecutor, args: &[&str]) -> Result<()> {
    run(executor, &CommandSpec::new("systemctl", args.iter().copied()))
}

/// Reloads unit files after they were written or changed.
pub fn daemon_reload(executor: &dyn CommandExecutor) -> Result<()> {
    systemctl(executor, &["daemon-reload"])
}

/// Enables `unit` at boot without starting it.
pub fn enable(executor: &dyn CommandExecutor, unit: &str) -> Result<()> {
    info!(unit, "enabling unit");
    systemctl(executor, &["enable", unit])
}

/// Enables `unit` at boot and starts it now.
pub fn enable_now(executor: &dyn CommandExecutor, unit: &str) -> Result<()> {
    info!(unit, "enabling and starting unit");
    systemctl(executor, &["enable", "--now", unit])
}

/// Restarts `unit`, starting it if it was stopped.
pub fn restart(executor: &dyn CommandExecutor, unit: &str) -> Result<()> {
    info!(unit, "restarting unit");
    systemctl(executor, &["restart", unit])
}
