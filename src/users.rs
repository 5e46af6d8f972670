//! User and group management through the Debian `adduser` tool family.
//!
//! Every operation checks the system databases first and does nothing
//! (besides logging) when the user or group already exists, so flowers can
//! call them on every run.

use anyhow::{Context, Result};
use camino::Utf8Path;
use tracing::{debug, info};

use crate::env::{GroupInfo, UserInfo};
use crate::error::FloristError;
use crate::executor::{CommandExecutor, CommandSpec, run};

/// Creates a regular user with a home directory and no password.
pub fn user_add(executor: &dyn CommandExecutor, name: &str) -> Result<()> {
    require_name("user", name)?;
    if UserInfo::lookup(name)?.is_some() {
        debug!(user = name, "user already exists");
        return Ok(());
    }
    info!(user = name, "adding user");
    let spec = CommandSpec::new("adduser", ["--disabled-password", "--gecos", "", name]);
    run(executor, &spec).with_context(|| format!("failed to add user {}", name))
}

/// Creates a system user with its own group and the given home directory.
pub fn user_system_add(executor: &dyn CommandExecutor, name: &str, home: &Utf8Path) -> Result<()> {
    require_name("user", name)?;
    if UserInfo::lookup(name)?.is_some() {
        debug!(user = name, "system user already exists");
        return Ok(());
    }
    info!(user = name, home = %home, "adding system user");
    let spec = CommandSpec::new(
        "adduser",
        ["--system", "--group", "--home", home.as_str(), name],
    );
    run(executor, &spec).with_context(|| format!("failed to add system user {}", name))
}

/// Creates a system group.
pub fn group_system_add(executor: &dyn CommandExecutor, name: &str) -> Result<()> {
    require_name("group", name)?;
    if GroupInfo::lookup(name)?.is_some() {
        debug!(group = name, "group already exists");
        return Ok(());
    }
    info!(group = name, "adding system group");
    let spec = CommandSpec::new("addgroup", ["--system", name]);
    run(executor, &spec).with_context(|| format!("failed to add system group {}", name))
}

/// Adds `user` to `groups`, keeping its existing memberships.
pub fn supplementary_groups(
    executor: &dyn CommandExecutor,
    user: &str,
    groups: &[&str],
) -> Result<()> {
    require_name("user", user)?;
    if groups.is_empty() {
        return Ok(());
    }
    info!(user, groups = ?groups, "adding supplementary groups");
    let joined = groups.join(",");
    let spec = CommandSpec::new("usermod", ["--append", "--groups", joined.as_str(), user]);
    run(executor, &spec).with_context(|| format!("failed to add {} to groups {}", user, joined))
}

fn require_name(kind: &str, name: &str) -> Result<(), FloristError> {
    if name.is_empty() {
        return Err(FloristError::Validation(format!("{} name must not be empty", kind)));
    }
    Ok(())
}
