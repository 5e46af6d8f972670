//! Debian package management through `apt-get` and `dpkg`.
//!
//! A package index refresh (`apt-get update`) costs tens of seconds and
//! often dominates a provisioning run. [`Apt`] keeps a [`CacheState`] in the
//! work directory and refreshes only when the last successful refresh is
//! older than the cache validity. Nothing short of a wall-clock window can
//! tell, without false negatives, that the index is still fresh.
//! [`Apt::add_repo`] invalidates the cache so the next [`Apt::install`]
//! sees the new repository.

use std::sync::Arc;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::cache::CacheState;
use crate::env::{Env, Owner};
use crate::executor::{CommandExecutor, CommandSpec, run};
use crate::fetch::{HashKind, KEY_TIMEOUT, http_client, net_fetch};
use crate::files::{copy_file, mkdir, write_file};

const APT_GET: &str = "apt-get";
const DPKG: &str = "dpkg";

/// Name of the cache sentinel guarding `apt-get update`.
pub const UPDATE_CACHE_NAME: &str = "apt-update";

/// Directory holding repository signing keys.
pub const DEFAULT_KEYRING_DIR: &str = "/etc/apt/keyrings";

/// Directory holding one-line repository source lists.
pub const DEFAULT_SOURCES_DIR: &str = "/etc/apt/sources.list.d";

/// Package layer over APT.
pub struct Apt {
    executor: Arc<dyn CommandExecutor>,
    cache: CacheState,
    owner: Owner,
    work_dir: Utf8PathBuf,
    keyring_dir: Utf8PathBuf,
    sources_dir: Utf8PathBuf,
    client: reqwest::blocking::Client,
}

impl Apt {
    /// Creates the package layer; the update cache lives in the work directory.
    pub fn new(executor: Arc<dyn CommandExecutor>, env: &Env) -> Result<Self> {
        Ok(Self {
            executor,
            cache: CacheState::new(env.cache_validity(), env.work_dir(), UPDATE_CACHE_NAME),
            owner: env.owner(),
            work_dir: env.work_dir().to_path_buf(),
            keyring_dir: Utf8PathBuf::from(DEFAULT_KEYRING_DIR),
            sources_dir: Utf8PathBuf::from(DEFAULT_SOURCES_DIR),
            client: http_client(KEY_TIMEOUT)?,
        })
    }

    #[must_use]
    pub fn with_keyring_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.keyring_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_sources_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.sources_dir = dir.into();
        self
    }

    /// The cache guarding `apt-get update`.
    pub fn cache(&self) -> &CacheState {
        &self.cache
    }

    fn apt_get<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(APT_GET, args).with_env("DEBIAN_FRONTEND", "noninteractive")
    }

    /// Refreshes the package index and marks the cache valid.
    pub fn update(&self) -> Result<()> {
        info!("refreshing package index");
        run(self.executor.as_ref(), &self.apt_get(["update"]))?;
        self.cache.update()?;
        Ok(())
    }

    /// Installs `packages`, refreshing the index first if the cache is stale.
    pub fn install(&self, packages: &[&str]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        if self.cache.is_valid() {
            debug!("package index is fresh, skipping refresh");
        } else {
            self.update()?;
        }
        info!(packages = ?packages, "installing packages");
        let args = ["install", "-y"].into_iter().chain(packages.iter().copied());
        run(self.executor.as_ref(), &self.apt_get(args))
            .with_context(|| format!("failed to install {}", packages.join(" ")))
    }

    /// Removes `packages`. Packages unknown to dpkg are skipped.
    pub fn remove(&self, packages: &[&str]) -> Result<()> {
        let mut present = Vec::new();
        for package in packages {
            let status = self
                .executor
                .execute(&CommandSpec::new(DPKG, ["-s", *package]))?;
            if status.success() {
                present.push(*package);
            } else {
                debug!(package, "not installed, nothing to remove");
            }
        }
        if present.is_empty() {
            return Ok(());
        }
        info!(packages = ?present, "removing packages");
        let args = ["remove", "-y"].into_iter().chain(present.iter().copied());
        run(self.executor.as_ref(), &self.apt_get(args))
            .with_context(|| format!("failed to remove {}", present.join(" ")))
    }

    /// Adds an APT repository signed by a hash-pinned key.
    ///
    /// `repo` is the rest of the `deb` line after the URL keyword, e.g.
    /// `https://apt.releases.hashicorp.com bookworm main`. The key ends up in
    /// the keyring directory as `<name>.asc` (or `<name>.gpg` for binary
    /// keys) and the source list as `<name>.list`.
    pub fn add_repo(&self, name: &str, key_url: &str, key_hash: &str, repo: &str) -> Result<()> {
        if name.is_empty() || repo.is_empty() {
            anyhow::bail!("AddRepo: name and repository must not be empty");
        }
        let downloaded = net_fetch(&self.client, key_url, HashKind::Sha256, key_hash, &self.work_dir)
            .with_context(|| format!("AddRepo {}: fetching signing key", name))?;

        let extension = if downloaded.as_str().ends_with(".gpg") { "gpg" } else { "asc" };
        mkdir(&self.keyring_dir, 0o755, &self.owner)?;
        let key_path = self.keyring_dir.join(format!("{}.{}", name, extension));
        copy_file(&downloaded, &key_path, 0o644, &self.owner)?;

        let list_path = self.sources_dir.join(format!("{}.list", name));
        write_file(&list_path, &source_line(&key_path, repo), 0o644, &self.owner)?;
        info!(repo = name, list = %list_path, "repository added");

        self.cache.invalidate()?;
        Ok(())
    }

    /// Installs a local `.deb` file.
    pub fn dpkg_install(&self, package: &Utf8Path) -> Result<()> {
        info!(package = %package, "installing local package");
        let spec = CommandSpec::new(DPKG, ["-i", package.as_str()])
            .with_env("DEBIAN_FRONTEND", "noninteractive");
        run(self.executor.as_ref(), &spec)
    }
}

fn source_line(key_path: &Utf8Path, repo: &str) -> String {
    format!("deb [signed-by={}] {}\n", key_path, repo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_line() {
        assert_eq!(
            source_line(
                Utf8Path::new("/etc/apt/keyrings/hashicorp.asc"),
                "https://apt.releases.hashicorp.com bookworm main"
            ),
            "deb [signed-by=/etc/apt/keyrings/hashicorp.asc] https://apt.releases.hashicorp.com bookworm main\n"
        );
    }
}
