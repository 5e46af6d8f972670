//! The flower contract and the context flowers run in.
//!
//! A flower is one unit of provisioning work (a service, a tool, a user
//! setup). The provisioner drives each registered flower through
//! `init` and then either `install` or `configure`:
//!
//! - `init` applies defaults and validates the flower's own fields. It must
//!   not touch the host, and runs before either phase in every invocation.
//! - `install` brings software onto the host: packages, binaries, unit
//!   files, users.
//! - `configure` applies host-specific or secret values to software that an
//!   earlier `install` put in place, possibly in another process.

use std::any::Any;
use std::sync::Arc;

use anyhow::Result;
use camino::Utf8PathBuf;

use crate::apt::Apt;
use crate::env::Env;
use crate::executor::{CommandExecutor, CommandSpec, run};
use crate::fetch::{DOWNLOAD_TIMEOUT, HashKind, http_client, net_fetch};

/// A pluggable unit of provisioning work.
///
/// Flowers are `'static` so the pre-configure callback can reach a concrete
/// flower through [`Registry::flower_mut`](crate::registry::Registry::flower_mut).
pub trait Flower: Any {
    /// Stable, non-empty identifier, unique within the registry.
    fn name(&self) -> &str;

    /// Short, non-empty human description.
    fn description(&self) -> &str;

    /// Paths of the files this flower ships in the asset bundle, in order.
    fn embedded_files(&self) -> Vec<String> {
        Vec::new()
    }

    /// Applies defaults and validates fields. Must not modify the host.
    fn init(&mut self, env: &Env) -> Result<()>;

    /// Installs the flower on the host. Runs after a successful `init`.
    fn install(&self, host: &Host) -> Result<()>;

    /// Configures the installed flower. Runs after a successful `init`.
    fn configure(&self, host: &Host) -> Result<()>;
}

/// Everything a flower may use to act on the host.
pub struct Host {
    env: Env,
    executor: Arc<dyn CommandExecutor>,
    http: reqwest::blocking::Client,
    apt: Apt,
}

impl Host {
    /// Builds a host context running commands through `executor`.
    pub fn new(env: Env, executor: Arc<dyn CommandExecutor>) -> Result<Self> {
        let apt = Apt::new(Arc::clone(&executor), &env)?;
        Ok(Self {
            http: http_client(DOWNLOAD_TIMEOUT)?,
            env,
            executor,
            apt,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn executor(&self) -> &dyn CommandExecutor {
        self.executor.as_ref()
    }

    pub fn apt(&self) -> &Apt {
        &self.apt
    }

    /// Runs a command, failing on a non-zero exit.
    pub fn run(&self, spec: &CommandSpec) -> Result<()> {
        run(self.executor.as_ref(), spec)
    }

    /// Downloads a hash-pinned file into the work directory.
    pub fn fetch(&self, url: &str, kind: HashKind, want: &str) -> Result<Utf8PathBuf> {
        Ok(net_fetch(&self.http, url, kind, want, self.env.work_dir())?)
    }
}
