//! The provisioner driver.
//!
//! A [`Provisioner`] owns the operator's setup function (which fills the
//! [`Registry`]) and the optional configure hooks. [`Provisioner::main`] is
//! the whole binary: it parses the command line, initializes logging,
//! detects the [`Env`], runs the requested phase and maps the outcome to an
//! exit code.

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use camino::Utf8Path;
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use clap::error::ErrorKind;
use tracing::{error, info};

use crate::cli::{Cli, Commands};
use crate::env::Env;
use crate::error::FloristError;
use crate::executor::RealCommandExecutor;
use crate::flower::{Flower, Host};
use crate::registry::Registry;
use crate::settings::Settings;

/// Registers the flowers of this provisioner, in execution order.
pub type SetupFn = Box<dyn Fn(&mut Registry) -> Result<()>>;

/// Runs after settings are loaded and before any flower is configured.
/// Typically moves settings values into configure-time flower fields.
pub type PreConfigureFn = Box<dyn Fn(&mut Registry, &mut Settings) -> Result<()>>;

/// Runs after every flower was configured and the motd was stamped.
pub type PostConfigureFn = Box<dyn Fn(&Registry) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
enum Phase {
    Install,
    Configure,
}

impl Phase {
    fn done(self) -> &'static str {
        match self {
            Phase::Install => "installed",
            Phase::Configure => "configured",
        }
    }
}

/// Drives registered flowers through `list`, `install` and `configure`.
pub struct Provisioner {
    setup: SetupFn,
    pre_configure: Option<PreConfigureFn>,
    post_configure: Option<PostConfigureFn>,
}

impl Provisioner {
    pub fn new(setup: impl Fn(&mut Registry) -> Result<()> + 'static) -> Self {
        Self {
            setup: Box::new(setup),
            pre_configure: None,
            post_configure: None,
        }
    }

    #[must_use]
    pub fn with_pre_configure(
        mut self,
        hook: impl Fn(&mut Registry, &mut Settings) -> Result<()> + 'static,
    ) -> Self {
        self.pre_configure = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn with_post_configure(mut self, hook: impl Fn(&Registry) -> Result<()> + 'static) -> Self {
        self.post_configure = Some(Box::new(hook));
        self
    }

    /// Entry point of a provisioner binary.
    ///
    /// Exits 0 on success and 1 on any failure, including command line
    /// errors. `--help` and `--version` exit 0.
    pub fn main(&self) -> ExitCode {
        let cli = match Cli::try_parse() {
            Ok(cli) => cli,
            Err(err) => {
                // Printing only fails if stdout/stderr are gone.
                let _ = err.print();
                return match err.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                    _ => ExitCode::FAILURE,
                };
            }
        };

        if let Err(err) = crate::init_logging(cli.log_level) {
            eprintln!("{:#}", err);
            return ExitCode::FAILURE;
        }

        let host = match Env::detect(program_name())
            .map_err(anyhow::Error::from)
            .and_then(|env| Host::new(env, Arc::new(RealCommandExecutor)))
        {
            Ok(host) => host,
            Err(err) => {
                error!("{:#}", err);
                return ExitCode::FAILURE;
            }
        };

        let stdout = std::io::stdout();
        self.execute(&cli.command, &host, &mut stdout.lock())
    }

    /// Runs `command` and logs the outcome with the elapsed time.
    pub fn execute(&self, command: &Commands, host: &Host, out: &mut dyn Write) -> ExitCode {
        let start = Instant::now();
        match self.run(command, host, out) {
            Ok(()) => {
                info!(elapsed = ?start.elapsed(), "exit success");
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!(elapsed = ?start.elapsed(), "exit failure: {:#}", err);
                ExitCode::FAILURE
            }
        }
    }

    /// Runs `command` against a freshly built registry.
    ///
    /// Halts at the first failing flower. The motd is stamped only when
    /// every flower of the phase succeeded.
    pub fn run(&self, command: &Commands, host: &Host, out: &mut dyn Write) -> Result<()> {
        let mut registry = Registry::new();
        (self.setup)(&mut registry).context("setup failed")?;

        match command {
            Commands::List => list(&mut registry, host.env(), out),
            Commands::Install => {
                for flower in registry.iter_mut() {
                    init(flower.as_mut(), host.env())?;
                    info!(flower = flower.name(), phase = %Phase::Install, "running flower");
                    flower
                        .install(host)
                        .with_context(|| format!("flower {}: install", flower.name()))?;
                }
                stamp_motd(host.env().motd_path(), Phase::Install, host.env().program())?;
                Ok(())
            }
            Commands::Configure(args) => {
                let mut settings = Settings::load(&args.settings)?;
                if let Some(hook) = &self.pre_configure {
                    hook(&mut registry, &mut settings).context("pre-configure failed")?;
                }
                settings.check()?;

                for flower in registry.iter_mut() {
                    init(flower.as_mut(), host.env())?;
                    info!(flower = flower.name(), phase = %Phase::Configure, "running flower");
                    flower
                        .configure(host)
                        .with_context(|| format!("flower {}: configure", flower.name()))?;
                }
                stamp_motd(host.env().motd_path(), Phase::Configure, host.env().program())?;

                if let Some(hook) = &self.post_configure {
                    hook(&registry).context("post-configure failed")?;
                }
                Ok(())
            }
        }
    }
}

fn init(flower: &mut dyn Flower, env: &Env) -> Result<()> {
    flower
        .init(env)
        .with_context(|| format!("flower {}: init", flower.name()))
}

fn list(registry: &mut Registry, env: &Env, out: &mut dyn Write) -> Result<()> {
    for flower in registry.iter_mut() {
        init(flower.as_mut(), env)?;
        writeln!(out, "{} — {}", flower.name(), flower.description())
            .context("failed to write flower list")?;
        for file in flower.embedded_files() {
            writeln!(out, "    {}", file).context("failed to write flower list")?;
        }
    }
    Ok(())
}

/// Appends `<timestamp> System <installed|configured> by <program>` to the
/// motd, creating it with mode 0644.
fn stamp_motd(path: &Utf8Path, phase: Phase, program: &str) -> Result<(), FloristError> {
    let line = format!(
        "{} System {} by {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        phase.done(),
        program
    );
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .mode(0o644)
        .open(path)
        .map_err(|e| FloristError::io(format!("motd {}", path), e))?;
    file.write_all(line.as_bytes())
        .map_err(|e| FloristError::io(format!("motd {}", path), e))?;
    Ok(())
}

fn program_name() -> String {
    std::env::args()
        .next()
        .as_deref()
        .map(Utf8Path::new)
        .and_then(Utf8Path::file_name)
        .map(str::to_string)
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_motd_appends_one_line_per_call() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = Utf8Path::from_path(dir.path()).expect("utf-8 path").join("motd");
        std::fs::write(&path, "Welcome\n").expect("failed to seed motd");

        stamp_motd(&path, Phase::Install, "web").expect("stamp should succeed");
        stamp_motd(&path, Phase::Configure, "web").expect("stamp should succeed");

        let content = std::fs::read_to_string(&path).expect("failed to read motd");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Welcome");
        assert!(lines[1].ends_with(" System installed by web"), "got: {}", lines[1]);
        assert!(lines[2].ends_with(" System configured by web"), "got: {}", lines[2]);
        let timestamp = lines[1].split(' ').next().expect("timestamp");
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok(), "got: {}", timestamp);
    }

    #[test]
    fn test_stamp_motd_creates_missing_file() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = Utf8Path::from_path(dir.path()).expect("utf-8 path").join("motd");

        stamp_motd(&path, Phase::Install, "db").expect("stamp should succeed");

        let content = std::fs::read_to_string(&path).expect("failed to read motd");
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with("System installed by db\n"));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Install.to_string(), "install");
        assert_eq!(Phase::Configure.to_string(), "configure");
    }
}
