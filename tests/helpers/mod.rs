use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use camino::Utf8PathBuf;
use florist::env::Env;
use florist::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use florist::flower::Host;

/// Creates a temporary directory and returns it with its UTF-8 path.
#[allow(dead_code)]
pub fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .expect("temp dir path should be valid UTF-8");
    (dir, path)
}

/// An [`Env`] for the current user with the work directory and motd inside `root`.
#[allow(dead_code)]
pub fn test_env(root: &Utf8PathBuf) -> Env {
    Env::detect("florist-test")
        .expect("current user should resolve")
        .with_work_dir(root.join("work"))
        .with_motd_path(root.join("motd"))
}

/// A [`Host`] running commands through `executor`.
#[allow(dead_code)]
pub fn test_host(env: Env, executor: Arc<dyn CommandExecutor>) -> Host {
    Host::new(env, executor).expect("host should build")
}

/// Records executed commands without running them.
///
/// Every call exits 0 unless its command line starts with a prefix given to
/// [`RecordingExecutor::exit_with`].
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingExecutor {
    calls: Mutex<Vec<CommandSpec>>,
    exits: Mutex<Vec<(String, i32)>>,
}

#[allow(dead_code)]
impl RecordingExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes commands whose line starts with `prefix` exit with `code`.
    pub fn exit_with(&self, prefix: &str, code: i32) {
        self.exits.lock().unwrap().push((prefix.to_string(), code));
    }

    /// Command lines of every call, in order.
    pub fn lines(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(CommandSpec::display_line).collect()
    }

    pub fn specs(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, spec: &CommandSpec) -> Result<ExecutionResult> {
        let line = spec.display_line();
        self.calls.lock().unwrap().push(spec.clone());
        let code = self
            .exits
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map_or(0, |(_, code)| *code);
        Ok(ExecutionResult {
            // Raw wait status: the exit code lives in the second byte.
            status: ExitStatus::from_raw(code << 8),
            stderr: if code == 0 {
                Vec::new()
            } else {
                vec![format!("{}: simulated failure", spec.command)]
            },
        })
    }
}
