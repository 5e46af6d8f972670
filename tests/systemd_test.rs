mod helpers;

use anyhow::Result;
use florist::systemd::{daemon_reload, enable, enable_now, restart};
use helpers::RecordingExecutor;

#[test]
fn unit_helpers_call_systemctl() -> Result<()> {
    let executor = RecordingExecutor::new();

    daemon_reload(executor.as_ref())?;
    enable(executor.as_ref(), "consul.service")?;
    enable_now(executor.as_ref(), "nomad.service")?;
    restart(executor.as_ref(), "consul.service")?;

    assert_eq!(
        executor.lines(),
        vec![
            "systemctl daemon-reload",
            "systemctl enable consul.service",
            "systemctl enable --now nomad.service",
            "systemctl restart consul.service",
        ]
    );
    Ok(())
}

#[test]
fn failed_restart_is_reported() {
    let executor = RecordingExecutor::new();
    executor.exit_with("systemctl restart", 1);

    let err = restart(executor.as_ref(), "consul.service").unwrap_err();

    assert!(err.to_string().contains("systemctl restart consul.service"), "got: {}", err);
}
