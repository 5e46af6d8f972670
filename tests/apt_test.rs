mod helpers;

use std::time::Duration;

use anyhow::Result;
use florist::apt::Apt;
use florist::fetch::HashKind;
use helpers::{RecordingExecutor, temp_dir, test_env};

#[test]
fn install_with_fresh_cache_skips_update() -> Result<()> {
    let (_dir, root) = temp_dir();
    let executor = RecordingExecutor::new();
    let env = test_env(&root).with_cache_validity(Duration::from_secs(3600));
    let apt = Apt::new(executor.clone(), &env)?;
    apt.cache().update()?;

    apt.install(&["curl"])?;

    assert_eq!(executor.lines(), vec!["apt-get install -y curl"]);
    Ok(())
}

#[test]
fn install_with_stale_cache_refreshes_first() -> Result<()> {
    let (_dir, root) = temp_dir();
    let executor = RecordingExecutor::new();
    let apt = Apt::new(executor.clone(), &test_env(&root))?;

    apt.install(&["curl", "jq"])?;
    apt.install(&["unzip"])?;

    assert_eq!(
        executor.lines(),
        vec!["apt-get update", "apt-get install -y curl jq", "apt-get install -y unzip"]
    );
    assert!(apt.cache().is_valid());
    Ok(())
}

#[test]
fn apt_get_runs_noninteractive() -> Result<()> {
    let (_dir, root) = temp_dir();
    let executor = RecordingExecutor::new();
    let apt = Apt::new(executor.clone(), &test_env(&root))?;

    apt.install(&["curl"])?;

    for spec in executor.specs() {
        assert!(
            spec.env
                .iter()
                .any(|(k, v)| k == "DEBIAN_FRONTEND" && v == "noninteractive"),
            "missing DEBIAN_FRONTEND for {}",
            spec.display_line()
        );
    }
    Ok(())
}

#[test]
fn failed_update_leaves_cache_invalid() -> Result<()> {
    let (_dir, root) = temp_dir();
    let executor = RecordingExecutor::new();
    executor.exit_with("apt-get update", 100);
    let apt = Apt::new(executor.clone(), &test_env(&root))?;

    let err = apt.install(&["curl"]).unwrap_err();

    assert!(format!("{:#}", err).contains("apt-get update"), "got: {:#}", err);
    assert_eq!(executor.call_count(), 1, "install must not run after a failed update");
    assert!(!apt.cache().is_valid());
    Ok(())
}

#[test]
fn empty_install_does_nothing() -> Result<()> {
    let (_dir, root) = temp_dir();
    let executor = RecordingExecutor::new();
    let apt = Apt::new(executor.clone(), &test_env(&root))?;

    apt.install(&[])?;

    assert_eq!(executor.call_count(), 0);
    Ok(())
}

#[test]
fn remove_skips_packages_that_are_not_installed() -> Result<()> {
    let (_dir, root) = temp_dir();
    let executor = RecordingExecutor::new();
    executor.exit_with("dpkg -s absent", 1);
    let apt = Apt::new(executor.clone(), &test_env(&root))?;

    apt.remove(&["present", "absent"])?;

    assert_eq!(
        executor.lines(),
        vec!["dpkg -s present", "dpkg -s absent", "apt-get remove -y present"]
    );
    Ok(())
}

#[test]
fn add_repo_installs_key_and_source_and_invalidates_cache() -> Result<()> {
    let key = "-----BEGIN PGP PUBLIC KEY BLOCK-----\ntest\n-----END PGP PUBLIC KEY BLOCK-----\n";
    let key_hash = HashKind::Sha256.hex_digest(key.as_bytes())?;
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/gpg")
        .with_status(200)
        .with_body(key)
        .create();

    let (_dir, root) = temp_dir();
    let executor = RecordingExecutor::new();
    let apt = Apt::new(executor.clone(), &test_env(&root))?
        .with_keyring_dir(root.join("keyrings"))
        .with_sources_dir(root.join("sources.list.d"));
    apt.cache().update()?;

    apt.add_repo(
        "hashicorp",
        &format!("{}/gpg", server.url()),
        &key_hash,
        "https://apt.releases.hashicorp.com bookworm main",
    )?;

    let key_path = root.join("keyrings/hashicorp.asc");
    assert_eq!(std::fs::read_to_string(&key_path)?, key);
    assert_eq!(
        std::fs::read_to_string(root.join("sources.list.d/hashicorp.list"))?,
        format!("deb [signed-by={}] https://apt.releases.hashicorp.com bookworm main\n", key_path)
    );
    assert!(!apt.cache().is_valid(), "a new repository requires a refresh");

    apt.install(&["consul"])?;
    assert_eq!(executor.lines(), vec!["apt-get update", "apt-get install -y consul"]);
    Ok(())
}

#[test]
fn add_repo_with_wrong_key_hash_writes_nothing() -> Result<()> {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/gpg")
        .with_status(200)
        .with_body("tampered")
        .create();

    let (_dir, root) = temp_dir();
    let apt = Apt::new(RecordingExecutor::new(), &test_env(&root))?
        .with_keyring_dir(root.join("keyrings"))
        .with_sources_dir(root.join("sources.list.d"));

    let err = apt
        .add_repo(
            "hashicorp",
            &format!("{}/gpg", server.url()),
            "c3ab8ff13720e8ad9047dd39466b3c8974e592c2fa383d4a3960714caef0c4f2",
            "https://apt.releases.hashicorp.com bookworm main",
        )
        .unwrap_err();

    assert!(format!("{:#}", err).contains("hash mismatch"), "got: {:#}", err);
    assert!(!root.join("sources.list.d/hashicorp.list").exists());
    Ok(())
}

#[test]
fn dpkg_install_runs_noninteractive() -> Result<()> {
    let (_dir, root) = temp_dir();
    let executor = RecordingExecutor::new();
    let apt = Apt::new(executor.clone(), &test_env(&root))?;

    apt.dpkg_install(&root.join("consul_1.16.1_amd64.deb"))?;

    let specs = executor.specs();
    assert_eq!(specs.len(), 1);
    assert_eq!(
        specs[0].display_line(),
        format!("dpkg -i {}", root.join("consul_1.16.1_amd64.deb"))
    );
    assert!(specs[0].env.contains(&("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())));
    Ok(())
}
