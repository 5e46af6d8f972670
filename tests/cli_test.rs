use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use clap::error::ErrorKind;
use florist::cli::{Cli, Commands, ConfigureArgs, LogLevel};

#[test]
fn test_parse_list_command() -> Result<()> {
    let args = Cli::try_parse_from(["florist", "list"])?;

    assert_eq!(args.command, Commands::List);
    assert_eq!(args.log_level, LogLevel::Info);
    Ok(())
}

#[test]
fn test_parse_install_with_log_level() -> Result<()> {
    let args = Cli::try_parse_from(["florist", "--log-level", "DEBUG", "install"])?;

    assert_eq!(args.command, Commands::Install);
    assert_eq!(args.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn test_log_level_after_subcommand() -> Result<()> {
    let args = Cli::try_parse_from(["florist", "install", "--log-level", "warn"])?;

    assert_eq!(args.log_level, LogLevel::Warn);
    Ok(())
}

#[test]
fn test_parse_configure_default_settings() -> Result<()> {
    let args = Cli::try_parse_from(["florist", "configure"])?;

    match args.command {
        Commands::Configure(opts) => {
            assert_eq!(opts.settings, Utf8PathBuf::from("/opt/florist/config.json"));
        }
        _ => panic!("Expected Configure command"),
    }
    Ok(())
}

#[test]
fn test_parse_configure_custom_settings() -> Result<()> {
    let args = Cli::try_parse_from(["florist", "configure", "--settings", "/tmp/web.json"])?;

    assert_eq!(
        args.command,
        Commands::Configure(ConfigureArgs {
            settings: Utf8PathBuf::from("/tmp/web.json"),
        })
    );
    Ok(())
}

#[test]
fn test_missing_subcommand_is_an_error() {
    let err = Cli::try_parse_from(["florist"]).unwrap_err();

    assert!(
        !matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion),
        "missing subcommand must not count as help, got: {:?}",
        err.kind()
    );
}

#[test]
fn test_unknown_log_level_is_rejected() {
    let err = Cli::try_parse_from(["florist", "--log-level", "verbose", "list"]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidValue);
}

#[test]
fn test_help_is_not_a_failure() {
    let err = Cli::try_parse_from(["florist", "--help"]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DisplayHelp);
}
