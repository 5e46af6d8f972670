use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use serde::Serialize;

use crate::assets::{AssetSource, DirAssets, UnionAssets};
use crate::env::{Env, Owner, UserInfo};
use crate::error::FloristError;
use crate::files::{copy_template_fs, mkdir};
use crate::flower::{Flower, Host};
use crate::template::Delimiters;

use super::ASSETS;

const TEMPLATE: &str = "authorized_keys.tmpl";

/// Installs the SSH public keys allowed to log in as a user.
///
/// `keys` is a configure-time field, normally filled from the settings file
/// by the pre-configure hook.
#[derive(Debug, Clone, Default)]
pub struct AuthorizedKeys {
    /// Account to configure. Defaults to the user running the provisioner.
    pub user: String,
    /// Directory holding `.ssh`. Defaults to the user's home directory.
    pub home: Option<Utf8PathBuf>,
    /// Directory whose files take precedence over the embedded ones.
    pub asset_overrides: Option<Utf8PathBuf>,
    /// Public keys, one per line.
    pub keys: String,
    pub resolved: Option<(Utf8PathBuf, Owner)>,
}

#[derive(Serialize)]
struct TemplateData<'a> {
    program: &'a str,
    keys: &'a str,
}

impl AuthorizedKeys {
    fn assets(&self) -> Box<dyn AssetSource> {
        let embedded = ASSETS.sub("authorized_keys");
        match &self.asset_overrides {
            Some(dir) => Box::new(
                UnionAssets::default()
                    .with(DirAssets::new(dir.clone()))
                    .with(embedded),
            ),
            None => Box::new(embedded),
        }
    }
}

impl Flower for AuthorizedKeys {
    fn name(&self) -> &str {
        "authorized-keys"
    }

    fn description(&self) -> &str {
        "install the SSH keys allowed to log in"
    }

    fn embedded_files(&self) -> Vec<String> {
        self.assets().files()
    }

    fn init(&mut self, env: &Env) -> Result<()> {
        if self.user.is_empty() {
            self.user = env.user().name.clone();
        }
        let user = UserInfo::lookup(&self.user)?.ok_or_else(|| {
            FloristError::Validation(format!("user '{}' does not exist", self.user))
        })?;
        let home = self.home.clone().unwrap_or_else(|| user.home.clone());
        self.resolved = Some((home, user.owner()));
        Ok(())
    }

    fn install(&self, _host: &Host) -> Result<()> {
        Ok(())
    }

    fn configure(&self, host: &Host) -> Result<()> {
        let keys = self.keys.trim();
        if keys.is_empty() {
            return Err(FloristError::Validation(format!(
                "no authorized keys given for user '{}'",
                self.user
            ))
            .into());
        }
        let (home, owner) = self
            .resolved
            .as_ref()
            .context("configure called before init")?;

        let ssh_dir = home.join(".ssh");
        mkdir(&ssh_dir, 0o700, owner)?;
        let data = TemplateData {
            program: host.env().program(),
            keys,
        };
        copy_template_fs(
            self.assets().as_ref(),
            TEMPLATE,
            &ssh_dir.join("authorized_keys"),
            0o600,
            owner,
            &data,
            &Delimiters::default(),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_files_lists_template() {
        assert_eq!(AuthorizedKeys::default().embedded_files(), vec![TEMPLATE]);
    }

    #[test]
    fn test_init_defaults_to_current_user() {
        let env = Env::detect("florist-test").expect("current user should resolve");
        let mut flower = AuthorizedKeys::default();
        flower.init(&env).expect("init should succeed");
        assert_eq!(flower.user, env.user().name);
        let (home, owner) = flower.resolved.expect("init resolves the user");
        assert_eq!(home, env.user().home);
        assert_eq!(owner.uid, env.user().uid);
    }

    #[test]
    fn test_init_rejects_unknown_user() {
        let env = Env::detect("florist-test").expect("current user should resolve");
        let mut flower = AuthorizedKeys {
            user: "florist-no-such-user".to_string(),
            ..Default::default()
        };
        let err = flower.init(&env).unwrap_err();
        assert!(err.to_string().contains("'florist-no-such-user' does not exist"), "got: {}", err);
    }
}
