use anyhow::Result;

use crate::env::Env;
use crate::error::FloristError;
use crate::flower::{Flower, Host};

/// Installs a list of Debian packages.
#[derive(Debug, Clone, Default)]
pub struct AptPackages {
    pub packages: Vec<String>,
}

impl AptPackages {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }
}

impl Flower for AptPackages {
    fn name(&self) -> &str {
        "apt-packages"
    }

    fn description(&self) -> &str {
        "install Debian packages"
    }

    fn init(&mut self, _env: &Env) -> Result<()> {
        if self.packages.is_empty() {
            return Err(
                FloristError::Validation("package list must not be empty".to_string()).into(),
            );
        }
        if let Some(blank) = self.packages.iter().position(|p| p.trim().is_empty()) {
            return Err(FloristError::Validation(format!("package {} is blank", blank + 1)).into());
        }
        Ok(())
    }

    fn install(&self, host: &Host) -> Result<()> {
        let packages: Vec<&str> = self.packages.iter().map(String::as_str).collect();
        host.apt().install(&packages)
    }

    fn configure(&self, _host: &Host) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_rejects_empty_list() {
        let env = Env::detect("florist-test").expect("current user should resolve");
        let err = AptPackages::default().init(&env).unwrap_err();
        assert!(err.to_string().contains("must not be empty"), "got: {}", err);
    }

    #[test]
    fn test_init_rejects_blank_package() {
        let env = Env::detect("florist-test").expect("current user should resolve");
        let err = AptPackages::new(["curl", " "]).init(&env).unwrap_err();
        assert!(err.to_string().contains("package 2 is blank"), "got: {}", err);
    }

    #[test]
    fn test_init_accepts_packages() {
        let env = Env::detect("florist-test").expect("current user should resolve");
        assert!(AptPackages::new(["curl", "jq"]).init(&env).is_ok());
    }
}
