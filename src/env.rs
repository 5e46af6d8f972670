//! Process-wide values captured once at startup.
//!
//! [`Env`] replaces module-level globals: the driver builds it once, then
//! hands it to the registry, to every flower's `init`, and to the
//! filesystem primitives through [`Owner`].

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use nix::unistd::{Gid, Group, Uid, User, getgid, getuid};

use crate::error::FloristError;

/// Default scratch directory for downloads, extractions and cache sentinels.
pub const DEFAULT_WORK_DIR: &str = "/tmp/florist.work";

/// Default validity of the package-manager cache.
pub const DEFAULT_CACHE_VALIDITY: Duration = Duration::from_secs(24 * 60 * 60);

/// Default file receiving the provenance stamp.
pub const DEFAULT_MOTD_PATH: &str = "/etc/motd";

/// A user account from the system user database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: Utf8PathBuf,
}

impl UserInfo {
    /// Looks up `name` in the user database.
    ///
    /// Returns `Ok(None)` if the user does not exist.
    pub fn lookup(name: &str) -> Result<Option<Self>, FloristError> {
        let user = User::from_name(name)
            .map_err(|e| FloristError::UserDatabase(format!("lookup user '{}': {}", name, e)))?;
        user.map(Self::try_from).transpose()
    }

    /// Owner handle for files created on behalf of this user and their primary group.
    pub fn owner(&self) -> Owner {
        Owner {
            uid: self.uid,
            gid: self.gid,
        }
    }
}

impl TryFrom<User> for UserInfo {
    type Error = FloristError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        let home = Utf8PathBuf::from_path_buf(user.dir).map_err(|p| {
            FloristError::UserDatabase(format!(
                "home of user '{}' is not valid UTF-8: {}",
                user.name,
                p.display()
            ))
        })?;
        Ok(Self {
            name: user.name,
            uid: user.uid.as_raw(),
            gid: user.gid.as_raw(),
            home,
        })
    }
}

/// A group from the system group database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub name: String,
    pub gid: u32,
}

impl GroupInfo {
    /// Looks up `name` in the group database.
    ///
    /// Returns `Ok(None)` if the group does not exist.
    pub fn lookup(name: &str) -> Result<Option<Self>, FloristError> {
        let group = Group::from_name(name)
            .map_err(|e| FloristError::UserDatabase(format!("lookup group '{}': {}", name, e)))?;
        Ok(group.map(|g| Self {
            name: g.name,
            gid: g.gid.as_raw(),
        }))
    }
}

/// Numeric owner and group applied to created files and directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    /// Resolves a user name and a group name through the system databases.
    pub fn lookup(user: &str, group: &str) -> Result<Self, FloristError> {
        let uid = UserInfo::lookup(user)?
            .ok_or_else(|| FloristError::UserDatabase(format!("user '{}' not found", user)))?
            .uid;
        let gid = GroupInfo::lookup(group)?
            .ok_or_else(|| FloristError::UserDatabase(format!("group '{}' not found", group)))?
            .gid;
        Ok(Self { uid, gid })
    }

    pub(crate) fn nix_ids(&self) -> (Uid, Gid) {
        (Uid::from_raw(self.uid), Gid::from_raw(self.gid))
    }
}

/// Values shared by the whole run, set exactly once before any flower runs.
#[derive(Debug, Clone)]
pub struct Env {
    program: String,
    user: UserInfo,
    group: GroupInfo,
    work_dir: Utf8PathBuf,
    cache_validity: Duration,
    motd_path: Utf8PathBuf,
}

impl Env {
    /// Creates an environment for explicit user and group snapshots, with
    /// default work directory, cache validity and motd path.
    pub fn new(program: impl Into<String>, user: UserInfo, group: GroupInfo) -> Self {
        Self {
            program: program.into(),
            user,
            group,
            work_dir: Utf8PathBuf::from(DEFAULT_WORK_DIR),
            cache_validity: DEFAULT_CACHE_VALIDITY,
            motd_path: Utf8PathBuf::from(DEFAULT_MOTD_PATH),
        }
    }

    /// Captures the user and primary group of the running process.
    pub fn detect(program: impl Into<String>) -> Result<Self, FloristError> {
        let uid = getuid();
        let user = User::from_uid(uid)
            .map_err(|e| FloristError::UserDatabase(format!("lookup uid {}: {}", uid, e)))?
            .ok_or_else(|| FloristError::UserDatabase(format!("uid {} not found", uid)))?;
        let gid = getgid();
        let group = Group::from_gid(gid)
            .map_err(|e| FloristError::UserDatabase(format!("lookup gid {}: {}", gid, e)))?
            .ok_or_else(|| FloristError::UserDatabase(format!("gid {} not found", gid)))?;
        Ok(Self::new(
            program,
            UserInfo::try_from(user)?,
            GroupInfo {
                name: group.name,
                gid: group.gid.as_raw(),
            },
        ))
    }

    #[must_use]
    pub fn with_work_dir(mut self, work_dir: impl Into<Utf8PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    #[must_use]
    pub fn with_cache_validity(mut self, validity: Duration) -> Self {
        self.cache_validity = validity;
        self
    }

    #[must_use]
    pub fn with_motd_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.motd_path = path.into();
        self
    }

    /// Name of the provisioner binary, used in the provenance stamp.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The user running the provisioner.
    pub fn user(&self) -> &UserInfo {
        &self.user
    }

    /// The primary group of the user running the provisioner.
    pub fn group(&self) -> &GroupInfo {
        &self.group
    }

    /// Owner handle for the current user and primary group.
    pub fn owner(&self) -> Owner {
        Owner {
            uid: self.user.uid,
            gid: self.group.gid,
        }
    }

    pub fn work_dir(&self) -> &Utf8Path {
        &self.work_dir
    }

    pub fn cache_validity(&self) -> Duration {
        self.cache_validity
    }

    pub fn motd_path(&self) -> &Utf8Path {
        &self.motd_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_captures_current_ids() {
        let env = Env::detect("florist-test").expect("current user should resolve");
        assert_eq!(env.user().uid, getuid().as_raw());
        assert_eq!(env.group().gid, getgid().as_raw());
        assert_eq!(env.owner().uid, getuid().as_raw());
        assert_eq!(env.program(), "florist-test");
    }

    #[test]
    fn test_defaults_and_overrides() {
        let env = Env::detect("florist-test").expect("current user should resolve");
        assert_eq!(env.work_dir(), Utf8Path::new(DEFAULT_WORK_DIR));
        assert_eq!(env.cache_validity(), DEFAULT_CACHE_VALIDITY);
        assert_eq!(env.motd_path(), Utf8Path::new(DEFAULT_MOTD_PATH));

        let env = env
            .with_work_dir("/var/tmp/w")
            .with_cache_validity(Duration::from_secs(60))
            .with_motd_path("/tmp/motd");
        assert_eq!(env.work_dir(), Utf8Path::new("/var/tmp/w"));
        assert_eq!(env.cache_validity(), Duration::from_secs(60));
        assert_eq!(env.motd_path(), Utf8Path::new("/tmp/motd"));
    }

    #[test]
    fn test_lookup_root_user() {
        let root = UserInfo::lookup("root").expect("lookup should not fail");
        assert_eq!(root.map(|u| u.uid), Some(0));
    }

    #[test]
    fn test_lookup_missing_user() {
        let missing = UserInfo::lookup("florist-no-such-user").expect("lookup should not fail");
        assert!(missing.is_none());
    }

    #[test]
    fn test_owner_lookup_missing_group() {
        let err = Owner::lookup("root", "florist-no-such-group").unwrap_err();
        assert!(err.to_string().contains("florist-no-such-group"), "got: {}", err);
    }
}
