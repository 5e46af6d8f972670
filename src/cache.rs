//! Filesystem-backed "last completed at" flag.
//!
//! A [`CacheState`] is a sentinel file whose modification time records when
//! an expensive operation (a package index refresh, a download) last
//! succeeded. The state is valid while `now - mtime < validity`.

use std::fs::{self, File};
use std::io;
use std::time::{Duration, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::error::FloristError;

/// A persistent validity flag backed by a sentinel file.
#[derive(Debug, Clone)]
pub struct CacheState {
    validity: Duration,
    sentinel: Utf8PathBuf,
}

impl CacheState {
    /// Creates a cache state whose sentinel is `root_dir/name`.
    ///
    /// Nothing is touched on disk until [`update`](Self::update).
    pub fn new(validity: Duration, root_dir: &Utf8Path, name: &str) -> Self {
        Self {
            validity,
            sentinel: root_dir.join(format!("{}.cache", name)),
        }
    }

    /// Path of the sentinel file.
    pub fn sentinel(&self) -> &Utf8Path {
        &self.sentinel
    }

    /// Returns true iff the sentinel exists and is younger than the validity.
    ///
    /// A missing sentinel, an unreadable one and a stale one are all invalid.
    pub fn is_valid(&self) -> bool {
        let modified = match fs::metadata(&self.sentinel).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    debug!(sentinel = %self.sentinel, "cache state unreadable: {}", e);
                }
                return false;
            }
        };
        match SystemTime::now().duration_since(modified) {
            Ok(age) => {
                let valid = age < self.validity;
                debug!(sentinel = %self.sentinel, ?age, valid, "cache state checked");
                valid
            }
            // mtime in the future: the operation just completed on a skewed clock
            Err(_) => true,
        }
    }

    /// Marks the cached operation as completed now.
    pub fn update(&self) -> Result<(), FloristError> {
        if let Some(parent) = self.sentinel.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FloristError::io(format!("CacheState: create directory {}", parent), e)
            })?;
        }
        let file = File::create(&self.sentinel).map_err(|e| {
            FloristError::io(format!("CacheState: create {}", self.sentinel), e)
        })?;
        file.set_modified(SystemTime::now()).map_err(|e| {
            FloristError::io(format!("CacheState: set mtime {}", self.sentinel), e)
        })?;
        debug!(sentinel = %self.sentinel, "cache state updated");
        Ok(())
    }

    /// Forgets the cached operation. A missing sentinel is not an error.
    pub fn invalidate(&self) -> Result<(), FloristError> {
        match fs::remove_file(&self.sentinel) {
            Ok(()) => {
                debug!(sentinel = %self.sentinel, "cache state invalidated");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FloristError::io(format!("CacheState: remove {}", self.sentinel), e)),
        }
    }
}
