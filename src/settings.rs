//! Read-only key-value settings loaded from a JSON document.
//!
//! The document must be a top-level object whose values are all strings.
//! Two access styles are offered on the same value:
//!
//! - [`Settings::get`] returns `""` for a missing key and remembers the miss,
//!   so a caller can fill many fields and check once with
//!   [`Settings::check`].
//! - [`Settings::lookup`] fails immediately and does not record anything.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::FloristError;

/// Default location of the settings file read by `configure`.
pub const DEFAULT_SETTINGS_PATH: &str = "/opt/florist/config.json";

/// Settings store with an accumulator of missing keys.
#[derive(Debug, Clone)]
pub struct Settings {
    source: Utf8PathBuf,
    values: BTreeMap<String, String>,
    missing: Vec<String>,
}

impl Settings {
    /// Loads settings from a JSON file.
    pub fn load(path: &Utf8Path) -> Result<Self, FloristError> {
        let file = File::open(path)
            .map_err(|e| FloristError::io(format!("settings: open {}", path), e))?;
        let values: BTreeMap<String, String> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| {
                FloristError::Config(format!(
                    "settings {}: expected a JSON object of strings: {}",
                    path, e
                ))
            })?;
        tracing::debug!(path = %path, keys = values.len(), "settings loaded");
        Ok(Self::from_map(path, values))
    }

    /// Wraps an in-memory map; `source` is only used in error messages.
    pub fn from_map(source: impl Into<Utf8PathBuf>, values: BTreeMap<String, String>) -> Self {
        Self {
            source: source.into(),
            values,
            missing: Vec::new(),
        }
    }

    /// Returns the value of `key`, or `""` after recording the miss.
    pub fn get(&mut self, key: &str) -> String {
        match self.values.get(key) {
            Some(value) => value.clone(),
            None => {
                if !self.missing.iter().any(|k| k == key) {
                    self.missing.push(key.to_string());
                }
                String::new()
            }
        }
    }

    /// Returns the value of `key`, failing immediately if it is absent.
    pub fn lookup(&self, key: &str) -> Result<&str, FloristError> {
        self.values.get(key).map(String::as_str).ok_or_else(|| {
            FloristError::Config(format!("settings {}: key '{}': not found", self.source, key))
        })
    }

    /// Fails with a single error naming every key [`get`](Self::get) missed.
    pub fn check(&self) -> Result<(), FloristError> {
        if self.missing.is_empty() {
            return Ok(());
        }
        let keys = self
            .missing
            .iter()
            .map(|k| format!("key '{}': not found", k))
            .collect::<Vec<_>>()
            .join("; ");
        Err(FloristError::Config(format!("settings {}: {}", self.source, keys)))
    }

    /// Path the settings were read from.
    pub fn source(&self) -> &Utf8Path {
        &self.source
    }
}
