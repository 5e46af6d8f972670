//! Asset sources: the embedded bundle and its real-filesystem counterpart.
//!
//! Flowers read their templates, unit files and small payloads through the
//! [`AssetSource`] trait, addressed by paths relative to the flower's own
//! sub-tree. [`EmbeddedAssets`] serves files compiled into the binary with
//! [`embed_assets!`](crate::embed_assets), [`DirAssets`] serves a directory
//! on the host, and [`UnionAssets`] layers several sources so that an
//! operator-supplied directory can override embedded defaults.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::error::FloristError;

/// A read-only tree of files addressed by relative paths.
pub trait AssetSource: Send + Sync {
    /// Returns the contents of the file at `path`.
    fn read(&self, path: &str) -> Result<Cow<'_, [u8]>, FloristError>;

    /// Returns every file path in this source, sorted.
    fn files(&self) -> Vec<String>;

    /// Short description used in error messages and listings.
    fn describe(&self) -> String;
}

fn not_found(source: &dyn AssetSource, path: &str) -> FloristError {
    FloristError::io(
        format!("{}: open {}", source.describe(), path),
        std::io::Error::from(std::io::ErrorKind::NotFound),
    )
}

/// Embeds a list of files, relative to a directory of the calling crate, as
/// an [`EmbeddedAssets`].
///
/// ```ignore
/// let assets = florist::embed_assets!("assets" => [
///     "authorized_keys/authorized_keys.tmpl",
/// ]);
/// ```
#[macro_export]
macro_rules! embed_assets {
    ($root:literal => [$($path:literal),* $(,)?]) => {{
        static ENTRIES: &[(&str, &[u8])] = &[$(
            (
                $path,
                include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/", $root, "/", $path)),
            )
        ),*];
        $crate::assets::EmbeddedAssets::new(ENTRIES)
    }};
}

/// Files compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedAssets {
    entries: &'static [(&'static str, &'static [u8])],
    prefix: &'static str,
}

impl EmbeddedAssets {
    pub const fn new(entries: &'static [(&'static str, &'static [u8])]) -> Self {
        Self { entries, prefix: "" }
    }

    /// Returns the view of the sub-tree under `prefix` (e.g. a flower's directory).
    ///
    /// Paths in the returned view are relative to `prefix`.
    #[must_use]
    pub fn sub(&self, prefix: &'static str) -> Self {
        Self {
            entries: self.entries,
            prefix,
        }
    }

    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(path);
        }
        path.strip_prefix(self.prefix.trim_end_matches('/'))
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

impl AssetSource for EmbeddedAssets {
    fn read(&self, path: &str) -> Result<Cow<'_, [u8]>, FloristError> {
        self.entries
            .iter()
            .find(|(name, _)| self.strip(name) == Some(path))
            .map(|(_, bytes)| Cow::Borrowed(*bytes))
            .ok_or_else(|| not_found(self, path))
    }

    fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = self
            .entries
            .iter()
            .filter_map(|(name, _)| self.strip(name))
            .map(str::to_string)
            .collect();
        files.sort();
        files
    }

    fn describe(&self) -> String {
        if self.prefix.is_empty() {
            "embedded".to_string()
        } else {
            format!("embedded:{}", self.prefix)
        }
    }
}

/// A directory on the host filesystem used as an asset source.
#[derive(Debug, Clone)]
pub struct DirAssets {
    root: Utf8PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl AssetSource for DirAssets {
    fn read(&self, path: &str) -> Result<Cow<'_, [u8]>, FloristError> {
        let full = self.root.join(path);
        fs::read(&full)
            .map(Cow::Owned)
            .map_err(|e| FloristError::io(format!("{}: open {}", self.describe(), path), e))
    }

    fn files(&self) -> Vec<String> {
        let mut files: Vec<String> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let rel = entry.path().strip_prefix(&self.root).ok()?;
                rel.to_str().map(str::to_string)
            })
            .collect();
        files.sort();
        files
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.root)
    }
}

/// Ordered list of sources where the first source holding a path wins.
#[derive(Default)]
pub struct UnionAssets {
    sources: Vec<Box<dyn AssetSource>>,
}

impl UnionAssets {
    pub fn new(sources: Vec<Box<dyn AssetSource>>) -> Self {
        Self { sources }
    }

    /// Appends a lower-priority source.
    #[must_use]
    pub fn with(mut self, source: impl AssetSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl AssetSource for UnionAssets {
    fn read(&self, path: &str) -> Result<Cow<'_, [u8]>, FloristError> {
        for source in &self.sources {
            match source.read(path) {
                Ok(bytes) => return Ok(bytes),
                Err(FloristError::Io { source: e, .. })
                    if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Err(not_found(self, path))
    }

    fn files(&self) -> Vec<String> {
        let set: BTreeSet<String> = self.sources.iter().flat_map(|s| s.files()).collect();
        set.into_iter().collect()
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self.sources.iter().map(|s| s.describe()).collect();
        format!("union[{}]", names.join(", "))
    }
}
