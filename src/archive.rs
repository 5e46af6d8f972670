//! Extraction of downloaded release archives.
//!
//! Release bundles usually carry a single binary next to a license and a
//! readme, so the common case is pulling one named member out of a ZIP or
//! gzip-compressed tar file. [`untar_all`] covers bundles whose whole
//! content is needed.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path};

use camino::Utf8Path;
use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::debug;

use crate::env::Owner;
use crate::error::FloristError;
use crate::files::{set_mode, set_owner};

fn archive_error(archive: &Utf8Path, message: impl Into<String>) -> FloristError {
    FloristError::Archive {
        archive: archive.to_string(),
        message: message.into(),
    }
}

fn open_tar_gz(
    op: &str,
    archive: &Utf8Path,
) -> Result<Archive<GzDecoder<BufReader<File>>>, FloristError> {
    let file =
        File::open(archive).map_err(|e| FloristError::io(format!("{}: open {}", op, archive), e))?;
    Ok(Archive::new(GzDecoder::new(BufReader::new(file))))
}

/// Writes `reader` to `dst`, truncating any existing file.
fn write_member<R: io::Read>(op: &str, mut reader: R, dst: &Utf8Path) -> Result<(), FloristError> {
    match fs::remove_file(dst) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(FloristError::io(format!("{}: remove {}", op, dst), e)),
    }
    let mut out =
        File::create(dst).map_err(|e| FloristError::io(format!("{}: create {}", op, dst), e))?;
    io::copy(&mut reader, &mut out)
        .map_err(|e| FloristError::io(format!("{}: write {}", op, dst), e))?;
    Ok(())
}

/// Extracts the single member `name` of a ZIP archive to `dst`.
pub fn unzip_one(archive: &Utf8Path, name: &str, dst: &Utf8Path) -> Result<(), FloristError> {
    const OP: &str = "UnzipOne";
    let file =
        File::open(archive).map_err(|e| FloristError::io(format!("{}: open {}", OP, archive), e))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file))
        .map_err(|e| archive_error(archive, format!("{}: {}", OP, e)))?;
    let member = zip.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => {
            archive_error(archive, format!("{}: member '{}' not found", OP, name))
        }
        other => archive_error(archive, format!("{}: {}: {}", OP, name, other)),
    })?;
    write_member(OP, member, dst)?;
    debug!(archive = %archive, member = name, dst = %dst, "extracted");
    Ok(())
}

/// Extracts the single member `name` of a gzip-compressed tar archive to `dst`.
pub fn untar_one(archive: &Utf8Path, name: &str, dst: &Utf8Path) -> Result<(), FloristError> {
    const OP: &str = "UntarOne";
    let wanted = normalized(Path::new(name));
    let mut tar = open_tar_gz(OP, archive)?;
    let entries = tar
        .entries()
        .map_err(|e| archive_error(archive, format!("{}: {}", OP, e)))?;
    for entry in entries {
        let entry = entry.map_err(|e| archive_error(archive, format!("{}: {}", OP, e)))?;
        let is_wanted = {
            let path = entry
                .path()
                .map_err(|e| archive_error(archive, format!("{}: {}", OP, e)))?;
            normalized(&path) == wanted
        };
        if is_wanted {
            write_member(OP, entry, dst)?;
            debug!(archive = %archive, member = name, dst = %dst, "extracted");
            return Ok(());
        }
    }
    Err(archive_error(archive, format!("{}: member '{}' not found", OP, name)))
}

/// Extracts every regular file of a gzip-compressed tar archive under
/// `dst_dir`, applying `mode` and `owner` uniformly.
///
/// Missing directories, including `dst_dir` itself, are created with mode
/// 0755 and `owner`; directories that already exist keep their mode and
/// ownership. Entries that are neither files nor directories are skipped, as
/// are entries whose path would escape `dst_dir`.
pub fn untar_all(
    archive: &Utf8Path,
    dst_dir: &Utf8Path,
    mode: u32,
    owner: &Owner,
) -> Result<(), FloristError> {
    const OP: &str = "UntarAll";
    create_missing_dirs(OP, dst_dir, owner)?;
    let mut tar = open_tar_gz(OP, archive)?;
    let entries = tar
        .entries()
        .map_err(|e| archive_error(archive, format!("{}: {}", OP, e)))?;
    let mut count = 0usize;
    for entry in entries {
        let entry = entry.map_err(|e| archive_error(archive, format!("{}: {}", OP, e)))?;
        let path = entry
            .path()
            .map_err(|e| archive_error(archive, format!("{}: {}", OP, e)))?
            .into_owned();
        let Some(rel) = path.to_str().map(|s| normalized(Path::new(s))) else {
            return Err(archive_error(archive, format!("{}: non UTF-8 member path", OP)));
        };
        if rel.is_empty() || escapes(&path) {
            debug!(archive = %archive, member = %path.display(), "skipping member");
            continue;
        }
        let target = dst_dir.join(&rel);
        let kind = entry.header().entry_type();
        match kind {
            EntryType::Directory => create_missing_dirs(OP, &target, owner)?,
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    create_missing_dirs(OP, parent, owner)?;
                }
                write_member(OP, entry, &target)?;
                set_owner(OP, &target, owner)?;
                set_mode(OP, &target, mode)?;
                count += 1;
            }
            other => {
                debug!(archive = %archive, member = %rel, kind = ?other, "skipping member");
            }
        }
    }
    debug!(archive = %archive, dst = %dst_dir, files = count, "extracted all");
    Ok(())
}

/// Creates `dir` and its missing ancestors top-down, applying mode 0755 and
/// `owner` to the created directories only.
fn create_missing_dirs(op: &str, dir: &Utf8Path, owner: &Owner) -> Result<(), FloristError> {
    let missing: Vec<&Utf8Path> = dir
        .ancestors()
        .take_while(|d| !d.as_str().is_empty() && !d.is_dir())
        .collect();
    for d in missing.into_iter().rev() {
        match fs::create_dir(d) {
            Ok(()) => {
                set_owner(op, d, owner)?;
                set_mode(op, d, 0o755)?;
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && d.is_dir() => {}
            Err(e) => return Err(FloristError::io(format!("{}: mkdir {}", op, d), e)),
        }
    }
    Ok(())
}

/// Joins the normal components of `path` with `/`, dropping `./` prefixes.
fn normalized(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn escapes(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
}
