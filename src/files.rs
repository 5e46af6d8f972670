//! Filesystem primitives used by flowers.
//!
//! Every primitive applies an explicit permission mode and [`Owner`] to what
//! it creates, and reports failures as [`FloristError::Io`] with the
//! operation name and path in the context.

use std::fs::{self, File};
use std::io::{self, Read, Write};

use camino::Utf8Path;
use serde::Serialize;
use tracing::debug;

use crate::assets::AssetSource;
use crate::env::Owner;
use crate::error::FloristError;
use crate::template::{self, Delimiters};

/// Sets Unix permission bits on `path`.
pub(crate) fn set_mode(op: &str, path: &Utf8Path, mode: u32) -> Result<(), FloristError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| FloristError::io(format!("{}: chmod {:o} {}", op, mode, path), e))
}

/// Changes owner and group of `path`.
pub(crate) fn set_owner(op: &str, path: &Utf8Path, owner: &Owner) -> Result<(), FloristError> {
    let (uid, gid) = owner.nix_ids();
    nix::unistd::chown(path.as_std_path(), Some(uid), Some(gid)).map_err(|errno| {
        FloristError::io(
            format!("{}: chown {}:{} {}", op, owner.uid, owner.gid, path),
            io::Error::from(errno),
        )
    })
}

/// Creates `path` and its parents if absent, then applies `mode` and `owner`.
///
/// An existing directory is kept, but its mode and ownership are reset to
/// the requested values.
pub fn mkdir(path: &Utf8Path, mode: u32, owner: &Owner) -> Result<(), FloristError> {
    const OP: &str = "Mkdir";
    fs::create_dir_all(path).map_err(|e| FloristError::io(format!("{}: {}", OP, path), e))?;
    set_owner(OP, path, owner)?;
    set_mode(OP, path, mode)?;
    Ok(())
}

/// Unlinks `dst`, then streams `src` into a fresh file with `mode` and `owner`.
///
/// Unlinking first lets a running executable be replaced without
/// "text file busy".
fn replace_with<R: Read>(
    op: &str,
    mut src: R,
    dst: &Utf8Path,
    mode: u32,
    owner: &Owner,
) -> Result<(), FloristError> {
    match fs::remove_file(dst) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(FloristError::io(format!("{}: remove {}", op, dst), e)),
    }
    let mut out =
        File::create(dst).map_err(|e| FloristError::io(format!("{}: create {}", op, dst), e))?;
    io::copy(&mut src, &mut out)
        .and_then(|_| out.flush())
        .map_err(|e| FloristError::io(format!("{}: write {}", op, dst), e))?;
    drop(out);
    set_owner(op, dst, owner)?;
    set_mode(op, dst, mode)?;
    Ok(())
}

/// Copies a host file to `dst`, overwriting it.
pub fn copy_file(
    src: &Utf8Path,
    dst: &Utf8Path,
    mode: u32,
    owner: &Owner,
) -> Result<(), FloristError> {
    const OP: &str = "CopyFile";
    debug!(src = %src, dst = %dst, "copying file");
    let file = File::open(src).map_err(|e| FloristError::io(format!("{}: open {}", OP, src), e))?;
    replace_with(OP, file, dst, mode, owner)
}

/// Copies a file from an asset source to `dst`, overwriting it.
pub fn copy_file_fs(
    assets: &dyn AssetSource,
    src: &str,
    dst: &Utf8Path,
    mode: u32,
    owner: &Owner,
) -> Result<(), FloristError> {
    const OP: &str = "CopyFileFS";
    debug!(source = %assets.describe(), src, dst = %dst, "copying asset");
    let bytes = assets.read(src)?;
    replace_with(OP, bytes.as_ref(), dst, mode, owner)
}

/// Renders an asset as a template with `data` and writes the result to `dst`.
///
/// Missing fields and missing map keys are errors.
pub fn copy_template_fs<T: Serialize>(
    assets: &dyn AssetSource,
    src: &str,
    dst: &Utf8Path,
    mode: u32,
    owner: &Owner,
    data: &T,
    delims: &Delimiters,
) -> Result<(), FloristError> {
    const OP: &str = "CopyTemplateFS";
    debug!(source = %assets.describe(), src, dst = %dst, "rendering template");
    let bytes = assets.read(src)?;
    let text = std::str::from_utf8(&bytes).map_err(|e| FloristError::Template {
        path: src.to_string(),
        message: format!("not valid UTF-8: {}", e),
    })?;
    let rendered = template::render(src, text, data, delims)?;
    replace_with(OP, rendered.as_bytes(), dst, mode, owner)
}

/// Writes `content` to `path`, creating parent directories as needed.
///
/// Parents are created with the default mode and are not chowned.
pub fn write_file(
    path: &Utf8Path,
    content: &str,
    mode: u32,
    owner: &Owner,
) -> Result<(), FloristError> {
    const OP: &str = "WriteFile";
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| FloristError::io(format!("{}: create directory {}", OP, parent), e))?;
    }
    fs::write(path, content).map_err(|e| FloristError::io(format!("{}: {}", OP, path), e))?;
    set_owner(OP, path, owner)?;
    set_mode(OP, path, mode)?;
    Ok(())
}
