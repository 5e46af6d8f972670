//! Hash-pinned HTTP downloads.
//!
//! [`net_fetch`] downloads a URL into a directory and verifies the content
//! against a pinned digest while streaming. A file already present with the
//! right digest is returned without touching the network.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use sha2::digest::DynDigest;
use sha2::{Digest, Sha256};
use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::error::FloristError;

/// Request timeout for large downloads (release archives, packages).
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Request timeout for small downloads (signing keys).
pub const KEY_TIMEOUT: Duration = Duration::from_secs(15);

/// Digest algorithms accepted for pinning downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum HashKind {
    Sha256,
}

impl HashKind {
    fn hasher(self) -> Box<dyn DynDigest> {
        match self {
            Self::Sha256 => Box::new(Sha256::new()),
        }
    }

    /// Hex digest of everything `reader` yields.
    pub fn hex_digest<R: Read>(self, mut reader: R) -> io::Result<String> {
        let mut writer = HashingWriter {
            inner: io::sink(),
            hasher: self.hasher(),
        };
        io::copy(&mut reader, &mut writer)?;
        Ok(writer.finish())
    }
}

/// Tee that forwards writes to `inner` and feeds them to a running hash.
struct HashingWriter<W> {
    inner: W,
    hasher: Box<dyn DynDigest>,
}

impl<W> HashingWriter<W> {
    fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Builds the HTTP client used for downloads.
pub fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client, FloristError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FloristError::Network {
            url: String::new(),
            message: format!("building HTTP client: {}", e),
        })
}

/// Last non-empty path segment of `url`.
fn file_name(url: &str) -> Result<String, FloristError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| FloristError::Validation(format!("NetFetch: invalid URL '{}': {}", url, e)))?;
    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(str::to_string)
        .ok_or_else(|| {
            FloristError::Validation(format!("NetFetch: URL '{}' has no file name", url))
        })
}

/// Downloads `url` into `dst_dir` and returns the path of the file.
///
/// `want` is the expected hex digest of kind `kind`, compared
/// case-insensitively. If `dst_dir/<basename of url>` already has that
/// digest, nothing is downloaded. On mismatch the downloaded file is
/// removed and [`FloristError::HashMismatch`] is returned.
pub fn net_fetch(
    client: &reqwest::blocking::Client,
    url: &str,
    kind: HashKind,
    want: &str,
    dst_dir: &Utf8Path,
) -> Result<Utf8PathBuf, FloristError> {
    let want = want.to_ascii_lowercase();
    let dst = dst_dir.join(file_name(url)?);

    if dst.exists() {
        let file =
            File::open(&dst).map_err(|e| FloristError::io(format!("NetFetch: open {}", dst), e))?;
        let have = kind
            .hex_digest(BufReader::new(file))
            .map_err(|e| FloristError::io(format!("NetFetch: hash {}", dst), e))?;
        if have == want {
            debug!(path = %dst, "NetFetch: cache hit");
            return Ok(dst);
        }
        debug!(path = %dst, %have, %want, "NetFetch: cached file stale, downloading again");
    }

    fs::create_dir_all(dst_dir)
        .map_err(|e| FloristError::io(format!("NetFetch: create directory {}", dst_dir), e))?;

    info!(url, "downloading");
    let start = Instant::now();
    let mut response = client.get(url).send().map_err(|e| FloristError::Network {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    if response.status() != reqwest::StatusCode::OK {
        return Err(FloristError::HttpStatus {
            status: response.status().to_string(),
            url: url.to_string(),
        });
    }

    let file =
        File::create(&dst).map_err(|e| FloristError::io(format!("NetFetch: create {}", dst), e))?;
    let mut tee = HashingWriter {
        inner: file,
        hasher: kind.hasher(),
    };
    io::copy(&mut response, &mut tee)
        .and_then(|_| tee.flush())
        .map_err(|e| FloristError::io(format!("NetFetch: download {} to {}", url, dst), e))?;
    let have = tee.finish();

    if have != want {
        if let Err(e) = fs::remove_file(&dst) {
            debug!(path = %dst, "NetFetch: failed to remove mismatching file: {}", e);
        }
        return Err(FloristError::HashMismatch { have, want });
    }

    debug!(url, path = %dst, elapsed = ?start.elapsed(), "downloaded");
    Ok(dst)
}
