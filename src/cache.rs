//! Source download and local file cache manager.
//!
//! Downloads the price CSV from its URL (or picks it up from a local path),
//! keeps the raw bytes in the cache directory together with the server ETag,
//! and writes a strictly decoded UTF-8 copy for DuckDB to ingest.

use crate::decode;
use crate::error::{PriceError, Result};
use log::{info, warn};
use reqwest::blocking::Client;
use reqwest::header::ETAG;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the raw price table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Remote file, downloaded into the cache directory on first use.
    Url(String),
    /// Local file, read in place.
    Path(PathBuf),
}

impl Source {
    /// File name used for the cached copy.
    fn file_name(&self) -> String {
        let name = match self {
            Source::Url(url) => url
                .split(['?', '#'])
                .next()
                .and_then(|u| u.rsplit('/').next())
                .map(|s| s.to_string()),
            Source::Path(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|s| s.to_string()),
        };
        match name {
            Some(n) if !n.is_empty() => n,
            _ => "source.csv".to_string(),
        }
    }

    /// Short hex digest of the full URL or absolute path.
    fn digest(&self) -> String {
        let key = match self {
            Source::Url(url) => url.clone(),
            Source::Path(path) => fs::canonicalize(path)
                .unwrap_or_else(|_| path.clone())
                .to_string_lossy()
                .into_owned(),
        };
        hex::encode(&Sha256::digest(key.as_bytes())[..8])
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Downloads and caches the source file.
///
/// Remote files are fetched lazily on first access and re-fetched when the
/// server's ETag no longer matches the one recorded at download time.
pub struct CacheManager {
    /// Directory where cached files are stored.
    pub cache_dir: PathBuf,
    /// If true, never download (use cached files only).
    pub offline: bool,
    timeout: Duration,
    client: Option<Client>,
}

impl CacheManager {
    /// Create a new cache manager.
    ///
    /// If `cache_dir` is `None`, uses the platform-appropriate default cache directory.
    /// Creates the cache directory if it does not exist.
    pub fn new(cache_dir: Option<PathBuf>, offline: bool, timeout: Duration) -> Result<Self> {
        let dir = cache_dir.unwrap_or_else(crate::config::default_cache_dir);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            cache_dir: dir,
            offline,
            timeout,
            client: None,
        })
    }

    /// Lazy HTTP client, created on first use.
    pub fn client(&mut self) -> Result<&Client> {
        if self.client.is_none() {
            let client = Client::builder()
                .timeout(self.timeout)
                .redirect(reqwest::redirect::Policy::limited(10))
                .build()?;
            self.client = Some(client);
        }
        self.client
            .as_ref()
            .ok_or_else(|| PriceError::InvalidArgument("HTTP client unavailable".into()))
    }

    fn etag_path(&self, source: &Source) -> PathBuf {
        self.cache_dir.join(format!("{}.etag", source.file_name()))
    }

    /// Read the ETag recorded when the cached copy was downloaded.
    fn local_etag(&self, source: &Source) -> Option<String> {
        fs::read_to_string(self.etag_path(source))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn save_etag(&self, source: &Source, etag: &str) {
        let _ = fs::write(self.etag_path(source), etag);
    }

    /// Fetch the current ETag of a remote source with a HEAD request.
    ///
    /// Returns `None` if offline, the server sends no ETag, or it is unreachable.
    pub fn remote_etag(&mut self, url: &str) -> Option<String> {
        if self.offline {
            return None;
        }
        let client = match self.client() {
            Ok(c) => c.clone(),
            Err(e) => {
                warn!("Cannot build HTTP client for staleness check: {}", e);
                return None;
            }
        };
        match client.head(url).send().and_then(|r| r.error_for_status()) {
            Ok(resp) => resp
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string()),
            Err(e) => {
                warn!("Failed to check {} for changes: {}", url, e);
                None
            }
        }
    }

    /// Local path of the raw (undecoded) cached copy.
    pub fn raw_path(&self, source: &Source) -> PathBuf {
        match source {
            Source::Url(_) => self.cache_dir.join(source.file_name()),
            Source::Path(path) => path.clone(),
        }
    }

    /// Local path of the decoded UTF-8 copy.
    pub fn utf8_path(&self, source: &Source) -> PathBuf {
        self.cache_dir
            .join(format!("{}-{}.utf8.csv", source.file_name(), source.digest()))
    }

    /// Check if the cached copy of a source is out of date.
    ///
    /// Local paths are never stale. A remote source is stale if it has not been
    /// downloaded yet or the server reports a different ETag. An unreachable
    /// server, or one that sends no ETag, counts as fresh.
    pub fn is_stale(&mut self, source: &Source) -> bool {
        let url = match source {
            Source::Path(_) => return false,
            Source::Url(url) => url.clone(),
        };
        if !self.raw_path(source).exists() {
            return true;
        }
        match (self.local_etag(source), self.remote_etag(&url)) {
            (Some(local), Some(remote)) => local != remote,
            _ => false,
        }
    }

    /// Download a remote source.
    ///
    /// Downloads to a temp file first and renames on success, so an
    /// interrupted download never leaves a corrupt partial file behind.
    fn download_file(&mut self, source: &Source, url: &str) -> Result<()> {
        info!("Downloading {}", url);
        let dest = self.raw_path(source);
        let tmp_dest = dest.with_extension("tmp");

        let client = self.client()?.clone();
        let result = (|| -> Result<Option<String>> {
            let resp = client.get(url).send()?.error_for_status()?;
            let etag = resp
                .headers()
                .get(ETAG)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            let bytes = resp.bytes()?;
            fs::write(&tmp_dest, &bytes)?;
            fs::rename(&tmp_dest, &dest)?;
            Ok(etag)
        })();

        match result {
            Ok(Some(etag)) => {
                self.save_etag(source, &etag);
                Ok(())
            }
            Ok(None) => {
                let _ = fs::remove_file(self.etag_path(source));
                Ok(())
            }
            Err(e) => {
                // Clean up partial temp file on any error
                let _ = fs::remove_file(&tmp_dest);
                Err(e)
            }
        }
    }

    /// Ensure the raw source file is available locally, downloading if needed.
    ///
    /// # Returns
    ///
    /// Local filesystem path to the raw source bytes.
    pub fn ensure_source(&mut self, source: &Source) -> Result<PathBuf> {
        let local_path = self.raw_path(source);

        match source {
            Source::Path(path) => {
                if !path.exists() {
                    return Err(PriceError::NotFound(format!(
                        "source file {} does not exist",
                        path.display()
                    )));
                }
            }
            Source::Url(url) => {
                if !local_path.exists() || self.is_stale(source) {
                    if self.offline {
                        if local_path.exists() {
                            return Ok(local_path);
                        }
                        return Err(PriceError::NotFound(format!(
                            "{} not cached and offline mode is enabled",
                            source.file_name()
                        )));
                    }
                    self.download_file(source, url)?;
                }
            }
        }

        Ok(local_path)
    }

    /// Ensure a UTF-8 copy of the source exists, decoding the raw bytes with
    /// the given encoding label.
    ///
    /// The copy is rewritten on every call so it always matches the raw bytes
    /// just resolved by [`ensure_source`](Self::ensure_source).
    pub fn ensure_utf8(&mut self, source: &Source, encoding: &str) -> Result<PathBuf> {
        let encoding = decode::resolve_encoding(encoding)?;
        let raw = self.ensure_source(source)?;
        let bytes = fs::read(&raw)?;
        let text = decode::decode_text(&bytes, encoding)?;

        let dest = self.utf8_path(source);
        write_atomic(&dest, text.as_bytes())?;
        Ok(dest)
    }

    /// Drop the cached copies of a source so the next access re-fetches it.
    pub fn invalidate(&self, source: &Source) -> Result<()> {
        if let Source::Url(_) = source {
            remove_if_exists(&self.raw_path(source))?;
            remove_if_exists(&self.etag_path(source))?;
        }
        remove_if_exists(&self.utf8_path(source))
    }

    /// Remove all cached files and recreate the cache directory.
    pub fn clear(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Close the HTTP client, if open.
    pub fn close(&mut self) {
        self.client = None;
    }
}

fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, dest)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
