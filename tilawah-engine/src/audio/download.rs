//! Download cache for chapter audio
//!
//! Chapter audio arrives as a stream URL; the decoder wants a seekable local
//! file. Downloads land in a cache directory keyed by a hash of the URL, so
//! replaying a chapter (and every loop restart) reuses the same bytes.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

const DOWNLOAD_TIMEOUT_SECS: u64 = 120;
const USER_AGENT: &str = concat!("tilawah/", env!("CARGO_PKG_VERSION"));

/// URL-keyed local file cache for downloaded audio
pub struct AudioCache {
    http: reqwest::Client,
    dir: PathBuf,
}

impl AudioCache {
    /// Create a cache rooted at `dir` (created lazily on first fetch)
    pub fn new(dir: PathBuf) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;

        Ok(Self { http, dir })
    }

    /// Fetch `url` into the cache, returning the local file path
    ///
    /// A file already present for this URL is returned without touching the
    /// network.
    pub async fn fetch(&self, url: &str) -> Result<PathBuf> {
        let path = self.dir.join(cache_file_name(url));

        if tokio::fs::metadata(&path).await.is_ok() {
            debug!("audio cache hit: {}", path.display());
            return Ok(path);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        info!("Downloading {} to {}", url, path.display());

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("failed to start download: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "audio download failed with status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("failed to download audio: {}", e)))?;

        // Write-then-rename so a torn download never looks like a cache hit
        let partial = path.with_extension("part");
        tokio::fs::write(&partial, &bytes).await?;
        tokio::fs::rename(&partial, &path).await?;

        info!("Download complete: {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }
}

/// Cache file name for a URL: sha256 of the URL plus its extension
fn cache_file_name(url: &str) -> String {
    let hash = Sha256::digest(url.as_bytes());
    let ext = url
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin");
    format!("{:x}.{}", hash, ext)
}
