//! Configuration loading for the recitation engine
//!
//! The timing constants here were tuned empirically against one upstream
//! timing provider; they are deliberately configuration rather than
//! compile-time constants, since a different audio or timing provider will
//! need different values.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file path
pub const CONFIG_ENV_VAR: &str = "TILAWAH_CONFIG";

/// Content API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the recitation content API
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.quran.com/api/v4".to_string(),
        }
    }
}

/// Timing constants for playback, highlighting and range boundaries
///
/// All values in milliseconds unless noted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackTuning {
    /// Sample loop interval for position polling
    pub position_poll_interval_ms: u64,
    /// Uniform delay subtracted from the raw position before highlight
    /// lookup, compensating output latency and upstream timestamp skew
    pub highlight_delay_ms: u64,
    /// Lead added after the previous verse's end when computing a range
    /// start offset
    pub range_start_lead_ms: u64,
    /// Trailing trim subtracted from the end verse's end timestamp, stopping
    /// before the next verse's audio bleeds in
    pub range_end_trim_ms: u64,
    /// Window after a loop restart during which finish triggers are ignored
    pub restart_guard_ms: u64,
    /// Cadence of broadcast progress events
    pub progress_event_interval_ms: u64,
}

impl Default for PlaybackTuning {
    fn default() -> Self {
        Self {
            position_poll_interval_ms: 100,
            highlight_delay_ms: 200,
            range_start_lead_ms: 250,
            range_end_trim_ms: 200,
            restart_guard_ms: 500,
            progress_event_interval_ms: 1000,
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Content API settings
    pub api: ApiConfig,
    /// Case-insensitive substring used to pick the default reciter
    pub preferred_reciter: String,
    /// How long a fetched reciter list stays fresh (seconds)
    pub reciter_cache_ttl_secs: u64,
    /// Directory for downloaded chapter audio; platform cache dir when unset
    pub audio_cache_dir: Option<PathBuf>,
    /// Timing constants
    pub tuning: PlaybackTuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            preferred_reciter: "Alafasy".to_string(),
            reciter_cache_ttl_secs: 3600,
            audio_cache_dir: None,
            tuning: PlaybackTuning::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration following the priority order:
    /// 1. Explicit path argument (highest priority)
    /// 2. `TILAWAH_CONFIG` environment variable
    /// 3. Platform config dir (`<config>/tilawah/config.toml`)
    /// 4. Compiled defaults (fallback)
    ///
    /// A missing file at the default location falls back to defaults; a file
    /// that exists but fails to parse is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        tracing::debug!("no config file found, using compiled defaults");
        Ok(Self::default())
    }

    /// Parse configuration from a TOML file
    ///
    /// Missing keys deserialize to their defaults, so partial files are fine.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Resolve the audio download cache directory
    ///
    /// Falls back to the platform cache dir, then to the system temp dir.
    pub fn resolve_audio_cache_dir(&self) -> PathBuf {
        if let Some(dir) = &self.audio_cache_dir {
            return dir.clone();
        }
        dirs::cache_dir()
            .map(|d| d.join("tilawah").join("audio"))
            .unwrap_or_else(|| std::env::temp_dir().join("tilawah-audio"))
    }
}

// Defaults live on the struct; the free function only picks the file location.
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tilawah").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.tuning.position_poll_interval_ms, 100);
        assert_eq!(config.tuning.highlight_delay_ms, 200);
        assert_eq!(config.tuning.range_start_lead_ms, 250);
        assert_eq!(config.tuning.range_end_trim_ms, 200);
        assert_eq!(config.tuning.restart_guard_ms, 500);
        assert_eq!(config.reciter_cache_ttl_secs, 3600);
        assert_eq!(config.preferred_reciter, "Alafasy");
    }
}
