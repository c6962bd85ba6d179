//! Recitation content API client
//!
//! Talks to a quran.com-style content API: one endpoint listing the
//! available reciters, one returning chapter audio metadata with per-verse
//! timestamps and per-word segments.

use crate::error::{Error, Result};
use crate::services::RecitationSource;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tilawah_common::types::{ChapterAudioFile, Reciter, VerseTiming, WordSegment};
use tracing::debug;

const USER_AGENT: &str = concat!("tilawah/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Reciter list response
#[derive(Debug, Deserialize)]
struct RecitationsResponse {
    recitations: Vec<RecitationDto>,
}

#[derive(Debug, Deserialize)]
struct RecitationDto {
    id: u32,
    reciter_name: String,
    #[serde(default)]
    arabic_name: Option<String>,
}

/// Chapter audio response
#[derive(Debug, Deserialize)]
struct ChapterAudioResponse {
    audio_file: AudioFileDto,
}

#[derive(Debug, Deserialize)]
struct AudioFileDto {
    audio_url: String,
    /// Duration in seconds, when the upstream reports one
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    verse_timings: Vec<VerseTimingDto>,
}

#[derive(Debug, Deserialize)]
struct VerseTimingDto {
    verse_key: String,
    timestamp_from: i64,
    timestamp_to: i64,
    /// `[word_position, start_ms, end_ms]` triples
    #[serde(default)]
    segments: Vec<Vec<i64>>,
}

impl VerseTimingDto {
    /// Normalize into the domain type
    ///
    /// Upstream occasionally carries negative offsets and short segment
    /// arrays; both are clamped/skipped rather than rejected, since the
    /// index is approximate by nature.
    fn into_timing(self) -> VerseTiming {
        let segments = self
            .segments
            .into_iter()
            .filter(|s| s.len() >= 3)
            .map(|s| WordSegment {
                word_position: s[0].max(0) as u32,
                start_ms: s[1].max(0) as u64,
                end_ms: s[2].max(0) as u64,
            })
            .collect();

        VerseTiming {
            verse_key: self.verse_key,
            timestamp_from: self.timestamp_from.max(0) as u64,
            timestamp_to: self.timestamp_to.max(0) as u64,
            segments,
        }
    }
}

/// HTTP client for the recitation content API
pub struct QuranApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl QuranApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl RecitationSource for QuranApiClient {
    async fn get_reciters(&self) -> Result<Vec<Reciter>> {
        let url = format!("{}/resources/recitations", self.base_url);
        debug!(url = %url, "fetching reciter list");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!(
                "reciter list request failed with status {}",
                status
            )));
        }

        let body: RecitationsResponse = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("malformed reciter list: {}", e)))?;

        Ok(body
            .recitations
            .into_iter()
            .map(|r| Reciter {
                id: r.id,
                name: r.reciter_name,
                arabic_name: r.arabic_name,
            })
            .collect())
    }

    async fn get_chapter_audio(
        &self,
        reciter_id: u32,
        chapter_id: u32,
    ) -> Result<ChapterAudioFile> {
        let url = format!(
            "{}/chapter_recitations/{}/{}?segments=true",
            self.base_url, reciter_id, chapter_id
        );
        debug!(url = %url, "fetching chapter audio metadata");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::ChapterNotAvailable {
                reciter_id,
                chapter_id,
            });
        }
        if !status.is_success() {
            return Err(Error::Fetch(format!(
                "chapter audio request failed with status {}",
                status
            )));
        }

        let body: ChapterAudioResponse = response
            .json()
            .await
            .map_err(|e| Error::Fetch(format!("malformed chapter audio metadata: {}", e)))?;

        let verse_timings: Vec<VerseTiming> = body
            .audio_file
            .verse_timings
            .into_iter()
            .map(VerseTimingDto::into_timing)
            .collect();

        Ok(ChapterAudioFile {
            audio_url: body.audio_file.audio_url,
            duration_ms: body
                .audio_file
                .duration
                .map(|secs| (secs * 1000.0).round() as u64),
            verse_timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = QuranApiClient::new("https://api.quran.com/api/v4");
        assert!(client.is_ok());
    }

    #[test]
    fn test_reciter_list_parsing() {
        let json = r#"{
            "recitations": [
                {"id": 7, "reciter_name": "Mishari Rashid al-Afasy", "arabic_name": "مشاري العفاسي"},
                {"id": 2, "reciter_name": "AbdulBaset AbdulSamad"}
            ]
        }"#;

        let body: RecitationsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.recitations.len(), 2);
        assert_eq!(body.recitations[0].id, 7);
        assert!(body.recitations[1].arabic_name.is_none());
    }

    #[test]
    fn test_chapter_audio_parsing_and_normalization() {
        let json = r#"{
            "audio_file": {
                "audio_url": "https://audio.example.com/7/002.mp3",
                "duration": 12.5,
                "verse_timings": [
                    {
                        "verse_key": "2:1",
                        "timestamp_from": 0,
                        "timestamp_to": 2000,
                        "segments": [[1, 0, 800], [2, 800, 2000], [3, 1900]]
                    },
                    {
                        "verse_key": "2:2",
                        "timestamp_from": -10,
                        "timestamp_to": 4000,
                        "segments": []
                    }
                ]
            }
        }"#;

        let body: ChapterAudioResponse = serde_json::from_str(json).unwrap();
        let timings: Vec<VerseTiming> = body
            .audio_file
            .verse_timings
            .into_iter()
            .map(VerseTimingDto::into_timing)
            .collect();

        // Short segment arrays are skipped, not errors
        assert_eq!(timings[0].segments.len(), 2);
        assert_eq!(timings[0].segments[1].word_position, 2);
        // Negative offsets clamp to zero
        assert_eq!(timings[1].timestamp_from, 0);
        assert_eq!(timings[1].timestamp_to, 4000);
    }

    #[test]
    fn test_duration_seconds_to_millis() {
        let dto = AudioFileDto {
            audio_url: "x".to_string(),
            duration: Some(12.5),
            verse_timings: vec![],
        };
        assert_eq!(dto.duration.map(|s| (s * 1000.0).round() as u64), Some(12500));
    }
}
