//! Domain types for the recitation playback engine
//!
//! Supporting types for reciters, verse timing indexes, playback ranges and
//! loop settings. All types here are plain data; the engine crate owns the
//! logic that interprets them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A reciter available from the content service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reciter {
    /// Upstream reciter identifier
    pub id: u32,
    /// Display name (Latin script)
    pub name: String,
    /// Arabic display name, when the upstream provides one
    pub arabic_name: Option<String>,
}

/// Per-word timing within a verse
///
/// Upstream delivers these as `[word_position, start_ms, end_ms]` triples;
/// the service client normalizes them into this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSegment {
    /// 1-based word position within the verse
    pub word_position: u32,
    /// Word start offset into the audio stream (milliseconds)
    pub start_ms: u64,
    /// Word end offset into the audio stream (milliseconds)
    pub end_ms: u64,
}

/// One verse's timing entry in the chapter timing index
///
/// Invariants (upstream guaranteed, re-established by sorting on load):
/// entries are ordered by ascending `timestamp_from`, and `segments` are
/// ordered by ascending `start_ms`. The index is approximate; `timestamp_from`
/// values systematically run early relative to the audio content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseTiming {
    /// Verse key in `chapter:verse` form, e.g. `"2:255"`
    pub verse_key: String,
    /// Verse start offset into the audio stream (milliseconds)
    pub timestamp_from: u64,
    /// Verse end offset into the audio stream (milliseconds)
    pub timestamp_to: u64,
    /// Per-word timing within the verse (may be empty)
    pub segments: Vec<WordSegment>,
}

impl VerseTiming {
    /// Verse number parsed from the `chapter:verse` key
    pub fn verse_number(&self) -> Option<u32> {
        self.verse_key.rsplit(':').next()?.parse().ok()
    }
}

/// Audio metadata for one (chapter, reciter) pairing
///
/// Immutable once fetched; replaced wholesale on chapter or reciter change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterAudioFile {
    /// Playable stream URL
    pub audio_url: String,
    /// Stream duration reported by the upstream, when available
    pub duration_ms: Option<u64>,
    /// Ordered verse timing index
    pub verse_timings: Vec<VerseTiming>,
}

/// Coarse playback lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing loaded
    Idle,
    /// Metadata fetch and resource open in flight
    Loading,
    /// Resource open, sample loop active
    Playing,
    /// Resource open, sample loop inactive
    Paused,
    /// Load or playback failed; requires an explicit clear before reuse
    Error,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Loading => write!(f, "loading"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Error => write!(f, "error"),
        }
    }
}

/// Live highlight state derived from the playback position
///
/// Recomputed in full on every sample tick and every explicit seek; never
/// persisted. Cleared whenever a chapter loads or the reciter changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightState {
    /// Verse currently being recited, `None` in gaps
    pub current_verse_key: Option<String>,
    /// Word currently being recited within the current verse
    pub current_word_position: Option<u32>,
    /// Verses whose recitation has fully passed
    pub completed_verse_keys: BTreeSet<String>,
}

/// User-selected verse range bounding playback to a subset of the chapter
///
/// When unset (or both fields `None`), the whole chapter plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRange {
    /// First verse of the range (1-based verse number)
    pub start_verse: Option<u32>,
    /// Last verse of the range (1-based verse number)
    pub end_verse: Option<u32>,
}

impl VerseRange {
    /// True when either bound is set
    pub fn is_active(&self) -> bool {
        self.start_verse.is_some() || self.end_verse.is_some()
    }
}

/// Repeat configuration for range playback
///
/// `loop_count: None` with `is_infinite: false` means play once.
/// `current_iteration` starts at 1, is reset whenever the settings are
/// (re)configured, and is incremented on each finite restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Total number of passes to play, when finite looping is requested
    pub loop_count: Option<u32>,
    /// Repeat forever until the user pauses or resets
    pub is_infinite: bool,
    /// 1-based index of the pass currently playing (finite loops only)
    pub current_iteration: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            loop_count: None,
            is_infinite: false,
            current_iteration: 1,
        }
    }
}
