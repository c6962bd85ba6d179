//! Event types for the tilawah engine
//!
//! Events are broadcast from the engine's shared state and can be serialized
//! for transmission to a host UI.

use crate::types::PlaybackState;
use serde::{Deserialize, Serialize};

/// Engine event types
///
/// Broadcast via the shared state's event channel. Hosts subscribe to drive
/// UI updates; the engine ignores send errors (no receivers is fine).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EngineEvent {
    /// Playback lifecycle state changed
    ///
    /// Triggers:
    /// - Host: update transport controls
    PlaybackStateChanged {
        /// Playback state before change
        old_state: PlaybackState,
        /// Playback state after change
        new_state: PlaybackState,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Chapter audio metadata fetched and resource opened
    ///
    /// Triggers:
    /// - Host: render verse list, enable transport
    ChapterLoaded {
        /// Chapter that was loaded
        chapter_id: u32,
        /// Reciter the audio belongs to
        reciter_id: u32,
        /// Stream duration (milliseconds)
        duration_ms: u64,
        /// Number of verse timing entries in the index
        verse_count: usize,
        /// When the load completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback progress update
    ///
    /// Emitted periodically during playback (configurable cadence, coarser
    /// than the internal position poll).
    ///
    /// Triggers:
    /// - Host: update progress bar
    PlaybackProgress {
        /// Chapter currently playing
        chapter_id: u32,
        /// Current playback position (milliseconds)
        position_ms: u64,
        /// Stream duration (milliseconds)
        duration_ms: u64,
        /// Progress update timestamp
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Current verse or word highlight changed
    ///
    /// Triggers:
    /// - Host: move the live verse/word highlight
    HighlightChanged {
        /// Verse currently recited, `None` in gaps
        verse_key: Option<String>,
        /// Word currently recited within the verse
        word_position: Option<u32>,
        /// Playback position the highlight was resolved for (milliseconds)
        position_ms: u64,
        /// When the highlight changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A loop pass restarted at the cached range start offset
    LoopIterationStarted {
        /// 1-based pass index now playing
        iteration: u32,
        /// Offset the resource was reopened at (milliseconds)
        start_offset_ms: u64,
        /// When the restart happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Range playback finished with no loop pass remaining
    RangeCompleted {
        /// Chapter the range belonged to
        chapter_id: u32,
        /// When playback settled
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Selected reciter changed
    ///
    /// The engine tears down the current session on reciter change; the host
    /// reloads the chapter when it observes this event.
    ReciterChanged {
        /// Newly selected reciter
        reciter_id: u32,
        /// When the selection changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A load or playback command failed
    PlaybackFailed {
        /// User-facing failure message
        message: String,
        /// When the failure surfaced
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = EngineEvent::PlaybackStateChanged {
            old_state: PlaybackState::Paused,
            new_state: PlaybackState::Playing,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"PlaybackStateChanged\""));
        assert!(json.contains("\"new_state\":\"playing\""));
    }

    #[test]
    fn test_highlight_event_roundtrip() {
        let event = EngineEvent::HighlightChanged {
            verse_key: Some("2:1".to_string()),
            word_position: Some(3),
            position_ms: 1500,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: EngineEvent = serde_json::from_str(&json).unwrap();
        match back {
            EngineEvent::HighlightChanged {
                verse_key,
                word_position,
                position_ms,
                ..
            } => {
                assert_eq!(verse_key.as_deref(), Some("2:1"));
                assert_eq!(word_position, Some(3));
                assert_eq!(position_ms, 1500);
            }
            other => panic!("expected HighlightChanged, got {:?}", other),
        }
    }
}
