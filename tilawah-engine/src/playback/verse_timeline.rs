//! Verse timeline and highlight resolution
//!
//! Maps a playback position to the verse and word being recited and the set
//! of verses already completed. Resolution is pure given the timing index
//! and a position: it is recomputed in full on every sample tick and every
//! explicit seek, and holds no incremental state.

use tilawah_common::types::{HighlightState, VerseTiming};

/// Verse timing index for one chapter
///
/// **Design:**
/// - Entries sorted by `timestamp_from` ascending
/// - Lookup walks the list in order; the first containing interval wins
/// - Word lookup keeps the last started word current until the next word
///   starts, so inter-word gaps never drop the highlight
#[derive(Debug, Clone)]
pub struct VerseTimeline {
    /// Sorted list of verse timings (by timestamp_from ascending)
    entries: Vec<VerseTiming>,
}

impl VerseTimeline {
    /// Create a timeline from timing entries
    ///
    /// Entries are sorted by `timestamp_from` ascending; upstream order is
    /// not trusted.
    pub fn new(mut entries: Vec<VerseTiming>) -> Self {
        entries.sort_by_key(|e| e.timestamp_from);
        Self { entries }
    }

    /// Resolve the highlight state for a position
    ///
    /// The caller is responsible for subtracting the configured highlight
    /// delay before lookup; this method sees the adjusted position.
    ///
    /// # Returns
    /// - `completed_verse_keys`: every verse with `timestamp_to <= position`
    /// - `current_verse_key`: the single verse whose
    ///   `[timestamp_from, timestamp_to)` interval contains the position,
    ///   or `None` in gaps
    /// - `current_word_position`: the last word of the current verse whose
    ///   start has passed, or `None` before the first word
    pub fn resolve(&self, position_ms: u64) -> HighlightState {
        let mut highlight = HighlightState::default();

        for entry in &self.entries {
            if entry.timestamp_to <= position_ms {
                highlight.completed_verse_keys.insert(entry.verse_key.clone());
                continue;
            }

            if entry.timestamp_from <= position_ms {
                highlight.current_verse_key = Some(entry.verse_key.clone());
                // Last word whose start has passed stays current across
                // inter-word gaps
                for segment in &entry.segments {
                    if segment.start_ms <= position_ms {
                        highlight.current_word_position = Some(segment.word_position);
                    } else {
                        break;
                    }
                }
                break;
            }

            // Sorted by timestamp_from: nothing later can contain or precede
            // this position
            break;
        }

        highlight
    }

    /// Timing entry for a verse number within this chapter
    pub fn timing_for_verse(&self, verse_number: u32) -> Option<&VerseTiming> {
        self.entries
            .iter()
            .find(|t| t.verse_number() == Some(verse_number))
    }

    /// End of the last verse, used as a duration fallback
    pub fn last_end_ms(&self) -> Option<u64> {
        self.entries.iter().map(|t| t.timestamp_to).max()
    }

    /// Number of entries in the timeline
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the timeline is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
