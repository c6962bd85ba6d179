//! Verse-range boundaries and loop policy
//!
//! Pure arithmetic over the verse timeline. The engine caches the computed
//! start offset for the duration of a play session so every loop iteration
//! restarts from the identical point; these functions never cache anything
//! themselves.

use crate::playback::verse_timeline::VerseTimeline;
use tilawah_common::types::LoopSettings;

/// Effective start offset for a bounded range
///
/// Verse 1 starts at its own `timestamp_from`. For any later verse the
/// previous verse's `timestamp_to` plus `lead_ms` is preferred: upstream
/// `timestamp_from` values are measured early, and using them directly
/// starts playback inside the previous verse's tail. When the previous
/// verse is missing from the index, the verse's own `timestamp_from` is the
/// fallback.
pub fn compute_start_offset(
    timeline: &VerseTimeline,
    start_verse: u32,
    lead_ms: u64,
) -> Option<u64> {
    if start_verse <= 1 {
        return timeline
            .timing_for_verse(start_verse)
            .map(|t| t.timestamp_from);
    }

    match timeline.timing_for_verse(start_verse - 1) {
        Some(previous) => Some(previous.timestamp_to + lead_ms),
        None => timeline
            .timing_for_verse(start_verse)
            .map(|t| t.timestamp_from),
    }
}

/// Position at which a bounded range counts as finished
///
/// The end verse's `timestamp_to` minus `trim_ms`, stopping before the
/// audio bleeds into the next verse's recitation.
pub fn range_end_boundary(
    timeline: &VerseTimeline,
    end_verse: u32,
    trim_ms: u64,
) -> Option<u64> {
    timeline
        .timing_for_verse(end_verse)
        .map(|t| t.timestamp_to.saturating_sub(trim_ms))
}

/// Whether another loop pass should start after a finish
pub fn should_continue(settings: &LoopSettings) -> bool {
    settings.is_infinite
        || matches!(settings.loop_count, Some(count) if settings.current_iteration < count)
}
