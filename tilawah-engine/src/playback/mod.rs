//! Playback engine components
//!
//! - [`engine`] - the playback session controller
//! - [`verse_timeline`] - position to verse/word highlight resolution
//! - [`range_loop`] - verse-range boundaries and loop policy
//! - [`reciters`] - default reciter selection

pub mod engine;
pub mod range_loop;
pub mod reciters;
pub mod verse_timeline;

pub use engine::PlaybackEngine;
pub use verse_timeline::VerseTimeline;
