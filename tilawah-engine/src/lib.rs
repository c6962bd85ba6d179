//! # Tilawah Engine
//!
//! Synchronized audio-recitation playback engine: streams chapter audio,
//! tracks the playback position against a sparse verse-timing index to drive
//! live verse/word highlighting, supports bounded verse-range playback with
//! precise start/stop trimming, and supports iterative looping with
//! reload-based restart semantics.
//!
//! The engine is a single cohesive state machine. A host constructs one
//! [`PlaybackEngine`] per playback surface, observes state through
//! [`SharedState`] and its broadcast event channel, and drives it through
//! the command methods (`load_chapter`, `play`, `pause`, ...).

pub mod audio;
pub mod error;
pub mod playback;
pub mod services;
pub mod state;

pub use error::{Error, Result};
pub use playback::engine::PlaybackEngine;
pub use state::SharedState;
