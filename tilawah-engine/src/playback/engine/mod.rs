//! Playback session controller
//!
//! Module organization:
//! - `core.rs` - engine struct, construction, chapter loading, reciter
//!   selection, range/loop setters, teardown
//! - `playback.rs` - play/pause/seek commands, status handling, finish and
//!   loop-restart orchestration
//! - `monitor.rs` - sample loop and progress emission

mod core;
mod monitor;
mod playback;

pub use core::PlaybackEngine;
