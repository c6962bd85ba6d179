//! # Tilawah Common Library
//!
//! Shared code for the tilawah recitation playback engine:
//! - Domain types (reciters, verse timings, ranges, loop settings)
//! - Event types (EngineEvent enum)
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use events::EngineEvent;
