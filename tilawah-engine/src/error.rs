//! Error types for the tilawah engine
//!
//! Defines engine-specific error types using thiserror for clear error
//! propagation, plus the mapping to user-facing messages surfaced through
//! the shared state.

use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    /// Network fetch failure (metadata or reciter list)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// The selected reciter has no recording for the requested chapter
    #[error("No recording of chapter {chapter_id} for reciter {reciter_id}")]
    ChapterNotAvailable { reciter_id: u32, chapter_id: u32 },

    /// Audio resource open or control failure
    #[error("Audio error: {0}")]
    Audio(String),

    /// Command issued in a state that cannot serve it
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// User-facing message for this failure
    ///
    /// Chapter-not-available gets a specific, actionable message; everything
    /// else collapses to retry-oriented text. Hosts display this string and
    /// call `clear_error` before retrying.
    pub fn user_message(&self) -> String {
        match self {
            Error::ChapterNotAvailable { .. } => {
                "This reciter does not have a recording for this chapter. \
                 Please choose a different reciter."
                    .to_string()
            }
            Error::Fetch(_) => {
                "Could not load the chapter audio. Check your connection and try again."
                    .to_string()
            }
            Error::Audio(_) => "Audio playback failed. Try again.".to_string(),
            Error::InvalidState(msg) => msg.clone(),
            Error::Config(_) | Error::Io(_) => {
                "Something went wrong while preparing playback.".to_string()
            }
        }
    }
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
