//! Audio resource boundary
//!
//! The engine controls audio through the [`AudioBackend`]/[`AudioHandle`]
//! traits rather than a concrete library, so the platform primitive can be
//! swapped (and mocked in tests). The shipped implementation is
//! [`RodioBackend`].

pub mod download;
pub mod output;

use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

pub use download::AudioCache;
pub use output::RodioBackend;

/// Options for opening an audio resource
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    /// Position to open at, in milliseconds; `None` opens at the start
    pub start_position_ms: Option<u64>,
}

/// One status update from the audio primitive
///
/// Delivered on the status channel at whatever cadence the backend provides;
/// finer-grained than the engine's own sample loop.
#[derive(Debug, Clone, Copy)]
pub struct StatusUpdate {
    /// Reported playback position (milliseconds)
    pub position_ms: u64,
    /// Resource is open and decodable
    pub is_loaded: bool,
    /// The stream just reached its natural end
    pub did_just_finish: bool,
}

/// Receiving half of a handle's status stream
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusUpdate>;

/// Sending half of a handle's status stream (held by backends)
pub type StatusSender = mpsc::UnboundedSender<StatusUpdate>;

/// One open, controllable audio resource
///
/// Handles are exclusively owned by the engine. Dropping a handle without
/// calling `unload` must still release the underlying resource eventually;
/// `unload` releases it deterministically and closes the status channel.
#[async_trait]
pub trait AudioHandle: Send + Sync {
    /// Start or resume playback
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the resource open
    async fn pause(&self) -> Result<()>;

    /// Reposition to the given offset
    async fn seek_to(&self, position_ms: u64) -> Result<()>;

    /// Current playback position
    async fn position_ms(&self) -> Result<u64>;

    /// Stream duration, when the container reports one
    fn duration_ms(&self) -> Option<u64>;

    /// Release the resource; errors here are for logging only
    async fn unload(&self) -> Result<()>;
}

/// Factory for audio resources
#[async_trait]
pub trait AudioBackend: Send + Sync {
    /// Open `url` as a playable resource without auto-starting
    ///
    /// Returns the control handle and the receiving half of its status
    /// stream. The status channel closes when the resource is unloaded.
    async fn open(
        &self,
        url: &str,
        opts: OpenOptions,
    ) -> Result<(Box<dyn AudioHandle>, StatusReceiver)>;
}
