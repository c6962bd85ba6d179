//! Shared observable state
//!
//! Thread-safe state the host reads and the engine writes. Hot fields
//! (position, duration) are lock-free atomics updated on every sample tick;
//! everything else sits behind RwLocks with rare writes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use tilawah_common::events::EngineEvent;
use tilawah_common::types::{
    ChapterAudioFile, HighlightState, LoopSettings, PlaybackState, Reciter, VerseRange,
};

/// Currently loaded chapter
#[derive(Debug, Clone)]
pub struct LoadedChapter {
    /// Chapter number (1-114)
    pub chapter_id: u32,
    /// Audio metadata for the (chapter, reciter) pairing
    pub audio: Arc<ChapterAudioFile>,
}

/// Shared state accessible by the engine's tasks and the host
///
/// Uses RwLock for concurrent read access with rare writes; position and
/// duration use atomics because the sample loop updates them at ~10 Hz.
pub struct SharedState {
    /// Coarse playback lifecycle state
    playback_state: RwLock<PlaybackState>,

    /// Currently loaded chapter (None when idle)
    chapter: RwLock<Option<LoadedChapter>>,

    /// Current playback position in milliseconds
    position_ms: AtomicU64,

    /// Stream duration in milliseconds
    duration_ms: AtomicU64,

    /// Live verse/word highlight derived from the position
    highlight: RwLock<HighlightState>,

    /// User-facing message for the last failure (None unless in error state)
    error_message: RwLock<Option<String>>,

    /// Fetched reciter list
    reciters: RwLock<Vec<Reciter>>,

    /// Currently selected reciter
    selected_reciter: RwLock<Option<Reciter>>,

    /// Reciter list fetch in flight
    loading_reciters: AtomicBool,

    /// Active verse range (None plays the whole chapter)
    verse_range: RwLock<Option<VerseRange>>,

    /// Loop configuration and iteration bookkeeping
    loop_settings: RwLock<LoopSettings>,

    /// Event broadcaster for host subscriptions
    event_tx: broadcast::Sender<EngineEvent>,
}

impl SharedState {
    /// Create new shared state with default values
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(100); // Buffer up to 100 events
        Self {
            playback_state: RwLock::new(PlaybackState::Idle),
            chapter: RwLock::new(None),
            position_ms: AtomicU64::new(0),
            duration_ms: AtomicU64::new(0),
            highlight: RwLock::new(HighlightState::default()),
            error_message: RwLock::new(None),
            reciters: RwLock::new(Vec::new()),
            selected_reciter: RwLock::new(None),
            loading_reciters: AtomicBool::new(false),
            verse_range: RwLock::new(None),
            loop_settings: RwLock::new(LoopSettings::default()),
            event_tx,
        }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast_event(&self, event: EngineEvent) {
        // Ignore send errors (no receivers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the engine event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    /// Get current playback state
    pub async fn playback_state(&self) -> PlaybackState {
        *self.playback_state.read().await
    }

    /// Set playback state, returning the previous state
    pub async fn set_playback_state(&self, state: PlaybackState) -> PlaybackState {
        let mut guard = self.playback_state.write().await;
        std::mem::replace(&mut *guard, state)
    }

    /// Get the currently loaded chapter
    pub async fn chapter(&self) -> Option<LoadedChapter> {
        self.chapter.read().await.clone()
    }

    /// Audio metadata of the loaded chapter, if any
    pub async fn audio_file(&self) -> Option<Arc<ChapterAudioFile>> {
        self.chapter.read().await.as_ref().map(|c| Arc::clone(&c.audio))
    }

    /// Set the loaded chapter
    pub async fn set_chapter(&self, chapter: Option<LoadedChapter>) {
        *self.chapter.write().await = chapter;
    }

    /// Current playback position in milliseconds
    pub fn position_ms(&self) -> u64 {
        self.position_ms.load(Ordering::Relaxed)
    }

    /// Update the playback position
    pub fn set_position_ms(&self, position_ms: u64) {
        self.position_ms.store(position_ms, Ordering::Relaxed);
    }

    /// Stream duration in milliseconds
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms.load(Ordering::Relaxed)
    }

    /// Record the stream duration
    pub fn set_duration_ms(&self, duration_ms: u64) {
        self.duration_ms.store(duration_ms, Ordering::Relaxed);
    }

    /// Current highlight state
    pub async fn highlight(&self) -> HighlightState {
        self.highlight.read().await.clone()
    }

    /// Replace the highlight state
    pub async fn set_highlight(&self, highlight: HighlightState) {
        *self.highlight.write().await = highlight;
    }

    /// User-facing message for the last failure
    pub async fn error_message(&self) -> Option<String> {
        self.error_message.read().await.clone()
    }

    /// Set or clear the failure message
    pub async fn set_error_message(&self, message: Option<String>) {
        *self.error_message.write().await = message;
    }

    /// Fetched reciter list
    pub async fn reciters(&self) -> Vec<Reciter> {
        self.reciters.read().await.clone()
    }

    /// Replace the reciter list
    pub async fn set_reciters(&self, reciters: Vec<Reciter>) {
        *self.reciters.write().await = reciters;
    }

    /// Currently selected reciter
    pub async fn selected_reciter(&self) -> Option<Reciter> {
        self.selected_reciter.read().await.clone()
    }

    /// Set the selected reciter
    pub async fn set_selected_reciter(&self, reciter: Option<Reciter>) {
        *self.selected_reciter.write().await = reciter;
    }

    /// Reciter list fetch in flight
    pub fn is_loading_reciters(&self) -> bool {
        self.loading_reciters.load(Ordering::Relaxed)
    }

    pub fn set_loading_reciters(&self, loading: bool) {
        self.loading_reciters.store(loading, Ordering::Relaxed);
    }

    /// Active verse range
    pub async fn verse_range(&self) -> Option<VerseRange> {
        *self.verse_range.read().await
    }

    /// Set or clear the verse range
    pub async fn set_verse_range(&self, range: Option<VerseRange>) {
        *self.verse_range.write().await = range;
    }

    /// Loop configuration and iteration bookkeeping
    pub async fn loop_settings(&self) -> LoopSettings {
        *self.loop_settings.read().await
    }

    /// Replace the loop settings
    pub async fn set_loop_settings(&self, settings: LoopSettings) {
        *self.loop_settings.write().await = settings;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
