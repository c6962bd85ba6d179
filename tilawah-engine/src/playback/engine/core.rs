//! Core playback engine - lifecycle and orchestration
//!
//! **Responsibilities:**
//! - PlaybackEngine struct definition and initialization
//! - Chapter loading (single-flight) and session teardown
//! - Reciter list loading and selection
//! - Verse-range and loop-settings commands
//!
//! One engine instance owns one audio resource and one sample loop. Hosts
//! construct an instance per playback surface; nothing here is process-wide.

use crate::audio::{AudioBackend, AudioHandle, OpenOptions, RodioBackend};
use crate::error::{Error, Result};
use crate::playback::reciters;
use crate::playback::verse_timeline::VerseTimeline;
use crate::services::{QuranApiClient, RecitationSource};
use crate::state::{LoadedChapter, SharedState};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tilawah_common::config::EngineConfig;
use tilawah_common::events::EngineEvent;
use tilawah_common::types::{HighlightState, LoopSettings, PlaybackState, Reciter, VerseRange};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// One open audio resource and its identity
pub(super) struct Session {
    /// Exclusive handle to the platform audio resource
    pub(super) handle: Box<dyn AudioHandle>,
    /// Chapter the resource belongs to
    pub(super) chapter_id: u32,
    /// Stream URL, kept for reload-based loop restarts
    pub(super) url: String,
}

/// State mirrored for the status-update handler
///
/// The handler task is attached once per open resource but must always
/// observe the latest range, loop and timing values. Every setter writes
/// through this shared context synchronously; the handler reads it fresh on
/// each update and never captures values at attach time.
#[derive(Default)]
pub(super) struct WatchContext {
    /// Timing index of the loaded chapter
    pub(super) timeline: Option<Arc<VerseTimeline>>,
    /// Loaded chapter id
    pub(super) chapter_id: Option<u32>,
    /// Active verse range
    pub(super) verse_range: Option<VerseRange>,
    /// Loop configuration and iteration bookkeeping
    pub(super) loop_settings: LoopSettings,
    /// Start offset computed for the current play session
    ///
    /// Cached so every loop iteration restarts from the identical point;
    /// cleared when the range, chapter or reciter changes.
    pub(super) cached_start_offset_ms: Option<u64>,
}

/// Playback engine - owns the audio resource and the coarse lifecycle
pub struct PlaybackEngine {
    /// Shared observable state
    pub(super) state: Arc<SharedState>,

    /// Engine configuration (timing constants, API base, cache dirs)
    pub(super) config: Arc<EngineConfig>,

    /// Recitation content service
    pub(super) source: Arc<dyn RecitationSource>,

    /// Audio resource factory
    pub(super) backend: Arc<dyn AudioBackend>,

    /// Currently open audio resource (None when idle)
    pub(super) session: Arc<RwLock<Option<Session>>>,

    /// Mirrored state for the status-update handler
    pub(super) watch: Arc<RwLock<WatchContext>>,

    /// Chapter load in flight; checked at entry for single-flight loading
    pub(super) loading: Arc<AtomicBool>,

    /// Sample loop running flag
    pub(super) polling: Arc<AtomicBool>,

    /// Finish handling in progress; blocks re-entrant finish triggers
    pub(super) restarting: Arc<AtomicBool>,

    /// When the last loop restart happened; finish triggers inside the
    /// configured guard window after this are ignored
    pub(super) last_restart: Arc<RwLock<Option<Instant>>>,

    /// When the reciter list was last fetched (TTL cache)
    pub(super) reciters_fetched_at: Arc<RwLock<Option<Instant>>>,
}

impl PlaybackEngine {
    /// Create an engine over explicit collaborators
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn RecitationSource>,
        backend: Arc<dyn AudioBackend>,
    ) -> Self {
        Self {
            state: Arc::new(SharedState::new()),
            config: Arc::new(config),
            source,
            backend,
            session: Arc::new(RwLock::new(None)),
            watch: Arc::new(RwLock::new(WatchContext::default())),
            loading: Arc::new(AtomicBool::new(false)),
            polling: Arc::new(AtomicBool::new(false)),
            restarting: Arc::new(AtomicBool::new(false)),
            last_restart: Arc::new(RwLock::new(None)),
            reciters_fetched_at: Arc::new(RwLock::new(None)),
        }
    }

    /// Create an engine wired to the real content API and rodio output
    pub fn with_default_services(config: EngineConfig) -> Result<Self> {
        let source = Arc::new(QuranApiClient::new(config.api.base_url.clone())?);
        let backend = Arc::new(RodioBackend::new(config.resolve_audio_cache_dir())?);
        Ok(Self::new(config, source, backend))
    }

    /// Shared observable state
    pub fn state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    /// Subscribe to the engine event stream
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<EngineEvent> {
        self.state.subscribe_events()
    }

    /// Clone the inner Arcs for sharing across tasks
    pub(super) fn clone_handles(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            config: Arc::clone(&self.config),
            source: Arc::clone(&self.source),
            backend: Arc::clone(&self.backend),
            session: Arc::clone(&self.session),
            watch: Arc::clone(&self.watch),
            loading: Arc::clone(&self.loading),
            polling: Arc::clone(&self.polling),
            restarting: Arc::clone(&self.restarting),
            last_restart: Arc::clone(&self.last_restart),
            reciters_fetched_at: Arc::clone(&self.reciters_fetched_at),
        }
    }

    /// Set the playback state, broadcasting the change when it differs
    pub(super) async fn transition(&self, new_state: PlaybackState) {
        let old_state = self.state.set_playback_state(new_state).await;
        if old_state != new_state {
            info!("Playback state changed: {} -> {}", old_state, new_state);
            self.state.broadcast_event(EngineEvent::PlaybackStateChanged {
                old_state,
                new_state,
                timestamp: Utc::now(),
            });
        }
    }

    /// Surface a failure through the shared state
    pub(super) async fn enter_error(&self, err: &Error) {
        error!("Playback error: {}", err);
        let message = err.user_message();
        self.state.set_error_message(Some(message.clone())).await;
        self.transition(PlaybackState::Error).await;
        self.state.broadcast_event(EngineEvent::PlaybackFailed {
            message,
            timestamp: Utc::now(),
        });
    }

    /// Load the reciter list, picking a default when none is selected
    ///
    /// The fetched list stays fresh for the configured TTL; calls inside the
    /// window are no-ops.
    pub async fn load_reciters(&self) -> Result<()> {
        let ttl = Duration::from_secs(self.config.reciter_cache_ttl_secs);
        if let Some(fetched_at) = *self.reciters_fetched_at.read().await {
            if fetched_at.elapsed() < ttl {
                debug!("Reciter list still fresh, skipping fetch");
                return Ok(());
            }
        }

        self.state.set_loading_reciters(true);
        let result = self.source.get_reciters().await;
        self.state.set_loading_reciters(false);

        match result {
            Ok(reciters) => {
                info!("Fetched {} reciters", reciters.len());
                *self.reciters_fetched_at.write().await = Some(Instant::now());

                if self.state.selected_reciter().await.is_none() {
                    if let Some(default) =
                        reciters::pick_default(&reciters, &self.config.preferred_reciter)
                    {
                        info!("Default reciter: {}", default.name);
                        self.state.set_selected_reciter(Some(default.clone())).await;
                    }
                }

                self.state.set_reciters(reciters).await;
                Ok(())
            }
            Err(e) => {
                self.enter_error(&e).await;
                Err(e)
            }
        }
    }

    /// Select a reciter, tearing down any open session
    ///
    /// Deliberately does not reload the chapter: the host observes the
    /// change and issues its own `load_chapter`, which decouples reciter
    /// selection from whether a chapter is currently open.
    pub async fn select_reciter(&self, reciter: Reciter) {
        info!("Reciter selected: {} ({})", reciter.name, reciter.id);
        self.teardown_session().await;
        let reciter_id = reciter.id;
        self.state.set_selected_reciter(Some(reciter)).await;
        self.state.broadcast_event(EngineEvent::ReciterChanged {
            reciter_id,
            timestamp: Utc::now(),
        });
    }

    /// Load a chapter for the selected reciter
    ///
    /// Single-flight: a load already in progress silently drops this
    /// request. Loading the chapter that is already open is a no-op.
    pub async fn load_chapter(&self, chapter_id: u32) -> Result<()> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Load already in flight, dropping request for chapter {}", chapter_id);
            return Ok(());
        }

        let result = self.load_chapter_inner(chapter_id).await;
        self.loading.store(false, Ordering::SeqCst);

        if let Err(e) = &result {
            self.enter_error(e).await;
        }
        result
    }

    async fn load_chapter_inner(&self, chapter_id: u32) -> Result<()> {
        {
            let session = self.session.read().await;
            if session.as_ref().map(|s| s.chapter_id) == Some(chapter_id) {
                debug!("Chapter {} already loaded, ignoring", chapter_id);
                return Ok(());
            }
        }

        let reciter = self.state.selected_reciter().await.ok_or_else(|| {
            Error::InvalidState("Select a reciter before loading a chapter.".to_string())
        })?;

        info!("Loading chapter {} with reciter {}", chapter_id, reciter.id);
        self.teardown_session().await;
        self.transition(PlaybackState::Loading).await;

        let audio = self.source.get_chapter_audio(reciter.id, chapter_id).await?;
        let timeline = Arc::new(VerseTimeline::new(audio.verse_timings.clone()));
        let (handle, status_rx) = self
            .backend
            .open(&audio.audio_url, OpenOptions::default())
            .await?;

        let duration_ms = handle
            .duration_ms()
            .or(audio.duration_ms)
            .or_else(|| timeline.last_end_ms())
            .unwrap_or(0);
        self.state.set_duration_ms(duration_ms);

        let url = audio.audio_url.clone();
        self.state
            .set_chapter(Some(LoadedChapter {
                chapter_id,
                audio: Arc::new(audio),
            }))
            .await;

        {
            let mut watch = self.watch.write().await;
            watch.timeline = Some(Arc::clone(&timeline));
            watch.chapter_id = Some(chapter_id);
            watch.cached_start_offset_ms = None;
        }

        *self.session.write().await = Some(Session {
            handle,
            chapter_id,
            url,
        });
        self.spawn_status_handler(status_rx);

        self.transition(PlaybackState::Paused).await;
        self.state.broadcast_event(EngineEvent::ChapterLoaded {
            chapter_id,
            reciter_id: reciter.id,
            duration_ms,
            verse_count: timeline.len(),
            timestamp: Utc::now(),
        });
        info!(
            "Chapter {} loaded ({} verses, {}ms)",
            chapter_id,
            timeline.len(),
            duration_ms
        );
        Ok(())
    }

    /// Release the session and clear everything derived from it
    ///
    /// Safe to call when already idle. Unload errors are swallowed; cleanup
    /// never fails.
    pub(super) async fn teardown_session(&self) {
        self.stop_sample_loop();

        if let Some(session) = self.session.write().await.take() {
            if let Err(e) = session.handle.unload().await {
                warn!("Unload failed during teardown (ignored): {}", e);
            }
        }

        {
            let mut watch = self.watch.write().await;
            watch.timeline = None;
            watch.chapter_id = None;
            watch.cached_start_offset_ms = None;
        }

        self.state.set_chapter(None).await;
        self.state.set_position_ms(0);
        self.state.set_duration_ms(0);
        self.state.set_highlight(HighlightState::default()).await;
        self.state.set_error_message(None).await;
        *self.last_restart.write().await = None;

        self.transition(PlaybackState::Idle).await;
    }

    /// Tear down the session and clear range and loop configuration
    pub async fn reset(&self) {
        info!("Reset command received");
        self.teardown_session().await;
        self.reset_playback_settings().await;
    }

    /// Leave the error state
    ///
    /// Settles back to `Paused` when a resource survived the failure,
    /// otherwise `Idle`. No-op outside the error state.
    pub async fn clear_error(&self) {
        if self.state.playback_state().await != PlaybackState::Error {
            return;
        }
        self.state.set_error_message(None).await;
        let next = if self.session.read().await.is_some() {
            PlaybackState::Paused
        } else {
            PlaybackState::Idle
        };
        self.transition(next).await;
    }

    /// Bound playback to a verse range
    ///
    /// Pure state setter; takes effect on the next `play`. An inverted range
    /// is rejected.
    pub async fn set_verse_range(&self, start_verse: Option<u32>, end_verse: Option<u32>) {
        if let (Some(start), Some(end)) = (start_verse, end_verse) {
            if start > end {
                warn!("Ignoring inverted verse range {}..{}", start, end);
                return;
            }
        }

        let range = VerseRange {
            start_verse,
            end_verse,
        };
        let range = range.is_active().then_some(range);
        debug!("Verse range set: {:?}", range);

        {
            let mut watch = self.watch.write().await;
            watch.verse_range = range;
            watch.cached_start_offset_ms = None;
        }
        self.state.set_verse_range(range).await;
    }

    /// Remove the verse range; takes effect on the next `play`
    pub async fn clear_verse_range(&self) {
        debug!("Verse range cleared");
        {
            let mut watch = self.watch.write().await;
            watch.verse_range = None;
            watch.cached_start_offset_ms = None;
        }
        self.state.set_verse_range(None).await;
    }

    /// Configure looping; resets the iteration counter to 1
    pub async fn set_loop_settings(&self, loop_count: Option<u32>, is_infinite: bool) {
        let settings = LoopSettings {
            loop_count,
            is_infinite,
            current_iteration: 1,
        };
        debug!("Loop settings set: {:?}", settings);
        self.watch.write().await.loop_settings = settings;
        self.state.set_loop_settings(settings).await;
    }

    /// Remove loop configuration
    pub async fn clear_loop_settings(&self) {
        debug!("Loop settings cleared");
        self.watch.write().await.loop_settings = LoopSettings::default();
        self.state.set_loop_settings(LoopSettings::default()).await;
    }

    /// Clear both range and loop configuration
    ///
    /// Intended for the host to call when navigating away from a chapter.
    pub async fn reset_playback_settings(&self) {
        self.clear_verse_range().await;
        self.clear_loop_settings().await;
    }
}
