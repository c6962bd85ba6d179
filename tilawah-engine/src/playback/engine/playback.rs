//! Playback control methods for PlaybackEngine
//!
//! **Responsibilities:**
//! - Playback state transitions (play, pause, seek)
//! - Status-update handling and end-of-range detection
//! - Finish orchestration: loop restarts and settling

use super::core::{PlaybackEngine, Session};
use crate::audio::{OpenOptions, StatusReceiver, StatusUpdate};
use crate::error::{Error, Result};
use crate::playback::range_loop;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tilawah_common::events::EngineEvent;
use tilawah_common::types::{HighlightState, PlaybackState};
use tracing::{debug, info, warn};

impl PlaybackEngine {
    /// Start or resume playback
    ///
    /// No-op without an open resource. With an active start verse the
    /// resource is reloaded at the effective start offset before playing.
    pub async fn play(&self) -> Result<()> {
        info!("Play command received");
        if self.state.playback_state().await == PlaybackState::Error {
            debug!("Play ignored: error state requires clear_error first");
            return Ok(());
        }
        if self.session.read().await.is_none() {
            debug!("Play ignored: no audio resource open");
            return Ok(());
        }

        let result = self.play_inner().await;
        if let Err(e) = &result {
            self.enter_error(e).await;
        }
        result
    }

    async fn play_inner(&self) -> Result<()> {
        // Range changes apply here, not when they are set: compute the
        // offset fresh and cache it for the loop iterations that follow
        let start_offset = {
            let mut watch = self.watch.write().await;
            let offset = match (
                watch.verse_range.and_then(|r| r.start_verse),
                watch.timeline.as_ref(),
            ) {
                (Some(start_verse), Some(timeline)) => range_loop::compute_start_offset(
                    timeline,
                    start_verse,
                    self.config.tuning.range_start_lead_ms,
                ),
                _ => None,
            };
            watch.cached_start_offset_ms = offset;
            offset
        };

        if let Some(offset_ms) = start_offset {
            // Full reload positioned at the offset keeps the first play and
            // every loop iteration byte-identical
            self.reopen_at(offset_ms).await?;
            self.state.set_position_ms(offset_ms);
        }

        {
            let session = self.session.read().await;
            let session = session
                .as_ref()
                .ok_or_else(|| Error::InvalidState("no audio resource open".to_string()))?;
            session.handle.play().await?;
        }

        self.start_sample_loop();
        self.transition(PlaybackState::Playing).await;
        Ok(())
    }

    /// Pause playback, keeping the resource open
    ///
    /// A failed pause is logged and leaves state unchanged; it is less
    /// disruptive than a failed play.
    pub async fn pause(&self) {
        info!("Pause command received");
        {
            let session = self.session.read().await;
            let Some(session) = session.as_ref() else {
                debug!("Pause ignored: no audio resource open");
                return;
            };
            if let Err(e) = session.handle.pause().await {
                warn!("Pause failed, state unchanged: {}", e);
                return;
            }
        }

        self.stop_sample_loop();
        self.transition(PlaybackState::Paused).await;
    }

    /// Reposition the open resource
    ///
    /// The highlight is recomputed for the new position immediately rather
    /// than waiting for the next sample tick. A failed seek is logged and
    /// leaves state unchanged.
    pub async fn seek_to(&self, position_ms: u64) {
        debug!("Seek command received: {}ms", position_ms);
        {
            let session = self.session.read().await;
            let Some(session) = session.as_ref() else {
                debug!("Seek ignored: no audio resource open");
                return;
            };
            if let Err(e) = session.handle.seek_to(position_ms).await {
                warn!("Seek failed, state unchanged: {}", e);
                return;
            }
        }

        self.state.set_position_ms(position_ms);
        self.refresh_highlight(position_ms).await;
    }

    /// Recompute the highlight for a raw position
    ///
    /// The configured delay is subtracted uniformly before lookup to
    /// compensate output latency and upstream timestamp skew.
    pub(super) async fn refresh_highlight(&self, raw_position_ms: u64) {
        let adjusted = raw_position_ms.saturating_sub(self.config.tuning.highlight_delay_ms);
        let timeline = self.watch.read().await.timeline.clone();
        let Some(timeline) = timeline else {
            return;
        };

        let next = timeline.resolve(adjusted);
        let current = self.state.highlight().await;
        if next == current {
            return;
        }

        let cursor_moved = next.current_verse_key != current.current_verse_key
            || next.current_word_position != current.current_word_position;
        let verse_key = next.current_verse_key.clone();
        let word_position = next.current_word_position;
        self.state.set_highlight(next).await;

        if cursor_moved {
            self.state.broadcast_event(EngineEvent::HighlightChanged {
                verse_key,
                word_position,
                position_ms: raw_position_ms,
                timestamp: Utc::now(),
            });
        }
    }

    /// Spawn the handler consuming one resource's status stream
    ///
    /// The task ends when the resource is unloaded and its channel closes.
    pub(super) fn spawn_status_handler(&self, mut status_rx: StatusReceiver) {
        let engine = self.clone_handles();
        tokio::spawn(async move {
            while let Some(update) = status_rx.recv().await {
                engine.on_status_update(update).await;
            }
            debug!("Status stream closed");
        });
    }

    /// React to one status update from the audio primitive
    ///
    /// End-of-range detection runs here, on the backend's finer-grained
    /// cadence, rather than on the coarse sample loop.
    async fn on_status_update(&self, update: StatusUpdate) {
        if !update.is_loaded {
            return;
        }

        let reached_range_end = {
            let watch = self.watch.read().await;
            match (
                watch.verse_range.and_then(|r| r.end_verse),
                watch.timeline.as_ref(),
            ) {
                (Some(end_verse), Some(timeline)) => range_loop::range_end_boundary(
                    timeline,
                    end_verse,
                    self.config.tuning.range_end_trim_ms,
                )
                .map_or(false, |boundary| update.position_ms >= boundary),
                _ => false,
            }
        };

        if (update.did_just_finish || reached_range_end)
            && self.state.playback_state().await == PlaybackState::Playing
        {
            self.handle_finish().await;
        }
    }

    /// Handle a finish trigger (natural end of stream or end of range)
    async fn handle_finish(&self) {
        // A stale update or the freshly attached stream can re-report the
        // same boundary right after a restart
        let guard = Duration::from_millis(self.config.tuning.restart_guard_ms);
        if let Some(restarted_at) = *self.last_restart.read().await {
            if restarted_at.elapsed() < guard {
                debug!("Finish suppressed inside restart guard window");
                return;
            }
        }

        if self.restarting.swap(true, Ordering::SeqCst) {
            return; // Finish handling already in progress
        }
        let result = self.finish_inner().await;
        self.restarting.store(false, Ordering::SeqCst);

        if let Err(e) = result {
            self.enter_error(&e).await;
        }
    }

    async fn finish_inner(&self) -> Result<()> {
        let (continue_loop, settings, start_offset_ms) = {
            let mut watch = self.watch.write().await;
            let continue_loop = range_loop::should_continue(&watch.loop_settings);
            if continue_loop && !watch.loop_settings.is_infinite {
                watch.loop_settings.current_iteration += 1;
            }
            // Iterations reuse the offset cached at play time; it is only
            // computed here when the range was configured mid-session
            let start_offset_ms = watch
                .cached_start_offset_ms
                .or_else(|| {
                    match (
                        watch.verse_range.and_then(|r| r.start_verse),
                        watch.timeline.as_ref(),
                    ) {
                        (Some(start_verse), Some(timeline)) => {
                            range_loop::compute_start_offset(
                                timeline,
                                start_verse,
                                self.config.tuning.range_start_lead_ms,
                            )
                        }
                        _ => None,
                    }
                })
                .unwrap_or(0);
            watch.cached_start_offset_ms = Some(start_offset_ms);
            (continue_loop, watch.loop_settings, start_offset_ms)
        };
        self.state.set_loop_settings(settings).await;
        self.state.set_highlight(HighlightState::default()).await;

        if continue_loop {
            info!(
                "Loop iteration {} restarting at {}ms",
                settings.current_iteration, start_offset_ms
            );
            *self.last_restart.write().await = Some(Instant::now());

            self.reopen_at(start_offset_ms).await?;
            self.state.set_position_ms(start_offset_ms);
            {
                let session = self.session.read().await;
                let session = session
                    .as_ref()
                    .ok_or_else(|| Error::InvalidState("no audio resource open".to_string()))?;
                session.handle.play().await?;
            }

            self.state.broadcast_event(EngineEvent::LoopIterationStarted {
                iteration: settings.current_iteration,
                start_offset_ms,
                timestamp: Utc::now(),
            });
        } else {
            info!("Playback finished, settling at {}ms", start_offset_ms);
            {
                let session = self.session.read().await;
                if let Some(session) = session.as_ref() {
                    if let Err(e) = session.handle.pause().await {
                        warn!("Pause at finish failed (ignored): {}", e);
                    }
                    if let Err(e) = session.handle.seek_to(start_offset_ms).await {
                        warn!("Reposition at finish failed (ignored): {}", e);
                    }
                }
            }
            self.state.set_position_ms(start_offset_ms);
            self.stop_sample_loop();
            self.transition(PlaybackState::Paused).await;

            let chapter_id = self.watch.read().await.chapter_id;
            if let Some(chapter_id) = chapter_id {
                self.state.broadcast_event(EngineEvent::RangeCompleted {
                    chapter_id,
                    timestamp: Utc::now(),
                });
            }
        }

        Ok(())
    }

    /// Release the resource and reopen it positioned at `offset_ms`
    ///
    /// A full reload rather than a seek: no residual decode buffer survives
    /// into the next pass, which keeps adjacent-verse audio from bleeding
    /// into loop restarts.
    pub(super) async fn reopen_at(&self, offset_ms: u64) -> Result<()> {
        let (chapter_id, url) = {
            let session = self.session.read().await;
            let session = session
                .as_ref()
                .ok_or_else(|| Error::InvalidState("no audio resource open".to_string()))?;
            (session.chapter_id, session.url.clone())
        };

        if let Some(old) = self.session.write().await.take() {
            if let Err(e) = old.handle.unload().await {
                warn!("Unload before reopen failed (ignored): {}", e);
            }
        }

        let (handle, status_rx) = self
            .backend
            .open(
                &url,
                OpenOptions {
                    start_position_ms: Some(offset_ms),
                },
            )
            .await?;

        *self.session.write().await = Some(Session {
            handle,
            chapter_id,
            url,
        });
        self.spawn_status_handler(status_rx);
        Ok(())
    }
}
