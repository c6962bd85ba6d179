//! Sample loop for PlaybackEngine
//!
//! Fixed-interval position polling. The underlying primitive's own status
//! callbacks drive finish detection; highlighting needs sub-second
//! granularity independent of whatever cadence those callbacks run at, so
//! the engine polls on its own clock as well.

use super::core::PlaybackEngine;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tilawah_common::events::EngineEvent;
use tokio::time::MissedTickBehavior;
use tracing::debug;

impl PlaybackEngine {
    /// Start the sample loop if it is not already running
    pub(super) fn start_sample_loop(&self) {
        if self.polling.swap(true, Ordering::SeqCst) {
            return; // Already running
        }
        let engine = self.clone_handles();
        tokio::spawn(async move {
            engine.sample_loop().await;
        });
    }

    /// Stop the sample loop at its next tick
    pub(super) fn stop_sample_loop(&self) {
        self.polling.store(false, Ordering::SeqCst);
    }

    async fn sample_loop(&self) {
        let poll_ms = self.config.tuning.position_poll_interval_ms.max(10);
        let progress_every = Duration::from_millis(
            self.config.tuning.progress_event_interval_ms.max(poll_ms),
        );
        let mut interval = tokio::time::interval(Duration::from_millis(poll_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_progress = Instant::now();

        debug!("Sample loop started ({}ms interval)", poll_ms);

        loop {
            interval.tick().await;
            if !self.polling.load(Ordering::SeqCst) {
                break;
            }

            // The session is briefly absent during a loop restart; skip the
            // tick rather than exiting
            let position = {
                let session = self.session.read().await;
                match session.as_ref() {
                    Some(session) => session.handle.position_ms().await,
                    None => continue,
                }
            };

            match position {
                Ok(position_ms) => {
                    // The finish handler may have stopped the loop and
                    // repositioned the resource while this tick was reading
                    if !self.polling.load(Ordering::SeqCst) {
                        break;
                    }
                    self.state.set_position_ms(position_ms);
                    self.refresh_highlight(position_ms).await;

                    if last_progress.elapsed() >= progress_every {
                        last_progress = Instant::now();
                        self.emit_progress(position_ms).await;
                    }
                }
                Err(e) => debug!("Position read failed: {}", e),
            }
        }

        debug!("Sample loop stopped");
    }

    async fn emit_progress(&self, position_ms: u64) {
        let chapter_id = self.watch.read().await.chapter_id;
        if let Some(chapter_id) = chapter_id {
            self.state.broadcast_event(EngineEvent::PlaybackProgress {
                chapter_id,
                position_ms,
                duration_ms: self.state.duration_ms(),
                timestamp: Utc::now(),
            });
        }
    }
}
