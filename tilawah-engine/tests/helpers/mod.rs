//! Test harness for PlaybackEngine integration tests
//!
//! Provides mock collaborators:
//! - `MockSource` - scripted recitation content with fetch counters
//! - `MockBackend` - records every open; tests read and drive each opened
//!   resource (position, status updates, unload tracking)

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tilawah_common::config::EngineConfig;
use tilawah_common::types::{ChapterAudioFile, Reciter, VerseTiming, WordSegment};
use tilawah_engine::audio::{
    AudioBackend, AudioHandle, OpenOptions, StatusReceiver, StatusSender, StatusUpdate,
};
use tilawah_engine::error::{Error, Result};
use tilawah_engine::services::RecitationSource;
use tilawah_engine::PlaybackEngine;
use tokio::sync::mpsc;

/// Engine configuration with test-friendly timing
///
/// The restart guard is shrunk so loop tests can step past it with short
/// sleeps; the documented highlight delay and range buffers keep their
/// production defaults.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.tuning.position_poll_interval_ms = 10;
    config.tuning.restart_guard_ms = 40;
    config.tuning.progress_event_interval_ms = 50;
    config
}

pub fn reciter(id: u32, name: &str) -> Reciter {
    Reciter {
        id,
        name: name.to_string(),
        arabic_name: None,
    }
}

pub fn timing(verse_key: &str, from: u64, to: u64, segments: &[(u32, u64, u64)]) -> VerseTiming {
    VerseTiming {
        verse_key: verse_key.to_string(),
        timestamp_from: from,
        timestamp_to: to,
        segments: segments
            .iter()
            .map(|&(word_position, start_ms, end_ms)| WordSegment {
                word_position,
                start_ms,
                end_ms,
            })
            .collect(),
    }
}

pub fn chapter_audio(timings: Vec<VerseTiming>) -> ChapterAudioFile {
    ChapterAudioFile {
        audio_url: "https://audio.test/7/002.mp3".to_string(),
        duration_ms: Some(60_000),
        verse_timings: timings,
    }
}

/// Scripted recitation source
pub struct MockSource {
    pub reciters: Vec<Reciter>,
    pub audio: ChapterAudioFile,
    pub reciter_fetches: AtomicUsize,
    pub chapter_fetches: AtomicUsize,
    /// Chapters this source reports as having no recording
    pub missing_chapters: Mutex<Vec<u32>>,
    /// Fail every chapter fetch with a generic network error
    pub fail_chapter_fetch: AtomicBool,
    /// Artificial latency before each chapter fetch resolves
    pub fetch_delay: Duration,
}

impl MockSource {
    pub fn new(audio: ChapterAudioFile) -> Self {
        Self {
            reciters: vec![
                reciter(1, "AbdulBaset AbdulSamad"),
                reciter(7, "Mishary Alafasy"),
            ],
            audio,
            reciter_fetches: AtomicUsize::new(0),
            chapter_fetches: AtomicUsize::new(0),
            missing_chapters: Mutex::new(Vec::new()),
            fail_chapter_fetch: AtomicBool::new(false),
            fetch_delay: Duration::from_millis(20),
        }
    }

    /// Mark a chapter as having no recording for any reciter
    pub fn set_missing(&self, chapter_id: u32) {
        self.missing_chapters.lock().unwrap().push(chapter_id);
    }

    pub fn chapter_fetch_count(&self) -> usize {
        self.chapter_fetches.load(Ordering::SeqCst)
    }

    pub fn reciter_fetch_count(&self) -> usize {
        self.reciter_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecitationSource for MockSource {
    async fn get_reciters(&self) -> Result<Vec<Reciter>> {
        self.reciter_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.reciters.clone())
    }

    async fn get_chapter_audio(
        &self,
        reciter_id: u32,
        chapter_id: u32,
    ) -> Result<ChapterAudioFile> {
        self.chapter_fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.fetch_delay).await;

        if self.fail_chapter_fetch.load(Ordering::SeqCst) {
            return Err(Error::Fetch("connection reset".to_string()));
        }
        if self.missing_chapters.lock().unwrap().contains(&chapter_id) {
            return Err(Error::ChapterNotAvailable {
                reciter_id,
                chapter_id,
            });
        }
        Ok(self.audio.clone())
    }
}

/// One resource opened through the mock backend
pub struct OpenedResource {
    pub opts: OpenOptions,
    pub position_ms: AtomicU64,
    pub playing: AtomicBool,
    pub unloaded: AtomicBool,
    pub seeks: Mutex<Vec<u64>>,
    status_tx: Mutex<Option<StatusSender>>,
}

impl OpenedResource {
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::SeqCst)
    }

    pub fn set_position(&self, position_ms: u64) {
        self.position_ms.store(position_ms, Ordering::SeqCst);
    }

    /// Push a status update into the engine, as the platform callback would
    pub fn send_status(&self, position_ms: u64, did_just_finish: bool) {
        self.set_position(position_ms);
        if let Some(tx) = self.status_tx.lock().unwrap().as_ref() {
            let _ = tx.send(StatusUpdate {
                position_ms,
                is_loaded: true,
                did_just_finish,
            });
        }
    }
}

/// Audio backend recording every open
#[derive(Default)]
pub struct MockBackend {
    pub opens: Mutex<Vec<Arc<OpenedResource>>>,
    pub fail_next_open: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    pub fn resource(&self, index: usize) -> Arc<OpenedResource> {
        Arc::clone(&self.opens.lock().unwrap()[index])
    }

    pub fn last_resource(&self) -> Arc<OpenedResource> {
        let opens = self.opens.lock().unwrap();
        Arc::clone(opens.last().expect("no resource opened"))
    }
}

#[async_trait]
impl AudioBackend for MockBackend {
    async fn open(
        &self,
        _url: &str,
        opts: OpenOptions,
    ) -> Result<(Box<dyn AudioHandle>, StatusReceiver)> {
        if self.fail_next_open.swap(false, Ordering::SeqCst) {
            return Err(Error::Audio("device unavailable".to_string()));
        }

        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let resource = Arc::new(OpenedResource {
            opts,
            position_ms: AtomicU64::new(opts.start_position_ms.unwrap_or(0)),
            playing: AtomicBool::new(false),
            unloaded: AtomicBool::new(false),
            seeks: Mutex::new(Vec::new()),
            status_tx: Mutex::new(Some(status_tx)),
        });
        self.opens.lock().unwrap().push(Arc::clone(&resource));

        Ok((Box::new(MockHandle { resource }), status_rx))
    }
}

struct MockHandle {
    resource: Arc<OpenedResource>,
}

#[async_trait]
impl AudioHandle for MockHandle {
    async fn play(&self) -> Result<()> {
        if self.resource.is_unloaded() {
            return Err(Error::Audio("resource unloaded".to_string()));
        }
        self.resource.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.resource.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn seek_to(&self, position_ms: u64) -> Result<()> {
        if self.resource.is_unloaded() {
            return Err(Error::Audio("resource unloaded".to_string()));
        }
        self.resource.set_position(position_ms);
        self.resource.seeks.lock().unwrap().push(position_ms);
        Ok(())
    }

    async fn position_ms(&self) -> Result<u64> {
        if self.resource.is_unloaded() {
            return Err(Error::Audio("resource unloaded".to_string()));
        }
        Ok(self.resource.position_ms.load(Ordering::SeqCst))
    }

    fn duration_ms(&self) -> Option<u64> {
        None
    }

    async fn unload(&self) -> Result<()> {
        self.resource.unloaded.store(true, Ordering::SeqCst);
        // Closing the status channel ends the engine's handler task
        self.resource.status_tx.lock().unwrap().take();
        Ok(())
    }
}

/// Engine wired to mock collaborators
pub struct TestEngine {
    pub engine: PlaybackEngine,
    pub source: Arc<MockSource>,
    pub backend: Arc<MockBackend>,
}

/// Install a test subscriber so `RUST_LOG` shows engine tracing
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

impl TestEngine {
    pub fn new(audio: ChapterAudioFile) -> Self {
        Self::with_config(audio, test_config())
    }

    pub fn with_config(audio: ChapterAudioFile, config: EngineConfig) -> Self {
        init_tracing();
        let source = Arc::new(MockSource::new(audio));
        let backend = Arc::new(MockBackend::new());
        let engine = PlaybackEngine::new(
            config,
            Arc::clone(&source) as Arc<dyn RecitationSource>,
            Arc::clone(&backend) as Arc<dyn AudioBackend>,
        );
        Self {
            engine,
            source,
            backend,
        }
    }

    /// Select a reciter and load a chapter, ready to play
    pub async fn load(&self, chapter_id: u32) -> Result<()> {
        self.engine
            .select_reciter(reciter(7, "Mishary Alafasy"))
            .await;
        self.engine.load_chapter(chapter_id).await
    }

    /// Give spawned handler tasks time to drain
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
}
