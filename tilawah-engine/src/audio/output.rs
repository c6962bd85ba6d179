//! rodio-backed audio output
//!
//! Playback runs on a dedicated thread owning the output stream and sink,
//! accepting commands via crossbeam channels and replying through oneshots.
//! The engine side only ever talks to the channels, which keeps the non-Send
//! output stream off the async runtime. The same thread doubles as the
//! status poller, emitting a position update roughly every 50 ms.

use crate::audio::{
    AudioBackend, AudioCache, AudioHandle, OpenOptions, StatusReceiver, StatusSender,
    StatusUpdate,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use rodio::{Decoder, OutputStream, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Status emission cadence on the audio thread
const STATUS_POLL_MS: u64 = 50;

enum Command {
    Play(oneshot::Sender<Result<()>>),
    Pause(oneshot::Sender<Result<()>>),
    SeekTo(u64, oneshot::Sender<Result<()>>),
    Position(oneshot::Sender<u64>),
    Unload(oneshot::Sender<()>),
}

/// Audio backend producing rodio-driven handles
pub struct RodioBackend {
    cache: AudioCache,
}

impl RodioBackend {
    /// Create a backend caching downloads under `cache_dir`
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        Ok(Self {
            cache: AudioCache::new(cache_dir)?,
        })
    }
}

#[async_trait]
impl AudioBackend for RodioBackend {
    async fn open(
        &self,
        url: &str,
        opts: OpenOptions,
    ) -> Result<(Box<dyn AudioHandle>, StatusReceiver)> {
        let path = self.cache.fetch(url).await?;

        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let (init_tx, init_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("tilawah-audio".to_string())
            .spawn(move || audio_thread(path, opts, cmd_rx, status_tx, init_tx))
            .map_err(|e| Error::Audio(format!("failed to spawn audio thread: {}", e)))?;

        let duration_ms = init_rx
            .await
            .map_err(|_| Error::Audio("audio thread terminated during init".to_string()))??;

        Ok((
            Box::new(RodioHandle {
                cmd_tx,
                duration_ms,
            }),
            status_rx,
        ))
    }
}

struct RodioHandle {
    cmd_tx: Sender<Command>,
    duration_ms: Option<u64>,
}

impl RodioHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .map_err(|_| Error::Audio("audio thread terminated".to_string()))?;
        rx.await
            .map_err(|_| Error::Audio("audio thread dropped reply".to_string()))
    }
}

#[async_trait]
impl AudioHandle for RodioHandle {
    async fn play(&self) -> Result<()> {
        self.request(Command::Play).await?
    }

    async fn pause(&self) -> Result<()> {
        self.request(Command::Pause).await?
    }

    async fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.request(|tx| Command::SeekTo(position_ms, tx)).await?
    }

    async fn position_ms(&self) -> Result<u64> {
        self.request(Command::Position).await
    }

    fn duration_ms(&self) -> Option<u64> {
        self.duration_ms
    }

    async fn unload(&self) -> Result<()> {
        // Cleanup must never fail; a dead thread already released everything
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(Command::Unload(tx)).is_ok() {
            let _ = rx.await;
        }
        Ok(())
    }
}

/// Command/status loop owning the output stream and sink
fn audio_thread(
    path: PathBuf,
    opts: OpenOptions,
    cmd_rx: Receiver<Command>,
    status_tx: StatusSender,
    init_tx: oneshot::Sender<Result<Option<u64>>>,
) {
    let (stream, sink, duration_ms) = match open_sink(&path, opts) {
        Ok(parts) => parts,
        Err(e) => {
            let _ = init_tx.send(Err(e));
            return;
        }
    };
    // Keep the device alive for the thread lifetime
    let _stream = stream;

    if init_tx.send(Ok(duration_ms)).is_err() {
        return;
    }

    let mut finish_reported = false;
    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(STATUS_POLL_MS)) {
            Ok(Command::Play(reply)) => {
                sink.play();
                let _ = reply.send(Ok(()));
            }
            Ok(Command::Pause(reply)) => {
                sink.pause();
                let _ = reply.send(Ok(()));
            }
            Ok(Command::SeekTo(ms, reply)) => {
                let result = sink
                    .try_seek(Duration::from_millis(ms))
                    .map_err(|e| Error::Audio(format!("seek failed: {}", e)));
                let _ = reply.send(result);
            }
            Ok(Command::Position(reply)) => {
                let _ = reply.send(sink.get_pos().as_millis() as u64);
            }
            Ok(Command::Unload(reply)) => {
                sink.stop();
                let _ = reply.send(());
                break;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let finished = sink.empty();
        let update = StatusUpdate {
            position_ms: sink.get_pos().as_millis() as u64,
            is_loaded: true,
            did_just_finish: finished && !finish_reported,
        };
        if finished {
            finish_reported = true;
        }
        // Receiver may be gone while the handle still serves commands
        let _ = status_tx.send(update);
    }

    debug!("audio thread for {} exiting", path.display());
}

/// Open the device, decode the file, and position the paused sink
fn open_sink(path: &Path, opts: OpenOptions) -> Result<(OutputStream, Sink, Option<u64>)> {
    let (stream, handle) = OutputStream::try_default()
        .map_err(|e| Error::Audio(format!("no audio output device: {}", e)))?;
    let sink = Sink::try_new(&handle).map_err(|e| Error::Audio(e.to_string()))?;

    let file = File::open(path)?;
    let source = Decoder::new(BufReader::new(file))
        .map_err(|e| Error::Audio(format!("decode failed: {}", e)))?;
    let duration_ms = source.total_duration().map(|d| d.as_millis() as u64);

    // Open without auto-starting; the engine issues an explicit play
    sink.pause();
    sink.append(source);

    if let Some(ms) = opts.start_position_ms {
        sink.try_seek(Duration::from_millis(ms))
            .map_err(|e| Error::Audio(format!("initial seek failed: {}", e)))?;
    }

    Ok((stream, sink, duration_ms))
}
