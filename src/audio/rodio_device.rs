//! Audio device implementation using rodio.
//!
//! This module provides the `RodioAudioDevice` which uses the rodio v0.20
//! audio library. Each handle owns one `Sink`; decoding is started on the
//! blocking pool so slow disks never stall the audio manager's runtime.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::time::Duration;

use rodio::source::{SineWave, Source, Zero};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::error::AudioError;
use super::{AudioDevice, PlaybackStatus, StatusSink};
use crate::playlist::TrackRef;

/// URI of the generated two-tone bell, used when no cue file is available.
pub const BUILTIN_BELL_URI: &str = "builtin:bell";

/// How often a playing handle is checked for end-of-track.
const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

// ============================================================================
// RodioAudioDevice
// ============================================================================

/// An audio device backed by rodio.
///
/// The rodio `OutputStream` is not `Send`, so it lives on a dedicated thread
/// for as long as the device exists; handles only use the `Send` stream
/// handle.
pub struct RodioAudioDevice {
    /// Handle to the output stream, `None` when audio is disabled or unavailable.
    stream_handle: Option<OutputStreamHandle>,
    /// Dropping this releases the output stream thread.
    _shutdown: Option<std_mpsc::Sender<()>>,
    /// Why the device cannot play, if it cannot.
    unavailable_reason: Option<String>,
}

impl RodioAudioDevice {
    /// Opens the default audio output.
    ///
    /// # Arguments
    ///
    /// * `disabled` - If true, no output is opened and every load fails with
    ///   `DeviceNotAvailable`.
    ///
    /// # Errors
    ///
    /// Returns `AudioError::DeviceNotAvailable` if no audio output device
    /// is available.
    pub fn new(disabled: bool) -> Result<Self, AudioError> {
        if disabled {
            return Ok(Self::unavailable("サウンドは無効化されています"));
        }

        let (stream_handle, shutdown) = open_output_stream()?;
        debug!("Audio output stream initialized");

        Ok(Self {
            stream_handle: Some(stream_handle),
            _shutdown: Some(shutdown),
            unavailable_reason: None,
        })
    }

    /// Creates a device that refuses every load.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            stream_handle: None,
            _shutdown: None,
            unavailable_reason: Some(reason.into()),
        }
    }

    /// Returns true if the device can produce sound.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.stream_handle.is_some()
    }

    fn stream(&self) -> Result<&OutputStreamHandle, AudioError> {
        self.stream_handle.as_ref().ok_or_else(|| {
            AudioError::DeviceNotAvailable(
                self.unavailable_reason
                    .clone()
                    .unwrap_or_else(|| "no output stream".to_string()),
            )
        })
    }

    /// Builds a paused sink for `source` on the blocking pool.
    async fn build_sink(&self, source: TrackSource, uri: String) -> Result<Sink, AudioError> {
        let stream = self.stream()?.clone();
        tokio::task::spawn_blocking(move || source.build_sink(&stream, &uri))
            .await
            .map_err(|e| AudioError::DeviceNotAvailable(format!("decoder task failed: {}", e)))?
    }
}

impl std::fmt::Debug for RodioAudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioAudioDevice")
            .field("available", &self.is_available())
            .finish_non_exhaustive()
    }
}

/// Opens the default output on its own thread and returns its handle.
fn open_output_stream() -> Result<(OutputStreamHandle, std_mpsc::Sender<()>), AudioError> {
    let (ready_tx, ready_rx) = std_mpsc::channel();
    let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

    std::thread::Builder::new()
        .name("audio-output".to_string())
        .spawn(move || match OutputStream::try_default() {
            Ok((stream, handle)) => {
                let _ = ready_tx.send(Ok(handle));
                // Blocks until the device (and its sender) is dropped.
                let _ = shutdown_rx.recv();
                drop(stream);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e.to_string()));
            }
        })
        .map_err(|e| AudioError::DeviceNotAvailable(e.to_string()))?;

    let handle = ready_rx
        .recv()
        .map_err(|e| AudioError::DeviceNotAvailable(e.to_string()))?
        .map_err(AudioError::DeviceNotAvailable)?;

    Ok((handle, shutdown_tx))
}

// ============================================================================
// RodioTrack
// ============================================================================

/// A loaded rodio sound.
#[derive(Clone)]
pub struct RodioTrack {
    inner: Arc<TrackInner>,
}

struct TrackInner {
    uri: String,
    source: TrackSource,
    sink: Mutex<Sink>,
    closed: AtomicBool,
}

impl RodioTrack {
    fn new(uri: String, source: TrackSource, sink: Sink) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                uri,
                source,
                sink: Mutex::new(sink),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// URI the track was loaded from.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    fn with_sink<T>(
        &self,
        command: &'static str,
        f: impl FnOnce(&Sink) -> T,
    ) -> Result<T, AudioError> {
        let sink = self
            .inner
            .sink
            .lock()
            .map_err(|_| AudioError::command(command, "sink lock poisoned"))?;
        Ok(f(&sink))
    }
}

impl std::fmt::Debug for RodioTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioTrack")
            .field("uri", &self.inner.uri)
            .field("closed", &self.inner.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// What a handle decodes from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TrackSource {
    File(PathBuf),
    Bell,
}

impl TrackSource {
    fn resolve(track: &TrackRef) -> Result<Self, AudioError> {
        if track.uri == BUILTIN_BELL_URI {
            return Ok(Self::Bell);
        }
        track
            .local_path()
            .map(Self::File)
            .ok_or_else(|| AudioError::load(&track.uri, "only local files are supported"))
    }

    /// Creates a paused sink with this source appended. Blocking.
    fn build_sink(&self, stream: &OutputStreamHandle, uri: &str) -> Result<Sink, AudioError> {
        let sink =
            Sink::try_new(stream).map_err(|e| AudioError::DeviceNotAvailable(e.to_string()))?;
        sink.pause();

        match self {
            Self::File(path) => {
                let file = File::open(path).map_err(|e| AudioError::load(uri, e.to_string()))?;
                let decoder = Decoder::new(BufReader::new(file))
                    .map_err(|e| AudioError::load(uri, e.to_string()))?;
                sink.append(decoder);
            }
            Self::Bell => {
                // 880 Hz then 1046.5 Hz with a short gap.
                let first = SineWave::new(880.0)
                    .take_duration(Duration::from_millis(150))
                    .amplify(0.3);
                let gap = Zero::<f32>::new(1, 44100).take_duration(Duration::from_millis(50));
                let second = SineWave::new(1046.5)
                    .take_duration(Duration::from_millis(200))
                    .amplify(0.3);
                sink.append(first);
                sink.append(gap);
                sink.append(second);
            }
        }

        Ok(sink)
    }
}

// ============================================================================
// AudioDevice impl
// ============================================================================

impl AudioDevice for RodioAudioDevice {
    type Handle = RodioTrack;

    async fn create(&self, track: &TrackRef, should_play: bool) -> Result<RodioTrack, AudioError> {
        let source = TrackSource::resolve(track)?;
        let sink = self.build_sink(source.clone(), track.uri.clone()).await?;
        if should_play {
            sink.play();
        }

        debug!("Loaded sound: {}", track.uri);
        Ok(RodioTrack::new(track.uri.clone(), source, sink))
    }

    async fn play(&self, handle: &RodioTrack) -> Result<(), AudioError> {
        handle.with_sink("再生", |sink| sink.play())
    }

    async fn pause(&self, handle: &RodioTrack) -> Result<(), AudioError> {
        handle.with_sink("一時停止", |sink| sink.pause())
    }

    async fn stop(&self, handle: &RodioTrack) -> Result<(), AudioError> {
        // Rewinding is done by swapping in a freshly decoded sink, which works
        // for every format regardless of seek support.
        let fresh = self
            .build_sink(handle.inner.source.clone(), handle.inner.uri.clone())
            .await?;

        let mut sink = handle
            .inner
            .sink
            .lock()
            .map_err(|_| AudioError::command("停止", "sink lock poisoned"))?;
        let old = std::mem::replace(&mut *sink, fresh);
        old.stop();
        Ok(())
    }

    async fn unload(&self, handle: RodioTrack) -> Result<(), AudioError> {
        handle.inner.closed.store(true, Ordering::Release);
        handle.with_sink("解放", |sink| sink.stop())?;
        debug!("Unloaded sound: {}", handle.inner.uri);
        Ok(())
    }

    fn subscribe_status(&self, handle: &RodioTrack, sink: StatusSink) {
        let track = Arc::clone(&handle.inner);

        tokio::spawn(async move {
            let mut ticker = interval(STATUS_POLL_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut reported = false;

            loop {
                ticker.tick().await;

                if track.closed.load(Ordering::Acquire) || sink.is_closed() {
                    break;
                }

                let finished = match track.sink.lock() {
                    Ok(s) => !s.is_paused() && s.empty(),
                    Err(_) => {
                        sink.send(PlaybackStatus::Error("sink lock poisoned".to_string()));
                        break;
                    }
                };

                if finished && !reported {
                    reported = true;
                    if !sink.send(PlaybackStatus::Finished { looping: false }) {
                        break;
                    }
                } else if !finished {
                    reported = false;
                }
            }

            debug!("Status watcher stopped: {}", track.uri);
        });
    }
}
