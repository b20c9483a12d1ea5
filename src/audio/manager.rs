//! Serialized audio resource manager.
//!
//! The manager is a single task owning the MainTrack slot, the CueTrack slot
//! and the playlist cursor. Operations arrive on an mpsc queue and are
//! executed one at a time; each fully resolves (including any device await)
//! before the next one starts.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::AudioError;
use super::handle::{AudioSnapshot, FinishedTrack, HandleState};
use super::{AudioDevice, PlaybackStatus, StatusSink, StatusUpdate};
use crate::playlist::{PlaylistCursor, TrackRef};

// ============================================================================
// AudioOp
// ============================================================================

/// An operation on the audio resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOp {
    /// Replace the MainTrack with `track`, optionally starting playback.
    LoadMain {
        /// Track to load
        track: TrackRef,
        /// Start playing once loaded
        autoplay: bool,
    },
    /// Start or resume the MainTrack, loading the current track if needed.
    Play,
    /// Pause the MainTrack if it is playing.
    Pause,
    /// Stop and rewind the MainTrack, keeping it loaded.
    Stop,
    /// Stop then play.
    Replay,
    /// Release the MainTrack.
    Unload,
    /// Release the MainTrack and move the cursor to the next track.
    Advance,
    /// Release the MainTrack, move to the next track and play it.
    AdvanceAndPlay,
    /// [`AdvanceAndPlay`](Self::AdvanceAndPlay), but only while the
    /// MainTrack is still the load `generation` that ended.
    AdvanceAfterFinish {
        /// Generation reported by the finish notice
        generation: u64,
    },
    /// Load the bell.
    LoadCue(TrackRef),
    /// Play the bell.
    PlayCue,
    /// Rewind and play the bell.
    ReplayCue,
}

impl AudioOp {
    /// Returns the operation name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoadMain { .. } => "load_main",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Replay => "replay",
            Self::Unload => "unload",
            Self::Advance => "advance",
            Self::AdvanceAndPlay => "advance_and_play",
            Self::AdvanceAfterFinish { .. } => "advance_after_finish",
            Self::LoadCue(_) => "load_cue",
            Self::PlayCue => "play_cue",
            Self::ReplayCue => "replay_cue",
        }
    }
}

type Reply<T> = oneshot::Sender<T>;

enum Request {
    Op {
        op: AudioOp,
        reply: Option<Reply<Result<(), AudioError>>>,
    },
    Snapshot(Reply<AudioSnapshot>),
    Flush(Reply<()>),
    Shutdown(Reply<()>),
}

// ============================================================================
// AudioManager
// ============================================================================

/// Handle to the audio manager task.
///
/// Cloning is cheap; every clone feeds the same queue.
#[derive(Debug, Clone)]
pub struct AudioManager {
    tx: mpsc::UnboundedSender<Request>,
    main_state: watch::Receiver<HandleState>,
}

impl AudioManager {
    /// Spawns the manager task.
    ///
    /// `on_track_finished` is called from the manager task each time the
    /// playing MainTrack reaches its end naturally.
    pub fn spawn<D, F>(device: D, cursor: PlaylistCursor, on_track_finished: F) -> (Self, JoinHandle<()>)
    where
        D: AudioDevice,
        F: Fn(FinishedTrack) + Send + Sync + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = mpsc::unbounded_channel();
        let (main_tx, main_state) = watch::channel(HandleState::Unloaded);

        let worker = Worker {
            device,
            cursor,
            main: None,
            cue: None,
            generation: 0,
            status_tx,
            main_tx,
            on_track_finished: Box::new(on_track_finished),
        };
        let task = tokio::spawn(worker.run(rx, status_rx));

        (Self { tx, main_state }, task)
    }

    /// Queues `op` without waiting for it.
    ///
    /// Failures are logged by the manager.
    pub fn submit(&self, op: AudioOp) {
        let name = op.as_str();
        if self.tx.send(Request::Op { op, reply: None }).is_err() {
            warn!("Audio manager closed, dropping {}", name);
        }
    }

    /// Queues `op` and waits until it has been executed.
    pub async fn request(&self, op: AudioOp) -> Result<(), AudioError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Op {
                op,
                reply: Some(reply),
            })
            .map_err(|_| AudioError::ManagerClosed)?;
        rx.await.map_err(|_| AudioError::ManagerClosed)?
    }

    /// Loads `track` as the MainTrack, replacing any loaded one.
    pub async fn load_main(&self, track: TrackRef, autoplay: bool) -> Result<(), AudioError> {
        self.request(AudioOp::LoadMain { track, autoplay }).await
    }

    /// Starts or resumes the MainTrack.
    ///
    /// Loads the cursor's current track first when nothing is loaded.
    pub async fn play(&self) -> Result<(), AudioError> {
        self.request(AudioOp::Play).await
    }

    /// Pauses the MainTrack. No-op unless it is playing.
    pub async fn pause(&self) -> Result<(), AudioError> {
        self.request(AudioOp::Pause).await
    }

    /// Stops and rewinds the MainTrack, keeping it loaded.
    pub async fn stop(&self) -> Result<(), AudioError> {
        self.request(AudioOp::Stop).await
    }

    /// Restarts the MainTrack from the beginning.
    pub async fn replay(&self) -> Result<(), AudioError> {
        self.request(AudioOp::Replay).await
    }

    /// Releases the MainTrack. No-op when nothing is loaded.
    pub async fn unload(&self) -> Result<(), AudioError> {
        self.request(AudioOp::Unload).await
    }

    /// Releases the MainTrack and selects the next track without loading it.
    pub async fn advance(&self) -> Result<(), AudioError> {
        self.request(AudioOp::Advance).await
    }

    /// Releases the MainTrack, then loads and plays the next track.
    pub async fn advance_and_play(&self) -> Result<(), AudioError> {
        self.request(AudioOp::AdvanceAndPlay).await
    }

    /// Moves on from a finished track, unless the MainTrack was replaced or
    /// rewound after `generation` ended.
    pub async fn advance_after_finish(&self, generation: u64) -> Result<(), AudioError> {
        self.request(AudioOp::AdvanceAfterFinish { generation }).await
    }

    /// Loads the bell.
    pub async fn load_cue(&self, track: TrackRef) -> Result<(), AudioError> {
        self.request(AudioOp::LoadCue(track)).await
    }

    /// Plays the bell, rewinding it first if it already played.
    pub async fn play_cue(&self) -> Result<(), AudioError> {
        self.request(AudioOp::PlayCue).await
    }

    /// Stops and replays the bell.
    pub async fn replay_cue(&self) -> Result<(), AudioError> {
        self.request(AudioOp::ReplayCue).await
    }

    /// Latest MainTrack state, including loads still in flight.
    pub fn main_state(&self) -> HandleState {
        self.main_state.borrow().clone()
    }

    /// Subscribes to MainTrack state changes.
    pub fn subscribe_main(&self) -> watch::Receiver<HandleState> {
        self.main_state.clone()
    }

    /// Returns the handle states after every queued operation has run.
    pub async fn snapshot(&self) -> Result<AudioSnapshot, AudioError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Snapshot(reply))
            .map_err(|_| AudioError::ManagerClosed)?;
        rx.await.map_err(|_| AudioError::ManagerClosed)
    }

    /// Waits until every previously queued operation has run.
    pub async fn flush(&self) -> Result<(), AudioError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Flush(reply))
            .map_err(|_| AudioError::ManagerClosed)?;
        rx.await.map_err(|_| AudioError::ManagerClosed)
    }

    /// Unloads both handles and stops the manager task.
    pub async fn shutdown(&self) -> Result<(), AudioError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Shutdown(reply))
            .map_err(|_| AudioError::ManagerClosed)?;
        rx.await.map_err(|_| AudioError::ManagerClosed)
    }
}

// ============================================================================
// Worker
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    /// Loaded at the start of the track.
    Stopped,
    Playing,
    Paused,
    /// Played to the end; needs a rewind before it can play again.
    Ended,
}

struct MainSlot<H> {
    handle: H,
    track: TrackRef,
    playback: Playback,
    generation: u64,
}

struct CueSlot<H> {
    handle: H,
    track: TrackRef,
    /// False once the bell has been played and not rewound.
    at_start: bool,
}

struct Worker<D: AudioDevice> {
    device: D,
    cursor: PlaylistCursor,
    main: Option<MainSlot<D::Handle>>,
    cue: Option<CueSlot<D::Handle>>,
    generation: u64,
    status_tx: mpsc::UnboundedSender<StatusUpdate>,
    main_tx: watch::Sender<HandleState>,
    on_track_finished: Box<dyn Fn(FinishedTrack) + Send + Sync>,
}

impl<D: AudioDevice> Worker<D> {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut status_rx: mpsc::UnboundedReceiver<StatusUpdate>,
    ) {
        debug!("Audio manager started");

        loop {
            tokio::select! {
                biased;

                Some(update) = status_rx.recv() => {
                    self.handle_status(update);
                    self.publish_main();
                }

                request = requests.recv() => match request {
                    Some(Request::Op { op, reply }) => {
                        let name = op.as_str();
                        let result = self.execute(op).await;
                        self.publish_main();
                        if let Err(e) = &result {
                            warn!("Audio {} failed: {}", name, e);
                        }
                        if let Some(reply) = reply {
                            let _ = reply.send(result);
                        }
                    }
                    Some(Request::Snapshot(reply)) => {
                        let _ = reply.send(self.snapshot());
                    }
                    Some(Request::Flush(reply)) => {
                        let _ = reply.send(());
                    }
                    Some(Request::Shutdown(reply)) => {
                        self.release_all().await;
                        self.publish_main();
                        let _ = reply.send(());
                        break;
                    }
                    None => {
                        self.release_all().await;
                        break;
                    }
                },
            }
        }

        debug!("Audio manager stopped");
    }

    async fn execute(&mut self, op: AudioOp) -> Result<(), AudioError> {
        match op {
            AudioOp::LoadMain { track, autoplay } => self.load_main(track, autoplay).await,
            AudioOp::Play => self.play().await,
            AudioOp::Pause => self.pause().await,
            AudioOp::Stop => self.stop().await,
            AudioOp::Replay => {
                self.stop().await?;
                self.play().await
            }
            AudioOp::Unload => self.unload().await,
            AudioOp::Advance => {
                let result = self.unload().await;
                let next = self.cursor.advance();
                debug!("Playlist advanced to {}", next.display_name());
                result
            }
            AudioOp::AdvanceAndPlay => self.advance_and_play().await,
            AudioOp::AdvanceAfterFinish { generation } => {
                let ended = matches!(
                    &self.main,
                    Some(slot) if slot.generation == generation && slot.playback == Playback::Ended
                );
                if ended {
                    self.advance_and_play().await
                } else {
                    debug!("Ignoring stale finish (generation {})", generation);
                    Ok(())
                }
            }
            AudioOp::LoadCue(track) => self.load_cue(track).await,
            AudioOp::PlayCue => self.play_cue(false).await,
            AudioOp::ReplayCue => self.play_cue(true).await,
        }
    }

    // ------------------------------------------------------------------------
    // MainTrack
    // ------------------------------------------------------------------------

    async fn load_main(&mut self, track: TrackRef, autoplay: bool) -> Result<(), AudioError> {
        if self.main.is_some() {
            if let Err(e) = self.unload().await {
                warn!("Unload before load failed: {}", e);
            }
        }

        self.main_tx.send_replace(HandleState::Loading);
        let handle = self.device.create(&track, autoplay).await?;

        self.generation += 1;
        self.device.subscribe_status(
            &handle,
            StatusSink::new(self.generation, self.status_tx.clone()),
        );

        debug!("Loaded main track: {}", track.display_name());
        self.main = Some(MainSlot {
            handle,
            track,
            playback: if autoplay {
                Playback::Playing
            } else {
                Playback::Stopped
            },
            generation: self.generation,
        });
        Ok(())
    }

    async fn advance_and_play(&mut self) -> Result<(), AudioError> {
        if let Err(e) = self.unload().await {
            warn!("Unload before advance failed: {}", e);
        }
        let next = self.cursor.advance().clone();
        self.load_main(next, true).await
    }

    async fn play(&mut self) -> Result<(), AudioError> {
        let Some(slot) = self.main.as_mut() else {
            let track = self.cursor.current().clone();
            return self.load_main(track, true).await;
        };

        match slot.playback {
            Playback::Playing => Ok(()),
            Playback::Stopped | Playback::Paused => {
                self.device.play(&slot.handle).await?;
                slot.playback = Playback::Playing;
                Ok(())
            }
            Playback::Ended => {
                self.device.stop(&slot.handle).await?;
                slot.playback = Playback::Stopped;
                self.device.play(&slot.handle).await?;
                slot.playback = Playback::Playing;
                Ok(())
            }
        }
    }

    async fn pause(&mut self) -> Result<(), AudioError> {
        match self.main.as_mut() {
            Some(slot) if slot.playback == Playback::Playing => {
                self.device.pause(&slot.handle).await?;
                slot.playback = Playback::Paused;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn stop(&mut self) -> Result<(), AudioError> {
        match self.main.as_mut() {
            Some(slot) if slot.playback != Playback::Stopped => {
                self.device.stop(&slot.handle).await?;
                slot.playback = Playback::Stopped;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn unload(&mut self) -> Result<(), AudioError> {
        let Some(slot) = self.main.take() else {
            return Ok(());
        };

        debug!("Unloading main track: {}", slot.track.display_name());
        // The slot is released even if the device reports a failure.
        self.device.unload(slot.handle).await
    }

    // ------------------------------------------------------------------------
    // CueTrack
    // ------------------------------------------------------------------------

    async fn load_cue(&mut self, track: TrackRef) -> Result<(), AudioError> {
        if let Some(old) = self.cue.take() {
            if let Err(e) = self.device.unload(old.handle).await {
                warn!("Unload of previous bell failed: {}", e);
            }
        }

        let handle = self.device.create(&track, false).await?;
        debug!("Loaded bell: {}", track.display_name());
        self.cue = Some(CueSlot {
            handle,
            track,
            at_start: true,
        });
        Ok(())
    }

    async fn play_cue(&mut self, rewind: bool) -> Result<(), AudioError> {
        let Some(slot) = self.cue.as_mut() else {
            return Err(AudioError::NotLoaded("ベル"));
        };

        if rewind || !slot.at_start {
            self.device.stop(&slot.handle).await?;
            slot.at_start = true;
        }
        self.device.play(&slot.handle).await?;
        slot.at_start = false;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Status and lifecycle
    // ------------------------------------------------------------------------

    fn handle_status(&mut self, update: StatusUpdate) {
        let Some(slot) = self.main.as_mut() else {
            debug!("Dropping status for released handle");
            return;
        };
        if slot.generation != update.generation {
            debug!(
                "Dropping stale status (generation {} != {})",
                update.generation, slot.generation
            );
            return;
        }

        match update.status {
            PlaybackStatus::Finished { looping: true } => {
                debug!("Looping track wrapped: {}", slot.track.display_name());
            }
            PlaybackStatus::Finished { looping: false } => {
                if slot.playback != Playback::Playing {
                    return;
                }
                slot.playback = Playback::Ended;
                debug!("Track finished: {}", slot.track.display_name());
                (self.on_track_finished)(FinishedTrack {
                    track: slot.track.clone(),
                    generation: slot.generation,
                });
            }
            PlaybackStatus::Error(message) => {
                warn!("Playback error on {}: {}", slot.track.display_name(), message);
            }
        }
    }

    fn main_state(&self) -> HandleState {
        match &self.main {
            None => HandleState::Unloaded,
            Some(slot) => match slot.playback {
                Playback::Playing => HandleState::Playing(slot.track.clone()),
                Playback::Paused => HandleState::Paused(slot.track.clone()),
                Playback::Stopped | Playback::Ended => HandleState::Loaded(slot.track.clone()),
            },
        }
    }

    fn publish_main(&self) {
        let state = self.main_state();
        self.main_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn snapshot(&self) -> AudioSnapshot {
        let main = self.main_state();
        let cue = match &self.cue {
            None => HandleState::Unloaded,
            Some(slot) => HandleState::Loaded(slot.track.clone()),
        };

        AudioSnapshot {
            main,
            cue,
            cursor_index: self.cursor.index(),
            current_track: self.cursor.current().clone(),
        }
    }

    async fn release_all(&mut self) {
        if let Err(e) = self.unload().await {
            warn!("Unload on shutdown failed: {}", e);
        }
        if let Some(cue) = self.cue.take() {
            if let Err(e) = self.device.unload(cue.handle).await {
                warn!("Unload of bell on shutdown failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{DeviceCommand, MockAudioDevice};
    use std::time::Duration;

    fn cursor() -> PlaylistCursor {
        PlaylistCursor::new(vec![
            TrackRef::new("a.mp3"),
            TrackRef::new("b.mp3"),
            TrackRef::new("c.mp3"),
        ])
        .unwrap()
    }

    fn spawn_with(
        device: &MockAudioDevice,
    ) -> (AudioManager, mpsc::UnboundedReceiver<FinishedTrack>) {
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();
        let (manager, _task) = AudioManager::spawn(device.clone(), cursor(), move |finished| {
            let _ = finished_tx.send(finished);
        });
        (manager, finished_rx)
    }

    mod main_track {
        use super::*;

        #[tokio::test]
        async fn test_play_loads_current_track_lazily() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();

            assert_eq!(
                device.commands(),
                vec![DeviceCommand::Create {
                    uri: "a.mp3".into(),
                    should_play: true
                }]
            );
            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.main, HandleState::Playing(TrackRef::new("a.mp3")));
        }

        #[tokio::test]
        async fn test_play_when_playing_is_noop() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            manager.play().await.unwrap();

            assert_eq!(device.create_count("a.mp3"), 1);
            assert_eq!(device.play_count("a.mp3"), 0);
        }

        #[tokio::test]
        async fn test_pause_twice_issues_one_command() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            manager.pause().await.unwrap();
            manager.pause().await.unwrap();

            assert_eq!(device.pause_count("a.mp3"), 1);
            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.main, HandleState::Paused(TrackRef::new("a.mp3")));
        }

        #[tokio::test]
        async fn test_commands_on_unloaded_are_noops() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.pause().await.unwrap();
            manager.stop().await.unwrap();
            manager.unload().await.unwrap();

            assert!(device.commands().is_empty());
        }

        #[tokio::test]
        async fn test_stop_rewinds_and_keeps_loaded() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            manager.stop().await.unwrap();
            manager.stop().await.unwrap();

            assert_eq!(device.stop_count("a.mp3"), 1);
            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.main, HandleState::Loaded(TrackRef::new("a.mp3")));

            manager.play().await.unwrap();
            assert_eq!(device.play_count("a.mp3"), 1);
        }

        #[tokio::test]
        async fn test_replay_stops_then_plays() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            device.clear_commands();
            manager.replay().await.unwrap();

            assert_eq!(
                device.commands(),
                vec![
                    DeviceCommand::Stop { uri: "a.mp3".into() },
                    DeviceCommand::Play { uri: "a.mp3".into() },
                ]
            );
        }

        #[tokio::test]
        async fn test_unload_releases_handle() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            manager.unload().await.unwrap();

            assert_eq!(device.unload_count("a.mp3"), 1);
            assert!(device.live_uris().is_empty());
            assert_eq!(
                manager.snapshot().await.unwrap().main,
                HandleState::Unloaded
            );
        }

        #[tokio::test]
        async fn test_load_main_replaces_loaded_track() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            manager
                .load_main(TrackRef::new("x.mp3"), false)
                .await
                .unwrap();

            assert_eq!(device.unload_count("a.mp3"), 1);
            assert_eq!(device.live_uris(), vec!["x.mp3".to_string()]);
            assert_eq!(
                manager.snapshot().await.unwrap().main,
                HandleState::Loaded(TrackRef::new("x.mp3"))
            );
        }
    }

    mod advance {
        use super::*;

        #[tokio::test]
        async fn test_advance_and_play() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            manager.advance_and_play().await.unwrap();

            assert_eq!(device.unload_count("a.mp3"), 1);
            assert!(device.commands().contains(&DeviceCommand::Create {
                uri: "b.mp3".into(),
                should_play: true
            }));
            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.cursor_index, 1);
            assert_eq!(snapshot.main, HandleState::Playing(TrackRef::new("b.mp3")));
        }

        #[tokio::test]
        async fn test_advance_does_not_load() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            manager.advance().await.unwrap();

            assert_eq!(device.create_count("b.mp3"), 0);
            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.main, HandleState::Unloaded);
            assert_eq!(snapshot.current_track, TrackRef::new("b.mp3"));
        }

        #[tokio::test]
        async fn test_cursor_wraps() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            for _ in 0..3 {
                manager.advance_and_play().await.unwrap();
            }

            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.cursor_index, 0);
            assert_eq!(snapshot.main, HandleState::Playing(TrackRef::new("a.mp3")));
            assert!(device.violations().is_empty());
        }
    }

    mod completion {
        use super::*;

        #[tokio::test]
        async fn test_natural_finish_notifies_once() {
            let device = MockAudioDevice::new();
            let (manager, mut finished) = spawn_with(&device);

            manager.play().await.unwrap();
            assert!(device.finish("a.mp3"));
            assert!(device.finish("a.mp3"));
            manager.flush().await.unwrap();

            let notice = finished.try_recv().unwrap();
            assert_eq!(notice.track, TrackRef::new("a.mp3"));
            assert_eq!(notice.generation, 1);
            assert!(finished.try_recv().is_err());
        }

        #[tokio::test]
        async fn test_advance_after_finish_plays_next() {
            let device = MockAudioDevice::new();
            let (manager, mut finished) = spawn_with(&device);

            manager.play().await.unwrap();
            device.finish("a.mp3");
            manager.flush().await.unwrap();
            let notice = finished.try_recv().unwrap();

            manager.advance_after_finish(notice.generation).await.unwrap();

            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.cursor_index, 1);
            assert_eq!(snapshot.main, HandleState::Playing(TrackRef::new("b.mp3")));
        }

        #[tokio::test]
        async fn test_advance_after_finish_ignored_once_replaced() {
            let device = MockAudioDevice::new();
            let (manager, mut finished) = spawn_with(&device);

            manager.play().await.unwrap();
            device.finish("a.mp3");
            manager.flush().await.unwrap();
            let notice = finished.try_recv().unwrap();

            // A skip queued ahead of the finish notice already moved on.
            manager.advance_and_play().await.unwrap();
            manager.advance_after_finish(notice.generation).await.unwrap();

            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.cursor_index, 1);
            assert_eq!(snapshot.main, HandleState::Playing(TrackRef::new("b.mp3")));
            assert_eq!(device.create_count("c.mp3"), 0);
        }

        #[tokio::test]
        async fn test_advance_after_finish_ignored_once_replayed() {
            let device = MockAudioDevice::new();
            let (manager, mut finished) = spawn_with(&device);

            manager.play().await.unwrap();
            device.finish("a.mp3");
            manager.flush().await.unwrap();
            let notice = finished.try_recv().unwrap();

            manager.replay().await.unwrap();
            manager.advance_after_finish(notice.generation).await.unwrap();

            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.cursor_index, 0);
            assert_eq!(snapshot.main, HandleState::Playing(TrackRef::new("a.mp3")));
            assert_eq!(device.create_count("b.mp3"), 0);
        }

        #[tokio::test]
        async fn test_stopped_track_does_not_notify() {
            let device = MockAudioDevice::new();
            let (manager, mut finished) = spawn_with(&device);

            manager.play().await.unwrap();
            manager.stop().await.unwrap();
            device.finish("a.mp3");
            manager.flush().await.unwrap();

            assert!(finished.try_recv().is_err());
        }

        #[tokio::test]
        async fn test_looping_finish_does_not_notify() {
            let device = MockAudioDevice::new();
            let (manager, mut finished) = spawn_with(&device);

            manager.play().await.unwrap();
            device.finish_looping("a.mp3");
            manager.flush().await.unwrap();

            assert!(finished.try_recv().is_err());
        }

        #[tokio::test]
        async fn test_ended_track_rewinds_before_play() {
            let device = MockAudioDevice::new();
            let (manager, _finished) = spawn_with(&device);

            manager.play().await.unwrap();
            device.finish("a.mp3");
            manager.flush().await.unwrap();
            device.clear_commands();

            manager.play().await.unwrap();
            assert_eq!(
                device.commands(),
                vec![
                    DeviceCommand::Stop { uri: "a.mp3".into() },
                    DeviceCommand::Play { uri: "a.mp3".into() },
                ]
            );
        }
    }

    mod failures {
        use super::*;

        #[tokio::test]
        async fn test_load_failure_leaves_unloaded_and_retries() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            device.set_should_fail_create(true);
            let err = manager.play().await.unwrap_err();
            assert!(err.is_load_failure());
            assert_eq!(
                manager.snapshot().await.unwrap().main,
                HandleState::Unloaded
            );

            device.set_should_fail_create(false);
            manager.play().await.unwrap();
            assert_eq!(device.create_attempts(), 2);
            assert!(manager.snapshot().await.unwrap().main.is_playing());
        }

        #[tokio::test]
        async fn test_command_failure_keeps_state() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            device.set_should_fail_commands(true);
            assert!(manager.pause().await.is_err());

            assert!(manager.snapshot().await.unwrap().main.is_playing());
        }

        #[tokio::test]
        async fn test_unload_failure_still_releases() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.play().await.unwrap();
            device.set_should_fail_commands(true);
            assert!(manager.unload().await.is_err());

            assert_eq!(
                manager.snapshot().await.unwrap().main,
                HandleState::Unloaded
            );
        }
    }

    mod serialization {
        use super::*;

        #[tokio::test]
        async fn test_queued_ops_wait_for_slow_load() {
            let device = MockAudioDevice::new();
            device.set_create_delay(Duration::from_millis(50));
            let (manager, _) = spawn_with(&device);

            manager.submit(AudioOp::Play);
            manager.submit(AudioOp::Pause);
            manager.submit(AudioOp::Play);
            manager.flush().await.unwrap();

            assert_eq!(
                device.commands(),
                vec![
                    DeviceCommand::Create {
                        uri: "a.mp3".into(),
                        should_play: true
                    },
                    DeviceCommand::Pause { uri: "a.mp3".into() },
                    DeviceCommand::Play { uri: "a.mp3".into() },
                ]
            );
            assert!(device.violations().is_empty());
        }

        #[tokio::test]
        async fn test_main_state_reports_load_in_flight() {
            let device = MockAudioDevice::new();
            device.set_create_delay(Duration::from_millis(50));
            let (manager, _) = spawn_with(&device);
            let mut main = manager.subscribe_main();

            manager.submit(AudioOp::Play);
            tokio::time::timeout(
                Duration::from_secs(2),
                main.wait_for(|state| *state == HandleState::Loading),
            )
            .await
            .expect("load never started")
            .unwrap();

            manager.flush().await.unwrap();
            assert_eq!(manager.main_state(), HandleState::Playing(TrackRef::new("a.mp3")));
        }

        #[tokio::test]
        async fn test_failed_load_publishes_unloaded() {
            let device = MockAudioDevice::new();
            device.set_should_fail_create(true);
            let (manager, _) = spawn_with(&device);

            assert!(manager.play().await.is_err());
            assert_eq!(manager.main_state(), HandleState::Unloaded);
        }

        #[tokio::test]
        async fn test_shutdown_releases_everything() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.load_cue(TrackRef::new("bell.mp3")).await.unwrap();
            manager.play().await.unwrap();
            manager.shutdown().await.unwrap();

            assert!(device.live_uris().is_empty());
            assert_eq!(manager.play().await, Err(AudioError::ManagerClosed));
        }
    }

    mod cue {
        use super::*;

        #[tokio::test]
        async fn test_play_cue_without_bell_is_not_fatal() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            assert_eq!(
                manager.play_cue().await,
                Err(AudioError::NotLoaded("ベル"))
            );
            manager.play().await.unwrap();
        }

        #[tokio::test]
        async fn test_play_and_replay_cue() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.load_cue(TrackRef::new("bell.mp3")).await.unwrap();
            manager.play_cue().await.unwrap();
            assert_eq!(device.play_count("bell.mp3"), 1);
            assert_eq!(device.stop_count("bell.mp3"), 0);

            manager.replay_cue().await.unwrap();
            assert_eq!(device.stop_count("bell.mp3"), 1);
            assert_eq!(device.play_count("bell.mp3"), 2);
        }

        #[tokio::test]
        async fn test_cue_is_independent_of_main() {
            let device = MockAudioDevice::new();
            let (manager, _) = spawn_with(&device);

            manager.load_cue(TrackRef::new("bell.mp3")).await.unwrap();
            manager.play().await.unwrap();
            manager.play_cue().await.unwrap();
            manager.unload().await.unwrap();

            let snapshot = manager.snapshot().await.unwrap();
            assert_eq!(snapshot.main, HandleState::Unloaded);
            assert_eq!(snapshot.cue, HandleState::Loaded(TrackRef::new("bell.mp3")));
        }
    }
}
