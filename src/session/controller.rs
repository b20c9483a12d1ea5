//! Session controller: wires the machine, audio manager and countdown.
//!
//! All events (user commands, countdown expiry, track completion) go
//! through one queue and are handled one at a time by a single task, so
//! the session state has exactly one writer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::countdown::{Countdown, TICK};
use super::error::SessionError;
use super::event::{SessionCommand, SessionEvent};
use super::machine::SessionMachine;
use crate::audio::{AudioDevice, AudioManager, AudioOp};
use crate::haptics::Haptics;
use crate::playlist::{PlaylistCursor, TrackRef};
use crate::types::{SessionConfig, SessionState};

/// Options for [`Session::spawn`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Initial durations
    pub config: SessionConfig,
    /// Vibration length at phase changes
    pub vibration: Duration,
    /// Bell played at phase changes
    pub cue: Option<TrackRef>,
    /// Length of one countdown second
    pub tick: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            config: SessionConfig::default(),
            vibration: Duration::from_millis(1000),
            cue: None,
            tick: TICK,
        }
    }
}

// ============================================================================
// SessionHandle
// ============================================================================

/// Cloneable handle for sending events to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    state: watch::Receiver<SessionState>,
    config: watch::Receiver<SessionConfig>,
    audio: AudioManager,
}

impl SessionHandle {
    /// Queues a user command.
    pub fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.events
            .send(command.into())
            .map_err(|_| SessionError::Closed)
    }

    pub fn start(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Start)
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Pause)
    }

    pub fn reset(&self, auto_start: bool) -> Result<(), SessionError> {
        self.send(SessionCommand::Reset { auto_start })
    }

    pub fn skip(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Skip)
    }

    pub fn configure(
        &self,
        work_minutes: impl Into<String>,
        break_minutes: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.send(SessionCommand::Configure {
            work_minutes: work_minutes.into(),
            break_minutes: break_minutes.into(),
        })
    }

    /// Reports that the countdown for `epoch` reached zero.
    pub fn countdown_expired(&self, epoch: u64) -> Result<(), SessionError> {
        self.events
            .send(SessionEvent::CountdownExpired { epoch })
            .map_err(|_| SessionError::Closed)
    }

    /// Latest published state.
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Latest stored configuration.
    pub fn config(&self) -> SessionConfig {
        *self.config.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn audio(&self) -> &AudioManager {
        &self.audio
    }

    /// Waits until every event sent so far has been handled and the audio
    /// operations it queued have completed.
    pub async fn settle(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(SessionEvent::Sync(reply))
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?;
        self.audio.flush().await?;
        Ok(())
    }
}

// ============================================================================
// Session
// ============================================================================

/// A running session: controller task, audio manager and countdown driver.
#[derive(Debug)]
pub struct Session {
    handle: SessionHandle,
    countdown: Countdown,
    controller: JoinHandle<()>,
    audio_task: JoinHandle<()>,
}

impl Session {
    /// Spawns every task of a session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<D: AudioDevice>(
        device: D,
        cursor: PlaylistCursor,
        haptics: Arc<dyn Haptics>,
        options: SessionOptions,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let finished_tx = events_tx.clone();
        let (audio, audio_task) = AudioManager::spawn(device, cursor, move |finished| {
            let _ = finished_tx.send(SessionEvent::TrackFinished(finished));
        });
        if let Some(cue) = options.cue {
            audio.submit(AudioOp::LoadCue(cue));
        }

        let machine = SessionMachine::new(options.config, audio.clone(), haptics, options.vibration);
        let state = machine.subscribe();
        let config = machine.subscribe_config();

        let countdown = Countdown::spawn(state.clone(), events_tx.clone(), options.tick);
        let controller = tokio::spawn(run(machine, events_rx));

        Self {
            handle: SessionHandle {
                events: events_tx,
                state,
                config,
                audio,
            },
            countdown,
            controller,
            audio_task,
        }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Live countdown seconds.
    pub fn remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn subscribe_remaining(&self) -> watch::Receiver<u32> {
        self.countdown.subscribe()
    }

    /// Stops the session, releasing every audio handle.
    pub async fn shutdown(self) {
        self.countdown.abort();
        if self.handle.events.send(SessionEvent::Shutdown).is_err() {
            debug!("Session controller already stopped");
        }
        if let Err(e) = self.controller.await {
            warn!("Session controller task failed: {}", e);
        }
        if let Err(e) = self.audio_task.await {
            warn!("Audio manager task failed: {}", e);
        }
    }
}

async fn run(mut machine: SessionMachine, mut events: mpsc::UnboundedReceiver<SessionEvent>) {
    info!("Session started");

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Command(command) => machine.handle_command(command),
            SessionEvent::CountdownExpired { epoch } => {
                machine.on_countdown_expired(epoch);
            }
            SessionEvent::TrackFinished(finished) => {
                debug!("Finished: {}", finished.track.display_name());
                machine.on_track_finished(finished.generation);
            }
            SessionEvent::Sync(reply) => {
                let _ = reply.send(());
            }
            SessionEvent::Shutdown => break,
        }
    }

    if let Err(e) = machine.audio().shutdown().await {
        warn!("Audio shutdown failed: {}", e);
    }
    info!("Session stopped");
}
