//! Session state machine.
//!
//! Owns the authoritative [`SessionState`] and decides which audio intents
//! and cues accompany each transition:
//!
//! | Event            | Condition        | Effect                                        |
//! |------------------|------------------|-----------------------------------------------|
//! | start            | not running      | running; music plays (work only)              |
//! | pause            | running          | stopped; music pauses                         |
//! | reset            | always           | work, new epoch; music replays or rewinds     |
//! | countdown (work) | current epoch    | bell, vibrate, running break, music unloaded  |
//! | countdown (break)| current epoch    | bell, vibrate, idle work, next track selected |
//! | track finished   | work and running | next track plays                              |
//!
//! Audio intents are queued on the [`AudioManager`] and never awaited here,
//! so a slow or failing device cannot hold up a transition.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use super::event::SessionCommand;
use crate::audio::{AudioManager, AudioOp};
use crate::haptics::Haptics;
use crate::settings::SettingsStore;
use crate::types::{SessionConfig, SessionPhase, SessionState};

/// The session state machine.
pub struct SessionMachine {
    settings: SettingsStore,
    state: SessionState,
    audio: AudioManager,
    haptics: Arc<dyn Haptics>,
    vibration: Duration,
    state_tx: watch::Sender<SessionState>,
    config_tx: watch::Sender<SessionConfig>,
}

impl SessionMachine {
    /// Creates an idle machine at the start of a work interval.
    pub fn new(
        config: SessionConfig,
        audio: AudioManager,
        haptics: Arc<dyn Haptics>,
        vibration: Duration,
    ) -> Self {
        let state = SessionState::new(&config);
        let (state_tx, _) = watch::channel(state);
        let (config_tx, _) = watch::channel(config);

        Self {
            settings: SettingsStore::new(config),
            state,
            audio,
            haptics,
            vibration,
            state_tx,
            config_tx,
        }
    }

    /// Subscribes to state changes (the countdown view's input).
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Subscribes to configuration changes.
    pub fn subscribe_config(&self) -> watch::Receiver<SessionConfig> {
        self.config_tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> SessionConfig {
        self.settings.config()
    }

    pub fn audio(&self) -> &AudioManager {
        &self.audio
    }

    /// Dispatches a user command.
    pub fn handle_command(&mut self, command: SessionCommand) {
        debug!("Session command: {}", command.as_str());
        match command {
            SessionCommand::Start => {
                self.start();
            }
            SessionCommand::Pause => {
                self.pause();
            }
            SessionCommand::Reset { auto_start } => self.reset(auto_start),
            SessionCommand::Skip => {
                self.skip();
            }
            SessionCommand::Configure {
                work_minutes,
                break_minutes,
            } => {
                self.update_config(&work_minutes, &break_minutes);
            }
        }
    }

    /// Starts the countdown. Returns false if it was already running.
    pub fn start(&mut self) -> bool {
        if self.state.is_running {
            return false;
        }

        self.state.is_running = true;
        if self.state.phase == SessionPhase::Work {
            self.audio.submit(AudioOp::Play);
        }
        self.publish();
        true
    }

    /// Pauses the countdown. Returns false if it was not running.
    pub fn pause(&mut self) -> bool {
        if !self.state.is_running {
            return false;
        }

        self.state.is_running = false;
        self.audio.submit(AudioOp::Pause);
        self.publish();
        true
    }

    /// Returns to the start of a work interval with a fresh countdown.
    pub fn reset(&mut self, auto_start: bool) {
        let config = self.settings.config();
        self.state.enter(SessionPhase::Work, &config, auto_start);

        self.audio.submit(if auto_start {
            AudioOp::Replay
        } else {
            AudioOp::Stop
        });

        info!("Session reset (epoch {})", self.state.epoch);
        self.publish();
    }

    /// Handles the countdown reaching zero.
    ///
    /// Expiry reports for an earlier epoch are ignored; returns true if the
    /// phase changed.
    pub fn on_countdown_expired(&mut self, epoch: u64) -> bool {
        if epoch != self.state.epoch {
            debug!(
                "Ignoring stale countdown (epoch {} != {})",
                epoch, self.state.epoch
            );
            return false;
        }

        let config = self.settings.config();
        match self.state.phase {
            SessionPhase::Work => {
                self.audio.submit(AudioOp::PlayCue);
                self.haptics.vibrate(self.vibration);
                self.state.enter(SessionPhase::Break, &config, true);
                self.audio.submit(AudioOp::Unload);
            }
            SessionPhase::Break => {
                self.audio.submit(AudioOp::ReplayCue);
                self.haptics.vibrate(self.vibration);
                self.state.enter(SessionPhase::Work, &config, false);
                self.audio.submit(AudioOp::Advance);
            }
        }

        info!(
            "Entered {} phase (epoch {}, {}s)",
            self.state.phase, self.state.epoch, self.state.remaining_seconds
        );
        self.publish();
        true
    }

    /// Handles natural end of the track loaded as `generation`.
    ///
    /// Returns true if the next track was requested. The audio manager drops
    /// the request if a skip or reset queued earlier already replaced or
    /// rewound that track.
    pub fn on_track_finished(&mut self, generation: u64) -> bool {
        if !self.state.is_running_in(SessionPhase::Work) {
            debug!("Track finished outside a running work interval");
            return false;
        }

        self.audio.submit(AudioOp::AdvanceAfterFinish { generation });
        true
    }

    /// Skips to the next track. Only allowed while a work interval runs.
    pub fn skip(&mut self) -> bool {
        if !self.state.is_running_in(SessionPhase::Work) {
            debug!("Skip ignored outside a running work interval");
            return false;
        }

        self.audio.submit(AudioOp::AdvanceAndPlay);
        true
    }

    /// Stores new durations typed by the user.
    ///
    /// The running countdown is untouched; the new values apply from the
    /// next reset or phase switch.
    pub fn update_config(&mut self, work_minutes: &str, break_minutes: &str) -> SessionConfig {
        let config = self.settings.apply_input(work_minutes, break_minutes);
        self.config_tx.send_replace(config);
        config
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state);
    }
}

impl std::fmt::Debug for SessionMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMachine")
            .field("state", &self.state)
            .field("config", &self.settings.config())
            .finish_non_exhaustive()
    }
}
