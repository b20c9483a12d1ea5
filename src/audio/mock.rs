//! Mock audio device for testing.
//!
//! Records every command it receives, can be told to fail or to load
//! slowly, and lets a test end a track as if it had played to completion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::AudioError;
use super::{AudioDevice, PlaybackStatus, StatusSink};
use crate::playlist::TrackRef;

/// A command received by [`MockAudioDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// A sound was created.
    Create {
        /// Loaded URI
        uri: String,
        /// Whether it started playing immediately
        should_play: bool,
    },
    /// Play was requested.
    Play {
        /// Target URI
        uri: String,
    },
    /// Pause was requested.
    Pause {
        /// Target URI
        uri: String,
    },
    /// Stop (rewind) was requested.
    Stop {
        /// Target URI
        uri: String,
    },
    /// The sound was released.
    Unload {
        /// Target URI
        uri: String,
    },
}

impl DeviceCommand {
    /// Returns the URI the command targeted.
    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Self::Create { uri, .. }
            | Self::Play { uri }
            | Self::Pause { uri }
            | Self::Stop { uri }
            | Self::Unload { uri } => uri,
        }
    }
}

/// Handle produced by [`MockAudioDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHandle {
    id: u64,
    uri: String,
}

impl MockHandle {
    /// Unique id of this handle.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// URI the handle was created for.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// Mock audio device for testing.
///
/// Clones share the same recorded state, so a test can keep one clone and
/// move another into the audio manager.
#[derive(Debug, Clone, Default)]
pub struct MockAudioDevice {
    state: Arc<MockState>,
}

#[derive(Debug, Default)]
struct MockState {
    commands: Mutex<Vec<DeviceCommand>>,
    live: Mutex<HashMap<u64, String>>,
    subscribers: Mutex<HashMap<u64, StatusSink>>,
    violations: Mutex<Vec<String>>,
    next_id: AtomicU64,
    create_attempts: AtomicUsize,
    should_fail_create: AtomicBool,
    should_fail_commands: AtomicBool,
    create_delay_ms: AtomicU64,
}

impl MockAudioDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail_create(&self, should_fail: bool) {
        self.state
            .should_fail_create
            .store(should_fail, Ordering::SeqCst);
    }

    pub fn set_should_fail_commands(&self, should_fail: bool) {
        self.state
            .should_fail_commands
            .store(should_fail, Ordering::SeqCst);
    }

    /// Makes every `create` take `delay` before resolving.
    pub fn set_create_delay(&self, delay: Duration) {
        self.state
            .create_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    #[must_use]
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.commands.lock().unwrap().clone()
    }

    pub fn clear_commands(&self) {
        self.state.commands.lock().unwrap().clear();
    }

    /// Counts recorded commands matching `predicate`.
    #[must_use]
    pub fn count(&self, predicate: impl Fn(&DeviceCommand) -> bool) -> usize {
        self.state
            .commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| predicate(c))
            .count()
    }

    #[must_use]
    pub fn create_count(&self, uri: &str) -> usize {
        self.count(|c| matches!(c, DeviceCommand::Create { .. }) && c.uri() == uri)
    }

    #[must_use]
    pub fn play_count(&self, uri: &str) -> usize {
        self.count(|c| matches!(c, DeviceCommand::Play { .. }) && c.uri() == uri)
    }

    #[must_use]
    pub fn pause_count(&self, uri: &str) -> usize {
        self.count(|c| matches!(c, DeviceCommand::Pause { .. }) && c.uri() == uri)
    }

    #[must_use]
    pub fn stop_count(&self, uri: &str) -> usize {
        self.count(|c| matches!(c, DeviceCommand::Stop { .. }) && c.uri() == uri)
    }

    #[must_use]
    pub fn unload_count(&self, uri: &str) -> usize {
        self.count(|c| matches!(c, DeviceCommand::Unload { .. }) && c.uri() == uri)
    }

    /// Number of `create` calls, including failed ones.
    #[must_use]
    pub fn create_attempts(&self) -> usize {
        self.state.create_attempts.load(Ordering::SeqCst)
    }

    /// URIs of all handles that are currently loaded.
    #[must_use]
    pub fn live_uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.state.live.lock().unwrap().values().cloned().collect();
        uris.sort();
        uris
    }

    #[must_use]
    pub fn is_live(&self, uri: &str) -> bool {
        self.state.live.lock().unwrap().values().any(|u| u == uri)
    }

    /// Commands that targeted a handle which was not loaded.
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        self.state.violations.lock().unwrap().clone()
    }

    /// Reports natural end-of-track for the newest live handle of `uri`.
    ///
    /// Returns false if no such handle is subscribed.
    pub fn finish(&self, uri: &str) -> bool {
        self.send_status(uri, PlaybackStatus::Finished { looping: false })
    }

    /// Reports a looping wrap-around for the newest live handle of `uri`.
    pub fn finish_looping(&self, uri: &str) -> bool {
        self.send_status(uri, PlaybackStatus::Finished { looping: true })
    }

    /// Reports a device error for the newest live handle of `uri`.
    pub fn report_error(&self, uri: &str, message: &str) -> bool {
        self.send_status(uri, PlaybackStatus::Error(message.to_string()))
    }

    fn send_status(&self, uri: &str, status: PlaybackStatus) -> bool {
        let id = self
            .state
            .live
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, u)| u.as_str() == uri)
            .map(|(id, _)| *id)
            .max();

        let Some(id) = id else {
            return false;
        };
        match self.state.subscribers.lock().unwrap().get(&id) {
            Some(sink) => sink.send(status),
            None => false,
        }
    }

    fn record(&self, command: DeviceCommand) {
        self.state.commands.lock().unwrap().push(command);
    }

    /// Records a command against `handle` and checks it is still loaded.
    fn command(
        &self,
        name: &'static str,
        handle: &MockHandle,
        command: DeviceCommand,
    ) -> Result<(), AudioError> {
        self.record(command);

        if !self.state.live.lock().unwrap().contains_key(&handle.id) {
            self.state.violations.lock().unwrap().push(format!(
                "{} on unloaded handle #{} ({})",
                name, handle.id, handle.uri
            ));
        }

        if self.state.should_fail_commands.load(Ordering::SeqCst) {
            let label = match name {
                "play" => "再生",
                "pause" => "一時停止",
                "stop" => "停止",
                _ => "解放",
            };
            return Err(AudioError::command(label, "mock failure"));
        }
        Ok(())
    }
}

impl AudioDevice for MockAudioDevice {
    type Handle = MockHandle;

    async fn create(&self, track: &TrackRef, should_play: bool) -> Result<MockHandle, AudioError> {
        self.state.create_attempts.fetch_add(1, Ordering::SeqCst);

        let delay = self.state.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.state.should_fail_create.load(Ordering::SeqCst) {
            return Err(AudioError::load(&track.uri, "mock failure"));
        }

        let id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        self.state
            .live
            .lock()
            .unwrap()
            .insert(id, track.uri.clone());
        self.record(DeviceCommand::Create {
            uri: track.uri.clone(),
            should_play,
        });

        Ok(MockHandle {
            id,
            uri: track.uri.clone(),
        })
    }

    async fn play(&self, handle: &MockHandle) -> Result<(), AudioError> {
        self.command(
            "play",
            handle,
            DeviceCommand::Play {
                uri: handle.uri.clone(),
            },
        )
    }

    async fn pause(&self, handle: &MockHandle) -> Result<(), AudioError> {
        self.command(
            "pause",
            handle,
            DeviceCommand::Pause {
                uri: handle.uri.clone(),
            },
        )
    }

    async fn stop(&self, handle: &MockHandle) -> Result<(), AudioError> {
        self.command(
            "stop",
            handle,
            DeviceCommand::Stop {
                uri: handle.uri.clone(),
            },
        )
    }

    async fn unload(&self, handle: MockHandle) -> Result<(), AudioError> {
        let result = self.command(
            "unload",
            &handle,
            DeviceCommand::Unload {
                uri: handle.uri.clone(),
            },
        );
        self.state.live.lock().unwrap().remove(&handle.id);
        self.state.subscribers.lock().unwrap().remove(&handle.id);
        result
    }

    fn subscribe_status(&self, handle: &MockHandle, sink: StatusSink) {
        self.state
            .subscribers
            .lock()
            .unwrap()
            .insert(handle.id, sink);
    }
}
