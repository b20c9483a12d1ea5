//! Audio resource management for the session.
//!
//! This module owns every audio resource the session uses:
//!
//! - One MainTrack handle (background music from the playlist)
//! - One CueTrack handle (the phase-change bell)
//! - Serialized load/play/pause/stop/unload transitions
//! - Natural end-of-track notification
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  AudioOp (mpsc)  ┌──────────────────┐
//! │  SessionMachine  │ ───────────────▶ │   AudioManager   │ ← one op at a time
//! └──────────────────┘                  │   (actor task)   │
//!          ▲                            └────────┬─────────┘
//!          │ track finished                      │ AudioDevice
//!          │ (callback → event queue)            ▼
//!          │                            ┌──────────────────┐
//!          └─────────────────────────── │ RodioAudioDevice │
//!                 PlaybackStatus        │ MockAudioDevice  │
//!                                       └──────────────────┘
//! ```
//!
//! The device is an opaque, slow, fallible service. The manager never
//! issues a playback command against a handle that has not finished
//! loading, and a command submitted while another is in flight waits behind
//! it instead of pre-empting it.

mod error;
mod handle;
mod manager;
mod mock;
mod rodio_device;

use std::future::Future;

use tokio::sync::mpsc;

use crate::playlist::TrackRef;

pub use error::AudioError;
pub use handle::{AudioSnapshot, FinishedTrack, HandleState};
pub use manager::{AudioManager, AudioOp};
pub use mock::{DeviceCommand, MockAudioDevice, MockHandle};
pub use rodio_device::{RodioAudioDevice, RodioTrack, BUILTIN_BELL_URI};

/// Playback status reported by a device handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// The handle reached the end of its audio.
    Finished {
        /// Whether the handle is looping (a looping finish is not an end).
        looping: bool,
    },
    /// The device reported an error for the handle.
    Error(String),
}

/// A status update tagged with the load generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Generation of the handle that produced the update
    pub generation: u64,
    /// The reported status
    pub status: PlaybackStatus,
}

/// Where a device handle sends its status updates.
#[derive(Debug, Clone)]
pub struct StatusSink {
    generation: u64,
    tx: mpsc::UnboundedSender<StatusUpdate>,
}

impl StatusSink {
    /// Creates a sink tagging every update with `generation`.
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<StatusUpdate>) -> Self {
        Self { generation, tx }
    }

    /// Sends a status update.
    ///
    /// Returns false once nobody is listening any more.
    pub fn send(&self, status: PlaybackStatus) -> bool {
        self.tx
            .send(StatusUpdate {
                generation: self.generation,
                status,
            })
            .is_ok()
    }

    /// Returns true once nobody is listening any more.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Trait for audio device implementations.
///
/// This abstracts the platform audio service (e.g. rodio, or a mock for
/// testing). All operations are asynchronous and may fail.
pub trait AudioDevice: Send + Sync + 'static {
    /// A loaded, playable sound.
    type Handle: Send + Sync + 'static;

    /// Creates a playable sound for `track`, starting playback if `should_play`.
    fn create(
        &self,
        track: &TrackRef,
        should_play: bool,
    ) -> impl Future<Output = Result<Self::Handle, AudioError>> + Send;

    /// Starts or resumes playback.
    fn play(&self, handle: &Self::Handle) -> impl Future<Output = Result<(), AudioError>> + Send;

    /// Pauses playback, keeping the position.
    fn pause(&self, handle: &Self::Handle) -> impl Future<Output = Result<(), AudioError>> + Send;

    /// Stops playback and rewinds to the start, keeping the resource loaded.
    fn stop(&self, handle: &Self::Handle) -> impl Future<Output = Result<(), AudioError>> + Send;

    /// Releases the device resource.
    fn unload(&self, handle: Self::Handle) -> impl Future<Output = Result<(), AudioError>> + Send;

    /// Routes status updates for `handle` to `sink` until it is unloaded.
    fn subscribe_status(&self, handle: &Self::Handle, sink: StatusSink);
}
