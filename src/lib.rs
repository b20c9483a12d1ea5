//! Pomodoro Player Library
//!
//! This library provides the core functionality for the Pomodoro player CLI.
//! It includes:
//! - Session state machine alternating work and break intervals
//! - Serialized audio resource manager for the playlist and the bell
//! - Playlist cursor and asset list loading
//! - Settings store and on-disk configuration
//! - Countdown driver and haptic cue adapters
//! - CLI command parsing and display utilities

pub mod audio;
pub mod cli;
pub mod haptics;
pub mod playlist;
pub mod session;
pub mod settings;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{SessionConfig, SessionPhase, SessionState};

// Re-export audio types
pub use audio::{
    AudioDevice, AudioError, AudioManager, AudioOp, AudioSnapshot, HandleState, MockAudioDevice,
    RodioAudioDevice,
};

// Re-export session types
pub use session::{Session, SessionCommand, SessionError, SessionHandle, SessionOptions};

// Re-export haptics, playlist and settings types
pub use haptics::{Haptics, MockHaptics, TerminalHaptics};
pub use playlist::{PlaylistCursor, PlaylistError, TrackRef};
pub use settings::{AppConfig, ConfigError, SettingsStore};
