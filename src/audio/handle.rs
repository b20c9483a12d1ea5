//! Observable state of the MainTrack and CueTrack handles.

use serde::Serialize;

use crate::playlist::TrackRef;

/// Lifecycle state of an audio handle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "track", rename_all = "snake_case")]
pub enum HandleState {
    /// No device resource exists.
    #[default]
    Unloaded,
    /// A device resource is being created.
    Loading,
    /// Loaded and not playing (at the start, or at the end of the track).
    Loaded(TrackRef),
    /// Playing.
    Playing(TrackRef),
    /// Paused mid-track.
    Paused(TrackRef),
}

impl HandleState {
    /// Returns the string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Loaded(_) => "loaded",
            Self::Playing(_) => "playing",
            Self::Paused(_) => "paused",
        }
    }

    /// Returns true if a device resource exists.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_) | Self::Playing(_) | Self::Paused(_))
    }

    /// Returns true if playing.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::Playing(_))
    }

    /// Returns the loaded track, if any.
    pub fn track(&self) -> Option<&TrackRef> {
        match self {
            Self::Loaded(track) | Self::Playing(track) | Self::Paused(track) => Some(track),
            Self::Unloaded | Self::Loading => None,
        }
    }
}

/// Point-in-time view of the audio manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSnapshot {
    /// Background music handle
    pub main: HandleState,
    /// Bell handle
    pub cue: HandleState,
    /// Index of the current playlist track
    pub cursor_index: usize,
    /// The current playlist track
    pub current_track: TrackRef,
}

/// A MainTrack that played to its end.
///
/// `generation` identifies the load; a later load, or a rewind of the same
/// load, makes the notice stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedTrack {
    /// The track that ended
    pub track: TrackRef,
    /// Load generation of the handle that ended
    pub generation: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unloaded() {
        assert_eq!(HandleState::default(), HandleState::Unloaded);
    }

    #[test]
    fn test_is_loaded() {
        let track = TrackRef::new("a.mp3");
        assert!(!HandleState::Unloaded.is_loaded());
        assert!(!HandleState::Loading.is_loaded());
        assert!(HandleState::Loaded(track.clone()).is_loaded());
        assert!(HandleState::Playing(track.clone()).is_loaded());
        assert!(HandleState::Paused(track).is_loaded());
    }

    #[test]
    fn test_track() {
        let track = TrackRef::new("a.mp3");
        assert_eq!(HandleState::Playing(track.clone()).track(), Some(&track));
        assert_eq!(HandleState::Loading.track(), None);
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&HandleState::Playing(TrackRef::new("a.mp3"))).unwrap();
        assert_eq!(json, r#"{"state":"playing","track":{"uri":"a.mp3"}}"#);

        let json = serde_json::to_string(&HandleState::Unloaded).unwrap();
        assert_eq!(json, r#"{"state":"unloaded"}"#);
    }
}
