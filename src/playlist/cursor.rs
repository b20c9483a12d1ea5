//! Playlist cursor.

use super::assets::TrackRef;
use super::error::PlaylistError;

/// Tracks which entry of a fixed, non-empty track list is current.
///
/// Advancing past the last track wraps to the first one, so the index is
/// always valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistCursor {
    tracks: Vec<TrackRef>,
    index: usize,
}

impl PlaylistCursor {
    /// Creates a cursor positioned on the first track.
    ///
    /// # Errors
    ///
    /// Returns `PlaylistError::Empty` if `tracks` is empty.
    pub fn new(tracks: Vec<TrackRef>) -> Result<Self, PlaylistError> {
        if tracks.is_empty() {
            return Err(PlaylistError::Empty);
        }
        Ok(Self { tracks, index: 0 })
    }

    /// Returns the current track.
    #[must_use]
    pub fn current(&self) -> &TrackRef {
        &self.tracks[self.index]
    }

    /// Moves to the next track and returns it.
    pub fn advance(&mut self) -> &TrackRef {
        self.index = (self.index + 1) % self.tracks.len();
        self.current()
    }

    /// Index of the current track.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of tracks in the list.
    #[must_use]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}
