//! Playlist error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building a playlist.
///
/// All of these are startup errors: once a
/// [`PlaylistCursor`](super::PlaylistCursor) exists, advancing it cannot fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    /// The track list contains no tracks.
    #[error("プレイリストが空です。少なくとも1曲を登録してください")]
    Empty,

    /// The track list file could not be read.
    #[error("プレイリストを読み込めません ({}): {}", .0.display(), .1)]
    Read(PathBuf, String),

    /// The track list file is not a JSON array of tracks.
    #[error("プレイリストの形式が不正です: {0}")]
    Parse(String),
}
