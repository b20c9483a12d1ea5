//! Track and cue asset lists.
//!
//! Asset lists are JSON arrays of track descriptors:
//!
//! ```json
//! [
//!   { "uri": "assets/music/lofi-01.mp3", "title": "Morning Coffee" },
//!   { "uri": "assets/music/lofi-02.mp3" }
//! ]
//! ```
//!
//! They are read once at startup and are immutable for the session.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::PlaylistError;

/// Reference to a playable track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRef {
    /// Location of the audio data (file path or `file://` URI).
    pub uri: String,
    /// Optional display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TrackRef {
    /// Creates a track reference without a title.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            title: None,
        }
    }

    /// Sets the display title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Returns the title, or the file name of the URI if there is none.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if let Some(title) = &self.title {
            return title;
        }
        self.uri.rsplit('/').next().unwrap_or(&self.uri)
    }

    /// Resolves the URI to a local file path.
    ///
    /// Plain paths are returned as-is and `file://` URIs are stripped.
    /// Returns `None` for any other scheme.
    #[must_use]
    pub fn local_path(&self) -> Option<PathBuf> {
        if let Some(path) = self.uri.strip_prefix("file://") {
            return Some(PathBuf::from(path));
        }
        if has_scheme(&self.uri) {
            return None;
        }
        Some(PathBuf::from(&self.uri))
    }
}

/// Returns true for `scheme:...` URIs. Single-letter prefixes are drive letters.
fn has_scheme(uri: &str) -> bool {
    match uri.split_once(':') {
        Some((scheme, _)) => {
            scheme.len() > 1
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Loads a track list from a JSON file.
///
/// Relative track paths are resolved against the directory containing the
/// list file.
///
/// # Errors
///
/// Returns `PlaylistError::Read` / `PlaylistError::Parse` for unreadable or
/// malformed files and `PlaylistError::Empty` for an empty list.
pub fn load_track_list(path: &Path) -> Result<Vec<TrackRef>, PlaylistError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PlaylistError::Read(path.to_path_buf(), e.to_string()))?;
    let tracks = parse_track_list(&content)?;

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(tracks
        .into_iter()
        .map(|track| resolve_relative(base, track))
        .collect())
}

/// Parses a track list from JSON text.
///
/// # Errors
///
/// Returns `PlaylistError::Parse` for malformed JSON and
/// `PlaylistError::Empty` for an empty array.
pub fn parse_track_list(json: &str) -> Result<Vec<TrackRef>, PlaylistError> {
    let tracks: Vec<TrackRef> =
        serde_json::from_str(json).map_err(|e| PlaylistError::Parse(e.to_string()))?;
    if tracks.is_empty() {
        return Err(PlaylistError::Empty);
    }
    Ok(tracks)
}

fn resolve_relative(base: &Path, track: TrackRef) -> TrackRef {
    match track.local_path() {
        Some(path) if path.is_relative() && !track.uri.starts_with("file://") => TrackRef {
            uri: base.join(path).to_string_lossy().into_owned(),
            title: track.title,
        },
        _ => track,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_title() {
        let track = TrackRef::new("music/a.mp3").with_title("Song A");
        assert_eq!(track.display_name(), "Song A");
    }

    #[test]
    fn test_display_name_falls_back_to_file_name() {
        let track = TrackRef::new("music/lofi/a.mp3");
        assert_eq!(track.display_name(), "a.mp3");
    }

    #[test]
    fn test_local_path() {
        assert_eq!(
            TrackRef::new("/music/a.mp3").local_path(),
            Some(PathBuf::from("/music/a.mp3"))
        );
        assert_eq!(
            TrackRef::new("file:///music/a.mp3").local_path(),
            Some(PathBuf::from("/music/a.mp3"))
        );
        assert_eq!(TrackRef::new("https://example.com/a.mp3").local_path(), None);
        assert_eq!(TrackRef::new("builtin:bell").local_path(), None);
        assert_eq!(
            TrackRef::new("C:/music/a.mp3").local_path(),
            Some(PathBuf::from("C:/music/a.mp3"))
        );
    }

    #[test]
    fn test_parse_track_list() {
        let tracks =
            parse_track_list(r#"[{"uri": "a.mp3", "title": "A"}, {"uri": "b.mp3"}]"#).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title.as_deref(), Some("A"));
        assert_eq!(tracks[1].title, None);
    }

    #[test]
    fn test_parse_empty_list_fails_fast() {
        let err = parse_track_list("[]").unwrap_err();
        assert!(matches!(err, PlaylistError::Empty));
    }

    #[test]
    fn test_parse_malformed_list() {
        let err = parse_track_list(r#"{"uri": "a.mp3"}"#).unwrap_err();
        assert!(matches!(err, PlaylistError::Parse(_)));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("playlist.json");
        std::fs::write(
            &path,
            r#"[{"uri": "music/a.mp3"}, {"uri": "/abs/b.mp3"}, {"uri": "builtin:bell"}]"#,
        )
        .unwrap();

        let tracks = load_track_list(&path).unwrap();
        assert_eq!(
            tracks[0].uri,
            dir.path().join("music/a.mp3").to_string_lossy()
        );
        assert_eq!(tracks[1].uri, "/abs/b.mp3");
        assert_eq!(tracks[2].uri, "builtin:bell");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_track_list(Path::new("/nonexistent/playlist.json")).unwrap_err();
        assert!(matches!(err, PlaylistError::Read(_, _)));
    }
}
