//! Background music playlist.
//!
//! - `assets`: track descriptors and JSON asset list loading
//! - `cursor`: the current-track cursor with wraparound

mod assets;
mod cursor;
mod error;

pub use assets::{load_track_list, parse_track_list, TrackRef};
pub use cursor::PlaylistCursor;
pub use error::PlaylistError;
