//! Session error types.

use thiserror::Error;

use crate::audio::AudioError;

/// Errors returned by a [`SessionHandle`](super::SessionHandle).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The controller task has stopped.
    #[error("セッションは終了しています")]
    Closed,

    /// The audio manager could not be reached.
    #[error(transparent)]
    Audio(#[from] AudioError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(SessionError::Closed.to_string().contains("終了"));

        let err: SessionError = AudioError::ManagerClosed.into();
        assert_eq!(err.to_string(), AudioError::ManagerClosed.to_string());
    }
}
