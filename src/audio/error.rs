//! Audio error types.
//!
//! Every variant is contained inside the audio manager: failures are logged
//! and reported to whoever awaited the operation, but they never stop the
//! session from being started, paused or reset.

use thiserror::Error;

/// Errors that can occur in the audio system.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// Audio device is not available (e.g., no speakers connected, or sound disabled).
    #[error("オーディオデバイスが利用できません: {0}")]
    DeviceNotAvailable(String),

    /// The audio resource could not be created (missing file, bad format, unsupported URI).
    #[error("サウンドの読み込みに失敗しました ({uri}): {reason}")]
    LoadFailed {
        /// The track that failed to load
        uri: String,
        /// Underlying failure
        reason: String,
    },

    /// The device rejected a play/pause/stop/unload command.
    #[error("サウンドの{command}に失敗しました: {reason}")]
    CommandFailed {
        /// Name of the rejected command
        command: &'static str,
        /// Underlying failure
        reason: String,
    },

    /// A playback command was issued for a handle that is not loaded.
    #[error("{0} が読み込まれていません")]
    NotLoaded(&'static str),

    /// The audio manager task is no longer running.
    #[error("オーディオマネージャーが停止しています")]
    ManagerClosed,
}

impl AudioError {
    /// Creates a `CommandFailed` error.
    pub fn command(command: &'static str, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command,
            reason: reason.into(),
        }
    }

    /// Creates a `LoadFailed` error.
    pub fn load(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadFailed {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the audio resource could not be created.
    #[must_use]
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::LoadFailed { .. })
    }

    /// Returns true if this error is related to device availability.
    #[must_use]
    pub fn is_device_error(&self) -> bool {
        matches!(self, Self::DeviceNotAvailable(_) | Self::CommandFailed { .. })
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::DeviceNotAvailable(_) => "オーディオデバイスを接続してください",
            Self::LoadFailed { .. } => {
                "ファイルのパスを確認し、もう一度 start を押すと再読み込みします"
            }
            Self::CommandFailed { .. } => "タイマーはそのまま操作できます。reset で再試行してください",
            Self::NotLoaded(_) => "サウンドの読み込みを待ってから再試行してください",
            Self::ManagerClosed => "アプリケーションを再起動してください",
        }
    }
}
