//! Settings error types.
//!
//! Validation errors coming from the configuration surface are never fatal:
//! the store keeps its previous value and the error is only logged.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while validating or loading settings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A duration was zero (or does not fit in seconds).
    #[error("{field} の時間は1分以上で指定してください: {value}")]
    NotPositive {
        /// Name of the rejected field
        field: &'static str,
        /// The rejected input
        value: String,
    },

    /// A duration was not a number.
    #[error("{field} の時間は数値で指定してください: '{value}'")]
    NotNumeric {
        /// Name of the rejected field
        field: &'static str,
        /// The rejected input
        value: String,
    },

    /// The configuration file could not be read.
    #[error("設定ファイルを読み込めません ({}): {}", .0.display(), .1)]
    Read(PathBuf, String),

    /// The configuration file could not be written.
    #[error("設定ファイルを書き込めません ({}): {}", .0.display(), .1)]
    Write(PathBuf, String),

    /// The configuration file is not valid JSON for `AppConfig`.
    #[error("設定ファイルの形式が不正です: {0}")]
    Parse(String),
}

impl ConfigError {
    /// Returns true if this error came from validating user input.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::NotPositive { .. } | Self::NotNumeric { .. })
    }

    /// Returns a user-friendly suggestion for resolving this error.
    #[must_use]
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NotPositive { .. } | Self::NotNumeric { .. } => {
                "正の整数（分）を入力してください。以前の値が維持されます"
            }
            Self::Read(_, _) => "ファイルのパスと権限を確認してください",
            Self::Write(_, _) => "設定ディレクトリの権限を確認してください",
            Self::Parse(_) => "`config init` で既定の設定ファイルを作り直してください",
        }
    }
}
