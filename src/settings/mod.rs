//! User-editable session settings.
//!
//! The [`SettingsStore`] is the only mutator of the configured durations.
//! Edits are validated field by field: anything that is not a strictly
//! positive whole number of minutes is ignored and the previous value is
//! kept. A stored edit is never applied to a countdown already in flight;
//! the session picks it up at the next reset or phase switch.
//!
//! [`AppConfig`] is the on-disk configuration loaded at startup.

mod app_config;
mod error;

pub use app_config::{default_config_path, AppConfig};
pub use error::ConfigError;

use tracing::debug;

use crate::types::SessionConfig;

/// Holds the configured work/break durations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsStore {
    config: SessionConfig,
}

impl SettingsStore {
    /// Creates a store seeded with `config`.
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    /// Returns the current configuration snapshot.
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Stores durations typed into the configuration surface.
    ///
    /// Each field is validated on its own; a rejected field (zero or not a
    /// whole number) keeps its prior value. Returns the resulting
    /// configuration.
    pub fn apply_input(&mut self, work_input: &str, break_input: &str) -> SessionConfig {
        self.try_apply(|config| {
            parse_minutes("work", work_input).and_then(|m| config.with_work_minutes(m))
        });
        self.try_apply(|config| {
            parse_minutes("break", break_input).and_then(|m| config.with_break_minutes(m))
        });
        self.config
    }

    fn try_apply<F>(&mut self, edit: F)
    where
        F: FnOnce(SessionConfig) -> Result<SessionConfig, ConfigError>,
    {
        match edit(self.config) {
            Ok(config) => self.config = config,
            Err(e) => debug!("Ignoring settings edit: {}", e),
        }
    }
}

/// Parses a minutes field from the configuration surface.
///
/// # Errors
///
/// Returns `ConfigError::NotNumeric` for text that is not a whole number and
/// `ConfigError::NotPositive` for zero.
pub fn parse_minutes(field: &'static str, input: &str) -> Result<u32, ConfigError> {
    let trimmed = input.trim();
    let minutes: u32 = trimmed.parse().map_err(|_| ConfigError::NotNumeric {
        field,
        value: trimmed.to_string(),
    })?;

    if minutes == 0 {
        return Err(ConfigError::NotPositive {
            field,
            value: trimmed.to_string(),
        });
    }
    Ok(minutes)
}
