//! Core data types for the Pomodoro session.
//!
//! This module defines the data structures used for:
//! - Session phase (work / break)
//! - Duration configuration with validation
//! - Session state shared with the countdown view

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::settings::ConfigError;

// ============================================================================
// SessionPhase
// ============================================================================

/// Represents the current phase of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Focused work interval, music plays
    #[default]
    Work,
    /// Break interval, music is unloaded
    Break,
}

impl SessionPhase {
    /// Returns the string representation of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Work => "work",
            SessionPhase::Break => "break",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SessionConfig
// ============================================================================

/// Default work duration in minutes.
pub const DEFAULT_WORK_MINUTES: u32 = 25;

/// Default break duration in minutes.
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// Interval durations for a session.
///
/// Both durations are strictly positive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Work duration in seconds
    work_seconds: NonZeroU32,
    /// Break duration in seconds
    break_seconds: NonZeroU32,
}

const DEFAULT_WORK_SECONDS: NonZeroU32 = match NonZeroU32::new(DEFAULT_WORK_MINUTES * 60) {
    Some(seconds) => seconds,
    None => panic!("default work duration must be positive"),
};

const DEFAULT_BREAK_SECONDS: NonZeroU32 = match NonZeroU32::new(DEFAULT_BREAK_MINUTES * 60) {
    Some(seconds) => seconds,
    None => panic!("default break duration must be positive"),
};

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_SECONDS, DEFAULT_BREAK_SECONDS)
    }
}

impl SessionConfig {
    /// Creates a configuration from second counts.
    pub fn new(work_seconds: NonZeroU32, break_seconds: NonZeroU32) -> Self {
        Self {
            work_seconds,
            break_seconds,
        }
    }

    /// Creates a configuration from minute counts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotPositive` if either value is zero or too
    /// large to be expressed in seconds.
    pub fn from_minutes(work_minutes: u32, break_minutes: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            work_seconds: minutes_to_seconds("work", work_minutes)?,
            break_seconds: minutes_to_seconds("break", break_minutes)?,
        })
    }

    /// Returns a copy with the work duration replaced.
    pub fn with_work_minutes(self, minutes: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            work_seconds: minutes_to_seconds("work", minutes)?,
            ..self
        })
    }

    /// Returns a copy with the break duration replaced.
    pub fn with_break_minutes(self, minutes: u32) -> Result<Self, ConfigError> {
        Ok(Self {
            break_seconds: minutes_to_seconds("break", minutes)?,
            ..self
        })
    }

    /// Work duration in seconds.
    pub fn work_seconds(&self) -> u32 {
        self.work_seconds.get()
    }

    /// Break duration in seconds.
    pub fn break_seconds(&self) -> u32 {
        self.break_seconds.get()
    }

    /// Work duration in whole minutes.
    pub fn work_minutes(&self) -> u32 {
        self.work_seconds.get() / 60
    }

    /// Break duration in whole minutes.
    pub fn break_minutes(&self) -> u32 {
        self.break_seconds.get() / 60
    }

    /// Returns the authoritative duration for the given phase.
    pub fn seconds_for(&self, phase: SessionPhase) -> u32 {
        match phase {
            SessionPhase::Work => self.work_seconds(),
            SessionPhase::Break => self.break_seconds(),
        }
    }
}

fn minutes_to_seconds(field: &'static str, minutes: u32) -> Result<NonZeroU32, ConfigError> {
    minutes
        .checked_mul(60)
        .and_then(NonZeroU32::new)
        .ok_or(ConfigError::NotPositive {
            field,
            value: minutes.to_string(),
        })
}

// ============================================================================
// SessionState
// ============================================================================

/// Authoritative state of the session.
///
/// This is the value handed to the countdown view. Whenever `epoch` changes
/// the view must discard its local countdown and restart from
/// `remaining_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Current phase
    pub phase: SessionPhase,
    /// Total seconds of the countdown for the current epoch
    pub remaining_seconds: u32,
    /// Whether the countdown is running
    pub is_running: bool,
    /// Countdown restart key, incremented on every reset and phase switch
    pub epoch: u64,
}

impl SessionState {
    /// Creates the initial state: idle work interval at epoch 0.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            phase: SessionPhase::Work,
            remaining_seconds: config.work_seconds(),
            is_running: false,
            epoch: 0,
        }
    }

    /// Enters `phase` with a fresh countdown taken from `config`.
    ///
    /// This is the only place the epoch advances, so `remaining_seconds`
    /// always matches the config snapshot of the latest epoch.
    pub fn enter(&mut self, phase: SessionPhase, config: &SessionConfig, running: bool) {
        self.phase = phase;
        self.remaining_seconds = config.seconds_for(phase);
        self.is_running = running;
        self.epoch += 1;
    }

    /// Returns true if in the given phase and running.
    pub fn is_running_in(&self, phase: SessionPhase) -> bool {
        self.is_running && self.phase == phase
    }
}

// ============================================================================
// Tests
// ============================================================================
