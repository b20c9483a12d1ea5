//! Session orchestration.
//!
//! This module contains the session core:
//! - `event`: Commands and system events fed into the session queue
//! - `machine`: The WORK/BREAK state machine and its audio/cue policy
//! - `controller`: The single task that drains the event queue
//! - `countdown`: The once-per-second countdown driver

pub mod controller;
pub mod countdown;
pub mod error;
pub mod event;
pub mod machine;

pub use controller::{Session, SessionHandle, SessionOptions};
pub use countdown::{Countdown, TICK};
pub use error::SessionError;
pub use event::{SessionCommand, SessionEvent};
pub use machine::SessionMachine;
