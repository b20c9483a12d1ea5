//! CLI module for the Pomodoro player.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `display`: Output formatting and display logic
//! - `prompt`: Parser for commands typed during a session

pub mod commands;
pub mod display;
pub mod prompt;

pub use commands::{Cli, Commands, ConfigAction, RunArgs};
pub use display::Display;
pub use prompt::{parse_prompt, PromptCommand};
