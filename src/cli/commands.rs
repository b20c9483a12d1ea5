//! Command definitions for the Pomodoro player CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ============================================================================
// CLI Structure
// ============================================================================

/// Pomodoro player CLI - focus timer with background music
#[derive(Parser, Debug)]
#[command(
    name = "pomodoro-player",
    version,
    about = "音楽を流しながら作業と休憩を繰り返すポモドーロタイマー",
    long_about = "作業中はプレイリストを再生し、作業と休憩の切り替え時にベルを鳴らします。\n\
                  起動後は start / pause / reset / skip などのコマンドを入力して操作します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run an interactive session
    Run(RunArgs),

    /// Inspect or create the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Configuration file actions
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file location
    Path,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

// ============================================================================
// Run Command Arguments
// ============================================================================

/// Arguments for the run command.
///
/// Every option overrides the configuration file.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Work duration in minutes
    #[arg(
        short,
        long,
        value_name = "MINUTES",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub work: Option<u32>,

    /// Break duration in minutes
    #[arg(
        short = 'b',
        long = "break",
        value_name = "MINUTES",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub break_minutes: Option<u32>,

    /// Playlist JSON file
    #[arg(short, long, value_name = "FILE")]
    pub playlist: Option<PathBuf>,

    /// Sound effect JSON file (the first entry is the bell)
    #[arg(long, value_name = "FILE")]
    pub cues: Option<PathBuf>,

    /// Disable all sound
    #[arg(long)]
    pub no_sound: bool,
}

// ============================================================================
// Tests
// ============================================================================
