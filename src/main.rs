//! Pomodoro player CLI - focus timer with background music
//!
//! Alternates work and break intervals:
//! - 25 minutes of work with the playlist playing
//! - 5 minutes of break with the music off
//! - A bell and a vibration at every switch

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use pomodoro_player::audio::{HandleState, RodioAudioDevice, BUILTIN_BELL_URI};
use pomodoro_player::cli::{parse_prompt, Cli, Commands, ConfigAction, Display, PromptCommand, RunArgs};
use pomodoro_player::haptics::TerminalHaptics;
use pomodoro_player::playlist::{load_track_list, PlaylistCursor, TrackRef};
use pomodoro_player::session::{Session, SessionCommand, SessionOptions, TICK};
use pomodoro_player::settings::{default_config_path, parse_minutes, AppConfig};
use pomodoro_player::types::{SessionPhase, SessionState};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_tracing(cli.verbose);

    // Execute command
    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().or_else(default_config_path);

    match cli.command {
        Some(Commands::Run(args)) => run_session(args, config_path.as_deref()).await,
        Some(Commands::Config { action }) => handle_config(action, config_path.as_deref()),
        Some(Commands::Completions { shell }) => {
            generate_completions(shell);
            Ok(())
        }
        None => run_session(RunArgs::default(), config_path.as_deref()).await,
    }
}

// ============================================================================
// config
// ============================================================================

fn handle_config(action: ConfigAction, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_app_config(path)?;
            Display::show_config(&config, path);
        }
        ConfigAction::Path => {
            let path = path.context("設定ディレクトリを特定できません")?;
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            let path = path.context("設定ディレクトリを特定できません")?;
            if path.exists() && !force {
                bail!(
                    "設定ファイルは既に存在します: {} (上書きするには --force を指定してください)",
                    path.display()
                );
            }
            AppConfig::default()
                .save(path)
                .context("設定ファイルを書き込めませんでした")?;
            Display::show_config_created(path);
        }
    }
    Ok(())
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_or_default(path)
            .with_context(|| format!("設定ファイルを読み込めませんでした: {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

// ============================================================================
// run
// ============================================================================

/// Merges command line overrides into the file configuration.
fn apply_overrides(mut config: AppConfig, args: &RunArgs) -> AppConfig {
    if let Some(work) = args.work {
        config.work_minutes = work;
    }
    if let Some(minutes) = args.break_minutes {
        config.break_minutes = minutes;
    }
    if let Some(playlist) = &args.playlist {
        config.playlist = playlist.clone();
    }
    if let Some(cues) = &args.cues {
        config.cues = cues.clone();
    }
    if args.no_sound {
        config.sound = false;
    }
    config
}

/// Returns the bell: the first cue entry, or the built-in tone.
fn load_cue(path: &Path) -> TrackRef {
    match load_track_list(path) {
        Ok(mut cues) => cues.swap_remove(0),
        Err(e) => {
            tracing::warn!("Using built-in bell ({}): {}", path.display(), e);
            TrackRef::new(BUILTIN_BELL_URI).with_title("bell")
        }
    }
}

async fn run_session(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let config = apply_overrides(load_app_config(config_path)?, &args);
    let session_config = config
        .session_config()
        .context("作業時間と休憩時間は1分以上で指定してください")?;

    let tracks = load_track_list(&config.playlist).with_context(|| {
        format!("プレイリストを読み込めませんでした: {}", config.playlist.display())
    })?;
    let cursor = PlaylistCursor::new(tracks)?;
    let track_count = cursor.track_count();
    let cue = load_cue(&config.cues);

    let device = match RodioAudioDevice::new(!config.sound) {
        Ok(device) => device,
        Err(e) => {
            Display::show_warning(&e.to_string(), e.suggestion());
            RodioAudioDevice::unavailable(e.to_string())
        }
    };
    let haptics = Arc::new(TerminalHaptics::new(config.sound));

    Display::show_banner(&session_config, track_count);

    let session = Session::spawn(
        device,
        cursor,
        haptics,
        SessionOptions {
            config: session_config,
            vibration: config.vibration(),
            cue: Some(cue),
            tick: TICK,
        },
    );

    let reporter = tokio::spawn(report_changes(
        session.handle().subscribe(),
        session.subscribe_remaining(),
    ));
    let music = tokio::spawn(report_music(session.handle().audio().subscribe_main()));

    let result = prompt_loop(&session).await;

    reporter.abort();
    music.abort();
    session.shutdown().await;
    Display::show_goodbye();
    result
}

/// Reads prompt lines until `quit`, end of input or Ctrl-C.
async fn prompt_loop(session: &Session) -> Result<()> {
    let handle = session.handle();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("標準入力を読み込めませんでした")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            return Ok(());
        };

        let command = match parse_prompt(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                Display::show_error(&message);
                continue;
            }
        };

        match command {
            PromptCommand::Quit => return Ok(()),
            PromptCommand::Help => Display::show_help(),
            PromptCommand::Status => {
                handle.settle().await?;
                let audio = handle.audio().snapshot().await.ok();
                Display::show_status(&handle.state(), session.remaining(), audio.as_ref());
            }
            PromptCommand::Session(SessionCommand::Skip)
                if !handle.state().is_running_in(SessionPhase::Work) =>
            {
                Display::show_error("曲のスキップは作業中のみ可能です");
            }
            PromptCommand::Session(command) => {
                let configure = match &command {
                    SessionCommand::Configure {
                        work_minutes,
                        break_minutes,
                    } => {
                        warn_invalid_minutes("work", work_minutes);
                        warn_invalid_minutes("break", break_minutes);
                        true
                    }
                    _ => false,
                };
                handle.send(command)?;
                if configure {
                    handle.settle().await?;
                    Display::show_config_updated(&handle.config());
                }
            }
        }
    }
}

/// Tells the user which typed duration will be ignored.
fn warn_invalid_minutes(field: &'static str, input: &str) {
    if let Err(e) = parse_minutes(field, input) {
        Display::show_warning(&e.to_string(), e.suggestion());
    }
}

/// Prints phase, reset and start/pause changes as they are published.
async fn report_changes(mut state: watch::Receiver<SessionState>, remaining: watch::Receiver<u32>) {
    let mut previous = *state.borrow_and_update();

    while state.changed().await.is_ok() {
        let current = *state.borrow_and_update();

        if current.epoch != previous.epoch {
            if current.phase != previous.phase {
                Display::show_phase_change(&current);
            } else {
                Display::show_reset(&current);
            }
        } else if current.is_running != previous.is_running {
            // Give the countdown a moment to publish its paused value.
            tokio::time::sleep(Duration::from_millis(10)).await;
            Display::show_running_change(&current, *remaining.borrow());
        }

        previous = current;
    }
}

/// Announces each track as it starts playing.
async fn report_music(mut main: watch::Receiver<HandleState>) {
    let mut previous = main.borrow_and_update().clone();

    while main.changed().await.is_ok() {
        let current = main.borrow_and_update().clone();
        Display::show_music_change(&previous, &current);
        previous = current;
    }
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
