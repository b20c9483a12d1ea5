//! Display utilities for the Pomodoro player CLI.
//!
//! This module provides formatted output for:
//! - Phase changes
//! - Status display
//! - Configuration
//! - Error messages

use std::path::Path;

use crate::audio::{AudioSnapshot, HandleState};
use crate::settings::AppConfig;
use crate::types::{SessionConfig, SessionPhase, SessionState};

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows the title and the available commands.
    pub fn show_banner(config: &SessionConfig, track_count: usize) {
        println!("Po-Fi");
        println!("─────────────────────────────");
        println!(
            "作業 {}分 / 休憩 {}分 / {}曲",
            config.work_minutes(),
            config.break_minutes(),
            track_count
        );
        Self::show_help();
    }

    /// Shows the interactive commands.
    pub fn show_help() {
        println!("コマンド:");
        println!("  start              タイマーを開始");
        println!("  pause              一時停止");
        println!("  reset              作業を最初からやり直して開始");
        println!("  reset hold         作業を最初に戻して停止");
        println!("  skip               次の曲へ (作業中のみ)");
        println!("  config <作業> <休憩>  時間を分で設定 (次のリセットから反映)");
        println!("  status             現在の状態を表示");
        println!("  quit               終了");
    }

    /// Shows a phase change.
    pub fn show_phase_change(state: &SessionState) {
        match state.phase {
            SessionPhase::Break => println!(
                "* 休憩を開始しました ({})",
                Self::format_time(state.remaining_seconds)
            ),
            SessionPhase::Work => println!(
                "* 休憩が終わりました。start で作業を開始します ({})",
                Self::format_time(state.remaining_seconds)
            ),
        }
    }

    /// Shows a running/paused change.
    pub fn show_running_change(state: &SessionState, remaining: u32) {
        if state.is_running {
            println!("> タイマーを開始しました (残り {})", Self::format_time(remaining));
        } else {
            println!("|| タイマーを一時停止しました (残り {})", Self::format_time(remaining));
        }
    }

    /// Shows a reset.
    pub fn show_reset(state: &SessionState) {
        println!(
            "[] 作業をリセットしました ({})",
            Self::format_time(state.remaining_seconds)
        );
    }

    /// Shows the track that just started, if the music moved on.
    pub fn show_music_change(previous: &HandleState, current: &HandleState) {
        if let Some(line) = Self::now_playing_line(previous, current) {
            println!("{}", line);
        }
    }

    /// Line announcing a newly started track.
    ///
    /// Resuming or replaying the same track is not announced.
    pub fn now_playing_line(previous: &HandleState, current: &HandleState) -> Option<String> {
        let HandleState::Playing(track) = current else {
            return None;
        };
        if previous.track() == Some(track) {
            return None;
        }
        Some(format!("♪ {}", track.display_name()))
    }

    /// Shows the current session status.
    pub fn show_status(state: &SessionState, remaining: u32, audio: Option<&AudioSnapshot>) {
        for line in Self::status_lines(state, remaining, audio) {
            println!("{}", line);
        }
    }

    /// Shows newly stored durations.
    pub fn show_config_updated(config: &SessionConfig) {
        println!(
            "* 設定を保存しました: 作業 {}分 / 休憩 {}分 (次のリセットから反映)",
            config.work_minutes(),
            config.break_minutes()
        );
    }

    /// Shows the effective configuration file contents.
    pub fn show_config(config: &AppConfig, path: Option<&Path>) {
        match path {
            Some(path) => println!("設定ファイル: {}", path.display()),
            None => println!("設定ファイル: (なし)"),
        }
        println!("─────────────────────────────");
        println!("作業時間: {}分", config.work_minutes);
        println!("休憩時間: {}分", config.break_minutes);
        println!("プレイリスト: {}", config.playlist.display());
        println!("効果音: {}", config.cues.display());
        println!("振動: {}ms", config.vibration_ms);
        println!("サウンド: {}", if config.sound { "有効" } else { "無効" });
    }

    /// Shows a message for a freshly written configuration file.
    pub fn show_config_created(path: &Path) {
        println!("* 設定ファイルを作成しました: {}", path.display());
    }

    /// Shows the farewell message.
    pub fn show_goodbye() {
        println!("おつかれさまでした");
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    /// Shows a non-fatal warning with a hint.
    pub fn show_warning(message: &str, suggestion: &str) {
        eprintln!("警告: {}", message);
        eprintln!("  {}", suggestion);
    }

    /// Builds the status lines.
    pub fn status_lines(
        state: &SessionState,
        remaining: u32,
        audio: Option<&AudioSnapshot>,
    ) -> Vec<String> {
        let mut lines = vec![
            format!(
                "状態: {}{}",
                Self::phase_label(state.phase),
                if state.is_running { "中" } else { " (停止中)" }
            ),
            format!("残り時間: {}", Self::format_time(remaining)),
        ];

        if let Some(audio) = audio {
            let music = match &audio.main {
                HandleState::Playing(track) => format!("再生中 - {}", track.display_name()),
                HandleState::Paused(track) => format!("一時停止 - {}", track.display_name()),
                HandleState::Loaded(track) => format!("停止 - {}", track.display_name()),
                HandleState::Loading => "読み込み中".to_string(),
                HandleState::Unloaded => {
                    format!("次の曲 - {}", audio.current_track.display_name())
                }
            };
            lines.push(format!("音楽: {}", music));
        }

        lines
    }

    /// Returns the Japanese label of a phase.
    pub fn phase_label(phase: SessionPhase) -> &'static str {
        match phase {
            SessionPhase::Work => "作業",
            SessionPhase::Break => "休憩",
        }
    }

    /// Formats seconds as `MM:SS`.
    pub fn format_time(total_seconds: u32) -> String {
        format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::TrackRef;

    // ------------------------------------------------------------------------
    // Format Time Tests
    // ------------------------------------------------------------------------

    mod format_time_tests {
        use super::*;

        #[test]
        fn test_format_time_zero() {
            assert_eq!(Display::format_time(0), "00:00");
        }

        #[test]
        fn test_format_time_mixed() {
            assert_eq!(Display::format_time(90), "01:30");
        }

        #[test]
        fn test_format_time_25_minutes() {
            assert_eq!(Display::format_time(25 * 60), "25:00");
        }

        #[test]
        fn test_format_time_over_an_hour() {
            assert_eq!(Display::format_time(120 * 60 + 59), "120:59");
        }
    }

    // ------------------------------------------------------------------------
    // Status Tests
    // ------------------------------------------------------------------------

    mod status_tests {
        use super::*;

        fn snapshot(main: HandleState) -> AudioSnapshot {
            AudioSnapshot {
                main,
                cue: HandleState::Unloaded,
                cursor_index: 1,
                current_track: TrackRef::new("/m/b.mp3").with_title("B"),
            }
        }

        #[test]
        fn test_running_work() {
            let mut state = SessionState::new(&SessionConfig::default());
            state.is_running = true;
            let audio = snapshot(HandleState::Playing(
                TrackRef::new("/m/b.mp3").with_title("B"),
            ));

            let lines = Display::status_lines(&state, 1499, Some(&audio));
            assert_eq!(lines[0], "状態: 作業中");
            assert_eq!(lines[1], "残り時間: 24:59");
            assert_eq!(lines[2], "音楽: 再生中 - B");
        }

        #[test]
        fn test_idle_with_next_track() {
            let state = SessionState::new(&SessionConfig::default());
            let audio = snapshot(HandleState::Unloaded);

            let lines = Display::status_lines(&state, 1500, Some(&audio));
            assert_eq!(lines[0], "状態: 作業 (停止中)");
            assert_eq!(lines[2], "音楽: 次の曲 - B");
        }

        #[test]
        fn test_now_playing_announces_new_track() {
            let a = TrackRef::new("/m/a.mp3").with_title("A");
            let b = TrackRef::new("/m/b.mp3").with_title("B");

            assert_eq!(
                Display::now_playing_line(&HandleState::Loading, &HandleState::Playing(a.clone())),
                Some("♪ A".to_string())
            );
            assert_eq!(
                Display::now_playing_line(&HandleState::Playing(a.clone()), &HandleState::Playing(b)),
                Some("♪ B".to_string())
            );
        }

        #[test]
        fn test_now_playing_quiet_on_resume_and_stop() {
            let a = TrackRef::new("/m/a.mp3");

            assert_eq!(
                Display::now_playing_line(&HandleState::Paused(a.clone()), &HandleState::Playing(a.clone())),
                None
            );
            assert_eq!(
                Display::now_playing_line(&HandleState::Playing(a), &HandleState::Unloaded),
                None
            );
        }

        #[test]
        fn test_without_audio() {
            let state = SessionState::new(&SessionConfig::default());
            assert_eq!(Display::status_lines(&state, 1500, None).len(), 2);
        }
    }

    // ------------------------------------------------------------------------
    // Display Output Tests
    // ------------------------------------------------------------------------

    mod display_tests {
        use super::*;

        #[test]
        fn test_show_functions_do_not_panic() {
            let config = SessionConfig::default();
            let mut state = SessionState::new(&config);

            Display::show_banner(&config, 3);
            Display::show_running_change(&state, 1500);
            state.enter(SessionPhase::Break, &config, true);
            Display::show_phase_change(&state);
            Display::show_reset(&state);
            Display::show_status(&state, 300, None);
            Display::show_config_updated(&config);
            Display::show_config(&AppConfig::default(), None);
            Display::show_error("Test error message");
            Display::show_warning("warning", "hint");
        }

        #[test]
        fn test_phase_label() {
            assert_eq!(Display::phase_label(SessionPhase::Work), "作業");
            assert_eq!(Display::phase_label(SessionPhase::Break), "休憩");
        }
    }
}
