//! Parser for the interactive session prompt.

use crate::session::SessionCommand;

/// A line typed at the session prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptCommand {
    /// Forward to the session
    Session(SessionCommand),
    /// Print the current status
    Status,
    /// Print the command list
    Help,
    /// End the session
    Quit,
}

/// Parses one prompt line.
///
/// Returns `Ok(None)` for a blank line.
///
/// # Errors
///
/// Returns a user-facing message for unknown commands or wrong arguments.
pub fn parse_prompt(line: &str) -> Result<Option<PromptCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match (word.to_lowercase().as_str(), args.as_slice()) {
        ("start", []) => PromptCommand::Session(SessionCommand::Start),
        ("pause", []) => PromptCommand::Session(SessionCommand::Pause),
        ("reset", []) => PromptCommand::Session(SessionCommand::Reset { auto_start: true }),
        ("reset", ["hold"]) => PromptCommand::Session(SessionCommand::Reset { auto_start: false }),
        ("skip" | "next", []) => PromptCommand::Session(SessionCommand::Skip),
        ("config", [work, brk]) => PromptCommand::Session(SessionCommand::Configure {
            work_minutes: (*work).to_string(),
            break_minutes: (*brk).to_string(),
        }),
        ("config", _) => return Err("使い方: config <作業(分)> <休憩(分)>".to_string()),
        ("status", []) => PromptCommand::Status,
        ("help" | "?", []) => PromptCommand::Help,
        ("quit" | "exit" | "q", []) => PromptCommand::Quit,
        (_, []) => return Err(format!("不明なコマンドです: {}", word)),
        (_, _) => return Err(format!("引数が正しくありません: {}", line.trim())),
    };

    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line() {
        assert_eq!(parse_prompt(""), Ok(None));
        assert_eq!(parse_prompt("   "), Ok(None));
    }

    #[test]
    fn test_session_commands() {
        assert_eq!(
            parse_prompt("start"),
            Ok(Some(PromptCommand::Session(SessionCommand::Start)))
        );
        assert_eq!(
            parse_prompt(" PAUSE "),
            Ok(Some(PromptCommand::Session(SessionCommand::Pause)))
        );
        assert_eq!(
            parse_prompt("next"),
            Ok(Some(PromptCommand::Session(SessionCommand::Skip)))
        );
    }

    #[test]
    fn test_reset_variants() {
        assert_eq!(
            parse_prompt("reset"),
            Ok(Some(PromptCommand::Session(SessionCommand::Reset {
                auto_start: true
            })))
        );
        assert_eq!(
            parse_prompt("reset hold"),
            Ok(Some(PromptCommand::Session(SessionCommand::Reset {
                auto_start: false
            })))
        );
        assert!(parse_prompt("reset now").is_err());
    }

    #[test]
    fn test_config_passes_raw_input() {
        assert_eq!(
            parse_prompt("config 10 abc"),
            Ok(Some(PromptCommand::Session(SessionCommand::Configure {
                work_minutes: "10".into(),
                break_minutes: "abc".into()
            })))
        );
        assert!(parse_prompt("config 10").is_err());
    }

    #[test]
    fn test_local_commands() {
        assert_eq!(parse_prompt("status"), Ok(Some(PromptCommand::Status)));
        assert_eq!(parse_prompt("?"), Ok(Some(PromptCommand::Help)));
        assert_eq!(parse_prompt("q"), Ok(Some(PromptCommand::Quit)));
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_prompt("dance").unwrap_err();
        assert!(err.contains("dance"));
    }
}
