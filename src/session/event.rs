//! Events processed by the session controller.

use tokio::sync::oneshot;

use crate::audio::FinishedTrack;

/// A user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Start (or resume) the countdown
    Start,
    /// Pause the countdown
    Pause,
    /// Restart the work interval
    Reset {
        /// Keep running after the reset
        auto_start: bool,
    },
    /// Skip to the next track (work interval only)
    Skip,
    /// Store new durations, as typed by the user
    Configure {
        /// Work minutes input
        work_minutes: String,
        /// Break minutes input
        break_minutes: String,
    },
}

impl SessionCommand {
    /// Returns the command name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Reset { .. } => "reset",
            Self::Skip => "skip",
            Self::Configure { .. } => "configure",
        }
    }
}

/// Everything that can change the session, in arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// A user command
    Command(SessionCommand),
    /// The countdown for `epoch` reached zero
    CountdownExpired {
        /// Epoch the countdown was started for
        epoch: u64,
    },
    /// The main track played to its end
    TrackFinished(FinishedTrack),
    /// Replies once every earlier event has been handled
    Sync(oneshot::Sender<()>),
    /// Releases audio and stops the controller
    Shutdown,
}

impl From<SessionCommand> for SessionEvent {
    fn from(command: SessionCommand) -> Self {
        Self::Command(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(SessionCommand::Start.as_str(), "start");
        assert_eq!(SessionCommand::Reset { auto_start: true }.as_str(), "reset");
        assert_eq!(
            SessionCommand::Configure {
                work_minutes: "10".into(),
                break_minutes: "2".into()
            }
            .as_str(),
            "configure"
        );
    }

    #[test]
    fn test_from_command() {
        let event: SessionEvent = SessionCommand::Skip.into();
        assert!(matches!(event, SessionEvent::Command(SessionCommand::Skip)));
    }
}
