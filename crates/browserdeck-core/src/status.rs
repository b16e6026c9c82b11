//! Task lifecycle states as reported by the agent backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a task on the agent backend.
///
/// The backend reports states as plain strings. Values this client does not
/// recognize are carried through unchanged in [`TaskState::Other`] rather
/// than rejected, so a newer backend never breaks an older client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    /// Task accepted, agent still starting up.
    Starting,
    /// Agent actively working.
    Running,
    /// Task finished successfully.
    Completed,
    /// Task finished with an error.
    Failed,
    /// Task was stopped on request.
    Stopped,
    /// Any state string this client does not recognize.
    Other(String),
}

impl TaskState {
    /// Returns true if the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Returns true if the task is still in progress (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// The wire representation of this state.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
            Self::Other(s) => s,
        }
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::Starting
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for TaskState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "starting" => Self::Starting,
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "stopped" => Self::Stopped,
            _ => Self::Other(s),
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        state.as_str().to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_states_round_trip() {
        let state: TaskState = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(state, TaskState::Running);
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"running\"");
    }

    #[test]
    fn test_unknown_state_passes_through() {
        let state: TaskState = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(state, TaskState::Other("paused".to_owned()));
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"paused\"");
        assert!(state.is_active());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Stopped.is_terminal());
        assert!(TaskState::Starting.is_active());
        assert!(TaskState::Running.is_active());
    }
}
