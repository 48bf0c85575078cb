//! Saga state machine.

use serde::{Deserialize, Serialize};

/// The state of a saga run.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed
///           ├──► Failed                       (nothing to undo)
///           └──► Compensating ──┬──► Compensated
///                               └──► Inconsistent
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Steps are being executed.
    #[default]
    Running,

    /// A step failed and compensating actions are in progress.
    Compensating,

    /// All steps completed (terminal state).
    Completed,

    /// A step failed before anything needed undoing (terminal state).
    Failed,

    /// Every completed step was undone (terminal state).
    Compensated,

    /// A compensating action failed; stores have diverged (terminal state).
    Inconsistent,
}

impl SagaState {
    /// Returns true if the saga can begin compensation.
    pub fn can_compensate(&self) -> bool {
        matches!(self, SagaState::Running)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Running => "Running",
            SagaState::Compensating => "Compensating",
            SagaState::Completed => "Completed",
            SagaState::Failed => "Failed",
            SagaState::Compensated => "Compensated",
            SagaState::Inconsistent => "Inconsistent",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_running() {
        assert_eq!(SagaState::default(), SagaState::Running);
    }

    #[test]
    fn test_can_compensate() {
        assert!(SagaState::Running.can_compensate());
        assert!(!SagaState::Compensating.can_compensate());
        assert!(!SagaState::Completed.can_compensate());
        assert!(!SagaState::Compensated.can_compensate());
    }

    #[test]
    fn test_display() {
        assert_eq!(SagaState::Compensated.to_string(), "Compensated");
        assert_eq!(SagaState::Inconsistent.to_string(), "Inconsistent");
    }
}
