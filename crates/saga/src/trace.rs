//! Per-run record of a saga's progress.

use crate::state::SagaState;

/// Tracks the steps a saga run has completed and where it ended.
///
/// Compensation walks `completed_steps` in reverse.
#[derive(Debug, Clone)]
pub struct SagaTrace {
    saga: &'static str,
    state: SagaState,
    completed_steps: Vec<&'static str>,
    failed_step: Option<&'static str>,
    failure_reason: Option<String>,
}

impl SagaTrace {
    /// Starts a run of `saga`.
    pub fn start(saga: &'static str) -> Self {
        Self {
            saga,
            state: SagaState::Running,
            completed_steps: Vec::new(),
            failed_step: None,
            failure_reason: None,
        }
    }

    pub fn step_completed(&mut self, step: &'static str) {
        tracing::debug!(saga = self.saga, step, "saga step completed");
        self.completed_steps.push(step);
    }

    /// Records a failed step. Moves to `Compensating` if earlier steps need
    /// undoing, otherwise to `Failed`.
    pub fn step_failed(&mut self, step: &'static str, reason: impl Into<String>) {
        self.failed_step = Some(step);
        self.failure_reason = Some(reason.into());
        self.state = if self.state.can_compensate() && !self.completed_steps.is_empty() {
            SagaState::Compensating
        } else {
            SagaState::Failed
        };
    }

    /// Records that a completed step was undone.
    pub fn step_compensated(&mut self, step: &'static str) {
        self.completed_steps.retain(|s| *s != step);
        if self.state == SagaState::Compensating && self.completed_steps.is_empty() {
            self.state = SagaState::Compensated;
        }
    }

    pub fn complete(&mut self) {
        self.state = SagaState::Completed;
    }

    /// Marks the run as having left the stores diverged.
    pub fn inconsistent(&mut self, reason: impl Into<String>) {
        self.state = SagaState::Inconsistent;
        self.failure_reason = Some(reason.into());
    }

    pub fn saga(&self) -> &'static str {
        self.saga
    }

    pub fn state(&self) -> SagaState {
        self.state
    }

    pub fn completed_steps(&self) -> &[&'static str] {
        &self.completed_steps
    }

    pub fn failed_step(&self) -> Option<&'static str> {
        self.failed_step
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}
