// Workflow lifecycle state machine
//
// pending -> running -> {completed | failed | cancelled}. Terminal states
// swallow every event, so nothing ever leaves them.

use statig::prelude::*;

use super::error::WorkflowError;
use super::types::WorkflowState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Start,
    Complete,
    Fail { error: String },
    Cancel,
}

impl LifecycleEvent {
    fn required_state(&self) -> WorkflowState {
        match self {
            LifecycleEvent::Start => WorkflowState::Pending,
            _ => WorkflowState::Running,
        }
    }
}

#[derive(Debug)]
pub struct WorkflowLifecycle {
    workflow_id: String,
    state: WorkflowState,
    last_error: Option<String>,
}

impl WorkflowLifecycle {
    pub fn new(workflow_id: String) -> Self {
        Self {
            workflow_id,
            state: WorkflowState::Pending,
            last_error: None,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn ignore(&self, event: &LifecycleEvent) -> Outcome<State> {
        tracing::debug!(
            workflow_id = %self.workflow_id,
            state = %self.state,
            event = ?event,
            "Ignoring lifecycle event"
        );
        Handled
    }
}

#[state_machine(initial = "State::pending()")]
impl WorkflowLifecycle {
    #[state]
    fn pending(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Start => {
                self.state = WorkflowState::Running;
                Transition(State::running())
            }
            _ => self.ignore(event),
        }
    }

    #[state]
    fn running(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        match event {
            LifecycleEvent::Complete => {
                self.state = WorkflowState::Completed;
                Transition(State::completed())
            }
            LifecycleEvent::Fail { error } => {
                self.state = WorkflowState::Failed;
                self.last_error = Some(error.clone());
                Transition(State::failed())
            }
            LifecycleEvent::Cancel => {
                self.state = WorkflowState::Cancelled;
                self.last_error = Some("cancelled".to_string());
                Transition(State::cancelled())
            }
            LifecycleEvent::Start => self.ignore(event),
        }
    }

    #[state]
    fn completed(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        self.ignore(event)
    }

    #[state]
    fn failed(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        self.ignore(event)
    }

    #[state]
    fn cancelled(&mut self, event: &LifecycleEvent) -> Outcome<State> {
        self.ignore(event)
    }
}

/// Wrapper that turns ignored events into errors
pub struct Lifecycle {
    machine: StateMachine<WorkflowLifecycle>,
}

impl Lifecycle {
    pub fn new(workflow_id: &str) -> Self {
        Self {
            machine: WorkflowLifecycle::new(workflow_id.to_string()).state_machine(),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.machine.inner().state()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.machine.inner().last_error()
    }

    pub fn apply(&mut self, event: LifecycleEvent) -> Result<WorkflowState, WorkflowError> {
        let before = self.state();
        self.machine.handle(&event);
        let after = self.state();

        if before == after {
            return Err(WorkflowError::InvalidState {
                id: self.machine.inner().workflow_id.clone(),
                actual: before,
                expected: event.required_state(),
            });
        }
        Ok(after)
    }
}
