//! Rebase-tag-push retry loop as an explicit state machine.
//!
//! [PublishState::next] is a pure function of the current state, the
//! outcome of the step just performed, and the [RetryPlan]. The
//! orchestrator performs the side effect each state names and feeds the
//! outcome back in until a terminal state is reached.

use crate::hg::FailureKind;

/// Default ceiling on push attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Fixed parameters of one retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPlan {
    pub max_attempts: u32,
    pub tag: bool,
}

/// Outcome of the step a state performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Failed(FailureKind),
}

/// Where the loop is. `attempt` counts from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishState {
    Rebasing { attempt: u32 },
    Tagging { attempt: u32 },
    Pushing { attempt: u32 },
    Done { attempts: u32 },
    Fatal { attempt: u32 },
    Exhausted { attempts: u32 },
}

impl PublishState {
    pub fn start() -> Self {
        PublishState::Rebasing { attempt: 1 }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PublishState::Done { .. } | PublishState::Fatal { .. } | PublishState::Exhausted { .. }
        )
    }

    /// Transition after performing this state's step.
    ///
    /// Only a conflicting push loops back to rebasing, and only while
    /// attempts remain. Every other failure is fatal immediately.
    pub fn next(self, outcome: StepOutcome, plan: &RetryPlan) -> Self {
        use PublishState::*;
        use StepOutcome::*;

        match (self, outcome) {
            (Rebasing { attempt }, Succeeded) if plan.tag => Tagging { attempt },
            (Rebasing { attempt }, Succeeded) => Pushing { attempt },
            (Rebasing { attempt }, Failed(_)) => Fatal { attempt },

            (Tagging { attempt }, Succeeded) => Pushing { attempt },
            (Tagging { attempt }, Failed(_)) => Fatal { attempt },

            (Pushing { attempt }, Succeeded) => Done { attempts: attempt },
            (Pushing { attempt }, Failed(FailureKind::Conflict)) if attempt < plan.max_attempts => {
                Rebasing {
                    attempt: attempt + 1,
                }
            }
            (Pushing { attempt }, Failed(FailureKind::Conflict)) => Exhausted { attempts: attempt },
            (Pushing { attempt }, Failed(FailureKind::Fatal)) => Fatal { attempt },

            (terminal, _) => terminal,
        }
    }
}
