//! Executor states and legal transitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a [`super::DryRunExecutor`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    Idle,
    Simulated,
    AwaitingConfirmation,
    Executed,
    Aborted,
}

impl ExecutorState {
    /// Whether moving from `self` to `to` is allowed. `dry_run` decides
    /// whether the simulation phase may be skipped.
    pub fn can_transition_to(&self, to: ExecutorState, dry_run: bool) -> bool {
        use ExecutorState::*;
        matches!(
            (self, to),
            (Idle, Simulated)
                | (Simulated, AwaitingConfirmation)
                | (AwaitingConfirmation, Executed)
                | (AwaitingConfirmation, Aborted)
        ) || (!dry_run && *self == Idle && to == Executed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Aborted)
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Simulated => "simulated",
            Self::AwaitingConfirmation => "awaiting confirmation",
            Self::Executed => "executed",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}
