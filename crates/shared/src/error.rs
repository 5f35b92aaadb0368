use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SessionPhase;

/// A user action was refused because a precondition did not hold.
///
/// Nothing is mutated when one of these is returned; the message is meant to
/// be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select a scenario to begin.")]
    NoScenarioSelected,
    #[error("Unknown scenario '{0}'.")]
    UnknownScenario(String),
    #[error("Type a message before sending.")]
    EmptyMessage,
    #[error("Still waiting for the previous reply.")]
    RequestPending,
    #[error("Conversation ended. Restart the scenario to continue.")]
    SessionEnded,
    #[error("No scenario is running.")]
    NoActiveSession,
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: SessionPhase,
        action: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Protocol,
}

/// Failure of a single dialogue-engine exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("dialogue engine did not answer in time")]
    Timeout,
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl EngineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Transport(_) | Self::Timeout => FailureKind::Transport,
            Self::Protocol(_) => FailureKind::Protocol,
        }
    }
}
