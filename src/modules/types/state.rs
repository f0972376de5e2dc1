//! Execution state of a registered query

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state stored in `status.status` of every query record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionState {
    /// Registered, never executed
    #[default]
    Unknown,
    /// Remote call in flight
    Running,
    /// Remote call succeeded and output was stored
    Done,
    /// Remote call or output storage failed
    Error,
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Unknown => write!(f, "unknown"),
            ExecutionState::Running => write!(f, "running"),
            ExecutionState::Done => write!(f, "done"),
            ExecutionState::Error => write!(f, "error"),
        }
    }
}

impl FromStr for ExecutionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(ExecutionState::Unknown),
            "running" => Ok(ExecutionState::Running),
            "done" => Ok(ExecutionState::Done),
            "error" => Ok(ExecutionState::Error),
            _ => Err(format!("Unknown execution state: {}", s)),
        }
    }
}

impl ExecutionState {
    /// Returns all execution states in lifecycle order
    pub fn all() -> &'static [ExecutionState] {
        &[
            ExecutionState::Unknown,
            ExecutionState::Running,
            ExecutionState::Done,
            ExecutionState::Error,
        ]
    }

    /// Returns true once no further transition is allowed
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Done | ExecutionState::Error)
    }
}
