//! Execution status and its state machine
//!
//! `transition` is the only place that knows which state follows which event.
//! The I/O driver in the runtime applies it and persists the result.

use chrono::{DateTime, Utc};
use querybridge_types::ExecutionState;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{QueryError, Result};

/// Events driving a query through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEvent {
    /// The remote call is about to be issued
    Start,
    /// The remote call returned and its output was stored
    Succeed,
    /// The remote call (or storing its output) failed
    Fail,
}

impl fmt::Display for ExecutionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionEvent::Start => write!(f, "start"),
            ExecutionEvent::Succeed => write!(f, "succeed"),
            ExecutionEvent::Fail => write!(f, "fail"),
        }
    }
}

/// Computes the state reached by applying `event` in state `current`.
///
/// Transitions are monotone: `unknown -> running -> {done, error}`.
pub fn transition(current: ExecutionState, event: ExecutionEvent) -> Result<ExecutionState> {
    match (current, event) {
        (ExecutionState::Unknown, ExecutionEvent::Start) => Ok(ExecutionState::Running),
        (ExecutionState::Running, ExecutionEvent::Succeed) => Ok(ExecutionState::Done),
        (ExecutionState::Running, ExecutionEvent::Fail) => Ok(ExecutionState::Error),
        (from, event) => Err(QueryError::InvalidTransition { from, event }),
    }
}

/// Persisted `status` block of a query record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryStatus {
    pub status: ExecutionState,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub info: String,
}

impl QueryStatus {
    /// Apply an event at time `now`, updating timestamps and diagnostics.
    ///
    /// `info` is only recorded for `Fail`; `Start` clears any stale value.
    pub fn apply(&mut self, event: ExecutionEvent, now: DateTime<Utc>, info: Option<String>) -> Result<()> {
        let next = transition(self.status, event)?;
        match event {
            ExecutionEvent::Start => {
                self.start = Some(now);
                self.end = None;
                self.info.clear();
            }
            ExecutionEvent::Succeed => {
                self.end = Some(now);
            }
            ExecutionEvent::Fail => {
                self.end = Some(now);
                self.info = info
                    .filter(|i| !i.is_empty())
                    .unwrap_or_else(|| "execution failed".to_string());
            }
        }
        self.status = next;
        Ok(())
    }

    /// A fresh `running` status as written by the claim operation
    pub fn running(now: DateTime<Utc>) -> Self {
        Self {
            status: ExecutionState::Running,
            start: Some(now),
            end: None,
            info: String::new(),
        }
    }
}
