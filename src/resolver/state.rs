//! Resolution state machine.
//!
//! ```text
//! Idle -> TryingCandidate(0) -> Playing(i)
//!                            -> TryingCandidate(i + 1) -> ...
//!                            -> Exhausted
//!                            -> Cancelled
//! ```
//!
//! The candidate index only moves forward, so a candidate that failed is
//! never attempted again within the same session.

use serde::{Deserialize, Serialize};

/// State of one resolution session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum ResolveState {
    /// No candidate attempted yet
    Idle,

    /// Candidate `i` is the active source and a load is in flight
    TryingCandidate(usize),

    /// Candidate `i` loaded; no further attempts are made
    Playing(usize),

    /// Every candidate failed
    Exhausted,

    /// The session was superseded or aborted
    Cancelled,
}

impl ResolveState {
    /// Enter the first candidate (or exhaustion, for an empty list)
    pub fn start(self, candidates: usize) -> Self {
        match self {
            ResolveState::Idle if candidates == 0 => ResolveState::Exhausted,
            ResolveState::Idle => ResolveState::TryingCandidate(0),
            other => other,
        }
    }

    /// The active candidate failed to load
    pub fn on_failure(self, candidates: usize) -> Self {
        match self {
            ResolveState::TryingCandidate(i) if i + 1 < candidates => {
                ResolveState::TryingCandidate(i + 1)
            }
            ResolveState::TryingCandidate(_) => ResolveState::Exhausted,
            other => other,
        }
    }

    /// The active candidate loaded
    pub fn on_success(self) -> Self {
        match self {
            ResolveState::TryingCandidate(i) => ResolveState::Playing(i),
            other => other,
        }
    }

    /// The session was cancelled
    pub fn on_cancel(self) -> Self {
        match self {
            ResolveState::Idle | ResolveState::TryingCandidate(_) => ResolveState::Cancelled,
            other => other,
        }
    }

    /// Whether no further transitions can happen
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResolveState::Playing(_) | ResolveState::Exhausted | ResolveState::Cancelled
        )
    }
}

impl std::fmt::Display for ResolveState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveState::Idle => write!(f, "idle"),
            ResolveState::TryingCandidate(i) => write!(f, "trying candidate {}", i),
            ResolveState::Playing(i) => write!(f, "playing candidate {}", i),
            ResolveState::Exhausted => write!(f, "exhausted"),
            ResolveState::Cancelled => write!(f, "cancelled"),
        }
    }
}
