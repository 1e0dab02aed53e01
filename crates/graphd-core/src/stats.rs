//! # Engine State and Metrics
//!
//! Lifecycle state of a `SocialGraph` and the counters reported by the
//! health endpoint and the `status` command.

use crate::index::GraphIndex;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// ENGINE STATE
// =============================================================================

/// Lifecycle state of the engine.
///
/// Only `Ready` serves queries and mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EngineState {
    /// Recovering from the store or bulk loading.
    Loading = 0,
    /// Serving traffic.
    Ready = 1,
    /// Rejecting new work and flushing.
    ShuttingDown = 2,
}

impl EngineState {
    /// Decode the value held in the engine's atomic state cell.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Ready,
            2 => Self::ShuttingDown,
            _ => Self::Loading,
        }
    }

    /// Short lowercase name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting_down",
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// GRAPH STATS
// =============================================================================

/// Snapshot of the engine's size and state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Lifecycle state when the snapshot was taken.
    pub state: EngineState,
    /// Actors with at least one edge.
    pub actors: usize,
    /// Follow edges.
    pub edges: usize,
}

impl GraphStats {
    /// Compute stats from an index.
    #[must_use]
    pub fn from_index(index: &GraphIndex, state: EngineState) -> Self {
        Self {
            state,
            actors: index.actor_count(),
            edges: index.edge_count(),
        }
    }
}
