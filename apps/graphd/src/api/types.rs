//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use graphd_core::{
    ActorId, BatchReport, Edge, EdgeOutcome, GraphError, GraphStats, MutationOutcome,
    primitives::MAX_INTERSECT_ACTORS,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// `?actor=A`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorParams {
    pub actor: String,
}

impl ActorParams {
    pub fn to_actor(&self) -> Result<ActorId, GraphError> {
        ActorId::parse(&self.actor)
    }
}

/// `?source=A&target=B`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairParams {
    pub source: String,
    pub target: String,
}

impl PairParams {
    pub fn to_actors(&self) -> Result<(ActorId, ActorId), GraphError> {
        Ok((ActorId::parse(&self.source)?, ActorId::parse(&self.target)?))
    }
}

/// `?actors=A,B,C`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorsParams {
    pub actors: String,
}

impl ActorsParams {
    /// Split and validate the comma-separated list.
    ///
    /// The count limit is checked before any identifier is parsed so an
    /// oversized list is rejected cheaply.
    pub fn to_actors(&self) -> Result<Vec<ActorId>, GraphError> {
        parse_actor_list(&self.actors)
    }
}

/// Parse a comma-separated actor list. Blank entries are ignored.
pub fn parse_actor_list(raw: &str) -> Result<Vec<ActorId>, GraphError> {
    let parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if parts.is_empty() || parts.len() > MAX_INTERSECT_ACTORS {
        return Err(GraphError::TooManyActors {
            count: parts.len(),
            max: MAX_INTERSECT_ACTORS,
        });
    }
    parts.into_iter().map(ActorId::parse).collect()
}

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub actors: usize,
    pub edges: usize,
}

impl From<GraphStats> for HealthResponse {
    fn from(stats: GraphStats) -> Self {
        Self {
            status: stats.state.name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            actors: stats.actors,
            edges: stats.edges,
        }
    }
}

// =============================================================================
// PAIR QUERY RESPONSE
// =============================================================================

/// Answer to `/doesFollow` and `/areMoots`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairResponse {
    pub source: String,
    pub target: String,
    pub result: bool,
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// One follow relationship in a request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeRequest {
    pub source: String,
    pub target: String,
}

impl EdgeRequest {
    /// Identifiers are validated by the mutation engine, so that a batch
    /// reports a bad identifier against its own pair.
    #[must_use]
    pub fn to_edge(&self) -> Edge {
        Edge::new(self.source.as_str(), self.target.as_str())
    }
}

/// Result of `/follow` and `/unfollow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationResponse {
    pub source: String,
    pub target: String,
    pub status: MutationOutcome,
}

impl MutationResponse {
    pub fn new(edge: &Edge, status: MutationOutcome) -> Self {
        Self {
            source: edge.source.to_string(),
            target: edge.target.to_string(),
            status,
        }
    }
}

/// Per-pair entry in a batch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeResult {
    pub source: String,
    pub target: String,
    #[serde(flatten)]
    pub outcome: EdgeOutcome,
}

/// Result of `/follows` and `/unfollows`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub applied: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<EdgeResult>,
}

impl From<BatchReport> for BatchResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            applied: report.applied,
            unchanged: report.unchanged,
            failed: report.failed,
            skipped: report.skipped,
            results: report
                .results
                .into_iter()
                .map(|(edge, outcome)| EdgeResult {
                    source: edge.source.to_string(),
                    target: edge.target.to_string(),
                    outcome,
                })
                .collect(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx response produced by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}
