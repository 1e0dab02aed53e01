//! # Mutation Engine
//!
//! Follow and unfollow, single and batched.
//!
//! Every mutation:
//! - Is validated before anything is written
//! - Is idempotent: re-following or re-unfollowing writes nothing
//! - Commits to the durable store before it becomes visible to readers

use crate::graph::{GraphWriter, SocialGraph};
use crate::primitives::MAX_BATCH_EDGES;
use crate::storage::EdgeStore;
use crate::{Edge, EdgeOp, GraphError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Whether a mutation changed the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    /// The edge was added or removed.
    Applied,
    /// The graph already matched the request.
    Unchanged,
}

/// How a batch reacts to a failing pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchPolicy {
    /// Attempt every pair and report each outcome.
    #[default]
    ContinueOnError,
    /// Stop at the first failure; later pairs are skipped. Pairs before
    /// the failure stay applied.
    StopOnFirstError,
}

impl FromStr for BatchPolicy {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "continue-on-error" => Ok(Self::ContinueOnError),
            "stop-on-first-error" => Ok(Self::StopOnFirstError),
            other => Err(GraphError::Config(format!(
                "unknown batch policy '{}' (expected continue-on-error or stop-on-first-error)",
                other
            ))),
        }
    }
}

/// Outcome of one pair in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EdgeOutcome {
    Applied,
    Unchanged,
    Failed { error: String },
    Skipped,
}

impl From<MutationOutcome> for EdgeOutcome {
    fn from(outcome: MutationOutcome) -> Self {
        match outcome {
            MutationOutcome::Applied => Self::Applied,
            MutationOutcome::Unchanged => Self::Unchanged,
        }
    }
}

/// Per-pair results of a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub applied: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub skipped: usize,
    pub results: Vec<(Edge, EdgeOutcome)>,
}

impl BatchReport {
    fn record(&mut self, edge: Edge, outcome: EdgeOutcome) {
        match outcome {
            EdgeOutcome::Applied => self.applied += 1,
            EdgeOutcome::Unchanged => self.unchanged += 1,
            EdgeOutcome::Failed { .. } => self.failed += 1,
            EdgeOutcome::Skipped => self.skipped += 1,
        }
        self.results.push((edge, outcome));
    }

    /// Whether every pair succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }
}

/// Stateless mutation operations over a `SocialGraph`.
pub struct MutationEngine;

impl MutationEngine {
    /// Record that `edge.source` follows `edge.target`.
    pub fn follow<S: EdgeStore>(
        graph: &SocialGraph<S>,
        edge: &Edge,
    ) -> Result<MutationOutcome, GraphError> {
        edge.validate()?;
        let writer = graph.writer()?;
        Self::apply(&writer, edge, EdgeOp::Insert)
    }

    /// Remove the follow from `edge.source` to `edge.target`.
    pub fn unfollow<S: EdgeStore>(
        graph: &SocialGraph<S>,
        edge: &Edge,
    ) -> Result<MutationOutcome, GraphError> {
        edge.validate_actors()?;
        let writer = graph.writer()?;
        Self::apply(&writer, edge, EdgeOp::Delete)
    }

    /// Follow every pair in `edges`.
    pub fn follow_many<S: EdgeStore>(
        graph: &SocialGraph<S>,
        edges: &[Edge],
        policy: BatchPolicy,
    ) -> Result<BatchReport, GraphError> {
        Self::apply_batch(graph, edges, EdgeOp::Insert, policy)
    }

    /// Unfollow every pair in `edges`.
    pub fn unfollow_many<S: EdgeStore>(
        graph: &SocialGraph<S>,
        edges: &[Edge],
        policy: BatchPolicy,
    ) -> Result<BatchReport, GraphError> {
        Self::apply_batch(graph, edges, EdgeOp::Delete, policy)
    }

    fn apply<S: EdgeStore>(
        writer: &GraphWriter<'_, S>,
        edge: &Edge,
        op: EdgeOp,
    ) -> Result<MutationOutcome, GraphError> {
        let present = writer.contains(edge);
        let noop = match op {
            EdgeOp::Insert => present,
            EdgeOp::Delete => !present,
        };
        if noop {
            return Ok(MutationOutcome::Unchanged);
        }
        writer.commit(edge, op)?;
        tracing::debug!(edge = %edge, op = ?op, "edge committed");
        Ok(MutationOutcome::Applied)
    }

    /// Apply a batch under a single hold of the writer gate.
    ///
    /// Each pair is persisted and applied on its own, so a failure part way
    /// through never rolls back earlier pairs.
    fn apply_batch<S: EdgeStore>(
        graph: &SocialGraph<S>,
        edges: &[Edge],
        op: EdgeOp,
        policy: BatchPolicy,
    ) -> Result<BatchReport, GraphError> {
        if edges.is_empty() {
            return Err(GraphError::EmptyBatch);
        }
        if edges.len() > MAX_BATCH_EDGES {
            return Err(GraphError::BatchTooLarge {
                size: edges.len(),
                max: MAX_BATCH_EDGES,
            });
        }

        let writer = graph.writer()?;
        let mut report = BatchReport::default();
        let mut stopped = false;

        for edge in edges {
            if stopped {
                report.record(edge.clone(), EdgeOutcome::Skipped);
                continue;
            }
            let result = match op {
                EdgeOp::Insert => edge.validate().and_then(|()| Self::apply(&writer, edge, op)),
                EdgeOp::Delete => edge
                    .validate_actors()
                    .and_then(|()| Self::apply(&writer, edge, op)),
            };
            match result {
                Ok(outcome) => report.record(edge.clone(), outcome.into()),
                Err(e) => {
                    tracing::warn!(edge = %edge, error = %e, "batch pair failed");
                    report.record(
                        edge.clone(),
                        EdgeOutcome::Failed {
                            error: e.to_string(),
                        },
                    );
                    stopped = policy == BatchPolicy::StopOnFirstError;
                }
            }
        }

        tracing::info!(
            op = ?op,
            applied = report.applied,
            unchanged = report.unchanged,
            failed = report.failed,
            skipped = report.skipped,
            "batch mutation finished"
        );
        Ok(report)
    }
}

// =============================================================================
// TESTS
// =============================================================================
