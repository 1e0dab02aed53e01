//! # Core Type Definitions
//!
//! This module contains the core types of the follow-graph engine:
//! - Actor identifiers (`ActorId`)
//! - Edges and the two adjacency directions (`Edge`, `Direction`, `EdgeOp`)
//! - Error types (`GraphError`)
//!
//! ## Ordering Guarantees
//!
//! `ActorId` orders by the raw bytes of the identifier, so every
//! `BTreeSet<ActorId>` iterates in lexicographic order. All query results
//! inherit this order.

use crate::primitives::MAX_ACTOR_ID_LENGTH;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// =============================================================================
// ACTOR IDENTIFIER
// =============================================================================

/// Opaque, globally unique identifier of an actor.
///
/// Backed by `Arc<str>`: the graph index interns identifiers, so cloning an
/// `ActorId` into another adjacency set never copies the bytes.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(Arc<str>);

impl ActorId {
    /// Wrap an identifier without validating it.
    ///
    /// Used for identifiers read back from the store, which were validated
    /// when first written.
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Parse an externally supplied identifier.
    ///
    /// Rejects empty identifiers, identifiers longer than
    /// `MAX_ACTOR_ID_LENGTH` bytes, and identifiers containing whitespace,
    /// control characters or `,`.
    pub fn parse(raw: &str) -> Result<Self, GraphError> {
        check_identifier(raw)?;
        Ok(Self(Arc::from(raw)))
    }

    /// Apply the `parse` rules to an identifier built without them.
    pub fn validate(&self) -> Result<(), GraphError> {
        check_identifier(&self.0)
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn check_identifier(raw: &str) -> Result<(), GraphError> {
    if raw.is_empty() {
        return Err(GraphError::InvalidActor("identifier is empty".to_string()));
    }
    if raw.len() > MAX_ACTOR_ID_LENGTH {
        return Err(GraphError::InvalidActor(format!(
            "identifier length {} exceeds maximum {} bytes",
            raw.len(),
            MAX_ACTOR_ID_LENGTH
        )));
    }
    if let Some(bad) = raw
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || *c == ',')
    {
        return Err(GraphError::InvalidActor(format!(
            "identifier contains forbidden character {:?}",
            bad
        )));
    }
    Ok(())
}

impl Borrow<str> for ActorId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({:?})", &*self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ActorId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl Serialize for ActorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ActorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw))
    }
}

// =============================================================================
// EDGES
// =============================================================================

/// A directed follow relationship: `source` follows `target`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: ActorId,
    pub target: ActorId,
}

impl Edge {
    /// Create an edge without validation.
    #[must_use]
    pub fn new(source: impl Into<ActorId>, target: impl Into<ActorId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Parse and validate both endpoints, rejecting self-follows.
    pub fn parse(source: &str, target: &str) -> Result<Self, GraphError> {
        let edge = Self::new(source, target);
        edge.validate()?;
        Ok(edge)
    }

    /// Check both identifiers and reject self-follows.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.validate_actors()?;
        if self.is_self_loop() {
            return Err(GraphError::SelfFollow(self.source.clone()));
        }
        Ok(())
    }

    /// Check both identifiers.
    pub fn validate_actors(&self) -> Result<(), GraphError> {
        self.source.validate()?;
        self.target.validate()
    }

    /// Whether source and target are the same actor.
    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// One of the two adjacency directions kept for every actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Actors this actor follows.
    Following,
    /// Actors that follow this actor.
    Followers,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Following => Self::Followers,
            Self::Followers => Self::Following,
        }
    }
}

/// Operation applied to a single edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeOp {
    Insert,
    Delete,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the graph engine.
///
/// - Validation errors leave the graph unchanged
/// - `Storage` is retryable per operation, fatal at startup
/// - `Corrupted` is never retryable
/// - `Unavailable` is transient (loading or shutting down)
#[derive(Debug, Error)]
pub enum GraphError {
    /// An I/O error in the durable store.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The store contents cannot be trusted.
    #[error("Store corrupted: {0}")]
    Corrupted(String),

    /// An actor tried to follow itself.
    #[error("Actor cannot follow itself: {0}")]
    SelfFollow(ActorId),

    /// An actor identifier failed validation.
    #[error("Invalid actor identifier: {0}")]
    InvalidActor(String),

    /// A batch mutation contained no edges.
    #[error("Batch is empty")]
    EmptyBatch,

    /// A batch mutation exceeded the size limit.
    #[error("Batch of {size} edges exceeds maximum {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// An intersection query named no actors or too many.
    #[error("Intersection needs between 1 and {max} actors, got {count}")]
    TooManyActors { count: usize, max: usize },

    /// The engine is loading or shutting down.
    #[error("Graph unavailable: {0}")]
    Unavailable(&'static str),

    /// The bulk edge source is unreadable or empty.
    #[error("Bulk source error: {0}")]
    BulkSource(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error outside the store (sockets, config files).
    #[error("I/O error: {0}")]
    Io(String),
}

impl GraphError {
    /// Whether the error was caused by caller input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::SelfFollow(_)
                | Self::InvalidActor(_)
                | Self::EmptyBatch
                | Self::BatchTooLarge { .. }
                | Self::TooManyActors { .. }
        )
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Unavailable(_))
    }

    /// Short machine-readable category.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Storage(_) | Self::Io(_) => "storage",
            Self::Corrupted(_) => "corrupted",
            Self::Unavailable(_) => "unavailable",
            Self::BulkSource(_) => "bulk_source",
            Self::Config(_) => "config",
            _ => "validation",
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
