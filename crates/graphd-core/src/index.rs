//! # Graph Index
//!
//! In-memory adjacency sets for every actor. All reads are served from here.
//!
//! Every edge `a -> b` is held twice: `b` in `a`'s following set and `a` in
//! `b`'s followers set. `apply` updates both sets before returning, and the
//! index is only ever mutated behind the exclusive side of the lock in
//! `SocialGraph`, so no reader can observe one side without the other.
//!
//! Uses `BTreeMap`/`BTreeSet` so iteration is always sorted.

use crate::storage::EdgeStore;
use crate::{ActorId, Direction, Edge, EdgeOp, GraphError};
use std::collections::{BTreeMap, BTreeSet};

/// The two adjacency sets of one actor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    /// Actors this actor follows.
    pub following: BTreeSet<ActorId>,
    /// Actors that follow this actor.
    pub followers: BTreeSet<ActorId>,
}

impl Adjacency {
    fn set(&self, direction: Direction) -> &BTreeSet<ActorId> {
        match direction {
            Direction::Following => &self.following,
            Direction::Followers => &self.followers,
        }
    }

    fn is_empty(&self) -> bool {
        self.following.is_empty() && self.followers.is_empty()
    }
}

/// Shared empty set returned for unknown actors.
static EMPTY: BTreeSet<ActorId> = BTreeSet::new();

/// In-memory follow graph.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    actors: BTreeMap<ActorId, Adjacency>,
    edge_count: usize,
}

impl GraphIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a stream of edges.
    ///
    /// Self-loops are ignored and duplicates collapse.
    pub fn from_edges(edges: impl IntoIterator<Item = Edge>) -> Self {
        let mut index = Self::new();
        for edge in edges {
            if !edge.is_self_loop() {
                index.apply(&edge, EdgeOp::Insert);
            }
        }
        index
    }

    /// Rebuild an index from a durable store.
    ///
    /// The following side is scanned to build the index, then every
    /// followers-side key is checked against it. Any disagreement between
    /// the two sides is reported as `Corrupted`.
    pub fn load_from_store<S: EdgeStore + ?Sized>(store: &S) -> Result<Self, GraphError> {
        let mut index = Self::new();
        for edge in store.scan_edges(Direction::Following)? {
            let edge = edge?;
            if edge.is_self_loop() {
                return Err(GraphError::Corrupted(format!("stored self-follow {}", edge)));
            }
            index.apply(&edge, EdgeOp::Insert);
        }

        let mut reverse_keys = 0usize;
        for edge in store.scan_edges(Direction::Followers)? {
            let edge = edge?;
            if !index.contains(&edge.source, &edge.target) {
                return Err(GraphError::Corrupted(format!(
                    "followers side records {} but following side does not",
                    edge
                )));
            }
            reverse_keys += 1;
        }
        if reverse_keys != index.edge_count {
            return Err(GraphError::Corrupted(format!(
                "following side holds {} edges, followers side {}",
                index.edge_count, reverse_keys
            )));
        }

        tracing::debug!(
            actors = index.actor_count(),
            edges = index.edge_count,
            "rebuilt graph index from store"
        );
        Ok(index)
    }

    /// Apply one edge operation to both adjacency sets.
    ///
    /// Returns `true` if the graph changed. Actors left with no edges in
    /// either direction are dropped.
    pub fn apply(&mut self, edge: &Edge, op: EdgeOp) -> bool {
        match op {
            EdgeOp::Insert => self.insert(edge),
            EdgeOp::Delete => self.remove(edge),
        }
    }

    fn insert(&mut self, edge: &Edge) -> bool {
        if self.contains(&edge.source, &edge.target) {
            return false;
        }
        let source = self.intern(&edge.source);
        let target = self.intern(&edge.target);

        self.actors
            .entry(source.clone())
            .or_default()
            .following
            .insert(target.clone());
        self.actors
            .entry(target)
            .or_default()
            .followers
            .insert(source);
        self.edge_count += 1;
        true
    }

    fn remove(&mut self, edge: &Edge) -> bool {
        let removed = match self.actors.get_mut(edge.source.as_str()) {
            Some(adjacency) => adjacency.following.remove(edge.target.as_str()),
            None => false,
        };
        if !removed {
            return false;
        }
        if let Some(adjacency) = self.actors.get_mut(edge.target.as_str()) {
            adjacency.followers.remove(edge.source.as_str());
        }
        self.edge_count -= 1;
        self.prune(&edge.source);
        self.prune(&edge.target);
        true
    }

    /// Reuse the stored `Arc` for a known actor.
    fn intern(&self, actor: &ActorId) -> ActorId {
        self.actors
            .get_key_value(actor.as_str())
            .map(|(known, _)| known.clone())
            .unwrap_or_else(|| actor.clone())
    }

    fn prune(&mut self, actor: &ActorId) {
        if self
            .actors
            .get(actor.as_str())
            .is_some_and(Adjacency::is_empty)
        {
            self.actors.remove(actor.as_str());
        }
    }

    /// Whether `source` follows `target`.
    #[must_use]
    pub fn contains(&self, source: &ActorId, target: &ActorId) -> bool {
        self.actors
            .get(source.as_str())
            .is_some_and(|adjacency| adjacency.following.contains(target.as_str()))
    }

    /// Adjacency set of an actor in one direction; empty for unknown actors.
    #[must_use]
    pub fn adjacent(&self, actor: &ActorId, direction: Direction) -> &BTreeSet<ActorId> {
        self.actors
            .get(actor.as_str())
            .map(|adjacency| adjacency.set(direction))
            .unwrap_or(&EMPTY)
    }

    /// Actors `actor` follows.
    #[must_use]
    pub fn following(&self, actor: &ActorId) -> &BTreeSet<ActorId> {
        self.adjacent(actor, Direction::Following)
    }

    /// Actors following `actor`.
    #[must_use]
    pub fn followers(&self, actor: &ActorId) -> &BTreeSet<ActorId> {
        self.adjacent(actor, Direction::Followers)
    }

    /// Number of actors with at least one edge.
    #[must_use]
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Iterate all edges, sorted by source then target.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.actors.iter().flat_map(|(source, adjacency)| {
            adjacency
                .following
                .iter()
                .map(move |target| Edge::new(source.clone(), target.clone()))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
