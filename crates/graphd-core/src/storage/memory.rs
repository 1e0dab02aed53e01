//! Volatile `EdgeStore` backed by a single ordered set.

use super::{ActorScan, EdgeScan, EdgeStore};
use crate::formats::StoreManifest;
use crate::{ActorId, Direction, Edge, GraphError};
use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::{PoisonError, RwLock};

/// Composite key: (direction, actor, related actor).
type Key = (Direction, ActorId, ActorId);

/// In-memory store with the same key layout as `RedbStore`.
///
/// Nothing survives the process. Used by tests and benchmarks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: RwLock<BTreeSet<Key>>,
    manifest: RwLock<StoreManifest>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn keys_for(edge: &Edge) -> (Key, Key) {
        (
            (
                Direction::Following,
                edge.source.clone(),
                edge.target.clone(),
            ),
            (
                Direction::Followers,
                edge.target.clone(),
                edge.source.clone(),
            ),
        )
    }
}

fn key_to_edge((direction, actor, related): &Key) -> Edge {
    match direction {
        Direction::Following => Edge::new(actor.clone(), related.clone()),
        Direction::Followers => Edge::new(related.clone(), actor.clone()),
    }
}

impl EdgeStore for MemoryStore {
    fn put_edge(&self, edge: &Edge) -> Result<bool, GraphError> {
        let (forward, reverse) = Self::keys_for(edge);
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        let inserted = keys.insert(forward);
        keys.insert(reverse);
        Ok(inserted)
    }

    fn delete_edge(&self, edge: &Edge) -> Result<bool, GraphError> {
        let (forward, reverse) = Self::keys_for(edge);
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        let removed = keys.remove(&forward);
        keys.remove(&reverse);
        Ok(removed)
    }

    fn put_edges_batch(&self, edges: &[Edge]) -> Result<usize, GraphError> {
        let mut keys = self.keys.write().unwrap_or_else(PoisonError::into_inner);
        let mut inserted = 0;
        for edge in edges {
            let (forward, reverse) = Self::keys_for(edge);
            if keys.insert(forward) {
                inserted += 1;
            }
            keys.insert(reverse);
        }
        Ok(inserted)
    }

    fn replace_all(
        &self,
        edges: &mut dyn Iterator<Item = Edge>,
        source: Option<&str>,
    ) -> Result<u64, GraphError> {
        let mut fresh = BTreeSet::new();
        let mut written = 0u64;
        for edge in edges {
            let (forward, reverse) = Self::keys_for(&edge);
            if fresh.insert(forward) {
                written += 1;
            }
            fresh.insert(reverse);
        }
        *self.keys.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        *self.manifest.write().unwrap_or_else(PoisonError::into_inner) = StoreManifest {
            last_bulk_source: source.map(str::to_string),
            last_bulk_edges: Some(written),
        };
        Ok(written)
    }

    fn scan_actor(
        &self,
        actor: &ActorId,
        direction: Direction,
        after: Option<&ActorId>,
    ) -> Result<ActorScan<'_>, GraphError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let lower = match after {
            Some(after) => Bound::Excluded((direction, actor.clone(), after.clone())),
            None => Bound::Included((direction, actor.clone(), ActorId::from(""))),
        };
        let related: Vec<ActorId> = keys
            .range((lower, Bound::Unbounded))
            .take_while(|(d, a, _)| *d == direction && a == actor)
            .map(|(_, _, related)| related.clone())
            .collect();
        Ok(Box::new(related.into_iter().map(Ok)))
    }

    fn scan_edges(&self, direction: Direction) -> Result<EdgeScan<'_>, GraphError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        let edges: Vec<Edge> = keys
            .iter()
            .filter(|(d, _, _)| *d == direction)
            .map(key_to_edge)
            .collect();
        Ok(Box::new(edges.into_iter().map(Ok)))
    }

    fn edge_count(&self) -> Result<u64, GraphError> {
        let keys = self.keys.read().unwrap_or_else(PoisonError::into_inner);
        Ok((keys.len() / 2) as u64)
    }

    fn manifest(&self) -> Result<StoreManifest, GraphError> {
        Ok(self
            .manifest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn flush(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(scan: ActorScan<'_>) -> Vec<String> {
        scan.map(|r| r.expect("scan").to_string()).collect()
    }

    #[test]
    fn put_writes_both_sides() {
        let store = MemoryStore::new();
        assert!(store.put_edge(&Edge::new("a", "b")).expect("put"));
        assert!(!store.put_edge(&Edge::new("a", "b")).expect("put"));

        let following = store
            .scan_actor(&ActorId::from("a"), Direction::Following, None)
            .expect("scan");
        assert_eq!(collect(following), vec!["b"]);
        let followers = store
            .scan_actor(&ActorId::from("b"), Direction::Followers, None)
            .expect("scan");
        assert_eq!(collect(followers), vec!["a"]);
        assert_eq!(store.edge_count().expect("count"), 1);
    }

    #[test]
    fn scan_resumes_after_cursor() {
        let store = MemoryStore::new();
        for target in ["d", "b", "c"] {
            store.put_edge(&Edge::new("a", target)).expect("put");
        }
        let rest = store
            .scan_actor(
                &ActorId::from("a"),
                Direction::Following,
                Some(&ActorId::from("b")),
            )
            .expect("scan");
        assert_eq!(collect(rest), vec!["c", "d"]);
    }

    #[test]
    fn replace_all_discards_previous_edges() {
        let store = MemoryStore::new();
        store.put_edge(&Edge::new("old", "edge")).expect("put");

        let mut fresh = vec![Edge::new("x", "y")].into_iter();
        let written = store
            .replace_all(&mut fresh, Some("edges.csv"))
            .expect("replace");

        assert_eq!(written, 1);
        assert_eq!(store.edge_count().expect("count"), 1);
        let manifest = store.manifest().expect("manifest");
        assert_eq!(manifest.last_bulk_source.as_deref(), Some("edges.csv"));
    }

    #[test]
    fn scan_edges_normalizes_followers_side() {
        let store = MemoryStore::new();
        store.put_edge(&Edge::new("a", "b")).expect("put");
        let edges: Vec<Edge> = store
            .scan_edges(Direction::Followers)
            .expect("scan")
            .map(|r| r.expect("edge"))
            .collect();
        assert_eq!(edges, vec![Edge::new("a", "b")]);
    }
}
