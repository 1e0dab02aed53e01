//! # Social Graph
//!
//! `SocialGraph` owns the durable store and the in-memory index and is the
//! only way the rest of the system touches either.
//!
//! ## Concurrency
//!
//! - Readers share an `RwLock` over the index.
//! - Writers are serialized by a separate writer gate held across
//!   persist-then-apply. The index write lock is only taken for the
//!   in-memory apply, so readers never wait on disk I/O.
//! - A lifecycle state cell gates every call: anything but `Ready` is
//!   rejected with `GraphError::Unavailable`.

use crate::index::GraphIndex;
use crate::loader::{BulkLoader, LoadOptions, LoadReport};
use crate::query::{Query, QueryEngine, QueryOutput};
use crate::stats::{EngineState, GraphStats};
use crate::storage::EdgeStore;
use crate::{ActorId, Edge, EdgeOp, GraphError};
use std::path::Path;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Durable follow graph: a store plus the index that mirrors it.
///
/// Shared between request handlers through an `Arc`.
pub struct SocialGraph<S: EdgeStore> {
    store: S,
    index: RwLock<GraphIndex>,
    writer: Mutex<()>,
    state: AtomicU8,
}

impl<S: EdgeStore> SocialGraph<S> {
    /// Wrap a store. The graph starts empty and `Loading`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            index: RwLock::new(GraphIndex::new()),
            writer: Mutex::new(()),
            state: AtomicU8::new(EngineState::Loading as u8),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Rebuild the index from the store and start serving.
    pub fn recover(&self) -> Result<GraphStats, GraphError> {
        let _gate = self.lock_writer();
        let previous = self.begin_load()?;

        let index = match GraphIndex::load_from_store(&self.store) {
            Ok(index) => index,
            Err(e) => {
                self.finish_load(previous);
                return Err(e);
            }
        };
        let stats = GraphStats::from_index(&index, EngineState::Ready);
        *self.write_index() = index;
        self.finish_load(EngineState::Ready);

        tracing::info!(
            actors = stats.actors,
            edges = stats.edges,
            "recovered follow graph from store"
        );
        Ok(stats)
    }

    /// Replace the whole graph with the edges in a CSV file and start
    /// serving.
    ///
    /// The store is rewritten in one transaction; the new index becomes
    /// visible only after that commit. On failure the previous graph is
    /// left in place.
    pub fn bulk_load(&self, path: &Path, options: &LoadOptions) -> Result<LoadReport, GraphError> {
        let _gate = self.lock_writer();
        let previous = self.begin_load()?;

        let (index, report) = match BulkLoader::load(&self.store, path, options) {
            Ok(loaded) => loaded,
            Err(e) => {
                self.finish_load(previous);
                return Err(e);
            }
        };
        *self.write_index() = index;
        self.finish_load(EngineState::Ready);
        Ok(report)
    }

    fn begin_load(&self) -> Result<EngineState, GraphError> {
        let previous = self.state();
        if previous == EngineState::ShuttingDown {
            return Err(GraphError::Unavailable("graph is shutting down"));
        }
        match self.state.compare_exchange(
            previous as u8,
            EngineState::Loading as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(previous),
            Err(_) => Err(GraphError::Unavailable("graph is shutting down")),
        }
    }

    /// Leave `Loading`, unless a shutdown started while the load ran.
    fn finish_load(&self, next: EngineState) {
        let _ = self.state.compare_exchange(
            EngineState::Loading as u8,
            next as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Reject all new queries and mutations from now on.
    pub fn begin_shutdown(&self) {
        self.state
            .store(EngineState::ShuttingDown as u8, Ordering::Release);
    }

    /// Stop accepting work, wait for in-flight mutations and flush the
    /// store.
    pub fn shutdown(&self) -> Result<(), GraphError> {
        self.begin_shutdown();
        let _gate = self.lock_writer();
        self.store.flush()?;
        tracing::info!("follow graph flushed");
        Ok(())
    }

    /// Size and state snapshot. Available in every state.
    pub fn stats(&self) -> GraphStats {
        GraphStats::from_index(&self.read_index(), self.state())
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Run a read against the index while the graph is `Ready`.
    pub fn read<T>(&self, f: impl FnOnce(&GraphIndex) -> T) -> Result<T, GraphError> {
        self.ensure_ready()?;
        Ok(f(&self.read_index()))
    }

    /// Execute a `Query`.
    pub fn query(&self, query: &Query) -> Result<QueryOutput, GraphError> {
        self.ensure_ready()?;
        QueryEngine::execute(&self.read_index(), query)
    }

    pub fn followers(&self, actor: &ActorId) -> Result<Vec<ActorId>, GraphError> {
        self.read(|index| QueryEngine::followers(index, actor))
    }

    pub fn following(&self, actor: &ActorId) -> Result<Vec<ActorId>, GraphError> {
        self.read(|index| QueryEngine::following(index, actor))
    }

    pub fn moots(&self, actor: &ActorId) -> Result<Vec<ActorId>, GraphError> {
        self.read(|index| QueryEngine::moots(index, actor))
    }

    pub fn followers_not_following(&self, actor: &ActorId) -> Result<Vec<ActorId>, GraphError> {
        self.read(|index| QueryEngine::followers_not_following(index, actor))
    }

    pub fn does_follow(&self, source: &ActorId, target: &ActorId) -> Result<bool, GraphError> {
        self.read(|index| QueryEngine::does_follow(index, source, target))
    }

    pub fn are_moots(&self, a: &ActorId, b: &ActorId) -> Result<bool, GraphError> {
        self.read(|index| QueryEngine::are_moots(index, a, b))
    }

    pub fn intersect_followers(&self, actors: &[ActorId]) -> Result<Vec<ActorId>, GraphError> {
        self.read(|index| QueryEngine::intersect_followers(index, actors))?
    }

    pub fn intersect_following(&self, actors: &[ActorId]) -> Result<Vec<ActorId>, GraphError> {
        self.read(|index| QueryEngine::intersect_following(index, actors))?
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Acquire the writer gate for a mutation.
    ///
    /// The state is checked after the gate is held, so a mutation that was
    /// waiting behind `shutdown` or a bulk load is rejected rather than
    /// applied.
    pub(crate) fn writer(&self) -> Result<GraphWriter<'_, S>, GraphError> {
        let gate = self.lock_writer();
        self.ensure_ready()?;
        Ok(GraphWriter { graph: self, _gate: gate })
    }

    fn ensure_ready(&self) -> Result<(), GraphError> {
        match self.state() {
            EngineState::Ready => Ok(()),
            EngineState::Loading => Err(GraphError::Unavailable("graph is loading")),
            EngineState::ShuttingDown => Err(GraphError::Unavailable("graph is shutting down")),
        }
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_index(&self) -> RwLockReadGuard<'_, GraphIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, GraphIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive write access to a `SocialGraph`, held for one mutation or
/// one batch.
pub(crate) struct GraphWriter<'a, S: EdgeStore> {
    graph: &'a SocialGraph<S>,
    _gate: MutexGuard<'a, ()>,
}

impl<S: EdgeStore> GraphWriter<'_, S> {
    /// Whether the edge is currently visible.
    pub(crate) fn contains(&self, edge: &Edge) -> bool {
        self.graph.read_index().contains(&edge.source, &edge.target)
    }

    /// Persist one edge operation, then make it visible.
    ///
    /// If the store write fails the index is not touched.
    pub(crate) fn commit(&self, edge: &Edge, op: EdgeOp) -> Result<(), GraphError> {
        match op {
            EdgeOp::Insert => self.graph.store.put_edge(edge)?,
            EdgeOp::Delete => self.graph.store.delete_edge(edge)?,
        };
        self.graph.write_index().apply(edge, op);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
