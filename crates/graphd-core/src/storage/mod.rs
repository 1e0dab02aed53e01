//! # Durable Store
//!
//! The `EdgeStore` trait is the persistence contract of the engine. Every
//! edge is recorded twice, once per direction, and both records are always
//! written or removed in the same atomic batch.
//!
//! Backends:
//! - `RedbStore`: redb database in a data directory (ACID, crash safe)
//! - `MemoryStore`: volatile `BTreeSet`, same contract without durability

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::formats::StoreManifest;
use crate::{ActorId, Direction, Edge, GraphError};

/// Lazily produced, ordered sequence of related actors.
pub type ActorScan<'a> = Box<dyn Iterator<Item = Result<ActorId, GraphError>> + Send + 'a>;

/// Lazily produced, ordered sequence of edges.
pub type EdgeScan<'a> = Box<dyn Iterator<Item = Result<Edge, GraphError>> + Send + 'a>;

/// Persistence contract for adjacency data.
///
/// Implementations provide their own concurrency safety: all methods take
/// `&self` and may be called from several threads.
pub trait EdgeStore: Send + Sync {
    /// Record both sides of an edge in one atomic batch.
    /// Returns `true` if the edge was not previously stored.
    fn put_edge(&self, edge: &Edge) -> Result<bool, GraphError>;

    /// Remove both sides of an edge in one atomic batch.
    /// Returns `true` if the edge was stored. Absent edges are not an error.
    fn delete_edge(&self, edge: &Edge) -> Result<bool, GraphError>;

    /// Record many edges as one all-or-nothing transaction.
    /// Returns the number of edges that were not previously stored.
    fn put_edges_batch(&self, edges: &[Edge]) -> Result<usize, GraphError>;

    /// Replace the entire stored edge set in one transaction.
    ///
    /// `source` names where the edges came from and is recorded in the
    /// manifest. Returns the number of edges written.
    fn replace_all(
        &self,
        edges: &mut dyn Iterator<Item = Edge>,
        source: Option<&str>,
    ) -> Result<u64, GraphError>;

    /// Scan one actor's adjacency set in sorted order.
    ///
    /// When `after` is given the scan resumes strictly after that
    /// identifier, so an interrupted scan can be restarted from the last
    /// identifier it yielded.
    fn scan_actor(
        &self,
        actor: &ActorId,
        direction: Direction,
        after: Option<&ActorId>,
    ) -> Result<ActorScan<'_>, GraphError>;

    /// Scan every edge recorded on one side, ordered by that side's actor.
    ///
    /// Edges are always yielded as `source -> target`, whichever side is
    /// scanned.
    fn scan_edges(&self, direction: Direction) -> Result<EdgeScan<'_>, GraphError>;

    /// Number of stored edges.
    fn edge_count(&self) -> Result<u64, GraphError>;

    /// Metadata describing the store.
    fn manifest(&self) -> Result<StoreManifest, GraphError>;

    /// Make every acknowledged write durable.
    fn flush(&self) -> Result<(), GraphError>;
}
