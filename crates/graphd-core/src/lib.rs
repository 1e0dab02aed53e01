//! # graphd-core
//!
//! The follow-graph engine behind graphd.
//!
//! Holds the complete directed "follows" relation between actors, keeps it
//! durable in an embedded ordered key-value store, and answers set-algebra
//! queries over followers and following from an in-memory index.
//!
//! ## Layout
//!
//! - `storage`: the `EdgeStore` contract and its redb and in-memory backends
//! - `index`: the in-memory dual-sided adjacency index
//! - `query`: read-only set algebra (moots, intersections, ...)
//! - `mutation`: follow/unfollow, single and batched
//! - `loader`: bulk loading from delimited text files
//! - `graph`: `SocialGraph`, which ties the above together behind locks
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies
//! - Every result is sorted: `BTreeMap`/`BTreeSet` only
//! - Every edge is stored on both the following and the followers side
//! - A mutation is durable before any reader can see it

// =============================================================================
// MODULES
// =============================================================================

pub mod formats;
pub mod graph;
pub mod index;
pub mod loader;
pub mod mutation;
pub mod primitives;
pub mod query;
pub mod stats;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{ActorId, Direction, Edge, EdgeOp, GraphError};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use graph::SocialGraph;
pub use index::GraphIndex;
pub use loader::{BulkLoader, LoadOptions, LoadReport};
pub use mutation::{BatchPolicy, BatchReport, EdgeOutcome, MutationEngine, MutationOutcome};
pub use query::{Query, QueryEngine, QueryOutput};
pub use stats::{EngineState, GraphStats};
pub use storage::{EdgeStore, MemoryStore, RedbStore};

// =============================================================================
// RE-EXPORTS: Formats
// =============================================================================

pub use formats::{ManifestHeader, StoreManifest};
