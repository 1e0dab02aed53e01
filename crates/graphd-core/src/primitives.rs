//! # Engine Limits
//!
//! Hardcoded constants for the follow-graph engine.
//!
//! All request-driven work is bounded by these limits so a single call
//! cannot monopolise the writer gate or the read lock.

/// Maximum length in bytes of an actor identifier.
pub const MAX_ACTOR_ID_LENGTH: usize = 512;

/// Maximum number of actors in one intersection query.
pub const MAX_INTERSECT_ACTORS: usize = 100;

/// Maximum number of edges in one `follow_many`/`unfollow_many` call.
pub const MAX_BATCH_EDGES: usize = 10_000;

/// Number of keys fetched per read transaction when scanning the store.
pub const SCAN_PAGE_SIZE: usize = 4096;

/// Bulk loader logs progress every this many rows.
pub const LOAD_PROGRESS_INTERVAL: u64 = 1_000_000;

/// Magic bytes identifying a graphd data directory manifest.
pub const MAGIC_BYTES: &[u8; 4] = b"GRFD";

/// Current on-disk format version.
///
/// Increment this when changing the key layout or manifest encoding.
pub const FORMAT_VERSION: u8 = 1;
