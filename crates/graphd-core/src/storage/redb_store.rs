//! # redb-backed Edge Storage
//!
//! A disk-backed edge store using the redb embedded database, providing:
//! - ACID transactions (both sides of an edge commit together)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! ## Key Layout
//!
//! One table, `edges`, keyed by `(direction-tag, actor, related)` with unit
//! values:
//! - `(0, source, target)`: source follows target
//! - `(1, target, source)`: target is followed by source
//!
//! A range starting at `(tag, actor, "")` yields exactly that actor's
//! adjacency set, sorted.

use super::{ActorScan, EdgeScan, EdgeStore};
use crate::formats::StoreManifest;
use crate::primitives::SCAN_PAGE_SIZE;
use crate::{ActorId, Direction, Edge, GraphError};
use redb::{
    Database, DatabaseError, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    StorageError, TableDefinition,
};
use std::collections::VecDeque;
use std::fmt::Display;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Table for adjacency keys: (direction tag, actor, related actor) -> ()
const EDGES: TableDefinition<(u8, &str, &str), ()> = TableDefinition::new("edges");

/// Table for metadata: key string -> encoded bytes
const META: TableDefinition<&str, &[u8]> = TableDefinition::new("meta");

const MANIFEST_KEY: &str = "manifest";

/// File created inside the data directory.
pub const DB_FILE_NAME: &str = "graph.redb";

const FOLLOWING_TAG: u8 = 0;
const FOLLOWERS_TAG: u8 = 1;

const fn tag(direction: Direction) -> u8 {
    match direction {
        Direction::Following => FOLLOWING_TAG,
        Direction::Followers => FOLLOWERS_TAG,
    }
}

fn storage(e: impl Display) -> GraphError {
    GraphError::Storage(e.to_string())
}

fn open_error(e: DatabaseError) -> GraphError {
    match e {
        DatabaseError::DatabaseAlreadyOpen => {
            GraphError::Storage("database is already open in another process".to_string())
        }
        DatabaseError::Storage(StorageError::Io(io)) => GraphError::Storage(io.to_string()),
        other => GraphError::Corrupted(other.to_string()),
    }
}

/// A disk-backed edge store using redb.
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
    page_size: usize,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a store in the given data directory.
    ///
    /// Fails with `Storage` if the directory cannot be created or accessed,
    /// and with `Corrupted` if the database or its manifest is unusable.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, GraphError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            GraphError::Storage(format!("cannot create data dir {}: {}", dir.display(), e))
        })?;
        let path = dir.join(DB_FILE_NAME);
        let db = Database::create(&path).map_err(open_error)?;

        // Initialize tables and manifest
        {
            let write_txn = db.begin_write().map_err(storage)?;
            {
                let _ = write_txn.open_table(EDGES).map_err(storage)?;
                let mut meta = write_txn.open_table(META).map_err(storage)?;
                let existing = meta
                    .get(MANIFEST_KEY)
                    .map_err(storage)?
                    .map(|guard| guard.value().to_vec());
                match existing {
                    Some(bytes) => {
                        StoreManifest::from_bytes(&bytes)?;
                    }
                    None => {
                        let bytes = StoreManifest::default().to_bytes()?;
                        meta.insert(MANIFEST_KEY, bytes.as_slice())
                            .map_err(storage)?;
                    }
                }
            }
            write_txn.commit().map_err(storage)?;
        }

        let store = Self {
            db: Arc::new(db),
            path,
            page_size: SCAN_PAGE_SIZE,
        };

        // Every edge owns exactly two keys
        let keys = store.key_count()?;
        if keys % 2 != 0 {
            return Err(GraphError::Corrupted(format!(
                "edge table holds {} keys, expected an even count",
                keys
            )));
        }

        tracing::debug!(path = %store.path.display(), edges = keys / 2, "opened edge store");
        Ok(store)
    }

    /// Override the number of keys fetched per scan page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key_count(&self) -> Result<u64, GraphError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(EDGES).map_err(storage)?;
        table.len().map_err(storage)
    }

    fn paged_scan(&self, direction: Direction, actor: Option<ActorId>) -> PagedScan {
        PagedScan {
            db: Arc::clone(&self.db),
            tag: tag(direction),
            actor,
            cursor: None,
            buffer: VecDeque::new(),
            page_size: self.page_size,
            exhausted: false,
        }
    }
}

impl EdgeStore for RedbStore {
    fn put_edge(&self, edge: &Edge) -> Result<bool, GraphError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        let inserted = {
            let mut table = write_txn.open_table(EDGES).map_err(storage)?;
            let existed = table
                .insert(
                    (FOLLOWING_TAG, edge.source.as_str(), edge.target.as_str()),
                    (),
                )
                .map_err(storage)?
                .is_some();
            table
                .insert(
                    (FOLLOWERS_TAG, edge.target.as_str(), edge.source.as_str()),
                    (),
                )
                .map_err(storage)?;
            !existed
        };
        write_txn.commit().map_err(storage)?;
        Ok(inserted)
    }

    fn delete_edge(&self, edge: &Edge) -> Result<bool, GraphError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        let removed = {
            let mut table = write_txn.open_table(EDGES).map_err(storage)?;
            let existed = table
                .remove((FOLLOWING_TAG, edge.source.as_str(), edge.target.as_str()))
                .map_err(storage)?
                .is_some();
            table
                .remove((FOLLOWERS_TAG, edge.target.as_str(), edge.source.as_str()))
                .map_err(storage)?;
            existed
        };
        write_txn.commit().map_err(storage)?;
        Ok(removed)
    }

    fn put_edges_batch(&self, edges: &[Edge]) -> Result<usize, GraphError> {
        if edges.is_empty() {
            return Ok(0);
        }
        let write_txn = self.db.begin_write().map_err(storage)?;
        let mut inserted = 0;
        {
            let mut table = write_txn.open_table(EDGES).map_err(storage)?;
            for edge in edges {
                let existed = table
                    .insert(
                        (FOLLOWING_TAG, edge.source.as_str(), edge.target.as_str()),
                        (),
                    )
                    .map_err(storage)?
                    .is_some();
                table
                    .insert(
                        (FOLLOWERS_TAG, edge.target.as_str(), edge.source.as_str()),
                        (),
                    )
                    .map_err(storage)?;
                if !existed {
                    inserted += 1;
                }
            }
        }
        write_txn.commit().map_err(storage)?;
        Ok(inserted)
    }

    fn replace_all(
        &self,
        edges: &mut dyn Iterator<Item = Edge>,
        source: Option<&str>,
    ) -> Result<u64, GraphError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        write_txn.delete_table(EDGES).map_err(storage)?;
        let mut written = 0u64;
        {
            let mut table = write_txn.open_table(EDGES).map_err(storage)?;
            for edge in edges {
                let existed = table
                    .insert(
                        (FOLLOWING_TAG, edge.source.as_str(), edge.target.as_str()),
                        (),
                    )
                    .map_err(storage)?
                    .is_some();
                table
                    .insert(
                        (FOLLOWERS_TAG, edge.target.as_str(), edge.source.as_str()),
                        (),
                    )
                    .map_err(storage)?;
                if !existed {
                    written += 1;
                }
            }

            let manifest = StoreManifest {
                last_bulk_source: source.map(str::to_string),
                last_bulk_edges: Some(written),
            };
            let bytes = manifest.to_bytes()?;
            let mut meta = write_txn.open_table(META).map_err(storage)?;
            meta.insert(MANIFEST_KEY, bytes.as_slice())
                .map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;
        Ok(written)
    }

    fn scan_actor(
        &self,
        actor: &ActorId,
        direction: Direction,
        after: Option<&ActorId>,
    ) -> Result<ActorScan<'_>, GraphError> {
        let mut scan = self.paged_scan(direction, Some(actor.clone()));
        scan.cursor = after.map(|after| (actor.clone(), after.clone()));
        Ok(Box::new(
            scan.map(|entry| entry.map(|(_, related)| related)),
        ))
    }

    fn scan_edges(&self, direction: Direction) -> Result<EdgeScan<'_>, GraphError> {
        let scan = self.paged_scan(direction, None);
        Ok(Box::new(scan.map(move |entry| {
            entry.map(|(actor, related)| match direction {
                Direction::Following => Edge::new(actor, related),
                Direction::Followers => Edge::new(related, actor),
            })
        })))
    }

    fn edge_count(&self) -> Result<u64, GraphError> {
        Ok(self.key_count()? / 2)
    }

    fn manifest(&self) -> Result<StoreManifest, GraphError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let meta = read_txn.open_table(META).map_err(storage)?;
        let bytes = meta
            .get(MANIFEST_KEY)
            .map_err(storage)?
            .map(|guard| guard.value().to_vec())
            .ok_or_else(|| GraphError::Corrupted("manifest missing".to_string()))?;
        StoreManifest::from_bytes(&bytes)
    }

    fn flush(&self) -> Result<(), GraphError> {
        // An empty commit with the default (immediate) durability fsyncs
        let write_txn = self.db.begin_write().map_err(storage)?;
        write_txn.commit().map_err(storage)?;
        Ok(())
    }
}

// =============================================================================
// PAGED SCAN
// =============================================================================

/// Iterator over one direction of the edge table, fetched in pages.
///
/// Each page is read in its own read transaction and the scan resumes
/// strictly after the last key of the previous page, so no transaction is
/// held open between calls to `next`.
struct PagedScan {
    db: Arc<Database>,
    tag: u8,
    actor: Option<ActorId>,
    cursor: Option<(ActorId, ActorId)>,
    buffer: VecDeque<(ActorId, ActorId)>,
    page_size: usize,
    exhausted: bool,
}

impl PagedScan {
    fn fetch_page(&mut self) -> Result<(), GraphError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(EDGES).map_err(storage)?;

        let lower: Bound<(u8, &str, &str)> = match (&self.cursor, &self.actor) {
            (Some((actor, related)), _) => {
                Bound::Excluded((self.tag, actor.as_str(), related.as_str()))
            }
            (None, Some(actor)) => Bound::Included((self.tag, actor.as_str(), "")),
            (None, None) => Bound::Included((self.tag, "", "")),
        };

        let mut page = Vec::with_capacity(self.page_size);
        for entry in table
            .range((lower, Bound::Unbounded))
            .map_err(storage)?
        {
            let (key, _) = entry.map_err(storage)?;
            let (key_tag, actor, related) = key.value();
            if key_tag != self.tag {
                break;
            }
            if let Some(filter) = &self.actor {
                if filter.as_str() != actor {
                    break;
                }
            }
            page.push((ActorId::from(actor), ActorId::from(related)));
            if page.len() >= self.page_size {
                break;
            }
        }

        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.cursor = Some(last.clone());
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl Iterator for PagedScan {
    type Item = Result<(ActorId, ActorId), GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn related(store: &RedbStore, actor: &str, direction: Direction) -> Vec<String> {
        store
            .scan_actor(&ActorId::from(actor), direction, None)
            .expect("scan")
            .map(|r| r.expect("entry").to_string())
            .collect()
    }

    #[test]
    fn open_creates_directory_and_manifest() {
        let temp = tempdir().expect("temp dir");
        let dir = temp.path().join("nested").join("graph");
        let store = RedbStore::open(&dir).expect("open");

        assert!(store.path().exists());
        assert_eq!(store.edge_count().expect("count"), 0);
        assert_eq!(store.manifest().expect("manifest"), StoreManifest::default());
    }

    #[test]
    fn put_edge_writes_both_sides() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path()).expect("open");

        assert!(store.put_edge(&Edge::new("alice", "bob")).expect("put"));
        assert!(!store.put_edge(&Edge::new("alice", "bob")).expect("put"));

        assert_eq!(related(&store, "alice", Direction::Following), vec!["bob"]);
        assert_eq!(related(&store, "bob", Direction::Followers), vec!["alice"]);
        assert!(related(&store, "alice", Direction::Followers).is_empty());
        assert_eq!(store.edge_count().expect("count"), 1);
    }

    #[test]
    fn delete_edge_removes_both_sides() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path()).expect("open");

        store.put_edge(&Edge::new("alice", "bob")).expect("put");
        assert!(store.delete_edge(&Edge::new("alice", "bob")).expect("delete"));
        assert!(!store.delete_edge(&Edge::new("alice", "bob")).expect("delete"));

        assert!(related(&store, "alice", Direction::Following).is_empty());
        assert!(related(&store, "bob", Direction::Followers).is_empty());
        assert_eq!(store.edge_count().expect("count"), 0);
    }

    #[test]
    fn prefix_scan_stays_within_actor() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path()).expect("open");

        // "al" is a string prefix of "alice"; its keys must not leak in
        store.put_edge(&Edge::new("al", "zed")).expect("put");
        store.put_edge(&Edge::new("alice", "carol")).expect("put");
        store.put_edge(&Edge::new("alice", "bob")).expect("put");
        store.put_edge(&Edge::new("bob", "alice")).expect("put");

        assert_eq!(
            related(&store, "alice", Direction::Following),
            vec!["bob", "carol"]
        );
        assert_eq!(related(&store, "al", Direction::Following), vec!["zed"]);
    }

    #[test]
    fn scan_pages_and_resumes() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path()).expect("open").with_page_size(2);

        let edges: Vec<Edge> = (0..5).map(|i| Edge::new("hub", format!("u{}", i))).collect();
        assert_eq!(store.put_edges_batch(&edges).expect("batch"), 5);

        assert_eq!(
            related(&store, "hub", Direction::Following),
            vec!["u0", "u1", "u2", "u3", "u4"]
        );

        let resumed: Vec<String> = store
            .scan_actor(
                &ActorId::from("hub"),
                Direction::Following,
                Some(&ActorId::from("u2")),
            )
            .expect("scan")
            .map(|r| r.expect("entry").to_string())
            .collect();
        assert_eq!(resumed, vec!["u3", "u4"]);
    }

    #[test]
    fn scan_edges_covers_every_actor() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path()).expect("open").with_page_size(3);

        let edges = vec![
            Edge::new("a", "b"),
            Edge::new("b", "a"),
            Edge::new("c", "a"),
            Edge::new("c", "b"),
        ];
        store.put_edges_batch(&edges).expect("batch");

        let following: Vec<Edge> = store
            .scan_edges(Direction::Following)
            .expect("scan")
            .map(|r| r.expect("edge"))
            .collect();
        assert_eq!(following, edges);

        let mut followers: Vec<Edge> = store
            .scan_edges(Direction::Followers)
            .expect("scan")
            .map(|r| r.expect("edge"))
            .collect();
        followers.sort();
        assert_eq!(followers, edges);
    }

    #[test]
    fn replace_all_swaps_contents_and_records_source() {
        let temp = tempdir().expect("temp dir");
        let store = RedbStore::open(temp.path()).expect("open");
        store.put_edge(&Edge::new("stale", "edge")).expect("put");

        let mut edges = vec![Edge::new("a", "b"), Edge::new("b", "c")].into_iter();
        let written = store
            .replace_all(&mut edges, Some("/tmp/edges.csv"))
            .expect("replace");

        assert_eq!(written, 2);
        assert_eq!(store.edge_count().expect("count"), 2);
        assert!(related(&store, "stale", Direction::Following).is_empty());
        let manifest = store.manifest().expect("manifest");
        assert_eq!(manifest.last_bulk_source.as_deref(), Some("/tmp/edges.csv"));
        assert_eq!(manifest.last_bulk_edges, Some(2));
    }

    #[test]
    fn edges_survive_reopen() {
        let temp = tempdir().expect("temp dir");
        {
            let store = RedbStore::open(temp.path()).expect("open");
            store.put_edge(&Edge::new("alice", "bob")).expect("put");
            store.put_edge(&Edge::new("bob", "carol")).expect("put");
            store.delete_edge(&Edge::new("bob", "carol")).expect("delete");
        }
        // Store dropped here, simulating process exit

        let store = RedbStore::open(temp.path()).expect("reopen");
        assert_eq!(store.edge_count().expect("count"), 1);
        assert_eq!(related(&store, "bob", Direction::Followers), vec!["alice"]);
    }

    #[test]
    fn open_rejects_unreadable_directory() {
        let temp = tempdir().expect("temp dir");
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, b"plain file").expect("write");

        let err = RedbStore::open(&file).expect_err("file is not a directory");
        assert!(matches!(err, GraphError::Storage(_)));
    }

    #[test]
    fn open_rejects_garbage_database() {
        let temp = tempdir().expect("temp dir");
        std::fs::write(temp.path().join(DB_FILE_NAME), vec![0xAB; 8192]).expect("write");

        let err = RedbStore::open(temp.path()).expect_err("garbage file");
        assert!(matches!(err, GraphError::Corrupted(_) | GraphError::Storage(_)));
    }
}
