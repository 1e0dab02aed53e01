//! # Bulk Loader
//!
//! Builds a complete graph from a delimited text file of
//! `source,target` rows and writes it to the store in one transaction.
//!
//! Bad rows never abort a load: they are skipped, counted and logged. Only
//! an unreadable source, or one that yields no valid edge at all, is fatal.

use crate::index::GraphIndex;
use crate::primitives::LOAD_PROGRESS_INTERVAL;
use crate::storage::EdgeStore;
use crate::{ActorId, Edge, EdgeOp, GraphError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;

/// How the bulk source is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Field delimiter byte.
    pub delimiter: u8,
    /// Whether the first row is a header to skip.
    pub has_headers: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            has_headers: false,
        }
    }
}

/// Counters produced by a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Path of the source file.
    pub source: String,
    /// Data rows read, excluding any header.
    pub rows_read: u64,
    /// Distinct edges written to the store.
    pub edges_loaded: u64,
    /// Rows with the wrong field count, invalid identifiers or bad bytes.
    pub malformed_rows: u64,
    /// Rows naming the same actor twice.
    pub self_loops: u64,
    /// Rows repeating an edge already loaded.
    pub duplicates: u64,
    /// Wall-clock duration in milliseconds, including the store write
    /// when loaded through `BulkLoader::load`.
    pub elapsed_ms: u64,
}

/// Reads bulk edge files.
pub struct BulkLoader;

impl BulkLoader {
    /// Parse `path` into a fresh index without touching any store.
    pub fn read_index(
        path: &Path,
        options: &LoadOptions,
    ) -> Result<(GraphIndex, LoadReport), GraphError> {
        let started = Instant::now();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .has_headers(options.has_headers)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| GraphError::BulkSource(format!("{}: {}", path.display(), e)))?;

        let mut index = GraphIndex::new();
        let mut report = LoadReport {
            source: path.display().to_string(),
            ..LoadReport::default()
        };

        for record in reader.records() {
            report.rows_read += 1;
            if report.rows_read % LOAD_PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    rows = report.rows_read,
                    edges = index.edge_count(),
                    "bulk load progress"
                );
            }

            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => {
                    return Err(GraphError::BulkSource(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )));
                }
                Err(e) => {
                    report.malformed_rows += 1;
                    tracing::debug!(row = report.rows_read, error = %e, "skipping undecodable row");
                    continue;
                }
            };

            let edge = match parse_row(&record) {
                Some(edge) => edge,
                None => {
                    report.malformed_rows += 1;
                    tracing::debug!(row = report.rows_read, "skipping malformed row");
                    continue;
                }
            };
            if edge.is_self_loop() {
                report.self_loops += 1;
                continue;
            }
            if !index.apply(&edge, EdgeOp::Insert) {
                report.duplicates += 1;
            }
        }

        if index.edge_count() == 0 {
            return Err(GraphError::BulkSource(format!(
                "{}: no valid edges in {} rows",
                path.display(),
                report.rows_read
            )));
        }

        report.edges_loaded = index.edge_count() as u64;
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok((index, report))
    }

    /// Parse `path` and replace the store's contents with it.
    ///
    /// The store is only written once the whole source parsed, so a fatal
    /// source error leaves the store untouched.
    pub fn load<S: EdgeStore + ?Sized>(
        store: &S,
        path: &Path,
        options: &LoadOptions,
    ) -> Result<(GraphIndex, LoadReport), GraphError> {
        let started = Instant::now();
        tracing::info!(source = %path.display(), "bulk load started");
        let (index, mut report) = Self::read_index(path, options)?;

        let written = store.replace_all(&mut index.edges(), Some(&report.source))?;
        if written != report.edges_loaded {
            return Err(GraphError::Storage(format!(
                "bulk load wrote {} edges, expected {}",
                written, report.edges_loaded
            )));
        }

        if report.malformed_rows > 0 {
            tracing::warn!(
                malformed = report.malformed_rows,
                "bulk source contained malformed rows"
            );
        }
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            rows = report.rows_read,
            edges = report.edges_loaded,
            self_loops = report.self_loops,
            duplicates = report.duplicates,
            elapsed_ms = report.elapsed_ms,
            "bulk load finished"
        );
        Ok((index, report))
    }
}

fn parse_row(record: &csv::StringRecord) -> Option<Edge> {
    if record.len() != 2 {
        return None;
    }
    let source = ActorId::parse(record.get(0)?).ok()?;
    let target = ActorId::parse(record.get(1)?).ok()?;
    Some(Edge { source, target })
}

// =============================================================================
// TESTS
// =============================================================================
