//! # On-disk Formats
//!
//! Encodings for metadata stored alongside the edge table.

pub mod manifest;

pub use manifest::{ManifestHeader, StoreManifest};
