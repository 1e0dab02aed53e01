//! # Store Manifest
//!
//! Identifies a graphd data directory and records how it was last populated.
//!
//! Format: Header (5 bytes) + postcard-serialized manifest body.
//! - 4 bytes: Magic ("GRFD")
//! - 1 byte: Version
//!
//! The header is checked before the body is decoded, so a foreign or
//! future-format database is reported as corrupted instead of misread.

use crate::{GraphError, primitives};
use serde::{Deserialize, Serialize};

/// Length of the fixed manifest header.
const HEADER_LEN: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The manifest header precedes the postcard body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl ManifestHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate magic bytes and version.
    pub fn validate(&self) -> Result<(), GraphError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(GraphError::Corrupted("invalid manifest magic".to_string()));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(GraphError::Corrupted(format!(
                "unsupported format version {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
        if bytes.len() < HEADER_LEN {
            return Err(GraphError::Corrupted("manifest too short".to_string()));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for ManifestHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// MANIFEST
// =============================================================================

/// Metadata describing the contents of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreManifest {
    /// Path of the edge file used by the most recent bulk load.
    pub last_bulk_source: Option<String>,
    /// Number of edges written by the most recent bulk load.
    pub last_bulk_edges: Option<u64>,
}

impl StoreManifest {
    /// Encode as header + postcard body.
    pub fn to_bytes(&self) -> Result<Vec<u8>, GraphError> {
        let body = postcard::to_stdvec(self)
            .map_err(|e| GraphError::Storage(format!("encode manifest: {}", e)))?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&ManifestHeader::new().to_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    /// Decode and validate an encoded manifest.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
        let header = ManifestHeader::from_bytes(bytes)?;
        header.validate()?;
        postcard::from_bytes(&bytes[HEADER_LEN..])
            .map_err(|e| GraphError::Corrupted(format!("decode manifest: {}", e)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
