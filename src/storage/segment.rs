//! Durable segment format for a single collection.
//!
//! A segment is the whole committed state of one collection, serialized as
//! MessagePack and replaced atomically via write-then-rename.

use crate::core::{Document, IndexError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const SEGMENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct Segment {
    pub version: u32,
    pub docs: HashMap<String, Document>,
    pub metadata: SegmentMetadata,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub committed_at: u64,
    pub doc_count: usize,
}

impl Segment {
    pub fn new(docs: HashMap<String, Document>) -> Self {
        let doc_count = docs.len();
        let committed_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            version: SEGMENT_VERSION,
            docs,
            metadata: SegmentMetadata {
                committed_at,
                doc_count,
            },
        }
    }
}

/// Load the segment at `path`, or `None` if no segment has been written yet.
pub fn load(path: &Path) -> Result<Option<Segment>> {
    if !path.exists() {
        return Ok(None);
    }
    let file = File::open(path)
        .map_err(|e| IndexError::IoError(format!("Failed to open segment {path:?}: {e}")))?;
    let segment: Segment = rmp_serde::from_read(BufReader::new(file))
        .map_err(|e| IndexError::SerializationError(format!("Failed to decode segment: {e}")))?;
    Ok(Some(segment))
}

/// Persist `segment` at `path`, replacing any previous generation atomically.
pub fn store(path: &Path, segment: &Segment) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| IndexError::IoError(format!("Segment path {path:?} has no parent")))?;
    fs::create_dir_all(parent)
        .map_err(|e| IndexError::IoError(format!("Failed to create index directory: {e}")))?;

    let bytes = rmp_serde::to_vec(segment)
        .map_err(|e| IndexError::SerializationError(format!("Failed to encode segment: {e}")))?;

    // Write to a temp file in the same directory, then rename over the
    // target so readers never observe a half-written segment.
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| IndexError::IoError(format!("Failed to create temp segment: {e}")))?;
    tmp.write_all(&bytes)
        .map_err(|e| IndexError::IoError(format!("Failed to write segment: {e}")))?;
    tmp.persist(path)
        .map_err(|e| IndexError::IoError(format!("Failed to persist segment: {e}")))?;

    Ok(())
}
