use crate::core::{Document, Result, WriteOp};
use crate::storage::segment::{self, Segment};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// The single mutable writer handle over one collection's segment.
///
/// Writes mutate a live overlay immediately; nothing reaches disk until
/// [`IndexWriter::commit`]. One writer generation exists per resource at a
/// time: rollback at the resource level replaces the writer wholesale
/// rather than reusing it.
#[derive(Debug)]
pub struct IndexWriter {
    path: PathBuf,
    state: Mutex<WriterState>,
}

#[derive(Debug)]
struct WriterState {
    /// Last durable state, shared with read views.
    committed: Arc<HashMap<String, Document>>,
    /// Committed state plus every op applied since the last commit.
    live: HashMap<String, Document>,
    dirty: bool,
}

impl IndexWriter {
    /// Open a writer over the segment at `path`, creating an empty state
    /// when no segment exists yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let docs = segment::load(&path)?.map(|s| s.docs).unwrap_or_default();
        Ok(Self {
            path,
            state: Mutex::new(WriterState {
                committed: Arc::new(docs.clone()),
                live: docs,
                dirty: false,
            }),
        })
    }

    /// Apply a write op to the live state, returning the affected count.
    pub fn apply(&self, op: WriteOp) -> Result<u64> {
        let mut state = self.state.lock()?;
        let affected = match op {
            WriteOp::Insert(doc) => {
                state.live.insert(doc.id.clone(), doc);
                1
            }
            WriteOp::Update(doc) => {
                if state.live.contains_key(&doc.id) {
                    state.live.insert(doc.id.clone(), doc);
                    1
                } else {
                    0
                }
            }
            WriteOp::Delete(id) => {
                if state.live.remove(&id).is_some() {
                    1
                } else {
                    0
                }
            }
        };
        if affected > 0 {
            state.dirty = true;
        }
        Ok(affected)
    }

    pub fn has_uncommitted_changes(&self) -> bool {
        self.state.lock().map(|s| s.dirty).unwrap_or(false)
    }

    /// Flush the live state to disk as the new segment. Idempotent when
    /// nothing is pending.
    pub fn commit(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        if !state.dirty {
            return Ok(());
        }
        let live = state.live.clone();
        segment::store(&self.path, &Segment::new(live.clone()))?;
        state.committed = Arc::new(live);
        state.dirty = false;
        Ok(())
    }

    /// Drop every uncommitted change, resetting the live state to the last
    /// durable one.
    pub fn discard(&self) -> Result<()> {
        let mut state = self.state.lock()?;
        let snapshot = Arc::clone(&state.committed);
        state.live = (*snapshot).clone();
        state.dirty = false;
        Ok(())
    }

    /// Snapshot of the last committed state; the basis for read views.
    pub fn committed_docs(&self) -> Result<Arc<HashMap<String, Document>>> {
        Ok(Arc::clone(&self.state.lock()?.committed))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
