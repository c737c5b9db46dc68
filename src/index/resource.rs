use crate::core::{Result, WriteOp};
use crate::storage::{IndexWriter, SearchView};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::debug;

/// One independently persisted index: a single mutable writer plus a
/// lazily-built, invalidatable read view over its committed state.
///
/// `commit` and `rollback` serialize on a per-resource lock; callers are
/// expected to reach them through the ordering gate
/// ([`crate::txn::ResourceAdapter`]), which decides *which* transaction
/// proceeds next.
#[derive(Debug)]
pub struct IndexResource {
    name: String,
    path: PathBuf,
    view_grace: Duration,
    /// Current writer generation; replaced wholesale on rollback.
    writer: RwLock<Arc<IndexWriter>>,
    /// Cached read view for the current generation.
    view: Mutex<Option<SearchView>>,
    /// Serializes commit/rollback against this resource.
    update_lock: tokio::sync::Mutex<()>,
}

impl IndexResource {
    /// Open the resource for `name`, loading its segment under `root`.
    pub fn open(name: &str, root: &Path, view_grace: Duration) -> Result<Arc<Self>> {
        let path = root.join(name).join("docs.seg");
        let writer = IndexWriter::open(&path)?;
        debug!(collection = name, "opened index resource");
        Ok(Arc::new(Self {
            name: name.to_string(),
            path,
            view_grace,
            writer: RwLock::new(Arc::new(writer)),
            view: Mutex::new(None),
            update_lock: tokio::sync::Mutex::new(()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The live writer handle, for writes issued outside a transaction's
    /// deferred-action queue.
    pub fn writer(&self) -> Result<Arc<IndexWriter>> {
        Ok(Arc::clone(&*self.writer.read()?))
    }

    /// Apply a write op directly against the live writer.
    pub fn apply(&self, op: WriteOp) -> Result<u64> {
        self.writer()?.apply(op)
    }

    /// The read view for the current generation, built lazily and cached:
    /// repeated calls between commits return the identical instance.
    pub fn read_view(&self) -> Result<SearchView> {
        let mut cached = self.view.lock()?;
        if let Some(view) = cached.as_ref() {
            return Ok(view.clone());
        }
        let docs = self.writer()?.committed_docs()?;
        let view = SearchView::new(self.name.clone(), docs);
        *cached = Some(view.clone());
        Ok(view)
    }

    /// Flush pending changes to stable storage and invalidate the cached
    /// read view so the next reader sees the new state. Idempotent when
    /// nothing is pending.
    pub async fn commit(&self) -> Result<()> {
        let _guard = self.update_lock.lock().await;
        let writer = self.writer()?;
        if writer.has_uncommitted_changes() {
            writer.commit()?;
            self.invalidate_view()?;
            debug!(collection = %self.name, "committed index resource");
        }
        Ok(())
    }

    /// Discard pending changes, replace the writer with a fresh generation
    /// over the same storage, and swap in a new view holder.
    pub async fn rollback(&self) -> Result<()> {
        let _guard = self.update_lock.lock().await;
        let current = self.writer()?;
        if current.has_uncommitted_changes() {
            current.discard()?;
            let fresh = IndexWriter::open(&self.path)?;
            *self.writer.write()? = Arc::new(fresh);
            self.invalidate_view()?;
            debug!(collection = %self.name, "rolled back index resource");
        }
        Ok(())
    }

    /// Detach the cached view and schedule its closing after the grace
    /// delay. Readers that already hold the view keep working until then.
    fn invalidate_view(&self) -> Result<()> {
        let old = self.view.lock()?.take();
        if let Some(view) = old {
            let grace = self.view_grace;
            let name = self.name.clone();
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                view.close();
                debug!(collection = %name, "closed superseded read view");
            });
        }
        Ok(())
    }
}
