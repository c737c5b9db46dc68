use crate::core::{IndexError, Result};
use crate::txn::adapter::ResourceAdapter;
use crate::txn::task::{WriteResult, WriteTask};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// Transaction lifecycle.
///
/// ```text
/// Active ── commit ──> Committing ──> Committed
///   │
///   ├── set_rollback_only ──> MarkedRollback
///   │
///   └── rollback ──> RollingBack ──> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Active,
    Committing,
    Committed,
    MarkedRollback,
    RollingBack,
    RolledBack,
}

impl TxState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TxState::Active,
            1 => TxState::Committing,
            2 => TxState::Committed,
            3 => TxState::MarkedRollback,
            4 => TxState::RollingBack,
            _ => TxState::RolledBack,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TxState::Committed | TxState::RolledBack)
    }
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TxState::Active => "ACTIVE",
            TxState::Committing => "COMMITTING",
            TxState::Committed => "COMMITTED",
            TxState::MarkedRollback => "MARKED_ROLLBACK",
            TxState::RollingBack => "ROLLING_BACK",
            TxState::RolledBack => "ROLLED_BACK",
        };
        write!(f, "{name}")
    }
}

/// A unit of work: deferred write actions plus the set of resources they
/// touch, committed or rolled back as one logical operation.
///
/// Deferred actions run at commit time, in insertion order, before any
/// per-resource commit is requested; cross-resource commits then execute
/// in parallel while same-resource commits stay ordered by each adapter's
/// queue.
pub struct Transaction {
    id: u64,
    state: AtomicU8,
    /// Commit/rollback wait bound in milliseconds; 0 means unbounded.
    timeout_ms: AtomicU64,
    inner: Mutex<TxInner>,
}

struct TxInner {
    tasks: Vec<WriteTask>,
    adapters: Vec<Arc<ResourceAdapter>>,
    finally_hook: Option<Box<dyn FnOnce() + Send>>,
}

impl Transaction {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            state: AtomicU8::new(TxState::Active as u8),
            timeout_ms: AtomicU64::new(0),
            inner: Mutex::new(TxInner {
                tasks: Vec::new(),
                adapters: Vec::new(),
                finally_hook: None,
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TxState {
        TxState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: TxState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout_ms
            .store(timeout.as_millis() as u64, Ordering::Release);
    }

    fn timeout(&self) -> Option<Duration> {
        match self.timeout_ms.load(Ordering::Acquire) {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Queue a deferred write action; it runs only when this transaction
    /// commits. Returns the handle for the action's affected-count.
    pub fn add_task<F>(self: &Arc<Self>, action: F) -> Result<WriteResult>
    where
        F: FnOnce() -> Result<u64> + Send + 'static,
    {
        let (task, receiver) = WriteTask::new(action);
        self.inner.lock()?.tasks.push(task);
        Ok(WriteResult::new(receiver, Arc::clone(self)))
    }

    /// Enroll a resource. A no-op returning `false` when an adapter for
    /// the same resource is already enrolled; otherwise the adapter's
    /// ordering gate records this transaction's id.
    pub fn enlist(&self, adapter: Arc<ResourceAdapter>) -> Result<bool> {
        let mut inner = self.inner.lock()?;
        if inner.adapters.iter().any(|a| a.is_same_resource(&adapter)) {
            return Ok(false);
        }
        adapter.enroll(self.id)?;
        inner.adapters.push(adapter);
        Ok(true)
    }

    /// Mark this transaction so a later [`Transaction::commit`] silently
    /// performs no work.
    pub fn set_rollback_only(&self) {
        self.set_state(TxState::MarkedRollback);
    }

    /// Attach the one-shot hook invoked exactly once after commit or
    /// rollback completes.
    pub fn set_finally_hook<F>(&self, hook: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.lock()?.finally_hook = Some(Box::new(hook));
        Ok(())
    }

    pub(crate) fn run_finally_hook(&self) {
        let hook = self.inner.lock().ok().and_then(|mut i| i.finally_hook.take());
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Run every deferred action in order, then commit all enrolled
    /// resources in parallel, bounded by the configured timeout.
    ///
    /// A timeout stops the caller from waiting longer; per-resource commit
    /// work already dispatched keeps running and may still apply. A failed
    /// deferred action aborts the remaining commit sequence, but commits
    /// already dispatched are likewise not retracted.
    pub async fn commit(&self) -> Result<()> {
        if self.state() == TxState::MarkedRollback {
            debug!(id = self.id, "commit skipped: marked rollback-only");
            return Ok(());
        }
        self.set_state(TxState::Committing);

        let (tasks, adapters) = {
            let mut inner = self.inner.lock()?;
            (std::mem::take(&mut inner.tasks), inner.adapters.clone())
        };
        let id = self.id;

        let work = async move {
            for task in tasks {
                task.run()?;
            }
            Self::fan_out(adapters, id, Outcome::Commit).await
        };
        self.bounded(work).await?;

        self.set_state(TxState::Committed);
        debug!(id = self.id, "transaction committed");
        Ok(())
    }

    /// Discard deferred actions and roll back every enrolled resource in
    /// parallel, bounded by the configured timeout.
    pub async fn rollback(&self) -> Result<()> {
        self.set_state(TxState::RollingBack);

        let adapters = {
            let mut inner = self.inner.lock()?;
            inner.tasks.clear();
            inner.adapters.clone()
        };
        let id = self.id;

        self.bounded(Self::fan_out(adapters, id, Outcome::Rollback))
            .await?;

        self.set_state(TxState::RolledBack);
        debug!(id = self.id, "transaction rolled back");
        Ok(())
    }

    async fn fan_out(
        adapters: Vec<Arc<ResourceAdapter>>,
        id: u64,
        outcome: Outcome,
    ) -> Result<()> {
        let handles: Vec<_> = adapters
            .into_iter()
            .map(|adapter| {
                tokio::spawn(async move {
                    match outcome {
                        Outcome::Commit => adapter.commit(id).await,
                        Outcome::Rollback => adapter.rollback(id).await,
                    }
                })
            })
            .collect();

        for joined in futures::future::join_all(handles).await {
            joined.map_err(|e| IndexError::ExecutionError(format!("commit worker failed: {e}")))??;
        }
        Ok(())
    }

    async fn bounded<F>(&self, work: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        match self.timeout() {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| IndexError::TransactionTimeout)?,
            None => work.await,
        }
    }
}

#[derive(Clone, Copy)]
enum Outcome {
    Commit,
    Rollback,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Document, WriteOp};
    use crate::index::IndexResource;
    use std::sync::atomic::AtomicBool;

    fn resource_and_adapter(
        name: &str,
        dir: &tempfile::TempDir,
    ) -> (Arc<IndexResource>, Arc<ResourceAdapter>) {
        let res = IndexResource::open(name, dir.path(), Duration::from_millis(20)).unwrap();
        let adapter = Arc::new(ResourceAdapter::new(
            Arc::clone(&res),
            Duration::from_millis(10),
        ));
        (res, adapter)
    }

    #[tokio::test]
    async fn test_commit_runs_tasks_then_resources() {
        let dir = tempfile::tempdir().unwrap();
        let (res, adapter) = resource_and_adapter("docs", &dir);

        let txn = Arc::new(Transaction::new(1));
        txn.enlist(adapter).unwrap();

        let writer = res.writer().unwrap();
        let result = txn
            .add_task(move || writer.apply(WriteOp::Insert(Document::new("a1"))))
            .unwrap();

        assert!(!res.writer().unwrap().has_uncommitted_changes());
        txn.commit().await.unwrap();
        assert_eq!(txn.state(), TxState::Committed);

        // The deferred insert ran and the resource committed it.
        assert!(res.read_view().unwrap().get("a1").unwrap().is_some());
        assert_eq!(result.get().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tasks_run_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let (_res, adapter) = resource_and_adapter("docs", &dir);

        let txn = Arc::new(Transaction::new(1));
        txn.enlist(adapter).unwrap();

        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..4u64 {
            let log = Arc::clone(&log);
            txn.add_task(move || {
                log.lock().unwrap().push(i);
                Ok(1)
            })
            .unwrap();
        }

        txn.commit().await.unwrap();
        assert_eq!(&*log.lock().unwrap(), &[0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_enlist_same_resource_twice_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let (res, adapter) = resource_and_adapter("docs", &dir);
        let twin = Arc::new(ResourceAdapter::new(res, Duration::from_millis(10)));

        let txn = Arc::new(Transaction::new(1));
        assert!(txn.enlist(adapter).unwrap());
        assert!(!txn.enlist(twin).unwrap());
    }

    #[tokio::test]
    async fn test_rollback_only_commit_does_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (res, adapter) = resource_and_adapter("docs", &dir);

        let txn = Arc::new(Transaction::new(1));
        txn.enlist(adapter).unwrap();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let result = txn
            .add_task(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(1)
            })
            .unwrap();

        txn.set_rollback_only();
        txn.commit().await.unwrap();

        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(txn.state(), TxState::MarkedRollback);
        assert!(res.read_view().unwrap().is_empty().unwrap());
        // The marked transaction reads as zero effect.
        assert_eq!(result.get().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rollback_discards_deferred_actions() {
        let dir = tempfile::tempdir().unwrap();
        let (res, adapter) = resource_and_adapter("docs", &dir);

        let txn = Arc::new(Transaction::new(1));
        txn.enlist(adapter).unwrap();

        let writer = res.writer().unwrap();
        let result = txn
            .add_task(move || writer.apply(WriteOp::Insert(Document::new("a1"))))
            .unwrap();

        txn.rollback().await.unwrap();
        assert_eq!(txn.state(), TxState::RolledBack);
        assert!(res.read_view().unwrap().is_empty().unwrap());
        assert_eq!(result.get().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_result_unavailable_while_active() {
        let txn = Arc::new(Transaction::new(1));
        let result = txn.add_task(|| Ok(1)).unwrap();
        assert!(matches!(
            result.get().await,
            Err(IndexError::ResultUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_task_aborts_commit() {
        let dir = tempfile::tempdir().unwrap();
        let (res, adapter) = resource_and_adapter("docs", &dir);

        let txn = Arc::new(Transaction::new(1));
        txn.enlist(adapter).unwrap();

        let writer = res.writer().unwrap();
        txn.add_task(move || {
            writer.apply(WriteOp::Insert(Document::new("a1")))?;
            Err(IndexError::ExecutionError("boom".into()))
        })
        .unwrap();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        txn.add_task(move || {
            flag.store(true, Ordering::SeqCst);
            Ok(1)
        })
        .unwrap();

        assert!(txn.commit().await.is_err());
        assert!(!ran.load(Ordering::SeqCst), "later tasks must not run");
        assert_eq!(txn.state(), TxState::Committing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_commit_timeout_leaves_dispatched_work_running() {
        let dir = tempfile::tempdir().unwrap();
        let (res, adapter) = resource_and_adapter("docs", &dir);

        // A phantom earlier transaction blocks the gate so this commit
        // cannot proceed within its bound.
        adapter.enroll(1).unwrap();

        let txn = Arc::new(Transaction::new(2));
        txn.enlist(Arc::clone(&adapter)).unwrap();
        txn.set_timeout(Duration::from_millis(100));

        let writer = res.writer().unwrap();
        txn.add_task(move || writer.apply(WriteOp::Insert(Document::new("a1"))))
            .unwrap();

        let started = std::time::Instant::now();
        let err = txn.commit().await.unwrap_err();
        assert!(matches!(err, IndexError::TransactionTimeout));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(90) && waited < Duration::from_secs(1));

        // Unblock the gate: the abandoned commit finishes in the background.
        adapter.commit(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(adapter.pending_count().unwrap(), 0);
        assert!(res.read_view().unwrap().get("a1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_finally_hook_runs_once() {
        let txn = Arc::new(Transaction::new(1));
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        txn.set_finally_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        txn.run_finally_hook();
        txn.run_finally_hook();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
