use crate::core::{IndexError, Result};
use crate::txn::transaction::{Transaction, TxState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// A deferred write action queued on a transaction, executed only when the
/// transaction commits. The affected-count flows to the paired
/// [`WriteResult`] through a oneshot channel.
pub(crate) struct WriteTask {
    action: Box<dyn FnOnce() -> Result<u64> + Send>,
    sender: oneshot::Sender<u64>,
}

impl WriteTask {
    pub(crate) fn new<F>(action: F) -> (Self, oneshot::Receiver<u64>)
    where
        F: FnOnce() -> Result<u64> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                action: Box::new(action),
                sender,
            },
            receiver,
        )
    }

    /// Execute the action and publish its affected-count. An error here
    /// aborts the remaining commit sequence of the owning transaction.
    pub(crate) fn run(self) -> Result<()> {
        let affected = (self.action)()?;
        // The caller may have dropped its result handle; that is fine.
        let _ = self.sender.send(affected);
        Ok(())
    }
}

/// Handle on a deferred write action's result.
///
/// The result only becomes observable once the owning transaction has left
/// the active/committing states: a rolled-back transaction reads as zero
/// effect, an unfinished one fails fast instead of blocking.
pub struct WriteResult {
    receiver: oneshot::Receiver<u64>,
    txn: Arc<Transaction>,
}

impl WriteResult {
    pub(crate) fn new(receiver: oneshot::Receiver<u64>, txn: Arc<Transaction>) -> Self {
        Self { receiver, txn }
    }

    fn gate(&self) -> Result<Option<u64>> {
        match self.txn.state() {
            TxState::MarkedRollback | TxState::RollingBack | TxState::RolledBack => Ok(Some(0)),
            TxState::Active | TxState::Committing => Err(IndexError::ResultUnavailable(
                "transaction has not completed".into(),
            )),
            TxState::Committed => Ok(None),
        }
    }

    /// The affected-count, once the owning transaction has completed.
    pub async fn get(self) -> Result<u64> {
        if let Some(zero) = self.gate()? {
            return Ok(zero);
        }
        self.receiver
            .await
            .map_err(|_| IndexError::ResultUnavailable("write action never ran".into()))
    }

    /// Like [`WriteResult::get`], bounded by `timeout`.
    pub async fn get_timeout(self, timeout: Duration) -> Result<u64> {
        if let Some(zero) = self.gate()? {
            return Ok(zero);
        }
        tokio::time::timeout(timeout, self.receiver)
            .await
            .map_err(|_| IndexError::TransactionTimeout)?
            .map_err(|_| IndexError::ResultUnavailable("write action never ran".into()))
    }
}
