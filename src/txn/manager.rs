use crate::core::{IndexError, Result};
use crate::runtime::AdapterRegistry;
use crate::txn::sequence::SequenceProvider;
use crate::txn::transaction::{Transaction, TxState};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// The ambient-transaction slot for one logical execution context.
///
/// Instead of a per-thread global, the context is an explicit handle:
/// callers thread it through their call chains and clone it into tasks
/// they spawn, which is what propagates the ambient transaction. Two
/// unrelated operations must use two different contexts.
#[derive(Clone, Default)]
pub struct TxContext {
    slot: Arc<Mutex<Option<Arc<Transaction>>>>,
}

impl TxContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self) -> Result<Option<Arc<Transaction>>> {
        Ok(self.slot.lock()?.clone())
    }

    fn take(&self) -> Result<Option<Arc<Transaction>>> {
        Ok(self.slot.lock()?.take())
    }
}

/// Coordinates transactions over a context handle with "required"
/// propagation: begin reuses the context's ambient transaction when one
/// exists, otherwise starts a fresh one.
pub struct TransactionManager {
    sequence: SequenceProvider,
    default_timeout: Option<Duration>,
}

impl TransactionManager {
    pub fn new(adapters: Arc<AdapterRegistry>, default_timeout: Option<Duration>) -> Self {
        Self {
            sequence: SequenceProvider::new(adapters),
            default_timeout,
        }
    }

    /// The context's ambient transaction, if any.
    pub fn current(&self, ctx: &TxContext) -> Result<Option<Arc<Transaction>>> {
        ctx.get()
    }

    /// Begin a transaction on `ctx`, or join the one already ambient.
    pub async fn begin(&self, ctx: &TxContext) -> Result<Arc<Transaction>> {
        if let Some(existing) = ctx.get()? {
            return Ok(existing);
        }
        let id = self.sequence.next().await?;
        let txn = Arc::new(Transaction::new(id));
        if let Some(timeout) = self.default_timeout {
            txn.set_timeout(timeout);
        }
        *ctx.slot.lock()? = Some(Arc::clone(&txn));
        debug!(id, "transaction begun");
        Ok(txn)
    }

    /// Commit the ambient transaction. The slot is cleared and the finally
    /// hook invoked whether or not the commit itself succeeded.
    pub async fn commit(&self, ctx: &TxContext) -> Result<()> {
        let txn = ctx.take()?.ok_or(IndexError::NoActiveTransaction)?;
        let outcome = txn.commit().await;
        txn.run_finally_hook();
        outcome
    }

    /// Roll back the ambient transaction, clearing the slot regardless of
    /// the outcome.
    pub async fn rollback(&self, ctx: &TxContext) -> Result<()> {
        let txn = ctx.take()?.ok_or(IndexError::NoActiveTransaction)?;
        txn.rollback().await
    }

    /// Detach and return the ambient transaction without completing it.
    pub fn suspend(&self, ctx: &TxContext) -> Result<Option<Arc<Transaction>>> {
        ctx.take()
    }

    /// Reinstall a previously suspended transaction. Refuses to displace a
    /// different transaction already ambient on `ctx`.
    pub fn resume(&self, ctx: &TxContext, txn: Arc<Transaction>) -> Result<()> {
        let mut slot = ctx.slot.lock()?;
        if let Some(existing) = slot.as_ref()
            && !Arc::ptr_eq(existing, &txn)
        {
            return Err(IndexError::ResumeConflict);
        }
        *slot = Some(txn);
        Ok(())
    }

    pub fn set_rollback_only(&self, ctx: &TxContext) -> Result<()> {
        ctx.get()?
            .ok_or(IndexError::NoActiveTransaction)?
            .set_rollback_only();
        Ok(())
    }

    /// Configure the ambient transaction's timeout. Non-positive seconds
    /// are a no-op.
    pub fn set_transaction_timeout(&self, ctx: &TxContext, seconds: i64) -> Result<()> {
        if seconds <= 0 {
            return Ok(());
        }
        ctx.get()?
            .ok_or(IndexError::NoActiveTransaction)?
            .set_timeout(Duration::from_secs(seconds as u64));
        Ok(())
    }

    /// The ambient transaction's state, or `None` when no transaction is
    /// associated with the context.
    pub fn status(&self, ctx: &TxContext) -> Result<Option<TxState>> {
        Ok(ctx.get()?.map(|txn| txn.state()))
    }
}
