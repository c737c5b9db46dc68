use crate::core::Result;
use crate::txn::manager::{TransactionManager, TxContext};
use std::sync::Arc;

/// Declarative settings for one templated transaction.
#[derive(Debug, Clone, Copy)]
pub struct TransactionDef {
    /// Timeout in seconds; non-positive means no bound.
    pub timeout_secs: i64,
}

impl TransactionDef {
    pub const DEFAULT: TransactionDef = TransactionDef { timeout_secs: -1 };

    pub fn with_timeout(timeout_secs: i64) -> Self {
        Self { timeout_secs }
    }
}

impl Default for TransactionDef {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Execute-around helper: begins a transaction on a fresh context, runs
/// the caller's closure, commits on success and rolls back on error.
pub struct TransactionTemplate {
    manager: Arc<TransactionManager>,
}

impl TransactionTemplate {
    pub fn new(manager: Arc<TransactionManager>) -> Self {
        Self { manager }
    }

    pub async fn execute<T, F, Fut>(&self, definition: TransactionDef, action: F) -> Result<T>
    where
        F: FnOnce(TxContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let ctx = TxContext::new();
        self.manager.begin(&ctx).await?;
        self.manager
            .set_transaction_timeout(&ctx, definition.timeout_secs)?;

        match action(ctx.clone()).await {
            Ok(value) => {
                self.manager.commit(&ctx).await?;
                Ok(value)
            }
            Err(err) => {
                self.manager.rollback(&ctx).await?;
                Err(err)
            }
        }
    }

    pub async fn execute_default<T, F, Fut>(&self, action: F) -> Result<T>
    where
        F: FnOnce(TxContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute(TransactionDef::DEFAULT, action).await
    }
}
