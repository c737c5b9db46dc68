// ============================================================================
// Transaction Coordination Module
// ============================================================================
//
// Multi-resource transactions over independently persisted indexes:
// deferred write actions run at commit time, then every enrolled resource
// commits in parallel while per-resource ordering is enforced by each
// adapter's gate. Commit-or-nothing in memory; there is no durable
// transaction log and no two-phase prepare voting.
//
// ============================================================================

pub mod adapter;
pub mod manager;
pub mod sequence;
pub mod task;
pub mod template;
pub mod transaction;

pub use adapter::ResourceAdapter;
pub use manager::{TransactionManager, TxContext};
pub use sequence::SequenceProvider;
pub use task::WriteResult;
pub use template::{TransactionDef, TransactionTemplate};
pub use transaction::{Transaction, TxState};
