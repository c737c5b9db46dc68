// ============================================================================
// Searchlite Library
// ============================================================================

//! Embedded document index with multi-resource transaction coordination.
//!
//! Each collection is an independently persisted index resource with one
//! mutable writer and an invalidatable point-in-time read view. The
//! transaction core lets writes against several resources commit or roll
//! back as one logical unit: deferred write actions run at commit time,
//! per-resource outcomes apply in strict enrollment order, and
//! cross-resource commits fan out in parallel under a single bounded wait.
//!
//! ```no_run
//! use searchlite::{Document, IndexRuntime, RuntimeConfig, TxContext, WriteOp};
//!
//! # #[tokio::main]
//! # async fn main() -> searchlite::Result<()> {
//! let runtime = IndexRuntime::start(
//!     RuntimeConfig::new("/var/lib/myapp/index").collection("articles"),
//! )?;
//!
//! let ctx = TxContext::new();
//! let manager = runtime.manager();
//! let txn = manager.begin(&ctx).await?;
//!
//! txn.enlist(runtime.adapter("articles")?)?;
//! let writer = runtime.resource("articles")?.writer()?;
//! let pending = txn.add_task(move || {
//!     writer.apply(WriteOp::Insert(Document::new("a1").field("title", "hello")))
//! })?;
//!
//! manager.commit(&ctx).await?;
//! assert_eq!(pending.get().await?, 1);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod index;
pub mod runtime;
pub mod storage;
pub mod txn;

// Re-export main types for convenience
pub use self::core::{Document, IndexError, Result, RuntimeConfig, WriteOp};
pub use index::IndexResource;
pub use runtime::IndexRuntime;
pub use storage::{IndexWriter, SearchView};
pub use txn::{
    ResourceAdapter, Transaction, TransactionDef, TransactionManager, TransactionTemplate,
    TxContext, TxState, WriteResult,
};
