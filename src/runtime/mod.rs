pub mod registry;

pub use registry::AdapterRegistry;

use crate::core::{IndexError, Result, RuntimeConfig};
use crate::index::IndexResource;
use crate::txn::{ResourceAdapter, TransactionManager, TransactionTemplate};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Lifecycle facade over a set of index resources.
///
/// Opens every configured collection at start, hands out resources and
/// their adapters by name, and owns the transaction manager that
/// coordinates writes across them.
pub struct IndexRuntime {
    config: RuntimeConfig,
    resources: RwLock<HashMap<String, Arc<IndexResource>>>,
    adapters: Arc<AdapterRegistry>,
    manager: Arc<TransactionManager>,
    closed: AtomicBool,
}

impl IndexRuntime {
    /// Open every configured collection and assemble the runtime.
    pub fn start(config: RuntimeConfig) -> Result<Arc<Self>> {
        debug!(path = ?config.index_path, "starting index runtime");

        let mut resources = HashMap::new();
        for name in &config.collections {
            let resource = IndexResource::open(name, &config.index_path, config.view_grace)?;
            resources.insert(name.clone(), resource);
        }

        let adapters = Arc::new(AdapterRegistry::new());
        let manager = Arc::new(TransactionManager::new(
            Arc::clone(&adapters),
            config.default_timeout,
        ));

        debug!(
            collections = config.collections.len(),
            "index runtime started"
        );
        Ok(Arc::new(Self {
            config,
            resources: RwLock::new(resources),
            adapters,
            manager,
            closed: AtomicBool::new(false),
        }))
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(IndexError::Runtime("runtime is closed".into()));
        }
        Ok(())
    }

    /// Look up a resource by collection name.
    pub fn resource(&self, name: &str) -> Result<Arc<IndexResource>> {
        self.check_open()?;
        self.resources
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| IndexError::ResourceNotFound(name.to_string()))
    }

    /// The ordering-gate adapter for a collection, created and registered
    /// on first use.
    pub fn adapter(&self, name: &str) -> Result<Arc<ResourceAdapter>> {
        let resource = self.resource(name)?;
        self.adapters
            .get_or_create(&resource, self.config.poll_interval)
    }

    pub fn manager(&self) -> &Arc<TransactionManager> {
        &self.manager
    }

    pub fn template(&self) -> TransactionTemplate {
        TransactionTemplate::new(Arc::clone(&self.manager))
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Drop every resource and adapter and refuse further lookups.
    /// Idempotent; pending uncommitted writer state is discarded,
    /// committed segments stay on disk.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.resources.write()?.clear();
        self.adapters.clear()?;
        debug!("index runtime closed");
        Ok(())
    }
}

impl Drop for IndexRuntime {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
