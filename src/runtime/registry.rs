use crate::core::Result;
use crate::index::IndexResource;
use crate::txn::ResourceAdapter;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Lookup of resource adapters by collection name.
///
/// Adapters are created lazily, the first time a transaction touches a
/// collection; the sequence provider walks every registered adapter when
/// it drains for a wrap-reset.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    inner: RwLock<HashMap<String, Arc<ResourceAdapter>>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<Option<Arc<ResourceAdapter>>> {
        Ok(self.inner.read()?.get(name).cloned())
    }

    /// The adapter for `resource`, creating and registering it on first use.
    pub fn get_or_create(
        &self,
        resource: &Arc<IndexResource>,
        poll_interval: Duration,
    ) -> Result<Arc<ResourceAdapter>> {
        if let Some(adapter) = self.get(resource.name())? {
            return Ok(adapter);
        }
        let mut inner = self.inner.write()?;
        // Another task may have won the race between the read and the write.
        if let Some(adapter) = inner.get(resource.name()) {
            return Ok(Arc::clone(adapter));
        }
        let adapter = Arc::new(ResourceAdapter::new(Arc::clone(resource), poll_interval));
        inner.insert(resource.name().to_string(), Arc::clone(&adapter));
        Ok(adapter)
    }

    pub fn all(&self) -> Result<Vec<Arc<ResourceAdapter>>> {
        Ok(self.inner.read()?.values().cloned().collect())
    }

    /// Drop every registered adapter. Used when the owning runtime closes.
    pub fn clear(&self) -> Result<()> {
        self.inner.write()?.clear();
        Ok(())
    }
}
