use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration for an embedded index
///
/// Built once and handed to [`crate::runtime::IndexRuntime::start`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Root directory holding one subdirectory per collection
    pub index_path: PathBuf,

    /// Collections opened at startup
    pub collections: Vec<String>,

    /// How long a superseded read view stays usable before its backing
    /// data is closed
    pub view_grace: Duration,

    /// Fixed interval at which the ordering gate re-checks the head of
    /// its pending queue
    pub poll_interval: Duration,

    /// Default transaction timeout applied by the manager; `None` waits
    /// indefinitely
    pub default_timeout: Option<Duration>,
}

impl RuntimeConfig {
    /// Create a configuration rooted at the given index directory
    pub fn new(index_path: impl AsRef<Path>) -> Self {
        Self {
            index_path: index_path.as_ref().to_path_buf(),
            collections: Vec::new(),
            view_grace: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
            default_timeout: None,
        }
    }

    /// Register a collection to be opened at startup
    pub fn collection(mut self, name: &str) -> Self {
        self.collections.push(name.to_string());
        self
    }

    /// Set the read-view disposal grace delay
    pub fn view_grace(mut self, grace: Duration) -> Self {
        self.view_grace = grace;
        self
    }

    /// Set the ordering-gate poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the default transaction timeout
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }
}
