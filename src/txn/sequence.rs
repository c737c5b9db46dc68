use crate::core::Result;
use crate::runtime::AdapterRegistry;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Issues monotonically increasing transaction ids.
///
/// The counter is a finite-width signed integer on purpose: a wrap shows
/// up as a negative value. When that happens, issuance pauses until every
/// resource's pending queue has drained, then the counter resets to zero.
/// The reset only guarantees the pending queues are empty: each adapter
/// keeps the highest id it ever saw, so a resource enrolled before the
/// wrap rejects the smaller post-reset ids for the rest of its lifetime.
#[derive(Debug)]
pub struct SequenceProvider {
    counter: AtomicI64,
    adapters: Arc<AdapterRegistry>,
    /// Makes the drain-and-reset critical section mutually exclusive;
    /// concurrent wrap observers queue here instead of racing the reset.
    reset_lock: tokio::sync::Mutex<()>,
}

impl SequenceProvider {
    pub fn new(adapters: Arc<AdapterRegistry>) -> Self {
        Self::with_start(0, adapters)
    }

    /// Start the counter at an arbitrary value. Exists so the wrap path
    /// can be exercised without issuing 2^63 ids first.
    pub fn with_start(start: i64, adapters: Arc<AdapterRegistry>) -> Self {
        Self {
            counter: AtomicI64::new(start),
            adapters,
            reset_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// The next id. Blocks only during the rare wrap-reset window.
    pub async fn next(&self) -> Result<u64> {
        loop {
            let val = self.counter.fetch_add(1, Ordering::SeqCst);
            if val >= 0 {
                return Ok(val as u64);
            }

            let _guard = self.reset_lock.lock().await;
            // Re-check under the lock: a predecessor may already have reset.
            let current = self.counter.load(Ordering::SeqCst);
            if current < 0 {
                for adapter in self.adapters.all()? {
                    adapter.wait_for_drain().await?;
                }
                let _ = self.counter.compare_exchange(
                    current,
                    0,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexResource;
    use std::collections::HashSet;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ids_are_unique_and_increasing() {
        let provider = Arc::new(SequenceProvider::new(Arc::new(AdapterRegistry::new())));

        let mut handles = vec![];
        for _ in 0..8 {
            let provider = Arc::clone(&provider);
            handles.push(tokio::spawn(async move {
                let mut ids = Vec::new();
                for _ in 0..100 {
                    ids.push(provider.next().await.unwrap());
                }
                ids
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            let ids = handle.await.unwrap();
            // Each task sees its own ids strictly increasing.
            assert!(ids.windows(2).all(|w| w[0] < w[1]));
            all.extend(ids);
        }

        let unique: HashSet<u64> = all.iter().copied().collect();
        assert_eq!(unique.len(), 800, "no duplicates, no drops");
    }

    #[tokio::test]
    async fn test_wrap_resets_to_zero_after_drain() {
        let provider = SequenceProvider::with_start(i64::MAX, Arc::new(AdapterRegistry::new()));

        let max = provider.next().await.unwrap();
        assert_eq!(max, i64::MAX as u64);

        // The counter has wrapped negative; the next call must drain
        // (trivially, no adapters) and restart from zero.
        assert_eq!(provider.next().await.unwrap(), 0);
        assert_eq!(provider.next().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wrap_waits_for_registered_adapters_to_drain() {
        let dir = tempfile::tempdir().unwrap();
        let res = IndexResource::open("docs", dir.path(), Duration::from_millis(20)).unwrap();
        let registry = Arc::new(AdapterRegistry::new());
        let adapter = registry
            .get_or_create(&res, Duration::from_millis(10))
            .unwrap();

        let provider = Arc::new(SequenceProvider::with_start(i64::MAX, registry));
        let last = provider.next().await.unwrap();
        adapter.enroll(last).unwrap();

        // The counter has wrapped while an id is still enrolled: issuance
        // must pause until that transaction completes.
        let p2 = Arc::clone(&provider);
        let reset = tokio::spawn(async move { p2.next().await });

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(
            !reset.is_finished(),
            "issuance must pause while an id is enrolled"
        );

        adapter.commit(last).await.unwrap();
        assert_eq!(reset.await.unwrap().unwrap(), 0);
    }
}
