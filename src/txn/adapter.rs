use crate::core::{IndexError, Result};
use crate::index::IndexResource;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::trace;

/// The ordering gate in front of one resource's commit/rollback.
///
/// Transactions enroll in strictly increasing sequence order and must
/// complete their final outcome against the resource in that same order,
/// no matter which worker issues the commit/rollback call first. The gate
/// polls at a fixed interval rather than using a condition variable; the
/// pending queue stays tiny, so the poll costs little.
#[derive(Debug)]
pub struct ResourceAdapter {
    resource: Arc<IndexResource>,
    poll_interval: Duration,
    queue: Mutex<OrderingQueue>,
}

#[derive(Debug, Default)]
struct OrderingQueue {
    /// Enrolled ids, min-first.
    pending: BinaryHeap<Reverse<u64>>,
    last_enrolled: Option<u64>,
}

impl ResourceAdapter {
    pub fn new(resource: Arc<IndexResource>, poll_interval: Duration) -> Self {
        Self {
            resource,
            poll_interval,
            queue: Mutex::new(OrderingQueue::default()),
        }
    }

    pub fn resource(&self) -> &Arc<IndexResource> {
        &self.resource
    }

    /// Two adapters are the same resource manager iff they wrap the same
    /// logical resource.
    pub fn is_same_resource(&self, other: &ResourceAdapter) -> bool {
        self.resource.name() == other.resource.name()
    }

    /// Enroll a transaction id. The first id is accepted unconditionally;
    /// every later one must be strictly greater than the last enrolled.
    pub fn enroll(&self, id: u64) -> Result<()> {
        let mut queue = self.queue.lock()?;
        if let Some(last) = queue.last_enrolled
            && last >= id
        {
            return Err(IndexError::OutOfOrderEnrollment { last, offered: id });
        }
        queue.last_enrolled = Some(id);
        queue.pending.push(Reverse(id));
        Ok(())
    }

    /// Commit the wrapped resource on behalf of `id`, once every earlier
    /// enrolled transaction has completed against it.
    pub async fn commit(&self, id: u64) -> Result<()> {
        self.wait_for_turn(id).await?;
        self.resource.commit().await
    }

    /// Roll back the wrapped resource on behalf of `id`, under the same
    /// ordering rule as [`ResourceAdapter::commit`].
    pub async fn rollback(&self, id: u64) -> Result<()> {
        self.wait_for_turn(id).await?;
        self.resource.rollback().await
    }

    async fn wait_for_turn(&self, id: u64) -> Result<()> {
        loop {
            {
                let mut queue = self.queue.lock()?;
                if queue.pending.peek() == Some(&Reverse(id)) {
                    queue.pending.pop();
                    return Ok(());
                }
            }
            trace!(
                collection = self.resource.name(),
                id, "waiting for earlier transactions"
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Block until no transaction remains enrolled against this resource.
    /// Used only by the sequence provider's wrap-reset.
    pub async fn wait_for_drain(&self) -> Result<()> {
        loop {
            if self.queue.lock()?.pending.is_empty() {
                return Ok(());
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.queue.lock()?.pending.len())
    }

    // No two-phase protocol: prepare voting, heuristic forget and crash
    // recovery fail unconditionally.

    pub fn prepare(&self, _id: u64) -> Result<()> {
        Err(IndexError::Unsupported("prepare".into()))
    }

    pub fn forget(&self, _id: u64) -> Result<()> {
        Err(IndexError::Unsupported("forget".into()))
    }

    pub fn recover(&self) -> Result<Vec<u64>> {
        Err(IndexError::Unsupported("recover".into()))
    }
}
