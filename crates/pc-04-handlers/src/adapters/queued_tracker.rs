//! # Queued Order Tracker
//!
//! In-memory [`OrderTracker`]: orders accumulate in a queue during the block
//! and are published as one batch over a `tokio::sync::broadcast` channel on
//! flush. Stream servers and other consumers subscribe to the channel.

use crate::ports::outbound::{OrderTracker, TrackedOrder};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Default broadcast channel capacity, in batches.
pub const DEFAULT_CAPACITY: usize = 256;

/// Orders accepted in one block.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBatch {
    /// Flush sequence number, starting at 1.
    pub sequence: u64,
    pub orders: Vec<TrackedOrder>,
}

/// Queue plus broadcast fan-out.
pub struct QueuedOrderTracker {
    queue: Mutex<Vec<TrackedOrder>>,
    sender: broadcast::Sender<Arc<OrderBatch>>,
    batches_published: AtomicU64,
}

impl QueuedOrderTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            queue: Mutex::new(Vec::new()),
            sender,
            batches_published: AtomicU64::new(0),
        }
    }

    /// Receive every batch flushed after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<OrderBatch>> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn batches_published(&self) -> u64 {
        self.batches_published.load(Ordering::Relaxed)
    }
}

impl Default for QueuedOrderTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderTracker for QueuedOrderTracker {
    fn add(&self, order: TrackedOrder) {
        self.queue.lock().push(order);
    }

    fn flush(&self) -> usize {
        let orders = std::mem::take(&mut *self.queue.lock());
        if orders.is_empty() {
            return 0;
        }

        let size = orders.len();
        let sequence = self.batches_published.fetch_add(1, Ordering::Relaxed) + 1;
        match self.sender.send(Arc::new(OrderBatch { sequence, orders })) {
            Ok(receivers) => {
                debug!(sequence, size, receivers, "[pc-04] Order batch published");
            }
            Err(_) => {
                warn!(sequence, size, "[pc-04] Order batch dropped: no subscribers");
            }
        }
        size
    }

    fn discard(&self) -> usize {
        let dropped = std::mem::take(&mut *self.queue.lock()).len();
        if dropped > 0 {
            warn!(dropped, "[pc-04] Queued orders discarded");
        }
        dropped
    }

    fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}
