//! Bounded FIFO of raw transactions, plus a holding area for transactions
//! that can only pass `checkTx` once the queued ones have committed.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MempoolError {
    #[error("Mempool full ({capacity} transactions)")]
    Full { capacity: usize },

    #[error("Mempool closed")]
    Closed,
}

pub struct Mempool {
    queue: Mutex<VecDeque<Vec<u8>>>,
    deferred: Mutex<Vec<Vec<u8>>>,
    capacity: usize,
    closed: AtomicBool,
}

impl Mempool {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            deferred: Mutex::new(Vec::new()),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_room(&self, queued: usize) -> Result<(), MempoolError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MempoolError::Closed);
        }
        if queued + self.deferred.lock().len() >= self.capacity {
            return Err(MempoolError::Full {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn push(&self, raw: Vec<u8>) -> Result<(), MempoolError> {
        let mut queue = self.queue.lock();
        self.ensure_room(queue.len())?;
        queue.push_back(raw);
        Ok(())
    }

    /// Hold `raw` until the next commit, when it is checked again.
    pub fn defer(&self, raw: Vec<u8>) -> Result<(), MempoolError> {
        let queue = self.queue.lock();
        self.ensure_room(queue.len())?;
        self.deferred.lock().push(raw);
        Ok(())
    }

    /// Remove every deferred transaction in arrival order.
    pub fn take_deferred(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.deferred.lock())
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.lock().len()
    }

    /// Remove up to `max` transactions in arrival order.
    pub fn take(&self, max: usize) -> Vec<Vec<u8>> {
        let mut queue = self.queue.lock();
        let count = max.min(queue.len());
        queue.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Refuse further submissions. Queued transactions can still be taken.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_and_capacity() {
        let mempool = Mempool::new(2);
        mempool.push(vec![1]).unwrap();
        mempool.push(vec![2]).unwrap();
        assert_eq!(mempool.push(vec![3]), Err(MempoolError::Full { capacity: 2 }));

        assert_eq!(mempool.take(1), vec![vec![1]]);
        assert_eq!(mempool.take(10), vec![vec![2]]);
        assert!(mempool.is_empty());
    }

    #[test]
    fn test_deferred_share_capacity() {
        let mempool = Mempool::new(2);
        mempool.push(vec![1]).unwrap();
        mempool.defer(vec![2]).unwrap();
        assert_eq!(mempool.push(vec![3]), Err(MempoolError::Full { capacity: 2 }));
        assert_eq!(mempool.defer(vec![3]), Err(MempoolError::Full { capacity: 2 }));

        assert_eq!(mempool.take(10), vec![vec![1]]);
        assert_eq!(mempool.deferred_len(), 1);
        assert_eq!(mempool.take_deferred(), vec![vec![2]]);
        assert_eq!(mempool.deferred_len(), 0);
    }

    #[test]
    fn test_closed_refuses_but_drains() {
        let mempool = Mempool::new(4);
        mempool.push(vec![1]).unwrap();
        mempool.close();
        assert_eq!(mempool.push(vec![2]), Err(MempoolError::Closed));
        assert_eq!(mempool.defer(vec![2]), Err(MempoolError::Closed));
        assert_eq!(mempool.len(), 1);
        assert_eq!(mempool.take(4).len(), 1);
    }
}
