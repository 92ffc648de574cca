//! Built-in FIFO pool container.
//!
//! The one instance of the pool vtable this crate ships itself, so the
//! engine is runnable without a caller-supplied container. Hot-path
//! push/pop go through a lock-free `SegQueue`; `remove` (used for
//! cancellation and migration source cleanup, both rare) drains and
//! rebuilds the queue, same as the source's linked-list `p_remove` walks
//! the whole pool.

use crossbeam_queue::SegQueue;
use esched_core::{CoreError, CoreResult, SpinLock, Unit};

use crate::pool::PoolOps;

pub struct FifoQueue {
    queue: SegQueue<Unit>,
    remove_lock: SpinLock<()>,
}

impl FifoQueue {
    pub fn new() -> Self {
        FifoQueue {
            queue: SegQueue::new(),
            remove_lock: SpinLock::new(()),
        }
    }
}

impl Default for FifoQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolOps for FifoQueue {
    fn push(&self, unit: Unit) {
        self.queue.push(unit);
    }

    fn pop(&self) -> Option<Unit> {
        self.queue.pop()
    }

    fn remove(&self, unit: Unit) -> CoreResult<()> {
        let _guard = self.remove_lock.lock();
        let mut drained = Vec::with_capacity(self.queue.len());
        while let Some(u) = self.queue.pop() {
            drained.push(u);
        }
        let before = drained.len();
        drained.retain(|&u| u != unit);
        let removed = drained.len() != before;
        for u in drained {
            self.queue.push(u);
        }
        if removed {
            Ok(())
        } else {
            Err(CoreError::Unit)
        }
    }

    fn get_size(&self) -> usize {
        self.queue.len()
    }
}
