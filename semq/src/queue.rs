use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Cancelled, Error, Result};
use crate::semaphore::Semaphore;

/// A fixed-capacity FIFO handing items from one producer to one consumer.
///
/// Capacity is tracked by two semaphores: `free` counts empty slots and
/// `filled` counts stored items. The buffer lock is only taken to move an item
/// in or out of a slot and is never held across a semaphore wait.
pub struct BoundedQueue<T> {
    ring: Mutex<Ring<T>>,
    free: Semaphore,
    filled: Semaphore,
    capacity: usize,
}

struct Ring<T> {
    buf: Box<[Option<T>]>,
    head: usize,
    tail: usize,
    occupied: usize,
    version: u64,
}

/// Queue state captured inside the lock by a successful operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub occupied: usize,
    pub capacity: usize,
    /// Position of the operation in the total order of queue mutations,
    /// starting from 1.
    pub version: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Enqueues that had to wait for a free slot.
    pub producer_waits: usize,
    /// Dequeues that had to wait for an item.
    pub consumer_waits: usize,
}

impl<T> BoundedQueue<T> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }
        let buf = std::iter::repeat_with(|| None).take(capacity).collect();
        Ok(Self {
            ring: Mutex::new(Ring {
                buf,
                head: 0,
                tail: 0,
                occupied: 0,
                version: 0,
            }),
            free: Semaphore::new(capacity),
            filled: Semaphore::new(0),
            capacity,
        })
    }

    /// Inserts `item`, blocking while the queue is full.
    ///
    /// The item is handed back if the wait was cancelled.
    pub fn enqueue(&self, item: T) -> Result<Snapshot, T> {
        self.enqueue_then(item, |_| ())
    }

    /// Like [`enqueue`](Self::enqueue), but runs `f` once the item is placed
    /// and before the consumer is signalled. No lock is held while `f` runs.
    pub fn enqueue_then(&self, item: T, f: impl FnOnce(Snapshot)) -> Result<Snapshot, T> {
        let Ok(permit) = self.free.acquire() else {
            return Err(item);
        };
        let snapshot = self.lock().push(item);
        tracing::trace!(
            "placed item, occupied={}/{}, version={}",
            snapshot.occupied,
            snapshot.capacity,
            snapshot.version,
        );
        // The slot is taken from here on, so even an unwinding `f` must
        // signal the consumer rather than hand the unit back to `free`.
        let _signal = permit.transfer(&self.filled);
        f(snapshot);
        Ok(snapshot)
    }

    /// Removes the oldest item, blocking while the queue is empty.
    pub fn dequeue(&self) -> Result<(T, Snapshot), Cancelled> {
        self.dequeue_then(|_, _| ())
    }

    /// Like [`dequeue`](Self::dequeue), but runs `f` once the item is taken
    /// and before the freed slot is signalled. No lock is held while `f` runs.
    pub fn dequeue_then(&self, f: impl FnOnce(&T, Snapshot)) -> Result<(T, Snapshot), Cancelled> {
        let permit = self.filled.acquire()?;
        let (item, snapshot) = self.lock().pop();
        tracing::trace!(
            "took item, occupied={}/{}, version={}",
            snapshot.occupied,
            snapshot.capacity,
            snapshot.version,
        );
        let _signal = permit.transfer(&self.free);
        f(&item, snapshot);
        Ok((item, snapshot))
    }

    /// Abandons every current and future blocking wait.
    ///
    /// Items already stored stay in the buffer and are dropped with the queue.
    pub fn cancel(&self) {
        tracing::debug!("cancelled queue");
        self.free.cancel();
        self.filled.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.free.is_cancelled()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().occupied
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            producer_waits: self.free.waits(),
            consumer_waits: self.filled.waits(),
        }
    }

    // Ring mutations are plain index updates that cannot panic halfway.
    fn lock(&self) -> MutexGuard<'_, Ring<T>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Ring<T> {
    fn push(&mut self, item: T) -> Snapshot {
        debug_assert!(self.occupied < self.buf.len(), "free permit without a free slot");
        let slot = &mut self.buf[self.tail];
        debug_assert!(slot.is_none());
        *slot = Some(item);
        self.tail = (self.tail + 1) % self.buf.len();
        self.occupied += 1;
        self.snapshot()
    }

    fn pop(&mut self) -> (T, Snapshot) {
        debug_assert!(self.occupied > 0, "filled permit without an item");
        let item = self.buf[self.head]
            .take()
            .expect("filled permit without an item");
        self.head = (self.head + 1) % self.buf.len();
        self.occupied -= 1;
        (item, self.snapshot())
    }

    fn snapshot(&mut self) -> Snapshot {
        self.version += 1;
        Snapshot {
            occupied: self.occupied,
            capacity: self.buf.len(),
            version: self.version,
        }
    }
}
