use crate::delay::{Delay, Phase};
use crate::error::Result;
use crate::item::Item;
use crate::observe::{Event, Observer};
use crate::queue::BoundedQueue;
use crate::task::{TaskMonitor, TaskState};

/// Drains a fixed number of items and processes each outside the queue.
pub struct Consumer {
    count: u64,
}

impl Consumer {
    pub fn new(count: u64) -> Self {
        Self { count }
    }

    /// Dequeues exactly `count` items and returns them in arrival order.
    ///
    /// The freed slot is signalled before the item is processed, so the
    /// producer may refill it while processing is still going on.
    pub fn run(
        self,
        queue: &BoundedQueue<Item>,
        mut delay: impl Delay,
        observer: &impl Observer,
        monitor: &TaskMonitor,
    ) -> Result<Vec<Item>> {
        tracing::info!("started consumer, items={}", self.count);
        monitor.set(TaskState::Blocked);
        observer.observe(Event::Ready);

        // `count` is caller-controlled; grow on demand past a small reserve.
        let mut consumed = Vec::with_capacity(self.count.min(1024) as usize);
        let result: Result<()> = (0..self.count).try_for_each(|_| {
            monitor.set(TaskState::Blocked);
            let (item, _) = queue.dequeue_then(|&item, snapshot| {
                monitor.set(TaskState::InCriticalSection);
                observer.observe(Event::Released { item, snapshot });
            })?;
            tracing::debug!("released item {item}");

            monitor.set(TaskState::Processing);
            delay.pause(Phase::Processing);
            observer.observe(Event::Processed { item });
            tracing::debug!("processed item {item}");

            consumed.push(item);
            Ok(())
        });

        monitor.set(TaskState::Finished);
        match result {
            Ok(()) => tracing::info!("exited consumer, consumed={}", consumed.len()),
            Err(ref e) => tracing::warn!("stopped consumer, consumed={}: {e}", consumed.len()),
        }
        result.map(|_| consumed)
    }
}
