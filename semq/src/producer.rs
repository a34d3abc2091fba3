use std::num::NonZeroU64;

use crate::delay::{Delay, Phase};
use crate::error::{Error, Result};
use crate::item::Item;
use crate::observe::{Event, Observer};
use crate::queue::BoundedQueue;
use crate::task::{TaskMonitor, TaskState};

/// Generates a fixed number of items and feeds them into the queue.
pub struct Producer {
    count: u64,
    catalog: &'static [&'static str],
    rng: fastrand::Rng,
}

impl Producer {
    pub fn new(count: u64, catalog: &'static [&'static str], rng: fastrand::Rng) -> Result<Self> {
        if catalog.is_empty() {
            return Err(Error::EmptyCatalog);
        }
        Ok(Self {
            count,
            catalog,
            rng,
        })
    }

    fn make_item(&mut self, sequence_id: NonZeroU64) -> Item {
        let payload = self.catalog[self.rng.usize(..self.catalog.len())];
        Item::new(sequence_id, payload)
    }

    /// Enqueues items `1..=count` in order and returns them.
    ///
    /// Each item is reported as [`Event::Produced`] once it is in the queue
    /// and before the consumer can take it.
    pub fn run(
        mut self,
        queue: &BoundedQueue<Item>,
        mut delay: impl Delay,
        observer: &impl Observer,
        monitor: &TaskMonitor,
    ) -> Result<Vec<Item>> {
        tracing::info!("started producer, items={}", self.count);
        monitor.set(TaskState::Blocked);
        delay.pause(Phase::Warmup);

        // `count` is caller-controlled; grow on demand past a small reserve.
        let mut produced = Vec::with_capacity(self.count.min(1024) as usize);
        let result: Result<()> = (1..=self.count)
            .filter_map(NonZeroU64::new)
            .try_for_each(|sequence_id| {
                monitor.set(TaskState::Blocked);
                let item = self.make_item(sequence_id);
                delay.pause(Phase::Arrival);
                queue
                    .enqueue_then(item, |snapshot| {
                        monitor.set(TaskState::InCriticalSection);
                        observer.observe(Event::Produced { item, snapshot });
                    })
                    .map_err(|item| {
                        tracing::debug!("dropped unqueued item {item}");
                        Error::Cancelled
                    })?;
                tracing::debug!("produced item {item}");
                produced.push(item);
                Ok(())
            });

        monitor.set(TaskState::Finished);
        match result {
            Ok(()) => tracing::info!("exited producer, produced={}", produced.len()),
            Err(ref e) => tracing::warn!("stopped producer, produced={}: {e}", produced.len()),
        }
        result.map(|_| produced)
    }
}
