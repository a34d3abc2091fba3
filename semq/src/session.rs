use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{Scope, ScopedJoinHandle};

use crate::consumer::Consumer;
use crate::delay::Delay;
use crate::error::{Error, Result};
use crate::item::Item;
use crate::observe::Observer;
use crate::producer::Producer;
use crate::queue::{BoundedQueue, QueueStats};
use crate::task::{Role, TaskMonitor};

/// Owns the queue shared by one producer and one consumer for a whole run.
pub struct Session {
    queue: BoundedQueue<Item>,
    producer: TaskMonitor,
    consumer: TaskMonitor,
    items: u64,
    started: AtomicBool,
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct Report {
    pub produced: Vec<Item>,
    pub consumed: Vec<Item>,
    pub stats: QueueStats,
}

impl Session {
    pub fn new(capacity: usize, items: u64) -> Result<Self> {
        Ok(Self {
            queue: BoundedQueue::new(capacity)?,
            producer: TaskMonitor::new(Role::Producer),
            consumer: TaskMonitor::new(Role::Consumer),
            items,
            started: AtomicBool::new(false),
        })
    }

    pub fn queue(&self) -> &BoundedQueue<Item> {
        &self.queue
    }

    pub fn monitor(&self, role: Role) -> &TaskMonitor {
        match role {
            Role::Producer => &self.producer,
            Role::Consumer => &self.consumer,
        }
    }

    /// Aborts a running session; both tasks return [`Error::Cancelled`].
    pub fn cancel(&self) {
        self.queue.cancel();
    }

    /// Runs both tasks to completion on their own threads.
    ///
    /// If either task fails, the queue is cancelled so the other one cannot
    /// stay blocked, and the first failure is returned. Fails with
    /// [`Error::AlreadyRun`] on every call after the first.
    pub fn run<O: Observer>(
        &self,
        catalog: &'static [&'static str],
        rng: fastrand::Rng,
        producer_delay: impl Delay,
        consumer_delay: impl Delay,
        observer: &O,
    ) -> Result<Report> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyRun);
        }
        let producer = Producer::new(self.items, catalog, rng)?;
        let consumer = Consumer::new(self.items);
        tracing::info!(
            "started session, capacity={}, items={}",
            self.queue.capacity(),
            self.items,
        );

        let (produced, consumed) = std::thread::scope(|cx| -> Result<_> {
            let consumer = self.spawn(cx, Role::Consumer, move || {
                consumer.run(&self.queue, consumer_delay, observer, &self.consumer)
            })?;
            let producer = self.spawn(cx, Role::Producer, move || {
                producer.run(&self.queue, producer_delay, observer, &self.producer)
            });
            let producer = match producer {
                Ok(producer) => producer,
                Err(e) => {
                    // Let the consumer unblock and exit before bailing out.
                    self.cancel();
                    _ = consumer.join();
                    return Err(e);
                },
            };
            let produced = join(Role::Producer, producer);
            let consumed = join(Role::Consumer, consumer);
            match (produced, consumed) {
                (Ok(produced), Ok(consumed)) => Ok((produced, consumed)),
                // Report the cause rather than the cancellation it led to.
                (Err(Error::Cancelled), Err(e)) | (Err(e), _) | (Ok(_), Err(e)) => Err(e),
            }
        })?;

        let stats = self.queue.stats();
        tracing::info!(
            "finished session, produced={}, consumed={}, producer_waits={}, consumer_waits={}",
            produced.len(),
            consumed.len(),
            stats.producer_waits,
            stats.consumer_waits,
        );
        Ok(Report {
            produced,
            consumed,
            stats,
        })
    }

    fn spawn<'scope, F>(
        &'scope self,
        cx: &'scope Scope<'scope, '_>,
        role: Role,
        f: F,
    ) -> Result<ScopedJoinHandle<'scope, Result<Vec<Item>>>>
    where
        F: 'scope + Send + FnOnce() -> Result<Vec<Item>>,
    {
        let queue = &self.queue;
        std::thread::Builder::new()
            .name(role.to_string())
            .spawn_scoped(cx, move || {
                let guard = CancelOnExit(queue);
                let result = f();
                if result.is_ok() {
                    std::mem::forget(guard);
                }
                result
            })
            .map_err(|source| Error::SynchronizationInitFailure { role, source })
    }
}

fn join(role: Role, handle: ScopedJoinHandle<'_, Result<Vec<Item>>>) -> Result<Vec<Item>> {
    handle
        .join()
        .unwrap_or_else(|_| Err(Error::TaskPanicked(role)))
}

/// Cancels the queue when a task leaves early, by error or by unwinding, so
/// that its peer cannot stay blocked forever.
struct CancelOnExit<'a>(&'a BoundedQueue<Item>);

impl Drop for CancelOnExit<'_> {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::{NoDelay, Phase};
    use crate::item::TRICKS;
    use crate::observe::{Event, Recorder};
    use crate::task::TaskState;
    use std::time::Duration;

    struct Sleep(Duration);
    impl Delay for Sleep {
        fn pause(&mut self, phase: Phase) {
            if phase == Phase::Processing {
                std::thread::sleep(self.0);
            }
        }
    }

    #[test]
    fn producer_blocks_on_slow_consumer() {
        let session = Session::new(2, 8).unwrap();
        let report = session
            .run(
                TRICKS,
                fastrand::Rng::new(),
                NoDelay,
                Sleep(Duration::from_millis(5)),
                &crate::observe::Silent,
            )
            .unwrap();
        assert_eq!(report.consumed, report.produced);
        assert!(report.stats.producer_waits >= 1);
        for role in [Role::Producer, Role::Consumer] {
            assert_eq!(session.monitor(role).state(), TaskState::Finished);
        }
    }

    #[test]
    fn runs_once() {
        let session = Session::new(2, 3).unwrap();
        let run = || {
            let rng = fastrand::Rng::new();
            session.run(TRICKS, rng, NoDelay, NoDelay, &crate::observe::Silent)
        };
        assert_eq!(run().unwrap().consumed.len(), 3);
        assert!(matches!(run(), Err(Error::AlreadyRun)));
        for role in [Role::Producer, Role::Consumer] {
            let monitor = session.monitor(role);
            assert_eq!((monitor.role(), monitor.state()), (role, TaskState::Finished));
        }
        assert!(!session.queue().is_cancelled());
    }

    #[test]
    fn causal_event_order() {
        let session = Session::new(3, 40).unwrap();
        let recorder = Recorder::new();
        session
            .run(TRICKS, fastrand::Rng::new(), NoDelay, NoDelay, &recorder)
            .unwrap();

        let events = recorder.into_events();
        let position = |pred: &dyn Fn(&Event) -> bool| events.iter().position(pred).unwrap();
        for id in 1..=40 {
            let produced = position(
                &|e| matches!(e, Event::Produced { item, .. } if item.sequence_id() == id),
            );
            let released = position(
                &|e| matches!(e, Event::Released { item, .. } if item.sequence_id() == id),
            );
            let processed = position(
                &|e| matches!(e, Event::Processed { item } if item.sequence_id() == id),
            );
            assert!(produced < released && released < processed);
        }
    }

    #[test]
    fn panicking_consumer_unblocks_producer() {
        struct Boom;
        impl Delay for Boom {
            fn pause(&mut self, phase: Phase) {
                if phase == Phase::Processing {
                    panic!("boom");
                }
            }
        }

        let session = Session::new(1, 5).unwrap();
        let err = session
            .run(TRICKS, fastrand::Rng::new(), NoDelay, Boom, &crate::observe::Silent)
            .unwrap_err();
        assert!(matches!(err, Error::TaskPanicked(Role::Consumer)), "{err}");
        assert!(session.queue().is_cancelled());
    }
}
