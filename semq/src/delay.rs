use std::ops::RangeInclusive;
use std::time::Duration;

/// Points at which a task may simulate real-world timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Once, before the producer starts generating items.
    Warmup,
    /// Before each enqueue attempt.
    Arrival,
    /// While the consumer works on a dequeued item.
    Processing,
}

/// Cosmetic timing injected into the producer and the consumer.
///
/// A delay is never taken while holding the queue lock or a semaphore permit.
pub trait Delay: Send {
    fn pause(&mut self, phase: Phase);
}

impl<D: Delay + ?Sized> Delay for &mut D {
    fn pause(&mut self, phase: Phase) {
        (**self).pause(phase)
    }
}

impl<D: Delay + ?Sized> Delay for Box<D> {
    fn pause(&mut self, phase: Phase) {
        (**self).pause(phase)
    }
}

/// Runs everything back to back.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn pause(&mut self, _phase: Phase) {}
}

/// Sleeps for a random duration per phase.
pub struct RandomDelay {
    rng: fastrand::Rng,
    warmup: Duration,
    arrival: RangeInclusive<Duration>,
    processing: Duration,
}

impl RandomDelay {
    pub fn new(
        rng: fastrand::Rng,
        warmup: Duration,
        arrival: RangeInclusive<Duration>,
        processing: Duration,
    ) -> Self {
        Self {
            rng,
            warmup,
            arrival,
            processing,
        }
    }

    pub fn duration_of(&mut self, phase: Phase) -> Duration {
        match phase {
            Phase::Warmup => self.warmup,
            Phase::Arrival => {
                let lo = self.arrival.start().as_millis() as u64;
                let hi = self.arrival.end().as_millis() as u64;
                Duration::from_millis(self.rng.u64(lo..=hi.max(lo)))
            },
            Phase::Processing => self.processing,
        }
    }
}

impl Delay for RandomDelay {
    fn pause(&mut self, phase: Phase) {
        let delay = self.duration_of(phase);
        if !delay.is_zero() {
            tracing::trace!("paused for {phase:?}, delay={}ms", delay.as_millis());
            std::thread::sleep(delay);
        }
    }
}
