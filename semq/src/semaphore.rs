use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::Cancelled;

/// A counting semaphore with cancellable waits.
///
/// Unlike a named OS semaphore, this lives exactly as long as its owner and
/// needs no explicit cleanup.
pub struct Semaphore {
    state: Mutex<State>,
    cond: Condvar,
}

struct State {
    permits: usize,
    cancelled: bool,
    waits: usize,
}

impl Semaphore {
    pub const fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(State {
                permits,
                cancelled: false,
                waits: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Takes one permit, blocking until one is available.
    ///
    /// Fails without taking anything once [`cancel`](Self::cancel) has been
    /// called, even if permits are left.
    pub fn acquire(&self) -> Result<Permit<'_>, Cancelled> {
        let mut state = self.lock();
        if state.permits == 0 && !state.cancelled {
            state.waits += 1;
            state = self
                .cond
                .wait_while(state, |s| s.permits == 0 && !s.cancelled)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.cancelled {
            return Err(Cancelled);
        }
        state.permits -= 1;
        Ok(Permit { sem: self })
    }

    /// Takes one permit if one is available right now.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut state = self.lock();
        if state.cancelled || state.permits == 0 {
            return None;
        }
        state.permits -= 1;
        Some(Permit { sem: self })
    }

    /// Adds one permit and wakes a single waiter.
    pub fn release(&self) {
        self.lock().permits += 1;
        self.cond.notify_one();
    }

    /// Wakes every waiter and fails all later acquisitions.
    pub fn cancel(&self) {
        self.lock().cancelled = true;
        self.cond.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.lock().cancelled
    }

    pub fn available(&self) -> usize {
        self.lock().permits
    }

    /// Number of acquisitions that had to block.
    pub fn waits(&self) -> usize {
        self.lock().waits
    }

    // The counter is never left half-updated, so a poisoned lock is still
    // consistent.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One unit taken from a [`Semaphore`].
///
/// Dropping the permit gives it back to the semaphore it came from.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit<'a> {
    sem: &'a Semaphore,
}

impl Permit<'_> {
    /// Consumes the permit without giving it back.
    ///
    /// Used when the unit moves to another semaphore instead.
    pub fn forget(self) {
        std::mem::forget(self);
    }

    /// Moves the unit to `to`: the returned permit releases into `to` when
    /// dropped, including while unwinding.
    pub fn transfer<'b>(self, to: &'b Semaphore) -> Permit<'b> {
        self.forget();
        Permit { sem: to }
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn permit_drop_releases() {
        let sem = Semaphore::new(2);
        let a = sem.acquire().unwrap();
        let b = sem.acquire().unwrap();
        assert_eq!(sem.available(), 0);
        assert!(sem.try_acquire().is_none());
        drop(a);
        assert_eq!(sem.available(), 1);
        b.forget();
        assert_eq!(sem.available(), 1);
        assert_eq!(sem.waits(), 0);
    }

    #[test]
    fn transfer_releases_into_target() {
        let (from, to) = (Semaphore::new(1), Semaphore::new(0));
        let permit = from.acquire().unwrap().transfer(&to);
        assert_eq!((from.available(), to.available()), (0, 0));
        drop(permit);
        assert_eq!((from.available(), to.available()), (0, 1));
    }

    #[test]
    fn acquire_blocks_until_release() {
        let sem = Semaphore::new(0);
        let acquired = AtomicBool::new(false);
        std::thread::scope(|cx| {
            cx.spawn(|| {
                sem.acquire().unwrap().forget();
                acquired.store(true, Ordering::Release);
            });
            while sem.waits() == 0 {
                std::thread::yield_now();
            }
            assert!(!acquired.load(Ordering::Acquire));
            sem.release();
        });
        assert!(acquired.load(Ordering::Acquire));
        assert_eq!(sem.available(), 0);
        assert_eq!(sem.waits(), 1);
    }

    #[test]
    fn cancel_wakes_waiters() {
        let sem = Semaphore::new(0);
        std::thread::scope(|cx| {
            let waiters = (0..3)
                .map(|_| cx.spawn(|| sem.acquire().map(Permit::forget)))
                .collect::<Vec<_>>();
            while sem.waits() < 3 {
                std::thread::sleep(Duration::from_millis(1));
            }
            sem.cancel();
            for w in waiters {
                assert_eq!(w.join().unwrap(), Err(Cancelled));
            }
        });
        sem.release();
        assert!(sem.is_cancelled());
        assert!(sem.acquire().is_err());
        assert!(sem.try_acquire().is_none());
    }
}
