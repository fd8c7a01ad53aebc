use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Blocking counting semaphore capping the number of chunks in flight.
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub(crate) fn new(permits: usize) -> Self {
        assert!(permits > 0, "permits must be > 0");
        Self {
            permits: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Take a permit, blocking until one is free. Returns how long the caller waited.
    pub(crate) fn acquire(&self) -> Duration {
        let start = Instant::now();
        let mut waited = false;
        let mut permits = self.lock();
        while *permits == 0 {
            waited = true;
            permits = self.cv.wait(permits).unwrap_or_else(PoisonError::into_inner);
        }
        *permits -= 1;
        if waited { start.elapsed() } else { Duration::ZERO }
    }

    pub(crate) fn release(&self) {
        *self.lock() += 1;
        self.cv.notify_one();
    }

    /// A permit held for the lifetime of the guard.
    pub(crate) fn permit(&self) -> (Permit<'_>, Duration) {
        let waited = self.acquire();
        (Permit { sem: self }, waited)
    }

    // The counter stays consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.permits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub(crate) struct Permit<'a> {
    sem: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}

#[cfg(test)]
mod tests {
    use super::Semaphore;

    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn uncontended_acquire_does_not_wait() {
        let sem = Semaphore::new(2);
        assert_eq!(sem.acquire(), Duration::ZERO);
        assert_eq!(sem.acquire(), Duration::ZERO);
        sem.release();
        sem.release();
    }

    #[test]
    fn permit_is_returned_on_drop() {
        let sem = Arc::new(Semaphore::new(1));
        {
            let (_permit, waited) = sem.permit();
            assert_eq!(waited, Duration::ZERO);
        }

        let sem2 = Arc::clone(&sem);
        let handle = std::thread::spawn(move || sem2.permit().1);
        assert_eq!(handle.join().unwrap(), Duration::ZERO);
    }
}
