//! Counting permit pool bounding concurrent ordinary work.
//!
//! The permit pool is the sole synchronization point enforcing the
//! background-execution concurrency bound. Release happens in [`Permit`]'s
//! `Drop`, so a permit is returned exactly once whether the work completes,
//! errors, or panics.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

pub struct PermitPool {
    capacity: usize,
    available: Mutex<usize>,
    released: Condvar,
}

impl PermitPool {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            available: Mutex::new(capacity),
            released: Condvar::new(),
        })
    }

    /// Acquire one permit, blocking until one is available.
    pub fn acquire(self: &Arc<Self>) -> Permit {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
        Permit {
            pool: Arc::clone(self),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        *self.available.lock()
    }

    /// Permits currently held by executing or pending work.
    pub fn outstanding(&self) -> usize {
        self.capacity - *self.available.lock()
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        debug_assert!(*available <= self.capacity);
        self.released.notify_one();
    }
}

/// A held permit. Dropping it returns the permit to the pool.
pub struct Permit {
    pool: Arc<PermitPool>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.pool.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn acquire_and_drop_round_trip() {
        let pool = PermitPool::new(2);
        assert_eq!(pool.available(), 2);
        let first = pool.acquire();
        let second = pool.acquire();
        assert_eq!(pool.outstanding(), 2);
        drop(first);
        assert_eq!(pool.outstanding(), 1);
        drop(second);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn acquire_blocks_until_release() {
        let pool = PermitPool::new(1);
        let held = pool.acquire();

        let pool_clone = Arc::clone(&pool);
        let waiter = thread::spawn(move || {
            let _permit = pool_clone.acquire();
        });

        // The waiter cannot finish while the permit is held.
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        drop(held);
        waiter.join().expect("waiter thread panicked");
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn permit_released_even_when_holder_panics() {
        let pool = PermitPool::new(1);
        let pool_clone = Arc::clone(&pool);
        let result = thread::spawn(move || {
            let _permit = pool_clone.acquire();
            panic!("task failed");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(pool.available(), 1);
    }
}
