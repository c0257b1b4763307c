//! # Semaphore
//! A counter of permits behind a mutex plus a condvar to sleep on while the counter is empty.
//!
//! It's the same shape as the `Mutex<VecDeque> + Condvar` channel: the mutex protects the state,
//! the condvar only spares us from spinning. The count is touched under the mutex only.
//!
//! - `acquire` ("P") waits in a loop while there're no permits, then takes one
//! - `release` ("V") puts a permit back and wakes a single waiter, as only one permit appeared
//! - `try_acquire` never sleeps, it just tells the caller there's nothing to take
//!
//! There's no FIFO among waiters. Whoever gets the mutex first after a wake-up takes the permit.

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, SyncError};

pub struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Negative initial count is the only way to fail
    pub fn new(initial: i64) -> Result<Self> {
        let count = usize::try_from(initial).map_err(|_| SyncError::InvalidArgument)?;
        Ok(Self {
            count: Mutex::new(count),
            available: Condvar::new(),
        })
    }

    pub fn acquire(&self) {
        let mut count = self.count.lock();
        // a loop, not a single wait: spurious wake-ups and other waiters may beat us to the permit
        while *count == 0 {
            self.available.wait(&mut count);
        }
        *count -= 1;
    }

    pub fn release(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.available.notify_one();
    }

    /// The guard is dropped on both branches, so the internal mutex is never left locked
    pub fn try_acquire(&self) -> Result<()> {
        let mut count = self.count.lock();
        if *count == 0 {
            return Err(SyncError::WouldBlock);
        }
        *count -= 1;
        Ok(())
    }

    /// Number of permits at the moment of the call, may be stale right away
    pub fn permits(&self) -> usize {
        *self.count.lock()
    }

    /// Owning the semaphore means nobody can be sleeping in [Semaphore::acquire],
    /// so there's nothing to refuse here. The mutex and the condvar go away with `self`.
    pub fn destroy(self) -> Result<()> {
        drop(self);
        Ok(())
    }

    /// Acquire a permit that goes back on drop
    pub fn permit(&self) -> SemaphorePermit<'_> {
        self.acquire();
        SemaphorePermit { semaphore: self }
    }

    pub fn try_permit(&self) -> Result<SemaphorePermit<'_>> {
        self.try_acquire()?;
        Ok(SemaphorePermit { semaphore: self })
    }
}

/// A taken permit, it's released by drop
pub struct SemaphorePermit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for SemaphorePermit<'_> {
    fn drop(&mut self) {
        self.semaphore.release();
    }
}

#[cfg(test)]
mod test {
    use std::{
        cell::UnsafeCell,
        sync::atomic::{AtomicBool, Ordering::SeqCst},
        thread::{scope, sleep},
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_negative_initial_count() {
        assert_eq!(Some(SyncError::InvalidArgument), Semaphore::new(-1).err());
        assert_eq!(0, Semaphore::new(0).unwrap().permits());
    }

    #[test]
    fn test_acquire_all_then_release_all() {
        let s = Semaphore::new(3).unwrap();
        for _ in 0..3 {
            s.acquire();
        }
        assert_eq!(0, s.permits());
        // one more acquire would block
        assert_eq!(Err(SyncError::WouldBlock), s.try_acquire());
        assert_eq!(0, s.permits());

        for _ in 0..3 {
            s.release();
        }
        assert_eq!(3, s.permits());
        s.destroy().unwrap();
    }

    #[test]
    fn test_try_acquire_doesnt_keep_the_lock() {
        let s = Semaphore::new(0).unwrap();
        assert_eq!(Err(SyncError::WouldBlock), s.try_acquire());
        // this would hang forever if the failed try_acquire didn't unlock the mutex
        s.release();
        assert_eq!(Ok(()), s.try_acquire());
        assert_eq!(0, s.permits());
    }

    #[test]
    fn test_acquire_waits_for_release() {
        let s = Semaphore::new(0).unwrap();
        let released = AtomicBool::new(false);
        scope(|sc| {
            sc.spawn(|| {
                s.acquire();
                // it can't proceed until the main thread releases
                assert!(released.load(SeqCst));
            });
            sleep(Duration::from_millis(100));
            released.store(true, SeqCst);
            s.release();
        });
        assert_eq!(0, s.permits());
    }

    #[test]
    fn test_release_beyond_initial() {
        let s = Semaphore::new(1).unwrap();
        s.release();
        s.release();
        assert_eq!(3, s.permits());
    }

    #[test]
    fn test_permit_guard() {
        let s = Semaphore::new(1).unwrap();
        {
            let _p = s.permit();
            assert_eq!(0, s.permits());
            assert!(s.try_permit().is_err());
        }
        assert_eq!(1, s.permits());
    }

    // the semaphore only orders the accesses, the data is ours to share
    struct Shared(UnsafeCell<u32>);
    unsafe impl Sync for Shared {}

    #[test]
    fn test_binary_semaphore_as_mutex() {
        let s = Semaphore::new(1).unwrap();
        let shared = Shared(UnsafeCell::new(0));
        scope(|sc| {
            for _ in 0..2 {
                sc.spawn(|| {
                    // capture the whole Sync wrapper, not just the field
                    let shared = &shared;
                    for _ in 0..1000 {
                        s.acquire();
                        // SAFETY: the single permit is held
                        unsafe { *shared.0.get() += 1 };
                        s.release();
                    }
                });
            }
        });
        assert_eq!(2000, shared.0.into_inner());
    }

    #[test]
    fn test_many_waiters_each_get_one_permit() {
        let s = Semaphore::new(0).unwrap();
        scope(|sc| {
            for _ in 0..4 {
                sc.spawn(|| s.acquire());
            }
            sleep(Duration::from_millis(50));
            for _ in 0..4 {
                s.release();
            }
        });
        assert_eq!(0, s.permits());
    }
}
