//! # Building locks on a mutex and a condvar
//!
//! The target: a semaphore, a recursive mutex, a read-write lock. The only tools are a plain mutex
//! and condition variables, the [parking_lot](https://crates.io/crates/parking_lot) ones:
//! - `Mutex::lock` - protects the bookkeeping of each primitive, nothing else ever touches it
//! - `Condvar::wait(&mut guard)` - unlocks, sleeps, locks again before returning, may wake up spuriously
//! - `Condvar::notify_one` / `notify_all` - signal / broadcast
//!
//! Every wait sits in a `while` re-checking its predicate, a single wait-then-go loses to spurious wake-ups.
//! None of them support timeouts or cancellation, so a blocked thread stays blocked until the predicate flips.
//! No fairness either: wake-up order is whatever the condvar does.
//!
//! Locking 2 slots of a lock array at once goes through [ordered]. Skipping it is a deadlock, not an error.

pub mod ordered;
pub mod read_write_lock;
pub mod recursive_mutex;
pub mod semaphore;

pub use ordered::{lock_all, lock_pair, pair_order, AllGuard, OrderedLock, PairGuard};
pub use read_write_lock::{RawRwLock, ReadGuard, RwLock, RwState, WriteGuard};
pub use recursive_mutex::{RawRecursiveLock, RecursiveGuard, RecursiveLock};
pub use semaphore::{Semaphore, SemaphorePermit};
