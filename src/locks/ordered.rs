//! # Ordered acquisition
//! Taking 2 locks of a lock array in whatever order the caller came up with is a recipe for a deadlock:
//! thread 1 holds 3 and waits for 7, thread 2 holds 7 and waits for 3 => circular wait forever.
//!
//! The cure is a total order over the locks. Here it's the slot index:
//! - `i == j` - lock once, unlock once
//! - `i < j` - lock i, then j; unlock j, then i
//! - `i > j` - lock j, then i; unlock i, then j
//!
//! It only works if EVERY place that takes 2 slots goes through it. Nothing detects a violation at runtime,
//! it just hangs.
//!
//! The same rule extends to taking all the locks at once, see [lock_all].

use crate::{
    error::{Result, SyncError},
    locks::{
        read_write_lock::{RwLock, WriteGuard},
        recursive_mutex::{RecursiveGuard, RecursiveLock},
        semaphore::{Semaphore, SemaphorePermit},
    },
};

/// Anything exclusive that hands out a guard and unlocks on its drop
pub trait OrderedLock {
    type Guard<'a>
    where
        Self: 'a;

    fn acquire(&self) -> Self::Guard<'_>;
}

impl OrderedLock for Semaphore {
    type Guard<'a> = SemaphorePermit<'a>;

    fn acquire(&self) -> SemaphorePermit<'_> {
        self.permit()
    }
}

impl<Y> OrderedLock for RecursiveLock<Y> {
    type Guard<'a>
        = RecursiveGuard<'a, Y>
    where
        Self: 'a;

    fn acquire(&self) -> RecursiveGuard<'_, Y> {
        self.lock()
    }
}

/// The write side, as 2-slot operations are about changing both
impl<Y> OrderedLock for RwLock<Y> {
    type Guard<'a>
        = WriteGuard<'a, Y>
    where
        Self: 'a;

    fn acquire(&self) -> WriteGuard<'_, Y> {
        self.write()
    }
}

/// The order itself: (first to lock, second to lock if it's a different slot)
pub fn pair_order(i: usize, j: usize) -> (usize, Option<usize>) {
    match i.cmp(&j) {
        std::cmp::Ordering::Equal => (i, None),
        std::cmp::Ordering::Less => (i, Some(j)),
        std::cmp::Ordering::Greater => (j, Some(i)),
    }
}

/// Both slots of a pair. Dropping it unlocks the higher slot first.
pub struct PairGuard<'a, L: OrderedLock + 'a> {
    high: Option<L::Guard<'a>>,
    low: L::Guard<'a>,
    // the caller asked for the higher index first
    first_is_high: bool,
}

impl<'a, L: OrderedLock + 'a> PairGuard<'a, L> {
    /// Guard of the 1st index the caller passed
    pub fn first(&self) -> &L::Guard<'a> {
        match (&self.high, self.first_is_high) {
            (Some(high), true) => high,
            _ => &self.low,
        }
    }

    /// Guard of the 2nd index the caller passed, the same one as [PairGuard::first] when the indices match
    pub fn second(&self) -> &L::Guard<'a> {
        match (&self.high, self.first_is_high) {
            (Some(high), false) => high,
            _ => &self.low,
        }
    }

    pub fn first_mut(&mut self) -> &mut L::Guard<'a> {
        match (&mut self.high, self.first_is_high) {
            (Some(high), true) => high,
            _ => &mut self.low,
        }
    }

    pub fn second_mut(&mut self) -> &mut L::Guard<'a> {
        match (&mut self.high, self.first_is_high) {
            (Some(high), false) => high,
            _ => &mut self.low,
        }
    }

    pub fn is_single(&self) -> bool {
        self.high.is_none()
    }
}

impl<'a, L: OrderedLock + 'a> Drop for PairGuard<'a, L> {
    fn drop(&mut self) {
        // reverse order: high goes now, low goes with the rest of the fields
        drop(self.high.take());
    }
}

/// Lock slots `i` and `j` of the array in index order
pub fn lock_pair<L: OrderedLock>(locks: &[L], i: usize, j: usize) -> Result<PairGuard<'_, L>> {
    if i >= locks.len() || j >= locks.len() {
        return Err(SyncError::InvalidArgument);
    }
    let (low, high) = pair_order(i, j);
    let low_guard = locks[low].acquire();
    let high_guard = high.map(|h| locks[h].acquire());
    Ok(PairGuard {
        high: high_guard,
        low: low_guard,
        first_is_high: i > j,
    })
}

/// Every slot of the array, in ascending order
pub struct AllGuard<'a, L: OrderedLock + 'a> {
    guards: Vec<L::Guard<'a>>,
}

impl<'a, L: OrderedLock + 'a> AllGuard<'a, L> {
    pub fn get(&self, index: usize) -> Option<&L::Guard<'a>> {
        self.guards.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &L::Guard<'a>> {
        self.guards.iter()
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl<'a, L: OrderedLock + 'a> Drop for AllGuard<'a, L> {
    fn drop(&mut self) {
        // descending, the mirror of how they were taken
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}

pub fn lock_all<L: OrderedLock>(locks: &[L]) -> AllGuard<'_, L> {
    AllGuard {
        guards: locks.iter().map(|l| l.acquire()).collect(),
    }
}
