//! # Read-write lock
//! 2 types of locking on top of the mutex + condvar pair:
//! - exclusive / write - a single writer, no readers around
//! - shared / read - any number of readers, but no writer
//!
//! There could be only 1 type of lock at a given moment of time => `writing && active_readers > 0` is never observable.
//!
//! Each side sleeps on its own condvar:
//! - the last reader out wakes 1 writer (readers don't wait on readers)
//! - a writer out wakes 1 writer first, then all the readers
//!
//! The order gives writers the first go, but it's a hint and not a priority queue.
//! Writers are favored but not guaranteed priority: a steady stream of readers can starve them forever.
//!
//! Readers aren't tracked per thread. Unlocking a read lock taken by someone else can't be caught,
//! only unlocking when nobody holds the lock in that mode is refused.

use std::{
    cell::UnsafeCell,
    ops::{Deref, DerefMut},
};

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, SyncError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RwState {
    pub active_readers: usize,
    pub writing: bool,
}

impl RwState {
    fn at_rest(&self) -> bool {
        self.active_readers == 0 && !self.writing
    }
}

#[derive(Default)]
pub struct RawRwLock {
    state: Mutex<RwState>,
    readers: Condvar,
    writers: Condvar,
}

impl RawRwLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_lock(&self) {
        let mut state = self.state.lock();
        while state.writing {
            self.readers.wait(&mut state);
        }
        state.active_readers += 1;
    }

    pub fn try_read_lock(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.writing {
            return Err(SyncError::WouldBlock);
        }
        state.active_readers += 1;
        Ok(())
    }

    pub fn read_unlock(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.active_readers == 0 {
            return Err(SyncError::NotOwner);
        }
        state.active_readers -= 1;
        if state.active_readers == 0 {
            self.writers.notify_one();
        }
        Ok(())
    }

    pub fn write_lock(&self) {
        let mut state = self.state.lock();
        while state.writing || state.active_readers > 0 {
            self.writers.wait(&mut state);
        }
        state.writing = true;
    }

    pub fn try_write_lock(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.writing || state.active_readers > 0 {
            return Err(SyncError::WouldBlock);
        }
        state.writing = true;
        Ok(())
    }

    pub fn write_unlock(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.writing {
            return Err(SyncError::NotOwner);
        }
        state.writing = false;
        // writers first, but if there're none the readers still get going
        self.writers.notify_one();
        self.readers.notify_all();
        Ok(())
    }

    /// A snapshot of the bookkeeping
    pub fn state(&self) -> RwState {
        *self.state.lock()
    }

    pub fn destroy(self) -> Result<()> {
        if !self.state.lock().at_rest() {
            return Err(SyncError::ResourceBusy);
        }
        Ok(())
    }
}

pub struct RwLock<Y> {
    raw: RawRwLock,
    value: UnsafeCell<Y>,
}

/// as the RwLock may have multiple references to Y accessed from different threads,
/// Y has to be not only Send, but also Sync
unsafe impl<Y> Sync for RwLock<Y> where Y: Send + Sync {}

/// Note the 2 separated methods and structs for different kinds of locks
impl<Y> RwLock<Y> {
    pub fn new(value: Y) -> Self {
        Self {
            raw: RawRwLock::new(),
            value: UnsafeCell::new(value),
        }
    }

    pub fn read(&self) -> ReadGuard<'_, Y> {
        self.raw.read_lock();
        ReadGuard { lock: self }
    }

    pub fn try_read(&self) -> Result<ReadGuard<'_, Y>> {
        self.raw.try_read_lock()?;
        Ok(ReadGuard { lock: self })
    }

    pub fn write(&self) -> WriteGuard<'_, Y> {
        self.raw.write_lock();
        WriteGuard { lock: self }
    }

    pub fn try_write(&self) -> Result<WriteGuard<'_, Y>> {
        self.raw.try_write_lock()?;
        Ok(WriteGuard { lock: self })
    }

    pub fn state(&self) -> RwState {
        self.raw.state()
    }

    pub fn get_mut(&mut self) -> &mut Y {
        self.value.get_mut()
    }

    pub fn into_inner(self) -> Y {
        self.value.into_inner()
    }
}

pub struct ReadGuard<'a, Y> {
    lock: &'a RwLock<Y>,
}

/// Read guard's main purpose - provide &Y
impl<Y> Deref for ReadGuard<'_, Y> {
    type Target = Y;
    fn deref(&self) -> &Self::Target {
        // SAFETY: no writer while a read lock is held
        unsafe { &*self.lock.value.get() }
    }
}

impl<Y> Drop for ReadGuard<'_, Y> {
    fn drop(&mut self) {
        // the guard itself is the proof of 1 active reader
        let unlocked = self.lock.raw.read_unlock();
        debug_assert!(unlocked.is_ok());
    }
}

pub struct WriteGuard<'a, Y> {
    lock: &'a RwLock<Y>,
}

/// Write guard also allows to just read the data
impl<Y> Deref for WriteGuard<'_, Y> {
    type Target = Y;
    fn deref(&self) -> &Self::Target {
        // SAFETY: the write lock is exclusive
        unsafe { &*self.lock.value.get() }
    }
}

/// write guard's main purpose - get &mut Y
impl<Y> DerefMut for WriteGuard<'_, Y> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: the write lock is exclusive
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<Y> Drop for WriteGuard<'_, Y> {
    fn drop(&mut self) {
        let unlocked = self.lock.raw.write_unlock();
        debug_assert!(unlocked.is_ok());
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering::SeqCst},
            Barrier,
        },
        thread::{scope, sleep},
        time::Duration,
    };

    use super::*;

    #[test]
    fn test_many_readers_at_once() {
        let l = RawRwLock::new();
        let barrier = Barrier::new(4);
        scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    l.read_lock();
                    // every reader gets here before anybody unlocks
                    barrier.wait();
                    l.read_unlock().unwrap();
                });
            }
        });
        assert_eq!(RwState::default(), l.state());
    }

    #[test]
    fn test_writer_excludes_everyone() {
        let l = RawRwLock::new();
        l.write_lock();
        assert_eq!(Err(SyncError::WouldBlock), l.try_read_lock());
        assert_eq!(Err(SyncError::WouldBlock), l.try_write_lock());
        assert_eq!(
            RwState {
                active_readers: 0,
                writing: true
            },
            l.state()
        );
        l.write_unlock().unwrap();

        l.read_lock();
        assert_eq!(Err(SyncError::WouldBlock), l.try_write_lock());
        assert_eq!(Ok(()), l.try_read_lock());
        assert_eq!(2, l.state().active_readers);
        l.read_unlock().unwrap();
        l.read_unlock().unwrap();
        l.destroy().unwrap();
    }

    #[test]
    fn test_unlock_without_lock() {
        let l = RawRwLock::new();
        assert_eq!(Err(SyncError::NotOwner), l.read_unlock());
        assert_eq!(Err(SyncError::NotOwner), l.write_unlock());
        assert_eq!(RwState::default(), l.state());
    }

    #[test]
    fn test_destroy_while_held() {
        let l = RawRwLock::new();
        l.read_lock();
        assert_eq!(Err(SyncError::ResourceBusy), l.destroy());
    }

    #[test]
    fn test_write_waits_for_last_reader() {
        let l = RawRwLock::new();
        let readers_done = AtomicBool::new(false);
        l.read_lock();
        l.read_lock();
        scope(|s| {
            s.spawn(|| {
                l.write_lock();
                assert!(readers_done.load(SeqCst));
                assert_eq!(0, l.state().active_readers);
                l.write_unlock().unwrap();
            });
            sleep(Duration::from_millis(50));
            l.read_unlock().unwrap();
            sleep(Duration::from_millis(50));
            readers_done.store(true, SeqCst);
            l.read_unlock().unwrap();
        });
    }

    #[test]
    fn test_write_unlock_wakes_all_readers() {
        let l = RawRwLock::new();
        let woken = AtomicUsize::new(0);
        l.write_lock();
        scope(|s| {
            for _ in 0..3 {
                s.spawn(|| {
                    l.read_lock();
                    woken.fetch_add(1, SeqCst);
                    l.read_unlock().unwrap();
                });
            }
            sleep(Duration::from_millis(50));
            assert_eq!(0, woken.load(SeqCst));
            l.write_unlock().unwrap();
        });
        assert_eq!(3, woken.load(SeqCst));
    }

    #[test]
    fn test_counter_readers_and_writers() {
        let counter = RwLock::new(0u64);
        let reads = AtomicUsize::new(0);
        scope(|s| {
            for _ in 0..5 {
                s.spawn(|| {
                    for _ in 0..100 {
                        let c = counter.read();
                        // no writer may be around while we look
                        let state = counter.state();
                        assert!(!state.writing && state.active_readers > 0);
                        assert!(*c <= 200);
                        reads.fetch_add(1, SeqCst);
                    }
                });
            }
            for _ in 0..2 {
                s.spawn(|| {
                    for _ in 0..100 {
                        let mut c = counter.write();
                        let before = *c;
                        *c += 1;
                        assert_eq!(before + 1, *c);
                        let state = counter.state();
                        assert!(state.writing && state.active_readers == 0);
                    }
                });
            }
        });
        assert_eq!(500, reads.load(SeqCst));
        assert_eq!(200, counter.into_inner());
    }

    #[test]
    fn test_readers_never_see_half_a_write() {
        let pair = RwLock::new((0u64, 0u64));
        let torn = AtomicBool::new(false);
        scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        let p = pair.read();
                        if p.0 != p.1 {
                            torn.store(true, SeqCst);
                        }
                    }
                });
            }
            for _ in 0..2 {
                s.spawn(|| {
                    for _ in 0..50 {
                        let mut p = pair.write();
                        p.0 += 1;
                        // a reader getting in here would see .0 ahead of .1
                        sleep(Duration::from_micros(20));
                        p.1 += 1;
                    }
                });
            }
        });
        assert!(!torn.load(SeqCst));
        assert_eq!((100, 100), pair.into_inner());
    }

    #[test]
    fn test_guards() {
        let l = RwLock::new(vec![1]);
        {
            let r1 = l.read();
            let r2 = l.try_read().unwrap();
            assert_eq!(r1.len(), r2.len());
            assert!(l.try_write().is_err());
        }
        l.write().push(2);
        assert_eq!(vec![1, 2], *l.read());
    }
}
