//! # Recursive mutex
//! A mutex the owning thread can lock again without deadlocking itself.
//!
//! The state is a pair of the owner's [ThreadId] and the nesting depth, both behind a plain mutex:
//! - depth == 0 <=> there's no owner
//! - only the owner changes depth
//!
//! Locking by the owner is the fast path - just one more level. Anyone else sleeps on the condvar
//! until depth drops to 0. The last unlock wakes exactly 1 waiter, since only 1 can take it anyway.
//!
//! [RawRecursiveLock] is the procedural version with lock / unlock / try_lock calls.
//! [RecursiveLock] wraps a value and hands out guards, like the `Mutex<Y>` with its `MutexGuard`.

use std::{
    marker::PhantomData,
    ops::Deref,
    thread::{self, ThreadId},
};

use parking_lot::{Condvar, Mutex};

use crate::error::{Result, SyncError};

struct Ownership {
    owner: Option<ThreadId>,
    depth: usize,
}

pub struct RawRecursiveLock {
    state: Mutex<Ownership>,
    released: Condvar,
}

impl Default for RawRecursiveLock {
    fn default() -> Self {
        Self::new()
    }
}

impl RawRecursiveLock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Ownership {
                owner: None,
                depth: 0,
            }),
            released: Condvar::new(),
        }
    }

    pub fn lock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.owner == Some(me) {
            state.depth += 1;
            return;
        }
        while state.depth > 0 {
            self.released.wait(&mut state);
        }
        state.owner = Some(me);
        state.depth = 1;
    }

    /// Fails with [SyncError::NotOwner] for any thread but the owner, leaving the state as is
    pub fn unlock(&self) -> Result<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        if state.owner != Some(me) {
            return Err(SyncError::NotOwner);
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            self.released.notify_one();
        }
        Ok(())
    }

    pub fn try_lock(&self) -> Result<()> {
        let me = thread::current().id();
        let mut state = self.state.lock();

        match state.owner {
            Some(owner) if owner == me => state.depth += 1,
            Some(_) => return Err(SyncError::WouldBlock),
            None => {
                state.owner = Some(me);
                state.depth = 1;
            }
        }
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().depth > 0
    }

    pub fn is_owned_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }

    /// Nesting depth of the current owner, 0 when unlocked
    pub fn depth(&self) -> usize {
        self.state.lock().depth
    }

    /// Refuses with [SyncError::ResourceBusy] if some thread locked and never unlocked
    pub fn destroy(self) -> Result<()> {
        if self.state.lock().depth > 0 {
            return Err(SyncError::ResourceBusy);
        }
        Ok(())
    }
}

/// Only &Y goes out, as the owner may have several guards alive at once.
/// Use Cell / RefCell inside to mutate.
pub struct RecursiveLock<Y> {
    raw: RawRecursiveLock,
    value: Y,
}

/// The value is reachable by the owning thread only, so sharing the lock needs Y: Send, not Sync.
/// Same deal as with the regular mutex.
unsafe impl<Y> Sync for RecursiveLock<Y> where Y: Send {}

impl<Y> RecursiveLock<Y> {
    pub fn new(value: Y) -> Self {
        Self {
            raw: RawRecursiveLock::new(),
            value,
        }
    }

    pub fn lock(&self) -> RecursiveGuard<'_, Y> {
        self.raw.lock();
        RecursiveGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    pub fn try_lock(&self) -> Result<RecursiveGuard<'_, Y>> {
        self.raw.try_lock()?;
        Ok(RecursiveGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    /// &mut self proves there're no guards around
    pub fn get_mut(&mut self) -> &mut Y {
        &mut self.value
    }

    pub fn into_inner(self) -> Y {
        self.value
    }
}

/// The guard must be dropped by the thread that took it => neither Send nor Sync
pub struct RecursiveGuard<'a, Y> {
    lock: &'a RecursiveLock<Y>,
    _not_send: PhantomData<*const ()>,
}

impl<Y> Deref for RecursiveGuard<'_, Y> {
    type Target = Y;
    fn deref(&self) -> &Self::Target {
        &self.lock.value
    }
}

impl<Y> Drop for RecursiveGuard<'_, Y> {
    fn drop(&mut self) {
        // the guard never leaves its thread, so that's the owner unlocking
        let unlocked = self.lock.raw.unlock();
        debug_assert!(unlocked.is_ok());
    }
}
