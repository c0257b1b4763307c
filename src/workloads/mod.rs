//! # Workloads
//! The client side of the locks: worker threads poking at shared state the way the exercises do.
//!
//! - [swap] - random swaps in a buffer with a recursive lock per slot, 2 slots at a time in index order
//! - [readers_writers] - a counter behind the read-write lock
//! - [barber] - the sleeping barber on 3 semaphores
//! - [binary_semaphore] - a semaphore of 1 used as a plain mutex
//!
//! Logging lives here, never in the primitives.

use std::thread::ScopedJoinHandle;

use thiserror::Error;

use crate::error::SyncError;

pub mod barber;
pub mod binary_semaphore;
pub mod op_count;
pub mod readers_writers;
pub mod swap;

pub use op_count::{IterationBudget, OpCounter};

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("{role} thread #{thread_num} panicked")]
    WorkerPanicked { role: &'static str, thread_num: usize },
}

pub type Result<T> = std::result::Result<T, WorkloadError>;

/// Join every handle, even after a panic, and report the first panicked one
pub(crate) fn join_all<Y>(
    role: &'static str,
    handles: Vec<ScopedJoinHandle<'_, Y>>,
) -> Result<Vec<Y>> {
    let mut results = Vec::with_capacity(handles.len());
    let mut panicked = None;
    for (thread_num, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(result) => results.push(result),
            Err(_) => {
                panicked.get_or_insert(WorkloadError::WorkerPanicked { role, thread_num });
            }
        }
    }
    match panicked {
        Some(e) => Err(e),
        None => Ok(results),
    }
}
