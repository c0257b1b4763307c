//! # Swapping positions in a shared buffer
//!
//! Every slot of the buffer has its own recursive lock, the "lock array". A swap needs 2 slots,
//! so it takes them with [lock_pair] - lower index first - and that's all that keeps the workers out of a deadlock.
//!
//! A swap is split into steps with pauses in between to provoke context switches in the middle of it.
//! Without the locks, values would get duplicated or lost. With them, the buffer stays a permutation of `0..size`.
//!
//! The optional printer thread takes the whole array with [lock_all], so its snapshot is consistent too.
//!
//! Workers either run `iterations` swaps each, or all draw from one [IterationBudget] of
//! `shared_iterations`. With a budget the printer stops as soon as the last swap is handed out.

use std::{
    cell::Cell,
    sync::atomic::{AtomicBool, Ordering},
    thread::{self, sleep},
    time::Duration,
};

use log::info;
use rand::Rng;

use crate::{
    config::WorkloadOptions,
    error::SyncError,
    locks::{lock_all, lock_pair, RecursiveLock},
    workloads::{join_all, IterationBudget, OpCounter, Result},
};

pub struct SwapBuffer {
    slots: Vec<RecursiveLock<Cell<i32>>>,
}

impl SwapBuffer {
    /// Buffer of `0, 1, ..., size - 1`
    pub fn new(size: usize) -> std::result::Result<Self, SyncError> {
        if size == 0 || size > i32::MAX as usize {
            return Err(SyncError::InvalidArgument);
        }
        Ok(Self {
            slots: (0..size as i32)
                .map(|v| RecursiveLock::new(Cell::new(v)))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Swap slots `i` and `j`, pausing for `delay` after every step.
    /// Returns the values seen before the swap.
    pub fn swap(
        &self,
        i: usize,
        j: usize,
        delay: Duration,
    ) -> std::result::Result<(i32, i32), SyncError> {
        let pair = lock_pair(&self.slots, i, j)?;
        let (a, b) = (pair.first(), pair.second());
        let before = (a.get(), b.get());

        let tmp = a.get();
        pause(delay);
        a.set(b.get());
        pause(delay);
        b.set(tmp);
        pause(delay);

        Ok(before)
    }

    /// All the values at one moment of time
    pub fn snapshot(&self) -> Vec<i32> {
        lock_all(&self.slots).iter().map(|slot| slot.get()).collect()
    }

    pub fn into_values(self) -> Vec<i32> {
        self.slots
            .into_iter()
            .map(|slot| slot.into_inner().get())
            .collect()
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        sleep(delay);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapReport {
    /// the buffer after the run, sorted
    pub sorted: Vec<i32>,
    pub operations: usize,
    pub snapshots: usize,
}

fn worker(
    thread_num: usize,
    buffer: &SwapBuffer,
    counter: &OpCounter,
    budget: Option<&IterationBudget>,
    options: &WorkloadOptions,
) -> std::result::Result<(), SyncError> {
    let mut rng = rand::thread_rng();
    let mut done = 0;
    loop {
        let more = match budget {
            Some(budget) => budget.try_take(),
            None => done < options.iterations,
        };
        if !more {
            return Ok(());
        }
        let i = rng.gen_range(0..buffer.len());
        let j = rng.gen_range(0..buffer.len());
        let (a, b) = buffer.swap(i, j, options.delay)?;
        info!("thread {thread_num} swapping positions {i} (== {a}) and {j} (== {b})");
        counter.inc();
        done += 1;
    }
}

fn printer(
    buffer: &SwapBuffer,
    running: &AtomicBool,
    budget: Option<&IterationBudget>,
    period: Duration,
) -> usize {
    let mut snapshots = 0;
    loop {
        sleep(period);
        let exhausted = budget.is_some_and(IterationBudget::is_exhausted);
        if exhausted || !running.load(Ordering::Acquire) {
            return snapshots;
        }
        let values = buffer.snapshot();
        info!("buffer: {values:?}");
        snapshots += 1;
    }
}

pub fn run(options: &WorkloadOptions) -> Result<SwapReport> {
    let buffer = SwapBuffer::new(options.buffer_size)?;
    let counter = OpCounter::new();
    let running = AtomicBool::new(true);
    let budget = options.shared_iterations.map(IterationBudget::new);

    info!("creating {} threads", options.threads);
    info!("buffer before: {:?}", buffer.snapshot());

    let snapshots = thread::scope(|s| -> Result<usize> {
        let (buffer, counter, running) = (&buffer, &counter, &running);
        let budget = budget.as_ref();

        let snapshotter = options
            .print_period
            .map(|period| s.spawn(move || printer(buffer, running, budget, period)));

        let workers: Vec<_> = (0..options.threads)
            .map(|n| s.spawn(move || worker(n, buffer, counter, budget, options)))
            .collect();

        // the printer has to be stopped even if some worker failed
        let joined = join_all("swap", workers);
        running.store(false, Ordering::Release);

        let snapshots: usize = match snapshotter {
            Some(handle) => join_all("printer", vec![handle])?.iter().sum(),
            None => 0,
        };
        for result in joined? {
            result?;
        }
        Ok(snapshots)
    })?;

    let operations = counter.get();
    let mut sorted = buffer.into_values();
    sorted.sort_unstable();
    info!("buffer after: {sorted:?}");
    info!("iterations: {operations}");

    Ok(SwapReport {
        sorted,
        operations,
        snapshots,
    })
}
