//! # Semaphore of 1 as a mutex
//! Every thread does `acquire; shared += 1; release` over and over.
//!
//! The increment is a separate load and store on purpose: without the permit two threads could load
//! the same value and one update would get lost. With it, the total is exact.

use std::{
    sync::atomic::{AtomicUsize, Ordering::Relaxed},
    thread,
};

use log::{debug, info};

use crate::{
    config::WorkloadOptions,
    locks::Semaphore,
    workloads::{join_all, Result},
};

fn increment(thread_num: usize, mutex: &Semaphore, shared: &AtomicUsize, iterations: usize) {
    for _ in 0..iterations {
        mutex.acquire();
        let value = shared.load(Relaxed);
        shared.store(value + 1, Relaxed);
        mutex.release();
    }
    debug!("thread {thread_num} done");
}

/// Returns the final value of the shared counter
pub fn run(options: &WorkloadOptions) -> Result<usize> {
    let mutex = Semaphore::new(1)?;
    let shared = AtomicUsize::new(0);
    let iterations = options.iterations;

    thread::scope(|s| {
        let (mutex, shared) = (&mutex, &shared);
        let workers: Vec<_> = (0..options.threads)
            .map(|n| s.spawn(move || increment(n, mutex, shared, iterations)))
            .collect();
        join_all("increment", workers)
    })?;

    let total = shared.into_inner();
    info!(
        "{} threads x {} increments = {total}",
        options.threads, iterations
    );
    mutex.destroy()?;
    Ok(total)
}
