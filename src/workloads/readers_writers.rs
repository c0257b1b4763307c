//! # Readers and writers
//! A single counter behind the [RwLock]: readers look at it, writers bump it by 1.
//!
//! Reads and writes exclude each other, so every read sees a fully committed value.
//! Every thread sleeps for `delay` after releasing its lock, that's where the others get their turn.

use std::{thread, time::Duration};

use log::info;

use crate::{
    config::WorkloadOptions,
    locks::RwLock,
    workloads::{join_all, Result},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadersWritersReport {
    pub counter: u64,
    pub reads: usize,
    /// the most readers seen holding the lock together
    pub max_concurrent_readers: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct ReaderTally {
    reads: usize,
    max_readers: usize,
}

fn reader(
    thread_num: usize,
    counter: &RwLock<u64>,
    iterations: usize,
    delay: Duration,
) -> ReaderTally {
    let mut tally = ReaderTally::default();
    for _ in 0..iterations {
        {
            let value = counter.read();
            tally.max_readers = tally.max_readers.max(counter.state().active_readers);
            tally.reads += 1;
            info!("reader {thread_num}: counter = {}", *value);
        }
        thread::sleep(delay);
    }
    tally
}

fn writer(thread_num: usize, counter: &RwLock<u64>, iterations: usize, delay: Duration) {
    for _ in 0..iterations {
        {
            let mut value = counter.write();
            *value += 1;
            info!("writer {thread_num}: incremented counter to {}", *value);
        }
        thread::sleep(delay);
    }
}

pub fn run(options: &WorkloadOptions) -> Result<ReadersWritersReport> {
    let counter = RwLock::new(0u64);
    let (iterations, delay) = (options.iterations, options.delay);

    info!(
        "creating {} readers and {} writers",
        options.readers, options.writers
    );

    let tallies = thread::scope(|s| -> Result<Vec<ReaderTally>> {
        let counter = &counter;
        let readers: Vec<_> = (0..options.readers)
            .map(|n| s.spawn(move || reader(n, counter, iterations, delay)))
            .collect();
        let writers: Vec<_> = (0..options.writers)
            .map(|n| s.spawn(move || writer(n, counter, iterations, delay)))
            .collect();

        let seen = join_all("reader", readers);
        join_all("writer", writers)?;
        seen
    })?;

    let counter = counter.into_inner();
    info!("final counter: {counter}");

    Ok(ReadersWritersReport {
        counter,
        reads: tallies.iter().map(|t| t.reads).sum(),
        max_concurrent_readers: tallies.iter().map(|t| t.max_readers).max().unwrap_or(0),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_five_readers_two_writers() {
        let options = WorkloadOptions {
            readers: 5,
            writers: 2,
            iterations: 100,
            delay: Duration::from_micros(10),
            ..Default::default()
        };
        let report = run(&options).unwrap();
        assert_eq!(200, report.counter);
        assert_eq!(500, report.reads);
        assert!(report.max_concurrent_readers >= 1);
        assert!(report.max_concurrent_readers <= 5);
    }
}
