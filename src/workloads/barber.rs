//! # Sleeping barber
//! A shop of barbers, customers and a waiting room with a few seats, all on [Semaphore]s:
//! - `customers` - customers sitting in the waiting room, barbers sleep on it
//! - `barbers` - barbers ready to cut, a seated customer waits on it
//! - `seats_lock` - a semaphore of 1 that acts as a mutex over the free seat count
//!
//! A customer finding no free seat leaves right away.
//! Once every customer is done, the coordinator raises `done` and releases `customers` once
//! per barber, so each of them wakes up, sees the flag and goes home.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use log::info;

use crate::{
    config::WorkloadOptions,
    locks::Semaphore,
    workloads::{join_all, Result},
};

struct Shop {
    customers: Semaphore,
    barbers: Semaphore,
    seats_lock: Semaphore,
    /// Free waiting room seats, read and written only while holding `seats_lock`
    free_seats_under_lock: AtomicUsize,
    done: AtomicBool,
}

impl Shop {
    fn new(seats: usize) -> Result<Self> {
        Ok(Self {
            customers: Semaphore::new(0)?,
            barbers: Semaphore::new(0)?,
            seats_lock: Semaphore::new(1)?,
            free_seats_under_lock: AtomicUsize::new(seats),
            done: AtomicBool::new(false),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarberReport {
    pub served: usize,
    pub turned_away: usize,
    pub cuts: usize,
}

fn barber(thread_num: usize, shop: &Shop, cut_time: Duration) -> usize {
    let mut cuts = 0;
    loop {
        // sleep until there's a customer (or the shop closes)
        shop.customers.acquire();
        if shop.done.load(Ordering::Acquire) {
            return cuts;
        }

        {
            let _seats = shop.seats_lock.permit();
            shop.free_seats_under_lock.fetch_add(1, Ordering::Relaxed);
            shop.barbers.release();
        }

        info!("barber {thread_num}: cutting hair...");
        thread::sleep(cut_time);
        cuts += 1;
    }
}

/// true if the customer got a hair cut
fn customer(thread_num: usize, shop: &Shop, cut_time: Duration) -> bool {
    let seats = shop.seats_lock.permit();
    if shop.free_seats_under_lock.load(Ordering::Relaxed) == 0 {
        drop(seats);
        info!("customer {thread_num}: no free seats, leaving");
        return false;
    }
    shop.free_seats_under_lock.fetch_sub(1, Ordering::Relaxed);
    shop.customers.release();
    drop(seats);

    shop.barbers.acquire();
    info!("customer {thread_num}: getting a hair cut...");
    thread::sleep(cut_time);
    true
}

pub fn run(options: &WorkloadOptions) -> Result<BarberReport> {
    let shop = Shop::new(options.seats)?;
    let cut_time = options.cut_time;

    info!(
        "creating {} barber threads and {} customer threads",
        options.barbers, options.customers
    );

    let (visits, cuts) = thread::scope(|s| -> Result<(Vec<bool>, usize)> {
        let shop = &shop;
        let barbers: Vec<_> = (0..options.barbers)
            .map(|n| s.spawn(move || barber(n, shop, cut_time)))
            .collect();
        let customers: Vec<_> = (0..options.customers)
            .map(|n| s.spawn(move || customer(n, shop, cut_time)))
            .collect();

        let visits = join_all("customer", customers);

        // close the shop: 1 wake-up per barber
        shop.done.store(true, Ordering::Release);
        for _ in 0..options.barbers {
            shop.customers.release();
        }
        let cuts: usize = join_all("barber", barbers)?.into_iter().sum();
        Ok((visits?, cuts))
    })?;

    let served = visits.iter().filter(|&&served| served).count();
    let report = BarberReport {
        served,
        turned_away: visits.len() - served,
        cuts,
    };
    info!(
        "served {}, turned away {}",
        report.served, report.turned_away
    );

    for semaphore in [shop.customers, shop.barbers, shop.seats_lock] {
        semaphore.destroy()?;
    }
    Ok(report)
}
