//! A counter of finished operations shared by all the workers of a run, and a budget of operations
//! the workers can draw from instead of running a fixed count each.
//! Both are owned by whoever spawns the workers and outlive them, the workers get a reference.

use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct OpCounter {
    count: Mutex<usize>,
}

impl OpCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        *self.count.lock() += 1;
    }

    pub fn get(&self) -> usize {
        *self.count.lock()
    }
}

/// Total number of operations left for all the workers together
#[derive(Debug)]
pub struct IterationBudget {
    remaining: Mutex<usize>,
}

impl IterationBudget {
    pub fn new(total: usize) -> Self {
        Self {
            remaining: Mutex::new(total),
        }
    }

    /// Take one operation out of the budget, false once it's used up
    pub fn try_take(&self) -> bool {
        let mut remaining = self.remaining.lock();
        match *remaining {
            0 => false,
            _ => {
                *remaining -= 1;
                true
            }
        }
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.lock()
    }

    /// Set as soon as the last operation has been handed out, it may still be running
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::atomic::{AtomicUsize, Ordering::SeqCst},
        thread::scope,
    };

    use super::*;

    #[test]
    fn test_concurrent_increments() {
        let counter = OpCounter::new();
        scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..250 {
                        counter.inc();
                    }
                });
            }
        });
        assert_eq!(2000, counter.get());
    }

    #[test]
    fn test_budget_is_split_exactly() {
        let budget = IterationBudget::new(1000);
        let taken = AtomicUsize::new(0);
        scope(|s| {
            for _ in 0..7 {
                s.spawn(|| {
                    while budget.try_take() {
                        taken.fetch_add(1, SeqCst);
                    }
                });
            }
        });
        assert_eq!(1000, taken.load(SeqCst));
        assert!(budget.is_exhausted());
        assert!(!budget.try_take());
    }

    #[test]
    fn test_empty_budget() {
        let budget = IterationBudget::new(0);
        assert!(budget.is_exhausted());
        assert!(!budget.try_take());
        assert_eq!(0, budget.remaining());
    }
}
