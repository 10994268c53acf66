use std::time::Duration;

use crate::task::{BusinessLogic, Task, TaskId};

/// Lazily generated sequence of tasks.
///
/// Only the cursor is stored, so a workload of millions of tasks costs the same memory as an empty
/// one until the tasks are pulled.
#[derive(Clone)]
pub struct Workload {
    next: TaskId,
    count: TaskId,
    delay: Duration,
    logic: BusinessLogic,
}

/// Create a workload of `count` tasks that each wait for `simulated_delay` before running
/// `business_logic`.
///
/// Task ids are `0..count` in order. Calling this twice with the same inputs produces the same
/// sequence.
pub fn generate(count: u64, simulated_delay: Duration, business_logic: BusinessLogic) -> Workload {
    Workload {
        next: 0,
        count,
        delay: simulated_delay,
        logic: business_logic,
    }
}

impl Workload {
    /// Total number of tasks in this workload, including any already taken.
    pub fn total(&self) -> u64 {
        self.count
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Iterator for Workload {
    type Item = Task;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }

        let task = Task::new(self.next, self.delay, self.logic.clone());
        self.next += 1;
        Some(task)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.count - self.next).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Workload {}
