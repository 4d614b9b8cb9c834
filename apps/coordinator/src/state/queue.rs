//! The Job Queue (§3, §5): an in-memory-only FIFO of job-ids awaiting
//! assignment. A plain mutex-guarded `VecDeque` is enough — pushes and pops
//! are O(1) and never suspend, so this is safe to hold across a short
//! critical section inside `dispatch()`.

use std::collections::VecDeque;
use std::sync::Mutex;

use uuid::Uuid;

pub struct JobQueue {
    jobs: Mutex<VecDeque<Uuid>>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self { jobs: Mutex::new(VecDeque::new()) }
    }

    /// Enqueues at the tail. Used both for fresh submissions and for the
    /// §9 open-question behavior of re-enqueueing a job dispatch couldn't
    /// place (FIFO-blocking semantics, preserved as specified).
    pub fn enqueue(&self, job_id: Uuid) {
        self.jobs.lock().expect("job queue lock poisoned").push_back(job_id);
    }

    pub fn dequeue(&self) -> Option<Uuid> {
        self.jobs.lock().expect("job queue lock poisoned").pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().expect("job queue lock poisoned").is_empty()
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().expect("job queue lock poisoned").len()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_is_preserved() {
        let queue = JobQueue::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        queue.enqueue(first);
        queue.enqueue(second);

        assert_eq!(queue.dequeue(), Some(first));
        assert_eq!(queue.dequeue(), Some(second));
        assert_eq!(queue.dequeue(), None);
    }
}
