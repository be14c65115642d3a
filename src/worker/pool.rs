//! Fixed-size worker pool.
//!
//! # Responsibilities
//! - Start a fixed number of named threads at startup
//! - Each thread takes items from the shared queue and runs the job on them
//! - Keep a worker alive if one job panics
//!
//! # Design Decisions
//! - Threads are detached; they live for the rest of the process
//! - No work stealing: the queue is the only source of work

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use crate::net::queue::BoundedQueue;
use crate::observability::metrics;

/// A running set of worker threads.
#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one) that run `job` on every dequeued item.
    pub fn start<T, F>(size: usize, queue: Arc<BoundedQueue<T>>, job: F) -> io::Result<Self>
    where
        T: Send + 'static,
        F: Fn(T) + Send + Sync + 'static,
    {
        let size = size.max(1);
        let job = Arc::new(job);
        for index in 0..size {
            let queue = Arc::clone(&queue);
            let job = Arc::clone(&job);
            thread::Builder::new()
                .name(format!("worker-{}", index))
                .spawn(move || worker_loop(index, &queue, job.as_ref()))?;
        }
        tracing::info!(workers = size, "Worker pool started");
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

fn worker_loop<T, F>(index: usize, queue: &BoundedQueue<T>, job: &F)
where
    F: Fn(T),
{
    tracing::debug!(worker = index, "Worker ready");
    loop {
        let item = queue.dequeue();
        metrics::set_queue_depth(queue.len());
        if panic::catch_unwind(AssertUnwindSafe(|| job(item))).is_err() {
            tracing::error!(worker = index, "Job panicked; worker continues");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn every_item_is_processed_once() {
        let queue = Arc::new(BoundedQueue::new(8));
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let pool = WorkerPool::start(4, Arc::clone(&queue), move |n: u32| {
            tx.lock().unwrap().send(n).unwrap();
        })
        .unwrap();
        assert_eq!(pool.size(), 4);

        for n in 0..100 {
            queue.enqueue(n);
        }
        let mut seen: Vec<u32> = (0..100)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn panicking_job_does_not_kill_the_worker() {
        let queue = Arc::new(BoundedQueue::new(4));
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        WorkerPool::start(1, Arc::clone(&queue), move |n: u32| {
            if n == 0 {
                panic!("boom");
            }
            tx.lock().unwrap().send(n).unwrap();
        })
        .unwrap();

        queue.enqueue(0);
        queue.enqueue(7);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }

    #[test]
    fn zero_size_still_starts_one_worker() {
        let queue: Arc<BoundedQueue<u32>> = Arc::new(BoundedQueue::new(1));
        let pool = WorkerPool::start(0, queue, |_| {}).unwrap();
        assert_eq!(pool.size(), 1);
    }
}
