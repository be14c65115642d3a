//! Bounded connection handoff queue.
//!
//! # Responsibilities
//! - Transfer ownership of ready connections from the acceptor to workers
//! - Block producers while full (backpressure), consumers while empty
//! - Preserve FIFO order across all producers and consumers
//!
//! # Design Decisions
//! - One mutex guards the ring; two condvars separate "not full" from "not empty"
//! - Items move by value, so a queued connection has exactly one owner
//! - Nothing is ever dropped or rejected; a full queue simply stalls the producer

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Fixed-capacity blocking FIFO.
#[derive(Debug)]
pub struct BoundedQueue<T> {
    slots: Mutex<VecDeque<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Create a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Mutex::new(VecDeque::with_capacity(capacity)),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            capacity,
        }
    }

    /// Append `item`, blocking while the queue is full. Returns the depth
    /// after insertion.
    pub fn enqueue(&self, item: T) -> usize {
        let mut slots = self.lock();
        while slots.len() == self.capacity {
            slots = self
                .not_full
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
        slots.push_back(item);
        let depth = slots.len();
        drop(slots);
        self.not_empty.notify_one();
        depth
    }

    /// Remove the oldest item, blocking while the queue is empty.
    pub fn dequeue(&self) -> T {
        let mut slots = self.lock();
        loop {
            if let Some(item) = slots.pop_front() {
                drop(slots);
                self.not_full.notify_one();
                return item;
            }
            slots = self
                .not_empty
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Current number of queued items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // The deque is never left half-updated, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fifo_order() {
        let queue = BoundedQueue::new(4);
        for i in 0..4 {
            queue.enqueue(i);
        }
        assert_eq!(queue.len(), 4);
        let drained: Vec<_> = (0..4).map(|_| queue.dequeue()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let queue: BoundedQueue<u8> = BoundedQueue::new(0);
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn every_item_delivered_exactly_once() {
        const PRODUCERS: usize = 4;
        const CONSUMERS: usize = 4;
        const PER_PRODUCER: usize = 500;
        let total = PRODUCERS * PER_PRODUCER;

        let queue = Arc::new(BoundedQueue::new(8));
        let taken = Arc::new(AtomicUsize::new(0));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.enqueue(p * PER_PRODUCER + i);
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..CONSUMERS)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let taken = Arc::clone(&taken);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    while taken.fetch_add(1, Ordering::SeqCst) < total {
                        seen.push(queue.dequeue());
                    }
                    seen
                })
            })
            .collect();

        for producer in producers {
            producer.join().unwrap();
        }
        let mut delivered = HashSet::new();
        let mut count = 0;
        for consumer in consumers {
            for item in consumer.join().unwrap() {
                assert!(delivered.insert(item), "item {} delivered twice", item);
                count += 1;
            }
        }
        assert_eq!(count, total);
        assert!(queue.is_empty());
    }

    #[test]
    fn full_queue_blocks_producer_until_slot_frees() {
        let queue = Arc::new(BoundedQueue::new(2));
        queue.enqueue(1);
        queue.enqueue(2);

        let (done_tx, done_rx) = mpsc::channel();
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                queue.enqueue(3);
                done_tx.send(()).unwrap();
            })
        };

        assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.dequeue(), 1);
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        producer.join().unwrap();

        assert_eq!(queue.dequeue(), 2);
        assert_eq!(queue.dequeue(), 3);
    }

    #[test]
    fn empty_queue_blocks_consumer() {
        let queue: Arc<BoundedQueue<&str>> = Arc::new(BoundedQueue::new(1));
        let (tx, rx) = mpsc::channel();
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || tx.send(queue.dequeue()).unwrap())
        };

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        queue.enqueue("conn");
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "conn");
        consumer.join().unwrap();
    }
}
