//! Fixed-capacity FIFO queue used between pipeline stages.
//!
//! Built on crossbeam's bounded channel. The queue handle owns both ends, so
//! it never disconnects while any clone is alive; producers and consumers
//! share a clone each.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError};
use thiserror::Error;
use tracing::trace;

use super::stop::StopSignal;

/// Queue error conditions.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue capacity exceeded")]
    QueueFull,
    #[error("Invalid capacity (must be at least one)")]
    InvalidCapacity,
    #[error("Stop requested while waiting for queue space")]
    Stopped,
    #[error("Queue disconnected")]
    Disconnected,
}

/// An item the queue refused, handed back to the producer.
#[derive(Debug)]
pub struct Rejected<T> {
    pub reason: QueueError,
    pub item: T,
}

impl<T> Rejected<T> {
    pub fn into_inner(self) -> T {
        self.item
    }
}

/// Bounded multi-producer multi-consumer FIFO.
pub struct BoundedQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
    capacity: usize,
}

impl<T> Clone for BoundedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T> BoundedQueue<T> {
    /// Creates a queue holding at most `capacity` items.
    ///
    /// A capacity of zero would turn the queue into a rendezvous channel and
    /// is rejected.
    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        if capacity == 0 {
            return Err(QueueError::InvalidCapacity);
        }
        let (tx, rx) = channel::bounded(capacity);
        Ok(Self { tx, rx, capacity })
    }

    /// Attempts to enqueue without waiting.
    pub fn try_push(&self, item: T) -> Result<(), Rejected<T>> {
        self.tx.try_send(item).map_err(|e| match e {
            TrySendError::Full(item) => Rejected {
                reason: QueueError::QueueFull,
                item,
            },
            TrySendError::Disconnected(item) => Rejected {
                reason: QueueError::Disconnected,
                item,
            },
        })
    }

    /// Enqueues, blocking while the queue is full.
    ///
    /// Each wait lasts at most `wait`; between waits the stop signal is
    /// checked, and once it is raised the item is handed back instead of
    /// waiting again. Items are never dropped silently.
    pub fn push_blocking(&self, item: T, stop: &StopSignal, wait: Duration) -> Result<(), Rejected<T>> {
        let mut item = item;
        loop {
            match self.tx.send_timeout(item, wait) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => {
                    if stop.is_raised() {
                        return Err(Rejected {
                            reason: QueueError::Stopped,
                            item: back,
                        });
                    }
                    trace!(capacity = self.capacity, "Queue full, producer waiting");
                    item = back;
                }
                Err(SendTimeoutError::Disconnected(back)) => {
                    return Err(Rejected {
                        reason: QueueError::Disconnected,
                        item: back,
                    })
                }
            }
        }
    }

    /// Dequeues, waiting at most `timeout` for an item.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Dequeues without waiting. Returns `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.tx.is_full()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    const WAIT: Duration = Duration::from_millis(20);

    #[test]
    fn rejects_zero_capacity() {
        assert!(matches!(
            BoundedQueue::<u32>::with_capacity(0),
            Err(QueueError::InvalidCapacity)
        ));
    }

    #[test]
    fn maintains_ordering() {
        let queue = BoundedQueue::with_capacity(4).unwrap();
        queue.try_push(1).unwrap();
        queue.try_push(2).unwrap();
        queue.try_push(3).unwrap();
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn signals_queue_full() {
        let queue = BoundedQueue::with_capacity(2).unwrap();
        queue.try_push(1).unwrap();
        queue.try_push(2).unwrap();
        let rejected = queue.try_push(3).unwrap_err();
        assert_eq!(rejected.reason, QueueError::QueueFull);
        assert_eq!(rejected.into_inner(), 3);
        assert_eq!(queue.len(), 2);
        assert!(queue.is_full());
    }

    #[test]
    fn pop_timeout_returns_none_when_empty() {
        let queue = BoundedQueue::<u32>::with_capacity(1).unwrap();
        let started = Instant::now();
        assert_eq!(queue.pop_timeout(WAIT), None);
        assert!(started.elapsed() >= WAIT);
    }

    #[test]
    fn blocked_producer_resumes_when_space_frees() {
        let queue = BoundedQueue::with_capacity(2).unwrap();
        let stop = StopSignal::new();
        queue.try_push(1).unwrap();
        queue.try_push(2).unwrap();

        let producer = {
            let queue = queue.clone();
            let stop = stop.clone();
            thread::spawn(move || queue.push_blocking(3, &stop, WAIT).is_ok())
        };

        // The producer must still be waiting with the queue at capacity.
        thread::sleep(WAIT * 5);
        assert!(!producer.is_finished());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop_timeout(WAIT), Some(1));
        assert!(producer.join().unwrap());
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
    }

    #[test]
    fn blocked_producer_gets_item_back_on_stop() {
        let queue = BoundedQueue::with_capacity(1).unwrap();
        let stop = StopSignal::new();
        queue.try_push("first").unwrap();

        let producer = {
            let queue = queue.clone();
            let stop = stop.clone();
            thread::spawn(move || queue.push_blocking("second", &stop, WAIT))
        };
        thread::sleep(WAIT * 2);
        stop.raise();

        let rejected = producer.join().unwrap().unwrap_err();
        assert_eq!(rejected.reason, QueueError::Stopped);
        assert_eq!(rejected.item, "second");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn push_blocking_succeeds_after_stop_when_space_is_available() {
        let queue = BoundedQueue::with_capacity(1).unwrap();
        let stop = StopSignal::new();
        stop.raise();
        assert!(queue.push_blocking(7, &stop, WAIT).is_ok());
        assert_eq!(queue.try_pop(), Some(7));
    }
}
