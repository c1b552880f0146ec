//! Bounded per-slot log history
//!
//! Lines enter through a queue written by the slot's reader and are moved
//! into a capped history when the consumer drains, or by the producer once
//! more than [`LOG_CAPACITY`] lines are waiting. Neither side ever waits on
//! the other for longer than the history lock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// Maximum number of retained lines per slot
pub const LOG_CAPACITY: usize = 100;

/// Queue plus capped history for one slot
#[derive(Debug)]
pub struct LogBuffer {
    sender: UnboundedSender<String>,
    /// Lines sent but not yet absorbed into the history
    queued: AtomicUsize,
    inner: Mutex<LogInner>,
}

#[derive(Debug)]
struct LogInner {
    receiver: UnboundedReceiver<String>,
    history: VecDeque<String>,
}

impl LogBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            queued: AtomicUsize::new(0),
            inner: Mutex::new(LogInner {
                receiver,
                history: VecDeque::with_capacity(LOG_CAPACITY),
            }),
        }
    }

    /// Queue one completed line
    pub fn push(&self, line: impl Into<String>) {
        // counted before sending so a concurrent drain never subtracts first
        let backlog = self.queued.fetch_add(1, Ordering::SeqCst);
        // The receiver lives as long as `self`, so the send cannot fail.
        let _ = self.sender.send(line.into());

        // nobody is draining; fold the backlog in so it stays bounded
        if backlog >= LOG_CAPACITY {
            let mut inner = self.inner.lock();
            let absorbed = inner.absorb_queue();
            self.queued.fetch_sub(absorbed, Ordering::SeqCst);
        }
    }

    /// Move queued lines into the history and return its last `limit` lines
    pub fn drain(&self, limit: usize) -> Vec<String> {
        let mut inner = self.inner.lock();
        let absorbed = inner.absorb_queue();
        self.queued.fetch_sub(absorbed, Ordering::SeqCst);

        let skip = inner.history.len().saturating_sub(limit);
        inner.history.iter().skip(skip).cloned().collect()
    }

    /// Forget the retained history; queued lines are kept
    pub fn clear(&self) {
        self.inner.lock().history.clear();
    }

    /// Lines waiting in the queue
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Number of retained lines (queued lines not counted)
    pub fn len(&self) -> usize {
        self.inner.lock().history.len()
    }

    /// Whether no lines are retained
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogInner {
    /// Move every queued line into the history; returns how many moved
    fn absorb_queue(&mut self) -> usize {
        let mut absorbed = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(line) => {
                    if self.history.len() == LOG_CAPACITY {
                        self.history.pop_front();
                    }
                    self.history.push_back(line);
                    absorbed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        absorbed
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_drain_empty_does_not_block() {
        let buffer = LogBuffer::new();
        assert!(buffer.drain(10).is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_returns_whole_history_when_limit_exceeds() {
        let buffer = LogBuffer::new();
        for i in 0..5 {
            buffer.push(format!("line {}", i));
        }
        let lines = buffer.drain(50);
        assert_eq!(lines, (0..5).map(|i| format!("line {}", i)).collect::<Vec<_>>());
        // history is retained across drains
        assert_eq!(buffer.drain(50).len(), 5);
    }

    #[test]
    fn test_drain_returns_tail() {
        let buffer = LogBuffer::new();
        for i in 0..10 {
            buffer.push(i.to_string());
        }
        assert_eq!(buffer.drain(3), vec!["7", "8", "9"]);
        assert!(buffer.drain(0).is_empty());
    }

    #[test]
    fn test_history_capped_oldest_dropped() {
        let buffer = LogBuffer::new();
        for i in 0..250 {
            buffer.push(i.to_string());
        }
        let lines = buffer.drain(usize::MAX);
        assert_eq!(lines.len(), LOG_CAPACITY);
        assert_eq!(lines.first().map(String::as_str), Some("150"));
        assert_eq!(lines.last().map(String::as_str), Some("249"));
    }

    #[test]
    fn test_clear_keeps_queued_lines() {
        let buffer = LogBuffer::new();
        buffer.push("old");
        buffer.drain(10);
        buffer.push("queued");
        buffer.clear();
        assert_eq!(buffer.drain(10), vec!["queued"]);
    }

    #[test]
    fn test_backlog_bounded_without_consumer() {
        let buffer = LogBuffer::new();
        for i in 0..10_000 {
            buffer.push(i.to_string());
            assert!(buffer.queued() <= LOG_CAPACITY);
        }
        assert!(buffer.len() <= LOG_CAPACITY);

        let lines = buffer.drain(usize::MAX);
        assert_eq!(lines.len(), LOG_CAPACITY);
        assert_eq!(lines.last().map(String::as_str), Some("9999"));
        assert_eq!(buffer.queued(), 0);
    }

    #[test]
    fn test_concurrent_producer() {
        let buffer = std::sync::Arc::new(LogBuffer::new());
        let producer = {
            let buffer = buffer.clone();
            std::thread::spawn(move || {
                for i in 0..1000 {
                    buffer.push(i.to_string());
                }
            })
        };
        while !producer.is_finished() {
            assert!(buffer.drain(LOG_CAPACITY).len() <= LOG_CAPACITY);
        }
        producer.join().unwrap();
        let lines = buffer.drain(LOG_CAPACITY);
        assert_eq!(lines.last().map(String::as_str), Some("999"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(usize),
        Drain(usize),
        Clear,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1usize..300).prop_map(Op::Push),
            (0usize..200).prop_map(Op::Drain),
            Just(Op::Clear),
        ]
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_capacity(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let buffer = LogBuffer::new();
            for op in ops {
                match op {
                    Op::Push(n) => (0..n).for_each(|i| buffer.push(i.to_string())),
                    Op::Drain(limit) => {
                        let lines = buffer.drain(limit);
                        prop_assert!(lines.len() <= limit.min(LOG_CAPACITY));
                    }
                    Op::Clear => buffer.clear(),
                }
                prop_assert!(buffer.len() <= LOG_CAPACITY);
                prop_assert!(buffer.queued() <= LOG_CAPACITY);
            }
        }
    }
}
