//! Capture-to-network frame handoff
//!
//! The only state shared between the real-time capture callback and the
//! async event domain. Bounded and lock-free; when the network side cannot
//! keep up, the oldest unsent frame is dropped so capture never stalls.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_queue::ArrayQueue;
use tokio::sync::Notify;

/// Bounded lock-free queue of encoded PCM frames
pub struct FrameQueue {
    frames: ArrayQueue<Vec<u8>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl FrameQueue {
    /// Create a queue holding at most `depth` frames
    ///
    /// # Panics
    ///
    /// Panics if `depth` is zero.
    #[must_use]
    pub fn new(depth: usize) -> Self {
        Self {
            frames: ArrayQueue::new(depth),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Push a frame from the capture callback
    ///
    /// Never blocks. On overflow the oldest queued frame is displaced and
    /// counted as dropped.
    pub fn push(&self, frame: Vec<u8>) {
        if self.frames.force_push(frame).is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
    }

    /// Pop the next frame without waiting
    #[must_use]
    pub fn try_pop(&self) -> Option<Vec<u8>> {
        self.frames.pop()
    }

    /// Wait for and pop the next frame
    pub async fn pop(&self) -> Vec<u8> {
        loop {
            if let Some(frame) = self.frames.pop() {
                return frame;
            }
            self.notify.notified().await;
        }
    }

    /// Number of frames dropped to the overflow policy so far
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of frames currently queued
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the queue is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_preserves_order() {
        let queue = FrameQueue::new(4);
        queue.push(vec![1]);
        queue.push(vec![2]);
        assert_eq!(queue.try_pop(), Some(vec![1]));
        assert_eq!(queue.try_pop(), Some(vec![2]));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn overflow_drops_oldest() {
        let queue = FrameQueue::new(2);
        queue.push(vec![1]);
        queue.push(vec![2]);
        queue.push(vec![3]);

        assert_eq!(queue.dropped(), 1);
        assert_eq!(queue.try_pop(), Some(vec![2]));
        assert_eq!(queue.try_pop(), Some(vec![3]));
    }

    #[test]
    fn dropped_count_accumulates() {
        let queue = FrameQueue::new(1);
        for i in 0..5 {
            queue.push(vec![i]);
        }
        assert_eq!(queue.dropped(), 4);
        assert_eq!(queue.try_pop(), Some(vec![4]));
    }

    #[tokio::test]
    async fn pop_wakes_on_push() {
        use std::sync::Arc;

        let queue = Arc::new(FrameQueue::new(4));
        let consumer = Arc::clone(&queue);
        let handle = tokio::spawn(async move { consumer.pop().await });

        tokio::task::yield_now().await;
        queue.push(vec![7]);

        assert_eq!(handle.await.unwrap(), vec![7]);
    }
}
