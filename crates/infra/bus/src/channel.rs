//! Receiving half handed out by the bus

use std::time::Duration;

use crossbeam::channel;
pub use crossbeam::channel::RecvTimeoutError;

/// Receiver for messages delivered to a topic subscription or an endpoint
#[derive(Debug)]
pub struct Receiver<T> {
    rx: channel::Receiver<T>,
}

impl<T> Receiver<T> {
    pub(crate) const fn new(rx: channel::Receiver<T>) -> Self {
        Self { rx }
    }

    /// Receive a message, blocking until one arrives.
    ///
    /// Returns `None` once every sender is gone and the queue is drained.
    #[must_use = "ignoring received messages defeats the purpose"]
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Receive a message, waiting at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`RecvTimeoutError::Timeout`] if nothing arrived in time and
    /// [`RecvTimeoutError::Disconnected`] once every sender is gone and the queue is drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Receive a message if one is queued
    #[must_use = "ignoring received messages defeats the purpose"]
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Take every queued message without blocking
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }

    /// Number of queued messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no message is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let (tx, rx) = channel::unbounded();
        let rx = Receiver::new(rx);
        for i in 0..3 {
            tx.send(i).unwrap();
        }

        assert_eq!(rx.len(), 3);
        assert_eq!(rx.drain(), vec![0, 1, 2]);
        assert!(rx.is_empty());
    }

    #[test]
    fn test_recv_timeout() {
        let (tx, rx) = channel::unbounded();
        let rx = Receiver::new(rx);

        assert_eq!(
            rx.recv_timeout(Duration::from_millis(1)),
            Err(RecvTimeoutError::Timeout)
        );
        tx.send(7).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_millis(1)), Ok(7));
        drop(tx);
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(1)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn test_recv_after_senders_dropped() {
        let (tx, rx) = channel::unbounded();
        let rx = Receiver::new(rx);
        tx.send("last").unwrap();
        drop(tx);

        assert_eq!(rx.recv(), Some("last"));
        assert_eq!(rx.recv(), None);
    }
}
