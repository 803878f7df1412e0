//! Outbound message queue.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

use crate::protocol::ClientMessage;

/// FIFO queue of outbound frames awaiting a live socket.
///
/// Every outbound message passes through this queue; the connection task
/// drains it to the wire whenever the socket is open. That single path is
/// what guarantees global FIFO ordering across the connect boundary:
/// everything enqueued before the socket opened is flushed before anything
/// enqueued after.
#[derive(Debug, Default)]
pub struct SendQueue {
    inner: Mutex<VecDeque<ClientMessage>>,
    notify: Notify,
}

impl SendQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and wake the connection task.
    pub fn push(&self, message: ClientMessage) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(message);
        self.notify.notify_one();
    }

    /// Take every queued message, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<ClientMessage> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Put messages back at the front, preserving their order.
    ///
    /// Used when the transport fails mid-flush so undelivered frames survive
    /// to the next connection.
    pub fn requeue_front(&self, messages: Vec<ClientMessage>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        for message in messages.into_iter().rev() {
            inner.push_front(message);
        }
        drop(inner);
        self.notify.notify_one();
    }

    /// Wait until [`push`](Self::push) is called.
    pub async fn wait(&self) {
        self.notify.notified().await;
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
