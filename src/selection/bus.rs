//! Typed publish/subscribe channel between the selection bridge and the chat.
//!
//! The host application owns the bus. Each subscriber gets its own flume
//! receiver; dropping the subscription unsubscribes it on the next publish.

use std::sync::{Arc, Mutex, PoisonError};

use flume::{Receiver, Sender};
use log::debug;

/// "Book text selected" notification
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionEvent {
    pub text: String,
    /// Capture time, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl SelectionEvent {
    pub fn new(text: impl Into<String>, timestamp_ms: i64) -> Self {
        Self {
            text: text.into(),
            timestamp_ms,
        }
    }

    pub fn now(text: impl Into<String>) -> Self {
        Self::new(text, chrono::Utc::now().timestamp_millis())
    }
}

#[derive(Clone, Default)]
pub struct SelectionBus {
    subscribers: Arc<Mutex<Vec<Sender<SelectionEvent>>>>,
}

impl SelectionBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> SelectionSubscription {
        let (tx, rx) = flume::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        SelectionSubscription { rx }
    }

    /// Deliver `event` to every live subscriber, returning how many got it
    pub fn publish(&self, event: SelectionEvent) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        debug!("Selection event delivered to {} subscriber(s)", subscribers.len());
        subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| !tx.is_disconnected());
        subscribers.len()
    }
}

pub struct SelectionSubscription {
    rx: Receiver<SelectionEvent>,
}

impl SelectionSubscription {
    pub fn try_recv(&self) -> Option<SelectionEvent> {
        self.rx.try_recv().ok()
    }

    pub fn drain(&self) -> Vec<SelectionEvent> {
        self.rx.try_iter().collect()
    }
}
