//! Process-local bus used by tests and single-node embeddings.

use std::sync::{Mutex, mpsc};

use thiserror::Error;

use crate::bus::{EventBus, Subscription};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InMemoryBusError {
    #[error("event bus lock poisoned")]
    Poisoned,
}

#[derive(Debug)]
struct Fanout<M> {
    senders: Vec<mpsc::Sender<M>>,
    delivered: u64,
}

/// Broadcast bus over `std::sync::mpsc` channels.
///
/// Every subscription gets its own channel. A subscription that was dropped is
/// forgotten the next time something is published.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    fanout: Mutex<Fanout<M>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriptions as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.fanout.lock().map(|f| f.senders.len()).unwrap_or(0)
    }

    /// Messages handed to at least one subscriber since the bus was created.
    pub fn delivered(&self) -> u64 {
        self.fanout.lock().map(|f| f.delivered).unwrap_or(0)
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self {
            fanout: Mutex::new(Fanout {
                senders: Vec::new(),
                delivered: 0,
            }),
        }
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut fanout = self.fanout.lock().map_err(|_| InMemoryBusError::Poisoned)?;
        fanout.senders.retain(|tx| tx.send(message.clone()).is_ok());
        if !fanout.senders.is_empty() {
            fanout.delivered += 1;
        }
        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();
        // Poisoned: the subscription is returned but never receives.
        if let Ok(mut fanout) = self.fanout.lock() {
            fanout.senders.push(tx);
        }
        Subscription::new(rx)
    }
}
