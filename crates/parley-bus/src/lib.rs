// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal typed event bus.
//!
//! Job producers and the worker pool publish [`JobEvent`]s; any number of
//! observers (loggers, the CLI, tests) subscribe. Publishing never blocks and
//! never fails: with no subscribers the event is dropped, and a subscriber
//! that falls behind by more than the channel capacity skips the oldest
//! events.

pub mod events;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

pub use events::{Envelope, JobEvent};

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast-based event bus.
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<Envelope>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: JobEvent) {
        let envelope = Envelope::new(event);
        trace!(event_id = %envelope.id, "publishing event");
        // No subscribers is not an error.
        let _ = self.sender.send(envelope);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
