// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Broadcast bus for stove events.

use tokio::sync::broadcast;

use crate::event::StoveEvent;

/// Default channel capacity. Slow subscribers lag rather than block the
/// controller.
const DEFAULT_CAPACITY: usize = 256;

/// Fan-out channel for [`StoveEvent`]s.
///
/// # Examples
///
/// ```
/// use aduro_lib::event::EventBus;
///
/// let bus = EventBus::new();
/// let mut rx = bus.subscribe();
/// assert_eq!(bus.subscriber_count(), 1);
/// drop(rx);
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoveEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus with a custom capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Opens a new subscription. Only events published after this call are
    /// delivered.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoveEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event to all current subscribers.
    ///
    /// An event with no subscribers is dropped silently.
    pub fn publish(&self, event: StoveEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of currently attached subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
