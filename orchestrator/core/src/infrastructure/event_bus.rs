// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

// Event Bus Implementation - Pub/Sub for Command Lifecycle Events
//
// Provides in-memory event streaming using tokio broadcast channels.
// The WebSocket transport, the CLI and tests subscribe here; the gateway
// publishes through the EventSink trait.
//
// In-memory only: events are lost on restart and slow receivers lag.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::domain::events::{CommandEvent, EventSink, EventSinkError};
use crate::domain::fingerprint::Fingerprint;

/// Event bus for publishing and subscribing to command events
#[derive(Clone)]
pub struct EventBus {
    sender: Arc<broadcast::Sender<CommandEvent>>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    /// Capacity determines how many events can be buffered before dropping old ones
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Create event bus with default capacity (1000)
    pub fn with_default_capacity() -> Self {
        Self::new(1000)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: CommandEvent) {
        debug!(
            kind = event.kind.as_str(),
            fingerprint = %event.fingerprint.short(),
            agent_id = %event.agent_id,
            "Publishing command event"
        );

        // send() only fails when nobody is listening
        let receiver_count = self.sender.send(event).unwrap_or(0);

        if receiver_count == 0 {
            debug!("No subscribers listening to event");
        }
    }

    /// Subscribe to all command events
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }

    /// Subscribe and filter for a single fingerprint
    /// Useful for following one command across leader and followers
    pub fn subscribe_fingerprint(&self, fingerprint: Fingerprint) -> FingerprintEventReceiver {
        FingerprintEventReceiver {
            receiver: self.sender.subscribe(),
            fingerprint,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventSink for EventBus {
    async fn emit(&self, event: CommandEvent) -> Result<(), EventSinkError> {
        self.publish(event);
        Ok(())
    }
}

/// Receiver for all command events
pub struct EventReceiver {
    receiver: broadcast::Receiver<CommandEvent>,
}

impl EventReceiver {
    /// Receive the next event (waits until an event is available)
    pub async fn recv(&mut self) -> Result<CommandEvent, EventBusError> {
        self.receiver.recv().await.map_err(map_recv_error)
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<CommandEvent, EventBusError> {
        self.receiver.try_recv().map_err(|e| match e {
            broadcast::error::TryRecvError::Empty => EventBusError::Empty,
            broadcast::error::TryRecvError::Closed => EventBusError::Closed,
            broadcast::error::TryRecvError::Lagged(n) => {
                warn!("Event receiver lagged by {} events", n);
                EventBusError::Lagged(n)
            }
        })
    }
}

/// Receiver for one fingerprint's events (filtered)
pub struct FingerprintEventReceiver {
    receiver: broadcast::Receiver<CommandEvent>,
    fingerprint: Fingerprint,
}

impl FingerprintEventReceiver {
    /// Receive the next event for the subscribed fingerprint
    /// Events for other fingerprints are skipped
    pub async fn recv(&mut self) -> Result<CommandEvent, EventBusError> {
        loop {
            let event = self.receiver.recv().await.map_err(map_recv_error)?;
            if event.fingerprint == self.fingerprint {
                return Ok(event);
            }
        }
    }
}

fn map_recv_error(e: broadcast::error::RecvError) -> EventBusError {
    match e {
        broadcast::error::RecvError::Closed => EventBusError::Closed,
        broadcast::error::RecvError::Lagged(n) => {
            warn!("Event receiver lagged by {} events", n);
            EventBusError::Lagged(n)
        }
    }
}

/// Errors that can occur when receiving events
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    #[error("Event bus is closed")]
    Closed,

    #[error("No events available")]
    Empty,

    #[error("Receiver lagged by {0} events (events were dropped)")]
    Lagged(u64),
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}
