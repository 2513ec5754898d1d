//! Message bus abstraction.
//!
//! The gateway talks to owner and pet services exclusively through a
//! direct-exchange style bus: a message published to `(exchange, routing_key)`
//! is delivered to every subscription bound to exactly that pair. Delivery is
//! at-most-once and carries no ordering guarantee across routing keys.

pub mod memory;
#[cfg(feature = "nats")]
pub mod nats;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

pub use memory::InMemoryBus;
#[cfg(feature = "nats")]
pub use nats::NatsBus;

/// Failure of a bus operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusError {
    /// The bus connection is down.
    #[error("message bus unavailable: {0}")]
    Unavailable(String),
    /// The broker refused or failed to accept a message.
    #[error("publish to {exchange}/{routing_key} failed: {reason}")]
    Publish {
        exchange: String,
        routing_key: String,
        reason: String,
    },
    /// A binding could not be established.
    #[error("subscribe to {exchange}/{routing_key} failed: {reason}")]
    Subscribe {
        exchange: String,
        routing_key: String,
        reason: String,
    },
    /// The subscription's delivery stream has ended.
    #[error("subscription closed")]
    Closed,
}

/// One message taken off the bus.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub exchange: String,
    pub routing_key: String,
    pub body: Bytes,
}

/// Stream of deliveries for one `(exchange, routing_key)` binding.
///
/// Dropping the subscription unbinds it; the bus prunes closed bindings on the
/// next publish to that key.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Delivery>,
}

impl Subscription {
    #[must_use]
    pub fn new(rx: mpsc::Receiver<Delivery>) -> Self {
        Self { rx }
    }

    /// Waits for the next delivery. `None` once the bus side has gone away.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }
}

/// Publish/subscribe access to a direct-exchange message bus.
#[async_trait]
pub trait MessageBus: Send + Sync + 'static {
    /// Publishes `body` to every subscription bound to `(exchange, routing_key)`.
    ///
    /// Publishing to a key nobody is bound to succeeds and drops the message.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Unavailable` when the connection is down and
    /// `BusError::Publish` when the broker rejects the message.
    async fn publish(&self, exchange: &str, routing_key: &str, body: Bytes)
        -> Result<(), BusError>;

    /// Binds a new subscription to `(exchange, routing_key)`.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Unavailable` or `BusError::Subscribe` when the
    /// binding cannot be created.
    async fn subscribe(&self, exchange: &str, routing_key: &str)
        -> Result<Subscription, BusError>;
}
