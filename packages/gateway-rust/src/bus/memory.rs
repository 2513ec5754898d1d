//! In-process bus backed by bounded mpsc channels.
//!
//! Each binding owns a bounded channel, so a slow consumer applies
//! backpressure to publishers instead of growing memory without limit.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{BusError, Delivery, MessageBus, Subscription};

/// Default per-binding channel capacity.
pub const DEFAULT_BINDING_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    exchange: String,
    routing_key: String,
}

impl BindingKey {
    fn new(exchange: &str, routing_key: &str) -> Self {
        Self {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
        }
    }
}

/// Direct-exchange bus living entirely inside the process.
///
/// Used for embedded deployments and tests. [`InMemoryBus::disconnect`]
/// simulates a broker outage: until [`InMemoryBus::reconnect`] every publish
/// and subscribe fails with `BusError::Unavailable`.
#[derive(Debug)]
pub struct InMemoryBus {
    bindings: DashMap<BindingKey, Vec<mpsc::Sender<Delivery>>>,
    connected: AtomicBool,
    capacity: usize,
}

impl InMemoryBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BINDING_CAPACITY)
    }

    /// Creates a bus whose bindings each buffer up to `capacity` messages.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bindings: DashMap::new(),
            connected: AtomicBool::new(true),
            capacity: capacity.max(1),
        }
    }

    pub fn disconnect(&self) {
        info!("in-memory bus disconnected");
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        info!("in-memory bus reconnected");
        self.connected.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions bound to `(exchange, routing_key)`.
    #[must_use]
    pub fn binding_count(&self, exchange: &str, routing_key: &str) -> usize {
        self.bindings
            .get(&BindingKey::new(exchange, routing_key))
            .map_or(0, |senders| senders.iter().filter(|tx| !tx.is_closed()).count())
    }

    fn ensure_connected(&self) -> Result<(), BusError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BusError::Unavailable("in-memory bus is disconnected".to_string()))
        }
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: Bytes,
    ) -> Result<(), BusError> {
        self.ensure_connected()?;
        let key = BindingKey::new(exchange, routing_key);

        // Snapshot the senders so no shard lock is held across an await.
        let senders: Vec<mpsc::Sender<Delivery>> = self
            .bindings
            .get(&key)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        if senders.is_empty() {
            debug!(exchange, routing_key, "no binding for routing key, message dropped");
            return Ok(());
        }

        let mut saw_closed = false;
        for tx in &senders {
            let delivery = Delivery {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                body: body.clone(),
            };
            if tx.send(delivery).await.is_err() {
                saw_closed = true;
            }
        }

        if saw_closed {
            if let Some(mut entry) = self.bindings.get_mut(&key) {
                entry.retain(|tx| !tx.is_closed());
            }
        }
        Ok(())
    }

    async fn subscribe(&self, exchange: &str, routing_key: &str) -> Result<Subscription, BusError> {
        self.ensure_connected()?;
        let (tx, rx) = mpsc::channel(self.capacity);
        self.bindings
            .entry(BindingKey::new(exchange, routing_key))
            .or_default()
            .push(tx);
        debug!(exchange, routing_key, "binding created");
        Ok(Subscription::new(rx))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_exact_binding_only() {
        let bus = InMemoryBus::new();
        let mut owners = bus.subscribe("owner-exchange", "owner.request").await.unwrap();
        let mut pets = bus.subscribe("pet-exchange", "pet.request").await.unwrap();

        bus.publish("owner-exchange", "owner.request", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        let delivery = owners.recv().await.unwrap();
        assert_eq!(delivery.routing_key, "owner.request");
        assert_eq!(&delivery.body[..], b"hello");
        assert!(pets.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn every_binding_receives_a_copy() {
        let bus = InMemoryBus::new();
        let mut first = bus.subscribe("x", "k").await.unwrap();
        let mut second = bus.subscribe("x", "k").await.unwrap();

        bus.publish("x", "k", Bytes::from_static(b"m")).await.unwrap();

        assert_eq!(&first.recv().await.unwrap().body[..], b"m");
        assert_eq!(&second.recv().await.unwrap().body[..], b"m");
    }

    #[tokio::test]
    async fn unroutable_publish_is_dropped() {
        let bus = InMemoryBus::new();
        assert!(bus.publish("x", "nobody", Bytes::new()).await.is_ok());
    }

    #[tokio::test]
    async fn dropped_subscription_is_pruned() {
        let bus = InMemoryBus::new();
        let sub = bus.subscribe("x", "k").await.unwrap();
        assert_eq!(bus.binding_count("x", "k"), 1);
        drop(sub);

        bus.publish("x", "k", Bytes::new()).await.unwrap();
        assert_eq!(bus.binding_count("x", "k"), 0);
        assert!(bus.bindings.get(&BindingKey::new("x", "k")).unwrap().is_empty());
    }

    #[tokio::test]
    async fn disconnected_bus_rejects_operations() {
        let bus = InMemoryBus::new();
        bus.disconnect();

        let err = bus.publish("x", "k", Bytes::new()).await.unwrap_err();
        assert!(matches!(err, BusError::Unavailable(_)));
        assert!(bus.subscribe("x", "k").await.is_err());

        bus.reconnect();
        assert!(bus.publish("x", "k", Bytes::new()).await.is_ok());
    }
}
