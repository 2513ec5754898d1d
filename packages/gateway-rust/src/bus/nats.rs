//! NATS-backed bus.
//!
//! An `(exchange, routing_key)` pair maps to the NATS subject
//! `"<exchange>.<routing_key>"`; plain subject subscriptions give the same
//! fan-out as a direct exchange with one queue per binding.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::memory::DEFAULT_BINDING_CAPACITY;
use super::{BusError, Delivery, MessageBus, Subscription};

/// Bus adapter over an `async_nats::Client`.
#[derive(Debug, Clone)]
pub struct NatsBus {
    client: async_nats::Client,
}

impl NatsBus {
    /// Connects to the NATS server at `url`.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Unavailable` if the initial connection fails.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Unavailable(e.to_string()))?;
        debug!(url, "connected to NATS");
        Ok(Self { client })
    }

    #[must_use]
    pub fn from_client(client: async_nats::Client) -> Self {
        Self { client }
    }
}

fn subject(exchange: &str, routing_key: &str) -> String {
    format!("{exchange}.{routing_key}")
}

#[async_trait]
impl MessageBus for NatsBus {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: bytes::Bytes,
    ) -> Result<(), BusError> {
        self.client
            .publish(subject(exchange, routing_key), body)
            .await
            .map_err(|e| BusError::Publish {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                reason: e.to_string(),
            })
    }

    async fn subscribe(&self, exchange: &str, routing_key: &str) -> Result<Subscription, BusError> {
        let mut subscriber = self
            .client
            .subscribe(subject(exchange, routing_key))
            .await
            .map_err(|e| BusError::Subscribe {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(DEFAULT_BINDING_CAPACITY);
        let exchange = exchange.to_string();
        let routing_key = routing_key.to_string();
        tokio::spawn(async move {
            while let Some(message) = subscriber.next().await {
                let delivery = Delivery {
                    exchange: exchange.clone(),
                    routing_key: routing_key.clone(),
                    body: message.payload,
                };
                if tx.send(delivery).await.is_err() {
                    break;
                }
            }
            if let Err(e) = subscriber.unsubscribe().await {
                warn!(%exchange, %routing_key, error = %e, "failed to unsubscribe");
            }
        });

        Ok(Subscription::new(rx))
    }
}
