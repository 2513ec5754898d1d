//! Reference owner and pet services answering on the bus.
//!
//! A [`Responder`] consumes one domain's request channel, hands each request
//! to a [`RequestProcessor`], and publishes exactly one reply per decodable
//! request on the domain's response channel. Requests that cannot be decoded
//! in full still get a failure reply as long as their correlation id can be
//! read.

pub mod owner;
pub mod pet;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use kennel_core::messages::EnvelopeHeader;
use kennel_core::{Action, ErrorKind, RequestEnvelope, ResponseEnvelope};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub use owner::OwnerBackend;
pub use pet::PetBackend;
pub use store::EntityStore;

use crate::bus::{BusError, Delivery, MessageBus};
use crate::config::ChannelConfig;
use crate::listener::{BusListener, MessageHandler};

/// A request the processor refused, with the kind reported to the sender.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    pub kind: ErrorKind,
    pub message: String,
}

impl Rejection {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unknown_action(action: Action) -> Self {
        Self {
            kind: ErrorKind::UnknownAction,
            message: format!("Unknown action: {action}"),
        }
    }
}

/// Domain logic behind a responder.
pub trait RequestProcessor: Send + Sync + 'static {
    type Payload: DeserializeOwned + Send;
    type Output: Serialize + Default + Send + Sync;

    /// Label for logs.
    fn domain(&self) -> &'static str;

    /// Executes one request.
    ///
    /// # Errors
    ///
    /// A [`Rejection`] describing why the request could not be served.
    fn process(&self, action: Action, payload: Self::Payload) -> Result<Self::Output, Rejection>;
}

/// Bus-facing adapter around a [`RequestProcessor`].
pub struct Responder<P> {
    processor: Arc<P>,
    bus: Arc<dyn MessageBus>,
    exchange: String,
    routing_key: String,
}

impl<P: RequestProcessor> Responder<P> {
    #[must_use]
    pub fn new(processor: Arc<P>, bus: Arc<dyn MessageBus>, channel: &ChannelConfig) -> Self {
        Self {
            processor,
            bus,
            exchange: channel.exchange.clone(),
            routing_key: channel.response_routing_key.clone(),
        }
    }

    /// Answers a decoded request. Always produces a reply echoing its id.
    pub fn answer(&self, request: RequestEnvelope<P::Payload>) -> ResponseEnvelope<P::Output> {
        let RequestEnvelope {
            correlation_id,
            action,
            payload,
        } = request;
        match self.processor.process(action, payload) {
            Ok(result) => ResponseEnvelope::success(correlation_id, action, result),
            Err(rejection) => {
                debug!(
                    domain = self.processor.domain(),
                    %correlation_id,
                    %action,
                    kind = rejection.kind.as_str(),
                    message = %rejection.message,
                    "request rejected"
                );
                ResponseEnvelope::failure(
                    correlation_id,
                    Some(action),
                    rejection.kind,
                    rejection.message,
                )
            }
        }
    }

    /// Builds the reply for a raw request body.
    ///
    /// `None` only when not even the correlation id can be read, since such
    /// a request cannot be answered.
    pub fn reply_to(&self, body: &[u8]) -> Option<ResponseEnvelope<P::Output>> {
        let decode_err = match kennel_core::decode::<RequestEnvelope<P::Payload>>(body) {
            Ok(request) => return Some(self.answer(request)),
            Err(e) => e,
        };

        let Ok(header) = kennel_core::decode::<EnvelopeHeader>(body) else {
            warn!(domain = self.processor.domain(), error = %decode_err, "unreadable request dropped");
            return None;
        };

        let action = header.known_action();
        let (kind, message) = match action {
            None => (
                ErrorKind::UnknownAction,
                format!("Unknown action: {}", header.action_text()),
            ),
            Some(_) => (ErrorKind::Validation, format!("Malformed request: {decode_err}")),
        };
        Some(ResponseEnvelope::failure(header.correlation_id, action, kind, message))
    }

    async fn publish(&self, reply: &ResponseEnvelope<P::Output>) -> Result<(), BusError> {
        let body = kennel_core::encode(reply).map_err(|e| BusError::Publish {
            exchange: self.exchange.clone(),
            routing_key: self.routing_key.clone(),
            reason: e.to_string(),
        })?;
        self.bus
            .publish(&self.exchange, &self.routing_key, Bytes::from(body))
            .await
    }
}

#[async_trait]
impl<P: RequestProcessor> MessageHandler for Responder<P> {
    async fn handle(&self, delivery: Delivery) {
        let Some(reply) = self.reply_to(&delivery.body) else {
            return;
        };
        if let Err(e) = self.publish(&reply).await {
            warn!(
                domain = self.processor.domain(),
                correlation_id = %reply.correlation_id,
                error = %e,
                "failed to publish reply"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Embedded services
// ---------------------------------------------------------------------------

/// Owner and pet responders running on one bus.
pub struct EmbeddedServices {
    pub owners: Arc<OwnerBackend>,
    pub pets: Arc<PetBackend>,
    listeners: Vec<BusListener>,
}

impl EmbeddedServices {
    /// Binds both request channels and starts answering.
    ///
    /// # Errors
    ///
    /// Returns the bus error if either request binding fails.
    pub async fn start(
        bus: Arc<dyn MessageBus>,
        owner: &ChannelConfig,
        pet: &ChannelConfig,
    ) -> Result<Self, BusError> {
        let owners = Arc::new(OwnerBackend::new());
        let pets = Arc::new(PetBackend::new());
        let listeners = vec![
            serve(Arc::clone(&owners), &bus, owner).await?,
            serve(Arc::clone(&pets), &bus, pet).await?,
        ];
        Ok(Self {
            owners,
            pets,
            listeners,
        })
    }

    pub async fn stop(&mut self) {
        for listener in &mut self.listeners {
            listener.stop().await;
        }
    }
}

/// Subscribes `processor` to the request side of `channel`.
///
/// # Errors
///
/// Returns the bus error if the request binding fails.
pub async fn serve<P: RequestProcessor>(
    processor: Arc<P>,
    bus: &Arc<dyn MessageBus>,
    channel: &ChannelConfig,
) -> Result<BusListener, BusError> {
    let subscription = bus
        .subscribe(&channel.exchange, &channel.request_routing_key)
        .await?;
    let name = format!("{}-responder", processor.domain());
    let responder = Arc::new(Responder::new(processor, Arc::clone(bus), channel));
    Ok(BusListener::spawn(name, subscription, responder))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
