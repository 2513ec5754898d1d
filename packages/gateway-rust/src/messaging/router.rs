//! Receiving side of request/response: routes replies to their waiters.

use std::sync::Arc;

use async_trait::async_trait;
use kennel_core::messages::EnvelopeHeader;
use kennel_core::{CorrelationId, ResponseEnvelope};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::registry::CorrelationRegistry;
use crate::bus::Delivery;
use crate::error::RemoteError;
use crate::listener::MessageHandler;

/// Matches replies from one domain's response channel to pending requests.
///
/// Never fails: bodies without a readable correlation id are logged and
/// dropped, and replies whose correlation id is unknown (late, duplicate, or
/// foreign) are discarded.
pub struct ResponseRouter<R> {
    registry: Arc<CorrelationRegistry<ResponseEnvelope<R>>>,
}

impl<R> ResponseRouter<R> {
    #[must_use]
    pub fn new(registry: Arc<CorrelationRegistry<ResponseEnvelope<R>>>) -> Self {
        Self { registry }
    }

    /// Settles the pending request matching `envelope`.
    ///
    /// A `success = false` reply settles the waiter with the classified
    /// [`RemoteError`]. Returns `false` if nothing was waiting.
    pub fn on_message(&self, envelope: ResponseEnvelope<R>) -> bool {
        let id = envelope.correlation_id.clone();
        let outcome = if envelope.success {
            Ok(envelope)
        } else {
            Err(RemoteError::from_reply(envelope.error_kind, envelope.error_message))
        };
        self.settle(&id, outcome)
    }

    fn settle(&self, id: &CorrelationId, outcome: Result<ResponseEnvelope<R>, RemoteError>) -> bool {
        let domain = self.registry.domain();
        let resolved = self.registry.resolve(id, outcome);
        if resolved {
            metrics::counter!("kennel_replies_total", "domain" => domain).increment(1);
        } else {
            debug!(domain, correlation_id = %id, "no pending request for reply, dropped");
            metrics::counter!("kennel_replies_dropped_total", "domain" => domain).increment(1);
        }
        resolved
    }
}

impl<R: DeserializeOwned> ResponseRouter<R> {
    /// Decodes a raw reply body and routes it.
    ///
    /// A reply whose correlation id is readable but whose body is not settles
    /// its waiter with `RemoteError::Internal` instead of leaving it to time
    /// out. Bodies without a readable id are dropped.
    pub fn on_bytes(&self, body: &[u8]) -> bool {
        let decode_err = match kennel_core::decode::<ResponseEnvelope<R>>(body) {
            Ok(envelope) => return self.on_message(envelope),
            Err(e) => e,
        };
        let domain = self.registry.domain();
        let Ok(header) = kennel_core::decode::<EnvelopeHeader>(body) else {
            warn!(domain, error = %decode_err, "malformed reply dropped");
            return false;
        };
        warn!(
            domain,
            correlation_id = %header.correlation_id,
            error = %decode_err,
            "undecodable reply settled as internal error"
        );
        self.settle(
            &header.correlation_id,
            Err(RemoteError::internal(format!("malformed reply: {decode_err}"))),
        )
    }
}

#[async_trait]
impl<R> MessageHandler for ResponseRouter<R>
where
    R: DeserializeOwned + Send + Sync + 'static,
{
    async fn handle(&self, delivery: Delivery) {
        self.on_bytes(&delivery.body);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
