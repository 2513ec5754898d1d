//! Sending side of request/response over the bus.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use kennel_core::{Action, CorrelationId, RequestEnvelope, ResponseEnvelope};
use serde::Serialize;
use tracing::{debug, warn};

use super::registry::{CorrelationRegistry, ReplyHandle};
use crate::bus::MessageBus;
use crate::config::ChannelConfig;
use crate::error::RemoteError;

/// Publishes requests for one domain and hands back a handle to the reply.
///
/// `P` is the domain's request payload, `R` its reply result. The dispatcher
/// shares its registry with the domain's [`ResponseRouter`](super::ResponseRouter).
pub struct CommandDispatcher<P, R> {
    bus: Arc<dyn MessageBus>,
    registry: Arc<CorrelationRegistry<ResponseEnvelope<R>>>,
    exchange: String,
    routing_key: String,
    timeout: Duration,
    _payload: PhantomData<fn(P)>,
}

impl<P, R> CommandDispatcher<P, R>
where
    P: Serialize + Send + Sync,
    R: Send + 'static,
{
    #[must_use]
    pub fn new(
        bus: Arc<dyn MessageBus>,
        registry: Arc<CorrelationRegistry<ResponseEnvelope<R>>>,
        channel: &ChannelConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            bus,
            registry,
            exchange: channel.exchange.clone(),
            routing_key: channel.request_routing_key.clone(),
            timeout,
            _payload: PhantomData,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registers a fresh correlation id and publishes the request.
    ///
    /// The slot is registered before publishing so a fast reply always finds
    /// it. Awaiting the returned handle yields the reply or a timeout.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Transport` if the bus rejects the publish; the
    /// slot is released first, so no timeout follows. Returns
    /// `RemoteError::Timeout` if the publish is still pending at the request
    /// deadline. Returns
    /// `RemoteError::Internal` if the envelope cannot be encoded.
    pub async fn send(
        &self,
        action: Action,
        payload: P,
    ) -> Result<ReplyHandle<ResponseEnvelope<R>>, RemoteError> {
        let correlation_id = CorrelationId::random();
        let handle = self.registry.register(correlation_id.clone(), self.timeout)?;
        let domain = self.registry.domain();

        let envelope = RequestEnvelope::new(correlation_id.clone(), action, payload);
        let body = match kennel_core::encode(&envelope) {
            Ok(body) => body,
            Err(e) => {
                self.registry.release(&correlation_id);
                return Err(RemoteError::internal(e.to_string()));
            }
        };

        let publish = self
            .bus
            .publish(&self.exchange, &self.routing_key, Bytes::from(body));
        match tokio::time::timeout_at(handle.deadline(), publish).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.registry.release(&correlation_id);
                warn!(domain, %correlation_id, %action, error = %e, "failed to publish request");
                return Err(RemoteError::Transport {
                    message: e.to_string(),
                });
            }
            Err(_elapsed) => {
                // The deadline covers the publish too; a stalled bus must not
                // outlive the request.
                self.registry.cancel(&correlation_id, self.timeout);
                warn!(domain, %correlation_id, %action, "publish stalled past the request deadline");
                return Err(RemoteError::Timeout {
                    timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }

        metrics::counter!(
            "kennel_requests_sent_total",
            "domain" => domain,
            "action" => action.as_str()
        )
        .increment(1);
        debug!(domain, %correlation_id, %action, "request published");
        Ok(handle)
    }

    /// Sends a request and waits for its reply.
    ///
    /// # Errors
    ///
    /// Any error from [`send`](Self::send), plus the reply's own failure or
    /// `RemoteError::Timeout`.
    pub async fn call(&self, action: Action, payload: P) -> Result<ResponseEnvelope<R>, RemoteError> {
        self.send(action, payload).await?.await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
