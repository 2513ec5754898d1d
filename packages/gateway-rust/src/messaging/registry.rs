//! Pending-request registry keyed by correlation id.
//!
//! Every outbound request owns one slot until it is settled by the first of
//! (a) a matching reply, (b) its deadline expiring, or (c) an explicit
//! release. Later settlement attempts find no slot and are no-ops, so each
//! request completes exactly once.

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kennel_core::CorrelationId;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

use crate::error::RemoteError;

type Slot<T> = oneshot::Sender<Result<T, RemoteError>>;

/// Failure to register a pending request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("correlation id {0} is already pending")]
    Collision(CorrelationId),
}

impl From<RegistryError> for RemoteError {
    fn from(err: RegistryError) -> Self {
        RemoteError::internal(err.to_string())
    }
}

/// Concurrent map from correlation id to the waiter for that id.
///
/// One registry per domain; the `domain` label tags logs and metrics.
#[derive(Debug)]
pub struct CorrelationRegistry<T> {
    pending: DashMap<CorrelationId, Slot<T>>,
    domain: &'static str,
}

impl<T> CorrelationRegistry<T> {
    #[must_use]
    pub fn new(domain: &'static str) -> Self {
        Self {
            pending: DashMap::new(),
            domain,
        }
    }

    #[must_use]
    pub fn domain(&self) -> &'static str {
        self.domain
    }

    /// Creates the slot for `id` and returns a handle that resolves when the
    /// slot is settled or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::Collision` if `id` is already pending.
    pub fn register(
        self: &Arc<Self>,
        id: CorrelationId,
        timeout: Duration,
    ) -> Result<ReplyHandle<T>, RegistryError> {
        let rx = match self.pending.entry(id.clone()) {
            Entry::Occupied(_) => return Err(RegistryError::Collision(id)),
            Entry::Vacant(vacant) => {
                let (tx, rx) = oneshot::channel();
                vacant.insert(tx);
                rx
            }
        };
        Ok(ReplyHandle {
            id,
            rx,
            started: Instant::now(),
            timeout,
            registry: Arc::clone(self),
        })
    }

    /// Settles the slot for `id` with `outcome`.
    ///
    /// Returns `false` if no slot exists (never registered, already settled,
    /// timed out, or released).
    pub fn resolve(&self, id: &CorrelationId, outcome: Result<T, RemoteError>) -> bool {
        match self.pending.remove(id) {
            Some((_, tx)) => {
                // The waiter may already be gone; the slot is settled either way.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Settles the slot for `id` with `RemoteError::Timeout`.
    pub fn cancel(&self, id: &CorrelationId, timeout: Duration) -> bool {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let cancelled = self.resolve(id, Err(RemoteError::Timeout { timeout_ms }));
        if cancelled {
            debug!(domain = self.domain, correlation_id = %id, timeout_ms, "request timed out");
            metrics::counter!("kennel_request_timeouts_total", "domain" => self.domain)
                .increment(1);
        }
        cancelled
    }

    /// Removes the slot for `id` without completing it.
    pub fn release(&self, id: &CorrelationId) -> bool {
        self.pending.remove(id).is_some()
    }

    #[must_use]
    pub fn contains(&self, id: &CorrelationId) -> bool {
        self.pending.contains_key(id)
    }

    /// Number of requests still awaiting settlement.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// ReplyHandle
// ---------------------------------------------------------------------------

/// Awaitable outcome of one registered request.
///
/// Awaiting yields the reply, or `RemoteError::Timeout` once the deadline has
/// passed. Dropping an unawaited handle releases its slot.
#[derive(Debug)]
pub struct ReplyHandle<T> {
    id: CorrelationId,
    rx: oneshot::Receiver<Result<T, RemoteError>>,
    started: Instant,
    timeout: Duration,
    registry: Arc<CorrelationRegistry<T>>,
}

impl<T> ReplyHandle<T> {
    #[must_use]
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.id
    }

    /// Instant after which the request counts as timed out.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.started + self.timeout
    }

    /// Waits for the slot to be settled.
    ///
    /// # Errors
    ///
    /// Returns the remote failure carried by the reply, or
    /// `RemoteError::Timeout` if no reply arrived before the deadline.
    pub async fn wait(mut self) -> Result<T, RemoteError> {
        let deadline = self.deadline();
        let outcome = match tokio::time::timeout_at(deadline, &mut self.rx).await {
            Ok(settled) => settled,
            Err(_elapsed) => {
                // A reply may race the deadline: whichever reaches the slot
                // first is the one the receiver sees.
                self.registry.cancel(&self.id, self.timeout);
                (&mut self.rx).await
            }
        };
        let outcome = outcome.unwrap_or_else(|_| {
            Err(RemoteError::internal(format!(
                "request {} was released before completion",
                self.id
            )))
        });
        metrics::histogram!(
            "kennel_request_duration_seconds",
            "domain" => self.registry.domain
        )
        .record(self.started.elapsed().as_secs_f64());
        outcome
    }
}

impl<T: Send + 'static> IntoFuture for ReplyHandle<T> {
    type Output = Result<T, RemoteError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}

impl<T> Drop for ReplyHandle<T> {
    fn drop(&mut self) {
        // No-op once settled; otherwise frees the slot of an abandoned request.
        self.registry.release(&self.id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
