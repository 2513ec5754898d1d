//! Background consumer loop for a bus subscription.
//!
//! A `BusListener` owns one [`Subscription`] and feeds each delivery to a
//! [`MessageHandler`] on a spawned tokio task until it is stopped or the
//! subscription ends.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::bus::{Delivery, Subscription};

// ---------------------------------------------------------------------------
// MessageHandler trait
// ---------------------------------------------------------------------------

/// Consumer of deliveries taken off one subscription.
///
/// Handlers never fail: anything that cannot be processed is logged and
/// dropped, so one bad message cannot stall the listener.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Processes a single delivery.
    async fn handle(&self, delivery: Delivery);

    /// Called once after the loop exits. Default is a no-op.
    async fn shutdown(&self) {}
}

// ---------------------------------------------------------------------------
// BusListener
// ---------------------------------------------------------------------------

/// Handle to a running consumer loop.
///
/// Deliveries are handled one at a time in arrival order.
pub struct BusListener {
    name: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BusListener {
    /// Spawns the consumer loop.
    pub fn spawn<H: MessageHandler + ?Sized>(
        name: impl Into<String>,
        mut subscription: Subscription,
        handler: Arc<H>,
    ) -> Self {
        let name = name.into();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task_name = name.clone();

        let handle = tokio::spawn(async move {
            debug!(listener = %task_name, "listener started");
            loop {
                tokio::select! {
                    delivery = subscription.recv() => {
                        match delivery {
                            Some(d) => handler.handle(d).await,
                            None => {
                                info!(listener = %task_name, "subscription closed");
                                break;
                            }
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
            handler.shutdown().await;
            debug!(listener = %task_name, "listener stopped");
        });

        Self {
            name,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` while the consumer task has not exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signals the loop to exit and waits for it.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for BusListener {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::bus::{InMemoryBus, MessageBus};

    struct Counting {
        seen: AtomicU32,
        shutdown_called: AtomicU32,
    }

    #[async_trait]
    impl MessageHandler for Counting {
        async fn handle(&self, _delivery: Delivery) {
            self.seen.fetch_add(1, Ordering::SeqCst);
        }

        async fn shutdown(&self) {
            self.shutdown_called.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn handles_deliveries_and_stops() {
        let bus = InMemoryBus::new();
        let handler = Arc::new(Counting {
            seen: AtomicU32::new(0),
            shutdown_called: AtomicU32::new(0),
        });
        let sub = bus.subscribe("x", "k").await.unwrap();
        let mut listener = BusListener::spawn("test", sub, Arc::clone(&handler));

        for _ in 0..3 {
            bus.publish("x", "k", Bytes::from_static(b"m")).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(handler.seen.load(Ordering::SeqCst), 3);
        assert!(listener.is_running());

        listener.stop().await;
        assert!(!listener.is_running());
        assert_eq!(handler.shutdown_called.load(Ordering::SeqCst), 1);
        assert_eq!(listener.name(), "test");
    }
}
