//! Explicit wiring of the messaging core.
//!
//! For each domain the builder creates one correlation registry, shares it
//! between the domain's dispatcher and response router, and binds the router
//! to the response channel before any request can be sent.

use std::sync::Arc;
use std::time::Duration;

use kennel_core::messages::{OwnerPayload, OwnerResult, PetPayload, PetResult};
use kennel_core::ResponseEnvelope;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::aggregation::GatewayService;
use crate::bus::{BusError, MessageBus};
use crate::config::{ChannelConfig, GatewayConfig};
use crate::facade::{OwnerClient, PetClient};
use crate::listener::BusListener;
use crate::messaging::{CommandDispatcher, CorrelationRegistry, ResponseRouter};

type Registry<R> = Arc<CorrelationRegistry<ResponseEnvelope<R>>>;

/// Running messaging core: both facades, their reply listeners, and the
/// aggregation service on top.
pub struct Gateway {
    service: Arc<GatewayService>,
    owner_registry: Registry<OwnerResult>,
    pet_registry: Registry<PetResult>,
    listeners: Vec<BusListener>,
}

impl Gateway {
    #[must_use]
    pub fn builder(bus: Arc<dyn MessageBus>) -> GatewayBuilder {
        GatewayBuilder {
            bus,
            config: GatewayConfig::default(),
        }
    }

    #[must_use]
    pub fn service(&self) -> Arc<GatewayService> {
        Arc::clone(&self.service)
    }

    /// Requests still waiting for a reply, across both domains.
    #[must_use]
    pub fn pending_requests(&self) -> usize {
        self.owner_registry.len() + self.pet_registry.len()
    }

    /// Stops the reply listeners. Requests still pending will time out.
    pub async fn shutdown(&mut self) {
        for listener in &mut self.listeners {
            listener.stop().await;
        }
        info!(pending = self.pending_requests(), "gateway stopped");
    }
}

/// Builder for [`Gateway`].
pub struct GatewayBuilder {
    bus: Arc<dyn MessageBus>,
    config: GatewayConfig,
}

impl GatewayBuilder {
    #[must_use]
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Binds both response channels and assembles the service.
    ///
    /// # Errors
    ///
    /// Returns the bus error if a response binding fails.
    pub async fn start(self) -> Result<Gateway, BusError> {
        let Self { bus, config } = self;

        let (owner_dispatcher, owner_registry, owner_listener) =
            link::<OwnerPayload, OwnerResult>(&bus, "owner", &config.owner, config.request_timeout)
                .await?;
        let (pet_dispatcher, pet_registry, pet_listener) =
            link::<PetPayload, PetResult>(&bus, "pet", &config.pet, config.request_timeout).await?;

        let service = Arc::new(GatewayService::new(
            Arc::new(OwnerClient::new(owner_dispatcher)),
            Arc::new(PetClient::new(pet_dispatcher)),
            config.join_page_size,
        ));
        info!(
            timeout_ms = u64::try_from(config.request_timeout.as_millis()).unwrap_or(u64::MAX),
            join_page_size = config.join_page_size,
            "gateway started"
        );

        Ok(Gateway {
            service,
            owner_registry,
            pet_registry,
            listeners: vec![owner_listener, pet_listener],
        })
    }
}

/// Wires one domain: registry, response listener, and dispatcher.
pub(crate) async fn link<P, R>(
    bus: &Arc<dyn MessageBus>,
    domain: &'static str,
    channel: &ChannelConfig,
    timeout: Duration,
) -> Result<(CommandDispatcher<P, R>, Registry<R>, BusListener), BusError>
where
    P: Serialize + Send + Sync,
    R: DeserializeOwned + Send + Sync + 'static,
{
    let registry: Registry<R> = Arc::new(CorrelationRegistry::new(domain));
    let replies = bus
        .subscribe(&channel.exchange, &channel.response_routing_key)
        .await?;
    let router = Arc::new(ResponseRouter::new(Arc::clone(&registry)));
    let listener = BusListener::spawn(format!("{domain}-replies"), replies, router);
    let dispatcher = CommandDispatcher::new(Arc::clone(bus), Arc::clone(&registry), channel, timeout);
    Ok((dispatcher, registry, listener))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use kennel_core::messages::{OwnerRequest, PetRequest};
    use kennel_core::{Owner, Page, PageRequest, Pet};

    use super::*;
    use crate::bus::InMemoryBus;
    use crate::error::RemoteError;
    use crate::facade::{OwnerApi, PetApi};
    use crate::responder::EmbeddedServices;
    use crate::testing::{date, pet_client, spawn_scripted};

    #[tokio::test]
    async fn end_to_end_with_embedded_services() {
        let bus = Arc::new(InMemoryBus::new());
        let bus_dyn: Arc<dyn MessageBus> = bus.clone();
        let config = GatewayConfig::default();
        let mut services = EmbeddedServices::start(Arc::clone(&bus_dyn), &config.owner, &config.pet)
            .await
            .unwrap();
        let mut gateway = Gateway::builder(bus_dyn).config(config).start().await.unwrap();
        let service = gateway.service();

        let mut input = Owner::new("Ann", date(1980, 1, 1));
        input.pets = vec![Pet::new("Rex", date(2020, 1, 1)), Pet::new("Tom", date(2021, 1, 1))];
        let created = service.create_owner_with_pets(input).await.unwrap();
        let owner_id = created.owner.id.unwrap();

        let view = service.owner_with_pets(owner_id).await.unwrap();
        assert_eq!(view.pets.len(), 2);

        service.delete_owner(owner_id).await.unwrap();
        assert!(services.owners.store().is_empty());
        assert!(services.pets.store().is_empty());
        assert_eq!(gateway.pending_requests(), 0);

        gateway.shutdown().await;
        services.stop().await;
    }

    #[tokio::test]
    async fn missing_pet_surfaces_not_found_through_bus() {
        let bus = Arc::new(InMemoryBus::new());
        let bus_dyn: Arc<dyn MessageBus> = bus.clone();
        let config = GatewayConfig::default();
        let _services = EmbeddedServices::start(Arc::clone(&bus_dyn), &config.owner, &config.pet)
            .await
            .unwrap();
        let linked = pet_client(&bus, Duration::from_secs(5)).await;

        let err = linked.client.get_by_id(42).await.unwrap_err();
        assert_eq!(err, RemoteError::not_found("Pet with id 42 not found"));
    }

    #[tokio::test]
    async fn concurrent_replies_in_reverse_order_reach_their_callers() {
        let bus = Arc::new(InMemoryBus::new());
        let channel = ChannelConfig::for_domain("pet");

        // Hold the first request's reply until the second has been answered.
        let held: Arc<parking_lot::Mutex<Option<ResponseEnvelope<PetResult>>>> = Arc::default();
        let script_held = Arc::clone(&held);
        let bus_for_script = Arc::clone(&bus);
        let channel_for_script = channel.clone();
        spawn_scripted(&bus, &channel, move |req: PetRequest| {
            let size = req.payload.paging.size.unwrap_or_default();
            let pets = vec![Pet::default().with_id(i64::from(size))];
            let reply = ResponseEnvelope::success(req.correlation_id, req.action, PetResult::page(pets, 1, 1));
            let mut slot = script_held.lock();
            match slot.take() {
                None => {
                    *slot = Some(reply);
                    None
                }
                Some(first) => {
                    // Answer the second request now, then release the first.
                    let bus = Arc::clone(&bus_for_script);
                    let channel = channel_for_script.clone();
                    tokio::spawn(async move {
                        tokio::task::yield_now().await;
                        let body = kennel_core::encode(&first).unwrap();
                        bus.publish(&channel.exchange, &channel.response_routing_key, body.into())
                            .await
                            .unwrap();
                    });
                    Some(reply)
                }
            }
        })
        .await;

        let linked = pet_client(&bus, Duration::from_secs(5)).await;
        let first = PageRequest::new(0, 11);
        let second = PageRequest::new(0, 22);
        let (a, b): (Result<Page<Pet>, RemoteError>, Result<Page<Pet>, RemoteError>) = tokio::join!(
            linked.client.get_all(&first),
            linked.client.get_all(&second),
        );
        assert_eq!(a.unwrap().items[0].id, Some(11));
        assert_eq!(b.unwrap().items[0].id, Some(22));
        assert!(linked.registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_request_times_out_and_clears_registry() {
        let bus = Arc::new(InMemoryBus::new());
        let bus_dyn: Arc<dyn MessageBus> = bus.clone();
        spawn_scripted(&bus, &ChannelConfig::for_domain("owner"), |_req: OwnerRequest| {
            None::<ResponseEnvelope<OwnerResult>>
        })
        .await;
        let gateway = Gateway::builder(bus_dyn)
            .request_timeout(Duration::from_millis(500))
            .start()
            .await
            .unwrap();

        let err = gateway.service().owner_with_pets(1).await.unwrap_err();
        assert_eq!(err, RemoteError::Timeout { timeout_ms: 500 });
        assert_eq!(gateway.pending_requests(), 0);
    }

    #[tokio::test]
    async fn bus_outage_is_transport_failure() {
        let bus = Arc::new(InMemoryBus::new());
        let bus_dyn: Arc<dyn MessageBus> = bus.clone();
        let gateway = Gateway::builder(bus_dyn).start().await.unwrap();
        bus.disconnect();

        let err = gateway.service().delete_pet(1).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport { .. }));
        assert!(err.is_retryable());
        assert_eq!(gateway.pending_requests(), 0);
    }

    #[tokio::test]
    async fn owner_facade_round_trip() {
        let bus = Arc::new(InMemoryBus::new());
        let bus_dyn: Arc<dyn MessageBus> = bus.clone();
        let config = GatewayConfig::default();
        let _services = EmbeddedServices::start(Arc::clone(&bus_dyn), &config.owner, &config.pet)
            .await
            .unwrap();
        let linked = crate::testing::owner_client(&bus, Duration::from_secs(5)).await;

        let created = linked.client.create(Owner::new("Ann", date(1990, 1, 1))).await.unwrap();
        let fetched = linked.client.get_by_id(created.id.unwrap()).await.unwrap();
        assert_eq!(fetched, created);
    }
}
