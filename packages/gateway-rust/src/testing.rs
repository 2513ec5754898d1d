//! Shared fixtures for unit tests: scripted services on an in-memory bus.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use kennel_core::messages::{OwnerPayload, OwnerResult, PetPayload, PetResult};
use kennel_core::{RequestEnvelope, ResponseEnvelope};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::bus::{InMemoryBus, MessageBus};
use crate::config::ChannelConfig;
use crate::facade::{OwnerClient, PetClient};
use crate::gateway::link;
use crate::listener::BusListener;
use crate::messaging::CorrelationRegistry;

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Answers requests on `channel` with `script`; `None` means stay silent.
///
/// The request binding exists once this returns.
pub(crate) async fn spawn_scripted<P, R, F>(
    bus: &Arc<InMemoryBus>,
    channel: &ChannelConfig,
    script: F,
) -> JoinHandle<()>
where
    P: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    F: Fn(RequestEnvelope<P>) -> Option<ResponseEnvelope<R>> + Send + 'static,
{
    let mut requests = bus
        .subscribe(&channel.exchange, &channel.request_routing_key)
        .await
        .unwrap();
    let bus = Arc::clone(bus);
    let channel = channel.clone();
    tokio::spawn(async move {
        while let Some(delivery) = requests.recv().await {
            let request: RequestEnvelope<P> = kennel_core::decode(&delivery.body).unwrap();
            if let Some(reply) = script(request) {
                let body = kennel_core::encode(&reply).unwrap();
                bus.publish(&channel.exchange, &channel.response_routing_key, body.into())
                    .await
                    .unwrap();
            }
        }
    })
}

pub(crate) struct Linked<C, R> {
    pub client: C,
    pub registry: Arc<CorrelationRegistry<ResponseEnvelope<R>>>,
    pub listener: BusListener,
}

pub(crate) async fn owner_client(
    bus: &Arc<InMemoryBus>,
    timeout: Duration,
) -> Linked<OwnerClient, OwnerResult> {
    let bus_dyn: Arc<dyn MessageBus> = Arc::clone(bus) as Arc<dyn MessageBus>;
    let (dispatcher, registry, listener) =
        link::<OwnerPayload, OwnerResult>(&bus_dyn, "owner", &ChannelConfig::for_domain("owner"), timeout)
            .await
            .unwrap();
    Linked {
        client: OwnerClient::new(dispatcher),
        registry,
        listener,
    }
}

pub(crate) async fn pet_client(
    bus: &Arc<InMemoryBus>,
    timeout: Duration,
) -> Linked<PetClient, PetResult> {
    let bus_dyn: Arc<dyn MessageBus> = Arc::clone(bus) as Arc<dyn MessageBus>;
    let (dispatcher, registry, listener) =
        link::<PetPayload, PetResult>(&bus_dyn, "pet", &ChannelConfig::for_domain("pet"), timeout)
            .await
            .unwrap();
    Linked {
        client: PetClient::new(dispatcher),
        registry,
        listener,
    }
}
