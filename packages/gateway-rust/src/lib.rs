//! `Kennel` Gateway — correlated request/response over a message bus, owner/pet
//! aggregation, and the REST surface in front of it.

pub mod aggregation;
pub mod bus;
pub mod config;
pub mod error;
pub mod facade;
pub mod gateway;
pub mod http;
pub mod listener;
pub mod messaging;
pub mod responder;

#[cfg(test)]
mod testing;

pub use aggregation::GatewayService;
pub use bus::{BusError, Delivery, InMemoryBus, MessageBus, Subscription};
pub use config::{ChannelConfig, GatewayConfig};
pub use error::RemoteError;
pub use facade::{OwnerApi, OwnerClient, PetApi, PetClient};
pub use gateway::{Gateway, GatewayBuilder};
pub use http::{HttpConfig, HttpModule};
pub use responder::EmbeddedServices;
