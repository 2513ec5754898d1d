//! Correlated request/response over the bus.
//!
//! A [`CommandDispatcher`] registers a correlation id in a shared
//! [`CorrelationRegistry`] and publishes the request; the matching
//! [`ResponseRouter`] settles the registry slot when the reply arrives.

pub mod dispatcher;
pub mod registry;
pub mod router;

pub use dispatcher::CommandDispatcher;
pub use registry::{CorrelationRegistry, RegistryError, ReplyHandle};
pub use router::ResponseRouter;
