//! Gateway configuration: bus channel names, request timeout, join page size.

use std::time::Duration;

/// Default bounded wait for a reply before a request fails with `Timeout`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default page size used for the "fetch everything" side of in-memory joins.
pub const DEFAULT_JOIN_PAGE_SIZE: u32 = 1000;

/// Names binding one domain's request/response pair on the bus.
///
/// Requests are published to `exchange` with `request_routing_key`; replies
/// come back on the same exchange with `response_routing_key`. Queue names are
/// only consulted by brokers that bind queues explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    pub exchange: String,
    pub request_routing_key: String,
    pub response_routing_key: String,
    pub request_queue: String,
    pub response_queue: String,
}

impl ChannelConfig {
    /// Conventional names for a domain: `<domain>-exchange`, `<domain>.request`, ...
    #[must_use]
    pub fn for_domain(domain: &str) -> Self {
        Self {
            exchange: format!("{domain}-exchange"),
            request_routing_key: format!("{domain}.request"),
            response_routing_key: format!("{domain}.response"),
            request_queue: format!("{domain}-request-queue"),
            response_queue: format!("{domain}-response-queue"),
        }
    }
}

/// Top-level configuration for the gateway's messaging core.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bounded wait for each pending request.
    pub request_timeout: Duration,
    /// Page size for the secondary fetch of an in-memory join.
    pub join_page_size: u32,
    /// Owner request/response channel.
    pub owner: ChannelConfig,
    /// Pet request/response channel.
    pub pet: ChannelConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            join_page_size: DEFAULT_JOIN_PAGE_SIZE,
            owner: ChannelConfig::for_domain("owner"),
            pet: ChannelConfig::for_domain("pet"),
        }
    }
}
