//! Kennel gateway server.
//!
//! Binds the REST surface, wires the messaging core to a bus, and by default
//! runs the reference owner/pet responders on the same in-memory bus.
//!
//! ```bash
//! kennel-gateway --port 8080 --metrics-port 9000
//! RUST_LOG=debug kennel-gateway --log-format json
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use kennel_gateway::{
    ChannelConfig, EmbeddedServices, Gateway, GatewayConfig, HttpConfig, HttpModule, InMemoryBus,
    MessageBus,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "kennel-gateway", version, about = "Owner/pet API gateway over a message bus")]
struct Args {
    #[arg(long, env = "KENNEL_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "KENNEL_PORT", default_value_t = 8080)]
    port: u16,

    /// Seconds to wait for a bus reply before failing with a timeout.
    #[arg(long, env = "KENNEL_REQUEST_TIMEOUT_SECS", default_value_t = 60)]
    request_timeout_secs: u64,

    /// Upper bound on one HTTP request; keep it above the bus timeout.
    #[arg(long, env = "KENNEL_HTTP_TIMEOUT_SECS", default_value_t = 75)]
    http_timeout_secs: u64,

    /// Page size used to fetch the "all" side of a join.
    #[arg(long, env = "KENNEL_JOIN_PAGE_SIZE", default_value_t = 1000)]
    join_page_size: u32,

    #[arg(long, env = "KENNEL_OWNER_EXCHANGE", default_value = "owner-exchange")]
    owner_exchange: String,

    #[arg(long, env = "KENNEL_OWNER_REQUEST_KEY", default_value = "owner.request")]
    owner_request_key: String,

    #[arg(long, env = "KENNEL_OWNER_RESPONSE_KEY", default_value = "owner.response")]
    owner_response_key: String,

    #[arg(long, env = "KENNEL_PET_EXCHANGE", default_value = "pet-exchange")]
    pet_exchange: String,

    #[arg(long, env = "KENNEL_PET_REQUEST_KEY", default_value = "pet.request")]
    pet_request_key: String,

    #[arg(long, env = "KENNEL_PET_RESPONSE_KEY", default_value = "pet.response")]
    pet_response_key: String,

    /// Run the reference owner/pet responders on the gateway's bus.
    #[arg(
        long,
        env = "KENNEL_EMBEDDED_SERVICES",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    embedded_services: bool,

    /// Connect to NATS instead of the in-memory bus.
    #[cfg(feature = "nats")]
    #[arg(long, env = "KENNEL_NATS_URL")]
    nats_url: Option<String>,

    #[arg(long, env = "KENNEL_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Expose Prometheus metrics on this port.
    #[arg(long, env = "KENNEL_METRICS_PORT")]
    metrics_port: Option<u16>,
}

impl Args {
    fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            join_page_size: self.join_page_size,
            owner: channel(
                "owner",
                &self.owner_exchange,
                &self.owner_request_key,
                &self.owner_response_key,
            ),
            pet: channel(
                "pet",
                &self.pet_exchange,
                &self.pet_request_key,
                &self.pet_response_key,
            ),
        }
    }

    fn http_config(&self) -> HttpConfig {
        HttpConfig {
            host: self.host.clone(),
            port: self.port,
            request_timeout: Duration::from_secs(self.http_timeout_secs),
            ..HttpConfig::default()
        }
    }

    #[cfg(feature = "nats")]
    async fn connect_bus(&self) -> anyhow::Result<Arc<dyn MessageBus>> {
        if let Some(url) = &self.nats_url {
            let bus = kennel_gateway::bus::NatsBus::connect(url)
                .await
                .with_context(|| format!("connecting to NATS at {url}"))?;
            info!(url = %url, "using NATS bus");
            return Ok(Arc::new(bus));
        }
        Ok(Arc::new(InMemoryBus::new()))
    }

    #[cfg(not(feature = "nats"))]
    async fn connect_bus(&self) -> anyhow::Result<Arc<dyn MessageBus>> {
        Ok(Arc::new(InMemoryBus::new()))
    }
}

fn channel(domain: &str, exchange: &str, request_key: &str, response_key: &str) -> ChannelConfig {
    ChannelConfig {
        exchange: exchange.to_string(),
        request_routing_key: request_key.to_string(),
        response_routing_key: response_key.to_string(),
        ..ChannelConfig::for_domain(domain)
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,kennel_gateway=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    if let Some(port) = args.metrics_port {
        PrometheusBuilder::new()
            .with_http_listener(SocketAddr::from(([0, 0, 0, 0], port)))
            .install()
            .context("installing Prometheus exporter")?;
        info!(port, "Prometheus metrics available at /metrics");
    }

    let config = args.gateway_config();
    let bus = args.connect_bus().await?;

    let mut services = if args.embedded_services {
        let services = EmbeddedServices::start(Arc::clone(&bus), &config.owner, &config.pet)
            .await
            .context("starting embedded services")?;
        info!("embedded owner/pet services running");
        Some(services)
    } else {
        warn!("embedded services disabled; requests need external responders on the bus");
        None
    };

    let mut gateway = Gateway::builder(Arc::clone(&bus))
        .config(config)
        .start()
        .await
        .context("starting gateway")?;

    let mut http = HttpModule::new(args.http_config(), gateway.service());
    let port = http.start().await?;
    info!(port, "kennel gateway listening");
    http.serve(shutdown_signal()).await?;

    gateway.shutdown().await;
    if let Some(services) = services.as_mut() {
        services.stop().await;
    }
    info!("kennel gateway stopped");
    Ok(())
}
