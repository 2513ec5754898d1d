//! REST surface over [`GatewayService`].
//!
//! Deferred startup: `new()` allocates shared state, `start()` binds the TCP
//! listener, and `serve()` accepts requests until the shutdown future fires.

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod shutdown;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use config::HttpConfig;
pub use error::{ApiError, ErrorBody};
pub use shutdown::{HealthState, ShutdownController};

use crate::aggregation::GatewayService;
use handlers::{
    create_owner, create_pet, delete_owner, delete_pet, get_owner, get_pet, list_owners,
    list_pets, search_pets, update_owner, update_pet,
};
use health::{health_handler, liveness_handler, readiness_handler};
use middleware::{apply_http_layers, track_in_flight};

/// State handed to every handler through `State` extraction.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GatewayService>,
    pub shutdown: Arc<ShutdownController>,
    pub start_time: Instant,
}

/// Owns the HTTP listener and lifecycle of the REST surface.
pub struct HttpModule {
    config: HttpConfig,
    listener: Option<TcpListener>,
    service: Arc<GatewayService>,
    shutdown: Arc<ShutdownController>,
}

impl HttpModule {
    #[must_use]
    pub fn new(config: HttpConfig, service: Arc<GatewayService>) -> Self {
        Self {
            config,
            listener: None,
            service,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the router with all routes and middleware.
    pub fn build_router(&self) -> Router {
        build_router(
            AppState {
                service: Arc::clone(&self.service),
                shutdown: Arc::clone(&self.shutdown),
                start_time: Instant::now(),
            },
            &self.config,
        )
    }

    /// Binds the TCP listener and returns the bound port (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        info!(host = %self.config.host, port, "HTTP listener bound");
        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then drains in-flight requests for
    /// up to the configured drain timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();
        let controller = Arc::clone(&self.shutdown);
        let drain_controller = Arc::clone(&self.shutdown);

        controller.set_ready();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                drain_controller.begin_drain();
            })
            .await?;

        if controller.wait_for_drain(self.config.drain_timeout).await {
            info!("HTTP surface drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "drain timeout expired with requests still in flight"
            );
        }
        Ok(())
    }
}

/// Probes at `/health*`, the entity API under `/api`.
///
/// The in-flight tracker wraps only `/api`, so probes keep answering while
/// the gateway drains.
pub fn build_router(state: AppState, config: &HttpConfig) -> Router {
    let api = Router::new()
        .route("/api/owners", get(list_owners).post(create_owner))
        .route(
            "/api/owners/{id}",
            get(get_owner).put(update_owner).delete(delete_owner),
        )
        .route("/api/pets", get(list_pets).post(create_pet))
        .route("/api/pets/search", get(search_pets))
        .route(
            "/api/pets/{id}",
            get(get_pet).put(update_pet).delete(delete_pet),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state.shutdown),
            track_in_flight,
        ));

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .merge(api);

    apply_http_layers(router, config).with_state(state)
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) struct Harness {
    pub state: AppState,
    pub services: crate::responder::EmbeddedServices,
    _gateway: crate::gateway::Gateway,
}

/// Gateway plus embedded services on a fresh in-memory bus.
#[cfg(test)]
pub(crate) async fn harness() -> Harness {
    use crate::bus::{InMemoryBus, MessageBus};
    use crate::config::GatewayConfig;
    use crate::gateway::Gateway;
    use crate::responder::EmbeddedServices;

    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new());
    let config = GatewayConfig::default();
    let services = EmbeddedServices::start(Arc::clone(&bus), &config.owner, &config.pet)
        .await
        .unwrap();
    let gateway = Gateway::builder(bus).config(config).start().await.unwrap();
    Harness {
        state: AppState {
            service: gateway.service(),
            shutdown: Arc::new(ShutdownController::new()),
            start_time: Instant::now(),
        },
        services,
        _gateway: gateway,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
