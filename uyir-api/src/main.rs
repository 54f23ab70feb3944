use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uyir_api::{app, worker, AppState};
use uyir_catalog::FareCalculator;
use uyir_core::RouteEstimator;
use uyir_dispatch::OfferPolicy;
use uyir_store::{app_config::Config, open_store, OsrmClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "uyir_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Uyir dispatch API on port {}", config.server.port);

    // Record store
    let store = open_store(&config.store)
        .await
        .context("Failed to open record store")?;

    // Routing: OSRM when configured, straight-line estimate otherwise
    let routes = match config.routing.osrm_base.as_deref() {
        Some(base) => {
            let client = OsrmClient::new(base, config.routing.timeout())
                .context("Failed to build OSRM client")?;
            tracing::info!("Routing via OSRM at {}", base);
            RouteEstimator::new(Arc::new(client), config.routing.timeout())
        }
        None => {
            tracing::warn!("No OSRM base configured, using geodesic estimates only");
            RouteEstimator::offline()
        }
    }
    .with_fallback_speed(config.routing.fallback_speed_kmh);

    let policy = OfferPolicy::new(config.dispatch.offer_ttl_seconds, config.dispatch.candidates)
        .with_class_matching(config.dispatch.match_class);

    let app_state = AppState::new(
        store,
        routes,
        FareCalculator::new(config.fare.clone()),
        policy,
        config.tracking.channel_capacity,
    )
    .context("Failed to register metrics")?;

    tokio::spawn(worker::start_offer_expiry_worker(
        app_state.clone(),
        Duration::from_secs(5),
    ));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
