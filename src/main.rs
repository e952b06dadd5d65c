use std::sync::Arc;

use anyhow::Context;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use guided_tour::config::{ServiceConfig, TourConfig};
use guided_tour::error::Error;
use guided_tour::notify::http::HttpAnalyticsSink;
use guided_tour::notify::{ActionTracker, AnalyticsSink, LogSink, Notifier};
use guided_tour::signals::SignalBus;
use guided_tour::store::{KeyValueStore, LibSqlStore, ProfileStore};
use guided_tour::tour::{TourDeps, TourRouteState, TourRuntime, spawn_signal_listener, tour_routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let tour_config = TourConfig::from_env()?;
    let service_config = ServiceConfig::from_env()?;

    eprintln!("🧭 Guided Tour v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api/tour", service_config.port);
    eprintln!("   Max steps: {}", tour_config.max_steps);

    // ── Database ─────────────────────────────────────────────────────────
    let kv: Arc<dyn KeyValueStore> = Arc::new(
        LibSqlStore::new_local(&service_config.db_path)
            .await
            .map_err(Error::from)
            .with_context(|| {
                format!(
                    "Failed to open database at {}",
                    service_config.db_path.display()
                )
            })?,
    );
    eprintln!("   Database: {}", service_config.db_path.display());

    // ── Step catalog ─────────────────────────────────────────────────────
    let catalog = service_config.load_catalog()?;
    eprintln!("   Catalog: {} steps", catalog.len());

    // ── Analytics ────────────────────────────────────────────────────────
    let (analytics, tracker): (Arc<dyn AnalyticsSink>, Arc<dyn ActionTracker>) =
        match service_config.analytics_url {
            Some(ref url) => {
                eprintln!("   Analytics: {}", url);
                let sink = Arc::new(HttpAnalyticsSink::new(url.clone()));
                (sink.clone() as Arc<dyn AnalyticsSink>, sink as Arc<dyn ActionTracker>)
            }
            None => (
                Arc::new(LogSink) as Arc<dyn AnalyticsSink>,
                Arc::new(LogSink) as Arc<dyn ActionTracker>,
            ),
        };
    let (notifier, _notifier_handle) =
        Notifier::spawn(analytics, tracker, tour_config.page_path.clone());

    // ── Tour runtime ─────────────────────────────────────────────────────
    let signals = SignalBus::new();
    let runtime = TourRuntime::new(
        tour_config,
        Arc::new(catalog),
        TourDeps {
            profiles: ProfileStore::new(kv),
            notifier,
            signals: signals.clone(),
        },
    );
    let _listener_handle = spawn_signal_listener(runtime.clone(), &signals);

    let app = tour_routes(TourRouteState {
        runtime: runtime.clone(),
    })
    .layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr = format!("0.0.0.0:{}", service_config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(port = service_config.port, "Guided tour server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    runtime.shutdown().await;
    tracing::info!("Guided tour server stopped");
    Ok(())
}
