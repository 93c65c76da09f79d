use std::sync::Arc;
use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::{self, TraceLayer};
use tracing::{Level, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use auth_cell::SessionService;
use shared_config::AppConfig;
use shared_database::{FileKvStore, MemoryStore, RealtimeDbClient, RemoteStore};
use sync_cell::{ClinicContext, SyncService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic desk");

    // Load configuration
    let config = AppConfig::from_env();

    let store: Arc<dyn RemoteStore> = if config.is_configured() {
        info!("Using remote store at {}", config.store_base_url());
        Arc::new(RealtimeDbClient::new(&config))
    } else {
        warn!("Appointments live in memory only and are lost on exit");
        Arc::new(MemoryStore::new())
    };
    let local = FileKvStore::new(&config.session_dir)
        .with_context(|| format!("cannot open session directory {}", config.session_dir))?;
    let bind_addr = config.bind_addr.clone();

    // Create shared state
    let state = Arc::new(ClinicContext::new(config, store, Arc::new(local)));

    let sync = SyncService::new(state.clone());
    if sync.seed_doctors().await.context("seeding doctor roster")? {
        info!("Seeded default doctor roster");
    }
    // Held for the life of the process; dropping does not cancel them.
    let _subscriptions = sync.start().await.context("subscribing to store")?;

    SessionService::new(state.clone()).restore();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new()
                    .level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new()
                    .level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("cannot bind {}", bind_addr))?;
    info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
