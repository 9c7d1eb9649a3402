use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dentbook_api::{create_router, seed};
use notification_cell::NotificationDispatcher;
use shared_config::{AppConfig, StorageBackend};
use shared_database::{BookingStore, InMemoryStore, SupabaseStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dentbook API server");

    let config = Arc::new(AppConfig::from_env());

    let store: Arc<dyn BookingStore> = match config.storage_backend {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            let store = Arc::new(InMemoryStore::new());
            if config.seed_demo_data {
                seed::seed_demo_data(store.as_ref())
                    .await
                    .context("failed to seed demo data")?;
            }
            store
        }
        StorageBackend::Supabase => {
            if !config.is_configured() {
                anyhow::bail!("STORAGE_BACKEND=supabase requires SUPABASE_URL and SUPABASE_ANON_PUBLIC_KEY");
            }
            if config.seed_demo_data {
                warn!("SEED_DEMO_DATA is ignored for the supabase backend");
            }
            info!("Using Supabase store at {}", config.supabase_url);
            Arc::new(SupabaseStore::new(&config))
        }
    };

    let notifier = Arc::new(NotificationDispatcher::new(&config));
    if !notifier.is_enabled() {
        warn!("Mail transport not configured, notifications will be suppressed");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(config.clone(), store, notifier)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
