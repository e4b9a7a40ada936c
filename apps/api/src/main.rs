use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use booking_cell::AppState;
use booking_cell::store::memory::MemoryBookingStore;
use directory_cell::models::DirectorySnapshot;
use directory_cell::InMemoryDirectory;
use shared_config::AppConfig;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scheduling API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Directory data comes from the external profile service; here it is a
    // snapshot file loaded once at startup.
    let directory = Arc::new(load_directory(&config).await);
    let store = Arc::new(MemoryBookingStore::new());

    let addr = SocketAddr::new(
        config
            .bind_address
            .parse::<IpAddr>()
            .unwrap_or_else(|_| IpAddr::from([0, 0, 0, 0])),
        config.port,
    );

    let state = AppState::new(directory, store, Arc::new(config));

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn load_directory(config: &AppConfig) -> InMemoryDirectory {
    let Some(path) = &config.directory_file else {
        return InMemoryDirectory::new();
    };

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<DirectorySnapshot>(&contents) {
            Ok(snapshot) => InMemoryDirectory::from_snapshot(snapshot).await,
            Err(e) => {
                warn!("Failed to parse directory snapshot {}: {}", path, e);
                InMemoryDirectory::new()
            }
        },
        Err(e) => {
            warn!("Failed to read directory snapshot {}: {}", path, e);
            InMemoryDirectory::new()
        }
    }
}
