use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use soundstage::{websocket_handler, AppState, InMemoryClientRegistry, ServerConfig};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soundstage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().expect("invalid server configuration");
    info!(?config, "Starting soundstage relay server");

    let registry = Arc::new(InMemoryClientRegistry::new());
    let app_state = AppState::new(registry, config.clone());

    // Single endpoint: the WebSocket upgrade at the root path. Browser
    // clients connect from arbitrary origins, so CORS stays permissive.
    let app = Router::new()
        .route("/", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    info!("Relay listening on ws://{addr}");
    axum::serve(listener, app).await.unwrap();
}
