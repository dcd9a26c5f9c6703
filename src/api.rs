//! Unified API router for the memory service
//!
//! Merges the module routers into a single axum `Router` with CORS and
//! request tracing.
//!
//! ## Endpoint Map
//!
//! | Path          | Method | Description                          |
//! |---------------|--------|--------------------------------------|
//! | `/health`     | GET    | Liveness, storage and payment flags  |
//! | `/gates`      | GET    | Gate registry                        |
//! | `/memory`     | GET    | Recent reflections (`?limit=N`)      |
//! | `/memory`     | POST   | Store a reflection                   |
//! | `/tolls`      | POST   | Record a toll transaction            |
//! | `/tolls/pay`  | POST   | Create or simulate a toll payment    |

use crate::config::InfloConfig;
use crate::error::Result;
use crate::server::{memory_router, service_router, tolls_router, ServerState};
use axum::{
    http::{header, Method},
    Router,
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete HTTP application
pub fn build_app(state: ServerState, cors_origins: &[String]) -> Router {
    let cors = build_cors(cors_origins);

    Router::new()
        .merge(service_router(state.clone()))
        .merge(memory_router(state.clone()))
        .merge(tolls_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Open the service state and serve until `shutdown` is cancelled
pub async fn serve(config: &InfloConfig, shutdown: CancellationToken) -> Result<()> {
    let state = ServerState::open(config).await?;
    let app = build_app(state, &config.server.cors_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Memory service listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("Memory service stopped");
    Ok(())
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}
