//! HTTP adapter for the scrape endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::SensorMetrics;

/// State shared across handlers.
#[derive(Clone)]
struct AppState {
    metrics: Arc<SensorMetrics>,
}

/// Builds the router: the metrics path, a root redirect to it, and a
/// health probe.
fn create_router(metrics: Arc<SensorMetrics>, metrics_path: &str) -> Router {
    let state = AppState { metrics };
    let redirect_to = metrics_path.to_string();

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .route(
            "/",
            get(move || {
                let location = redirect_to.clone();
                async move {
                    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
                }
            }),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = state.metrics.render();

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        body,
    )
        .into_response()
}

async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// The scrape-endpoint server.
pub struct HttpServer {
    metrics: Arc<SensorMetrics>,
    listen_addr: SocketAddr,
    metrics_path: String,
}

impl HttpServer {
    pub fn new(metrics: Arc<SensorMetrics>, listen_addr: SocketAddr, metrics_path: String) -> Self {
        Self {
            metrics,
            listen_addr,
            metrics_path,
        }
    }

    /// Binds the listener and serves until the process exits.
    pub async fn run(self) -> std::io::Result<()> {
        let router = create_router(self.metrics, &self.metrics_path);

        info!(
            addr = %self.listen_addr,
            path = %self.metrics_path,
            "starting scrape endpoint"
        );

        let listener = tokio::net::TcpListener::bind(self.listen_addr).await?;
        axum::serve(listener, router).await
    }
}
