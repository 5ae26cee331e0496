use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use super::api::{self, MockState, SharedState};
use super::db::BoardDb;

/// Configuration for the mock server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Start with demo data instead of an empty board
    pub seed: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            seed: true,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the full router: the REST API under `/api` plus `/health`.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .nest("/api", api::api_router())
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

fn initial_state(seed: bool) -> SharedState {
    let db = if seed { BoardDb::seeded() } else { BoardDb::new() };
    Arc::new(MockState::new(db))
}

/// Run the mock server until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    println!("Mock sprint board API running at http://{}/api", local_addr);
    info!(%local_addr, seed = config.seed, "mock server started");

    axum::serve(listener, build_router(initial_state(config.seed)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    println!("Server shut down gracefully.");
    Ok(())
}

/// Serve `db` on an ephemeral local port in the background.
pub async fn spawn(db: BoardDb) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind mock server")?;
    let addr = listener.local_addr()?;
    let app = build_router(Arc::new(MockState::new(db)));
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "mock server stopped");
        }
    });
    Ok((addr, handle))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C");
    }
    println!("\nShutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_router() -> Router {
        build_router(initial_state(true))
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let app = test_router();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_api_routes_mounted_under_prefix() {
        let app = test_router();
        let req = Request::builder()
            .uri("/api/users/me")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let user: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(user["name"], "Carla Ruiz");
    }

    #[tokio::test]
    async fn test_unprefixed_api_path_is_not_found() {
        let app = test_router();
        let req = Request::builder()
            .uri("/tasks")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_board() {
        let app = build_router(initial_state(false));
        let req = Request::builder()
            .uri("/api/teams")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"[]");
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert!(config.seed);
    }
}
