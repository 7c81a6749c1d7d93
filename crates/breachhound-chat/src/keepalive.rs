//! Keep-alive HTTP endpoint.
//!
//! A small axum router that uptime monitors can poll, with a stats route
//! for operator inspection. Serves until the shutdown signal is received.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use breachhound_core::handler::CommandHandler;

/// Shared state accessible to the keep-alive route handlers.
pub struct KeepaliveState {
    pub handler: Arc<CommandHandler>,
    pub started_at: Instant,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Response body for `GET /stats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub uptime_secs: u64,
    pub corpus_files: usize,
    pub total_keys: usize,
    pub active_keys: usize,
}

/// Error body for failed routes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the axum router with the keep-alive routes.
pub fn router(state: Arc<KeepaliveState>) -> axum::Router {
    axum::Router::new()
        .route("/health", get(handle_health))
        .route("/stats", get(handle_stats))
        .with_state(state)
}

/// Serve the keep-alive endpoint on `addr` until the shutdown signal.
pub async fn serve(
    addr: SocketAddr,
    state: Arc<KeepaliveState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "keep-alive endpoint listening");

    let app = router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("keep-alive endpoint shutting down");
        })
        .await
}

// ── Route handlers ──────────────────────────────────────────────────────

async fn handle_health(State(state): State<Arc<KeepaliveState>>) -> Json<HealthResponse> {
    let _ = state; // health doesn't need state
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn handle_stats(
    State(state): State<Arc<KeepaliveState>>,
) -> Result<Json<StatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let internal = |e: String| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: e }),
        )
    };

    let corpus_files = state
        .handler
        .corpus()
        .files()
        .map_err(|e| internal(e.to_string()))?
        .len();
    let keys = state
        .handler
        .entitlements()
        .key_stats()
        .map_err(|e| internal(e.to_string()))?;

    Ok(Json(StatsResponse {
        uptime_secs: state.started_at.elapsed().as_secs(),
        corpus_files,
        total_keys: keys.total,
        active_keys: keys.active,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use breachhound_core::corpus::Corpus;
    use breachhound_core::entitlement::EntitlementStore;
    use breachhound_core::moderation::BanList;
    use breachhound_core::report::ReportWriter;
    use breachhound_core::usage::UsageTracker;
    use breachhound_test_utils::corpus::TempCorpus;

    fn test_state(fixture: &TempCorpus) -> Arc<KeepaliveState> {
        let handler = CommandHandler::new(
            EntitlementStore::in_memory(10),
            UsageTracker::in_memory(),
            BanList::in_memory(),
            Corpus::new(fixture.root(), vec![".txt".to_string()]),
            ReportWriter::new(fixture.sibling("reports")),
        );
        Arc::new(KeepaliveState {
            handler: Arc::new(handler),
            started_at: Instant::now(),
        })
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let fixture = TempCorpus::new();
        let app = router(test_state(&fixture));
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let health: HealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(health.status, "ok");
        assert!(!health.version.is_empty());
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let fixture = TempCorpus::with_files(&[("a.txt", "x"), ("b.txt", "y")]);
        let state = test_state(&fixture);
        state
            .handler
            .entitlements()
            .create_key("alice", false)
            .unwrap();
        let app = router(state);

        let req = Request::get("/stats").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let stats: StatsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(stats.corpus_files, 2);
        assert_eq!(stats.total_keys, 1);
        assert_eq!(stats.active_keys, 1);
    }

    #[tokio::test]
    async fn test_serve_graceful_shutdown() {
        let fixture = TempCorpus::new();
        let state = test_state(&fixture);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        // Port 0 binds an ephemeral port; the test only exercises shutdown
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let server = tokio::spawn(serve(addr, state, shutdown_rx));
        // Give the server a moment to bind, then stop it
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        let result = server.await.unwrap();
        assert!(result.is_ok());
    }
}
