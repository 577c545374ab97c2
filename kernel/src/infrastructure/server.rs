//! HTTP server: branch API plus the control plane.

use crate::api::branches::{routes, unknown_endpoint};
use crate::host::KernelState;
use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, warn};

async fn health_check() -> &'static str {
    "OK"
}

async fn readiness(State(state): State<Arc<KernelState>>) -> Response {
    match sqlx::query("SELECT 1").execute(state.db()).await {
        Ok(_) => "OK".into_response(),
        Err(e) => {
            warn!(error = %e, "Readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable").into_response()
        }
    }
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    info!(
        %method,
        path = %path,
        status = response.status().as_u16(),
        latency = ?started.elapsed(),
        "request"
    );
    response
}

/// Builds the application router.
///
/// Branch routes are nested under `base_path`; health probes and, when a
/// handle is given, `/metrics` sit at the root. Unmatched paths answer
/// `404 {"error": "unknown endpoint"}`.
pub fn build_router(
    state: Arc<KernelState>,
    base_path: &str,
    prometheus: Option<PrometheusHandle>,
) -> Router {
    let base_path = base_path.trim_end_matches('/');

    let mut control_plane = Router::new()
        .route("/health/live", get(health_check))
        .route("/health/ready", get(readiness));

    if let Some(handle) = prometheus {
        control_plane =
            control_plane.route("/metrics", get(move || std::future::ready(handle.render())));
    }

    let app = if base_path.is_empty() {
        control_plane.merge(routes())
    } else {
        control_plane.nest(base_path, routes())
    };

    app.fallback(unknown_endpoint)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Serves `app` on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while running.
pub async fn run_server(
    listener: TcpListener,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    info!("Conservation kernel listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
