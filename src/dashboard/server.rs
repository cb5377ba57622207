use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::routes;
use super::state::DashboardState;
use super::websocket;

/// All dashboard routes. Server-side paths always live at the root; the
/// configured pathname prefix only changes the URLs the browser requests.
pub fn router(state: Arc<DashboardState>) -> Router {
    Router::new()
        // HTML page
        .route("/", get(routes::index))
        // Renderer protocol
        .route("/_dash-layout", get(routes::get_layout))
        .route("/_dash-dependencies", get(routes::get_dependencies))
        .route("/_dash-update-component", post(routes::update_component))
        // Observability
        .route("/api/stats", get(routes::get_stats))
        .route("/api/events", get(websocket::ws_handler))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C, then print the callback statistics.
pub async fn start_dashboard(state: Arc<DashboardState>, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    state.metrics.read().await.display();
    Ok(())
}
