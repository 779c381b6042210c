pub mod api;
pub mod embedded_static;
pub mod handlers;
pub mod state;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::render::Figure;
use state::ViewerState;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

pub fn router(state: Arc<ViewerState>) -> Router {
    let api_routes = Router::new()
        .route("/figures", get(handlers::list_figures))
        .route("/figures/{index}", get(handlers::get_figure))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .fallback(embedded_static::serve_embedded_file)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

/// Serve the figures until Ctrl-C
pub async fn run_viewer(figures: &[Figure], host: &str, port: u16) -> anyhow::Result<()> {
    let state = Arc::new(ViewerState::new(figures)?);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    let local = listener.local_addr()?;

    println!(
        "Viewing {} figure(s) at http://{} (press Ctrl-C to exit)",
        figures.len(),
        local
    );
    tracing::info!("Viewer listening on http://{}", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await?;

    tracing::info!("Viewer stopped");
    Ok(())
}
