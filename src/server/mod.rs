mod handlers;
mod state;

use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::locator::LocatorService;
pub use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/find-properties", post(handlers::find_properties))
        .route("/health", get(handlers::health))
        .route("/properties", get(handlers::property_list))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(
    host: &str,
    port: u16,
    locator: LocatorService,
    trust_forwarded_for: bool,
) -> std::io::Result<()> {
    let app = build_router(Arc::new(AppState {
        locator,
        trust_forwarded_for,
    }));
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("property locator listening on http://{}", addr);
    if trust_forwarded_for {
        log::info!("rate limiting keyed on X-Forwarded-For");
    }

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
}
