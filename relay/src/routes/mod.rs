//! Router assembly

pub mod twilio;

use std::sync::Arc;

use axum::{Router, routing::any};
use tower_http::trace::TraceLayer;

use crate::handlers::api::{not_found, root};
use crate::state::AppState;

/// Full application router: liveness on `/` for any method, relay on `/twilio`,
/// 404 elsewhere (upgrade attempts on `/` included).
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", any(root))
        .merge(twilio::create_twilio_router())
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
