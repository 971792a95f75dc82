use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::health::health_check;
use super::rest::rest_routes;
use super::state::AppState;
use super::user::user_routes;
use crate::auth::{cors_layer, security_headers_layer};

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/user", user_routes(&state))
        .nest("/api/v2", rest_routes(&state))
        .layer(TraceLayer::new_for_http())
        .layer(security_headers_layer())
        .layer(cors_layer())
        .with_state(state)
}
