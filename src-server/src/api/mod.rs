use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::timeout::TimeoutLayer;

use crate::main_lib::AppState;

pub mod events;
pub mod goals;
pub mod shared;
pub mod valuations;

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `request_timeout` applies to the command routes only; `/events` streams
/// stay open until the client leaves.
pub fn router(request_timeout: Duration) -> Router<Arc<AppState>> {
    let commands = Router::new()
        .merge(goals::router())
        .merge(valuations::router())
        .layer(TimeoutLayer::new(request_timeout));

    let api = Router::new().merge(commands).merge(events::router());

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/v1", api)
}
