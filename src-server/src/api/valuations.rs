use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use wealthgoals_core::valuation::AccountValuation;

use crate::{
    api::shared::emit_resource_changed, error::ApiResult, events::ResourceEventPayload,
    main_lib::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    account_id: String,
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn get_historical_valuations(
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<AccountValuation>>> {
    let history = state
        .goal_service
        .get_historical_valuations(
            &query.account_id,
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )
        .await?;
    Ok(Json(history))
}

async fn upsert_valuations(
    State(state): State<Arc<AppState>>,
    Json(valuations): Json<Vec<AccountValuation>>,
) -> ApiResult<Json<usize>> {
    let mut account_ids: Vec<String> = valuations.iter().map(|v| v.account_id.clone()).collect();
    account_ids.sort();
    account_ids.dedup();

    let count = state.goal_service.upsert_valuations(valuations).await?;
    emit_resource_changed(
        &state,
        ResourceEventPayload::new(
            "valuation",
            "updated",
            json!({ "account_ids": account_ids, "count": count }),
        ),
    );
    Ok(Json(count))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/valuations/history", get(get_historical_valuations))
        .route("/valuations", post(upsert_valuations))
}
