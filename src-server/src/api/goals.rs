use std::sync::Arc;

use crate::{
    api::shared::emit_resource_changed, error::ApiResult, events::ResourceEventPayload,
    main_lib::AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use wealthgoals_core::errors::Result as CoreResult;
use wealthgoals_core::goals::{
    AllocationVersion, Goal, GoalProgressHistory, GoalProgressSnapshot, GoalsAllocation, NewGoal,
    TimePeriod,
};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationConflictValidationRequest {
    pub account_id: String,
    pub start_date: String,
    pub end_date: String,
    pub percent_allocation: f64,
    pub exclude_allocation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPercentageValidationRequest {
    pub account_id: String,
    pub new_percentage: f64,
    pub exclude_allocation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnallocatedBalanceValidationRequest {
    pub account_id: String,
    pub allocation_amount: f64,
    pub current_account_value: f64,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct AllocationValidationResponse {
    pub valid: bool,
    pub message: String,
}

impl From<CoreResult<()>> for AllocationValidationResponse {
    fn from(result: CoreResult<()>) -> Self {
        match result {
            Ok(()) => AllocationValidationResponse {
                valid: true,
                message: String::new(),
            },
            Err(e) => AllocationValidationResponse {
                valid: false,
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnallocatedBalanceResponse {
    pub unallocated_balance: f64,
}

#[derive(Deserialize)]
struct GoalProgressQuery {
    #[serde(rename = "date")]
    query_date: Option<String>,
}

#[derive(Deserialize)]
struct ValuationHistoryQuery {
    #[serde(default)]
    period: TimePeriod,
    today: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnallocatedBalanceQuery {
    current_account_value: f64,
}

async fn get_goals(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Goal>>> {
    let goals = state.goal_service.get_goals()?;
    Ok(Json(goals))
}

async fn create_goal(
    State(state): State<Arc<AppState>>,
    Json(goal): Json<NewGoal>,
) -> ApiResult<Json<Goal>> {
    let g = state.goal_service.create_goal(goal).await?;
    emit_resource_changed(
        &state,
        ResourceEventPayload::new("goal", "created", json!({ "goal_id": g.id })),
    );
    Ok(Json(g))
}

async fn update_goal(
    State(state): State<Arc<AppState>>,
    Json(goal): Json<Goal>,
) -> ApiResult<Json<Goal>> {
    let g = state.goal_service.update_goal(goal).await?;
    emit_resource_changed(
        &state,
        ResourceEventPayload::new("goal", "updated", json!({ "goal_id": g.id })),
    );
    Ok(Json(g))
}

async fn delete_goal(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    let _ = state.goal_service.delete_goal(id.clone()).await?;
    emit_resource_changed(
        &state,
        ResourceEventPayload::new("goal", "deleted", json!({ "goal_id": id })),
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn load_goals_allocations(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<GoalsAllocation>>> {
    let allocs = state.goal_service.load_goals_allocations()?;
    Ok(Json(allocs))
}

async fn update_goal_allocations(
    State(state): State<Arc<AppState>>,
    Json(allocs): Json<Vec<GoalsAllocation>>,
) -> ApiResult<StatusCode> {
    let count = state.goal_service.upsert_goal_allocations(allocs).await?;
    emit_resource_changed(
        &state,
        ResourceEventPayload::new("allocation", "updated", json!({ "count": count })),
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_goal_allocation(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    let _ = state.goal_service.delete_goal_allocation(id.clone()).await?;
    emit_resource_changed(
        &state,
        ResourceEventPayload::new("allocation", "deleted", json!({ "allocation_id": id })),
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn get_allocation_versions(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<AllocationVersion>>> {
    let versions = state.goal_service.get_allocation_versions(&id)?;
    Ok(Json(versions))
}

/// Get goal progress on a specific date
/// Query params:
///   date: YYYY-MM-DD format (optional, defaults to today)
async fn get_goal_progress(
    Path(goal_id): Path<String>,
    Query(query): Query<GoalProgressQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<GoalProgressSnapshot>> {
    let progress = state
        .goal_service
        .get_goal_progress(&goal_id, query.query_date.as_deref())
        .await?;
    Ok(Json(progress))
}

/// Get all allocations for a goal on a specific date
/// Query params:
///   date: YYYY-MM-DD format (optional, defaults to today)
async fn get_goal_allocations_on_date(
    Path(goal_id): Path<String>,
    Query(query): Query<GoalProgressQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<GoalsAllocation>>> {
    let query_date = query
        .query_date
        .unwrap_or_else(|| wealthgoals_core::dates::format_date(wealthgoals_core::dates::today()));

    let allocations = state
        .goal_service
        .get_goal_allocations_on_date(&goal_id, &query_date)?;

    Ok(Json(allocations))
}

/// Chart series of projected and actual goal value
/// Query params:
///   period: weeks | months | years | all (defaults to months)
///   today: YYYY-MM-DD override for the window center
async fn get_goal_valuation_history(
    Path(goal_id): Path<String>,
    Query(query): Query<ValuationHistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<GoalProgressHistory>> {
    let history = state
        .goal_service
        .get_goal_valuation_history(&goal_id, query.period, query.today.as_deref())
        .await?;
    Ok(Json(history))
}

/// Validate if adding a new allocation would create a conflict
async fn validate_allocation_conflict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AllocationConflictValidationRequest>,
) -> Json<AllocationValidationResponse> {
    let result = state.goal_service.validate_allocation_conflicts(
        &req.account_id,
        &req.start_date,
        &req.end_date,
        req.percent_allocation,
        req.exclude_allocation_id.as_deref(),
    );
    Json(result.into())
}

async fn validate_allocation_percentages(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AllocationPercentageValidationRequest>,
) -> Json<AllocationValidationResponse> {
    let result = state.goal_service.validate_allocation_percentages(
        &req.account_id,
        req.new_percentage,
        req.exclude_allocation_id.as_deref(),
    );
    Json(result.into())
}

async fn validate_unallocated_balance(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UnallocatedBalanceValidationRequest>,
) -> Json<AllocationValidationResponse> {
    let result = state.goal_service.validate_unallocated_balance(
        &req.account_id,
        req.allocation_amount,
        req.current_account_value,
    );
    Json(result.into())
}

async fn get_unallocated_balance(
    Path(account_id): Path<String>,
    Query(query): Query<UnallocatedBalanceQuery>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<UnallocatedBalanceResponse>> {
    let unallocated_balance = state
        .goal_service
        .get_unallocated_balance(&account_id, query.current_account_value)?;
    Ok(Json(UnallocatedBalanceResponse { unallocated_balance }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/goals/allocations",
            get(load_goals_allocations).post(update_goal_allocations),
        )
        .route("/goals/allocations/:id", delete(delete_goal_allocation))
        .route("/goals/allocations/:id/versions", get(get_allocation_versions))
        .route("/goals/:id/progress", get(get_goal_progress))
        .route("/goals/:id/allocations-on-date", get(get_goal_allocations_on_date))
        .route("/goals/:id/valuation-history", get(get_goal_valuation_history))
        .route(
            "/goals/validate-allocation-conflict",
            post(validate_allocation_conflict),
        )
        .route(
            "/goals/validate-allocation-percentages",
            post(validate_allocation_percentages),
        )
        .route(
            "/goals/validate-unallocated-balance",
            post(validate_unallocated_balance),
        )
        .route("/goals", get(get_goals).post(create_goal).put(update_goal))
        .route("/goals/:id", delete(delete_goal))
        .route(
            "/accounts/:id/unallocated-balance",
            get(get_unallocated_balance),
        )
}
