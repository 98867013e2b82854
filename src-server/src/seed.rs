//! Startup data for the in-memory stores.
//!
//! The portfolio engine owns goals and valuations in production; a seed file
//! lets the server start from a known state instead of empty stores.

use std::path::Path;

use serde::{Deserialize, Serialize};
use wealthgoals_core::goals::{Goal, GoalsAllocation};
use wealthgoals_core::valuation::AccountValuation;

use crate::main_lib::AppState;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub allocations: Vec<GoalsAllocation>,
    #[serde(default)]
    pub valuations: Vec<AccountValuation>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub goals: usize,
    pub allocations: usize,
    pub valuations: usize,
}

pub async fn load_seed_file(path: &Path, state: &AppState) -> anyhow::Result<SeedSummary> {
    let raw = tokio::fs::read_to_string(path).await?;
    let data: SeedData = serde_json::from_str(&raw)?;
    apply_seed(data, state).await
}

/// Goals keep their ids; allocations go through the same validation as
/// regular upserts.
pub async fn apply_seed(data: SeedData, state: &AppState) -> anyhow::Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for goal in data.goals {
        state.goal_repository.insert_goal(goal);
        summary.goals += 1;
    }
    if !data.valuations.is_empty() {
        summary.valuations = state.goal_service.upsert_valuations(data.valuations).await?;
    }
    if !data.allocations.is_empty() {
        summary.allocations = state
            .goal_service
            .upsert_goal_allocations(data.allocations)
            .await?;
    }

    Ok(summary)
}
