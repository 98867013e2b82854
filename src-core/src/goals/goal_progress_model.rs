use serde::{Deserialize, Serialize};

use crate::goals::chart_intervals::TimePeriod;

/// Represents the progress of a goal on a specific date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgressSnapshot {
    pub goal_id: String,
    pub goal_title: String,
    pub query_date: String,
    /// Sum of the initial contributions of the active allocations
    pub init_value: f64,
    /// init_value + growth
    pub current_value: f64,
    /// Allocated share of account growth since each allocation started
    pub growth: f64,
    /// Where the goal's contribution plan expects it to be on query_date
    pub projected_value: f64,
    pub target_amount: f64,
    pub progress_percent: f64,
    pub on_track: bool,
    /// Allocation breakdown by account
    pub allocation_details: Vec<AllocationDetail>,
}

/// Details of how a goal is performing on a specific account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDetail {
    pub allocation_id: String,
    pub account_id: String,
    /// 0-100
    pub allocation_percentage: f64,
    pub init_amount: f64,
    /// Account value when the allocation started (baseline)
    pub account_value_at_allocation_start: f64,
    pub account_current_value: f64,
    pub account_growth: f64,
    pub allocated_growth: f64,
    /// init_amount + allocated_growth
    pub contributed_value: f64,
}

/// One chart point of a goal's valuation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalValuationPoint {
    pub date: String,
    pub projected_value: f64,
    /// Absent for dates after today
    pub actual_value: Option<f64>,
    pub on_track: Option<bool>,
}

/// Goal valuation history for a chart period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgressHistory {
    pub goal_id: String,
    pub goal_title: String,
    pub period: TimePeriod,
    pub start_date: String,
    pub end_date: String,
    pub target_amount: f64,
    pub points: Vec<GoalValuationPoint>,
}
