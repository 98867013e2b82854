//! Account valuation snapshots supplied by the portfolio engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Total value of one account at the end of one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountValuation {
    pub account_id: String,
    pub valuation_date: NaiveDate,
    pub total_value: f64,
}

/// Last value on or before `date` in a date-sorted history.
pub fn value_on_or_before(history: &[AccountValuation], date: NaiveDate) -> Option<f64> {
    let idx = history.partition_point(|v| v.valuation_date <= date);
    idx.checked_sub(1).map(|i| history[i].total_value)
}
