//! Attribution of account growth to goal allocations.

use chrono::NaiveDate;

/// Value an allocation has contributed to its goal.
///
/// `initial_contribution + (current_value - start_value) * percentage`, with
/// `percentage` as a fraction (`1.0` is the whole account). Only the growth
/// since the allocation started is shared, so a losing account reduces the
/// contribution below the initial amount.
pub fn calculate_contributed_value(
    initial_contribution: f64,
    percentage: f64,
    start_value: f64,
    current_value: f64,
) -> f64 {
    initial_contribution + (current_value - start_value) * percentage
}

/// Growth attributed to an allocation over a period, with
/// `allocation_percentage` in the 0-100 range.
pub fn calculate_allocation_growth(
    allocation_percentage: f64,
    account_value_start: f64,
    account_value_end: f64,
) -> f64 {
    let account_growth = account_value_end - account_value_start;
    account_growth * (allocation_percentage / 100.0)
}

/// Total growth across periods that each had their own percentage.
///
/// Each entry is `(allocation_percentage, value_start, value_end)`.
pub fn calculate_segmented_growth(segments: &[(f64, f64, f64)]) -> f64 {
    segments
        .iter()
        .map(|(percentage, start, end)| calculate_allocation_growth(*percentage, *start, *end))
        .sum()
}

/// Inclusive range overlap, where a missing end is unbounded.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: Option<NaiveDate>,
    b_start: NaiveDate,
    b_end: Option<NaiveDate>,
) -> bool {
    let a_before_b_ends = b_end.map_or(true, |end| a_start <= end);
    let b_before_a_ends = a_end.map_or(true, |end| b_start <= end);
    a_before_b_ends && b_before_a_ends
}
