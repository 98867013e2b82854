//! Actual-versus-projected series for goal charts.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::dates::format_date;
use crate::errors::Result;
use crate::goals::allocation_calc::calculate_contributed_value;
use crate::goals::chart_intervals::DateIntervals;
use crate::goals::goal_progress_model::{AllocationDetail, GoalValuationPoint};
use crate::goals::goals_model::{Goal, GoalsAllocation};
use crate::goals::projection::{project_goal_value, Compounding};
use crate::valuation::valuation_model::value_on_or_before;
use crate::valuation::AccountValuation;

/// Starting amount the goal projection compounds from: the goal's
/// `initial_actual_value` when set, otherwise the allocations' initial
/// contributions.
pub fn goal_principal(goal: &Goal, allocations: &[GoalsAllocation]) -> f64 {
    goal.initial_actual_value.unwrap_or_else(|| {
        allocations
            .iter()
            .filter(|a| a.goal_id == goal.id)
            .map(|a| a.init_amount)
            .sum()
    })
}

pub fn allocation_detail(
    allocation: &GoalsAllocation,
    start_value: f64,
    current_value: f64,
) -> AllocationDetail {
    let percentage = allocation.effective_percentage();
    let contributed_value = calculate_contributed_value(
        allocation.init_amount,
        percentage / 100.0,
        start_value,
        current_value,
    );
    AllocationDetail {
        allocation_id: allocation.id.clone(),
        account_id: allocation.account_id.clone(),
        allocation_percentage: percentage,
        init_amount: allocation.init_amount,
        account_value_at_allocation_start: start_value,
        account_current_value: current_value,
        account_growth: current_value - start_value,
        allocated_growth: contributed_value - allocation.init_amount,
        contributed_value,
    }
}

/// Actual value of the goal on `date` from the allocations active then.
fn actual_value_on(
    allocations: &[&GoalsAllocation],
    histories: &HashMap<String, Vec<AccountValuation>>,
    date: NaiveDate,
) -> Result<f64> {
    let mut total = 0.0;
    for allocation in allocations {
        if !allocation.is_active_on(date)? {
            continue;
        }
        let Some(start) = allocation.effective_start()? else {
            continue;
        };
        let history = histories
            .get(&allocation.account_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let start_value = value_on_or_before(history, start).unwrap_or(0.0);
        let current_value = value_on_or_before(history, date).unwrap_or(0.0);
        total += allocation_detail(allocation, start_value, current_value).contributed_value;
    }
    Ok(total)
}

/// One point per tick: the projected value always, the actual value only up
/// to `today`.
pub fn build_goal_valuation_history(
    goal: &Goal,
    allocations: &[GoalsAllocation],
    histories: &HashMap<String, Vec<AccountValuation>>,
    intervals: &DateIntervals,
    today: NaiveDate,
    compounding: Compounding,
) -> Result<Vec<GoalValuationPoint>> {
    let goal_allocations: Vec<&GoalsAllocation> =
        allocations.iter().filter(|a| a.goal_id == goal.id).collect();
    let principal = goal_principal(goal, allocations);

    let mut points = Vec::new();
    for date in intervals.iter() {
        let projected_value = project_goal_value(goal, principal, date, compounding)?;
        let actual_value = if date <= today {
            Some(actual_value_on(&goal_allocations, histories, date)?)
        } else {
            None
        };
        points.push(GoalValuationPoint {
            date: format_date(date),
            projected_value,
            actual_value,
            on_track: actual_value.map(|actual| actual >= projected_value),
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::goals::chart_intervals::Step;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn goal() -> Goal {
        Goal {
            id: "goal-1".to_string(),
            title: "Retirement".to_string(),
            description: None,
            target_amount: 10_000.0,
            is_achieved: false,
            target_return_rate: Some(0.0),
            due_date: Some("2025-12-31".to_string()),
            monthly_investment: Some(100.0),
            start_date: Some("2025-01-01".to_string()),
            initial_actual_value: None,
        }
    }

    fn allocation(id: &str, account_id: &str, pct: f64, init: f64, start: &str) -> GoalsAllocation {
        GoalsAllocation {
            id: id.to_string(),
            goal_id: "goal-1".to_string(),
            account_id: account_id.to_string(),
            allocation_percentage: pct,
            init_amount: init,
            allocation_date: Some(start.to_string()),
            ..Default::default()
        }
    }

    fn history(account_id: &str, points: &[(&str, f64)]) -> Vec<AccountValuation> {
        points
            .iter()
            .map(|(date, value)| AccountValuation {
                account_id: account_id.to_string(),
                valuation_date: d(date),
                total_value: *value,
            })
            .collect()
    }

    #[test]
    fn carries_values_forward() {
        let h = history("a", &[("2025-01-01", 10.0), ("2025-01-05", 20.0)]);
        assert_eq!(value_on_or_before(&h, d("2024-12-31")), None);
        assert_eq!(value_on_or_before(&h, d("2025-01-04")), Some(10.0));
        assert_eq!(value_on_or_before(&h, d("2025-02-01")), Some(20.0));
    }

    #[test]
    fn principal_prefers_initial_actual_value() {
        let allocations = vec![allocation("x", "a", 50.0, 300.0, "2025-01-01")];
        let mut g = goal();
        assert_eq!(goal_principal(&g, &allocations), 300.0);
        g.initial_actual_value = Some(1_000.0);
        assert_eq!(goal_principal(&g, &allocations), 1_000.0);
    }

    #[test]
    fn detail_splits_growth() {
        let a = allocation("x", "a", 40.0, 200.0, "2025-01-01");
        let detail = allocation_detail(&a, 1_000.0, 1_500.0);
        assert_eq!(detail.account_growth, 500.0);
        assert_eq!(detail.allocated_growth, 200.0);
        assert_eq!(detail.contributed_value, 400.0);
    }

    #[test]
    fn series_has_actuals_only_up_to_today() {
        let allocations = vec![
            allocation("x", "acc-a", 50.0, 500.0, "2025-01-01"),
            allocation("y", "acc-b", 100.0, 0.0, "2025-03-01"),
        ];
        let mut histories = HashMap::new();
        histories.insert(
            "acc-a".to_string(),
            history("acc-a", &[("2025-01-01", 1_000.0), ("2025-02-01", 1_400.0)]),
        );
        histories.insert(
            "acc-b".to_string(),
            history("acc-b", &[("2025-03-01", 2_000.0), ("2025-03-20", 2_100.0)]),
        );

        let intervals = DateIntervals::new(d("2025-01-01"), d("2025-05-01"), Step::Month);
        let points = build_goal_valuation_history(
            &goal(),
            &allocations,
            &histories,
            &intervals,
            d("2025-04-01"),
            Compounding::Monthly,
        )
        .unwrap();

        assert_eq!(points.len(), 5);
        // principal 500, 100 a month, no return
        assert_eq!(points[0].projected_value, 500.0);
        assert_eq!(points[4].projected_value, 900.0);

        assert_eq!(points[0].actual_value, Some(500.0));
        assert_eq!(points[1].actual_value, Some(700.0));
        // acc-b joins on 2025-03-01 with no growth yet
        assert_eq!(points[2].actual_value, Some(700.0));
        assert_eq!(points[3].actual_value, Some(800.0));
        assert_eq!(points[3].on_track, Some(true));
        assert_eq!(points[4].actual_value, None);
        assert_eq!(points[4].on_track, None);
    }
}
