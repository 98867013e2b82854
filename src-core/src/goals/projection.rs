//! Time-value-of-money projections for goal contributions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{add_months, days_in_month, whole_months_between};
use crate::errors::Result;
use crate::goals::goals_model::Goal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compounding {
    #[default]
    Monthly,
    Daily,
}

impl Compounding {
    pub fn periods_per_year(self) -> f64 {
        match self {
            Compounding::Monthly => 12.0,
            Compounding::Daily => 365.0,
        }
    }

    pub fn rate_per_period(self, annual_rate_percent: f64) -> f64 {
        annual_rate_percent / 100.0 / self.periods_per_year()
    }

    /// Spread a monthly contribution over this compounding period.
    pub fn contribution_per_period(self, monthly_contribution: f64) -> f64 {
        match self {
            Compounding::Monthly => monthly_contribution,
            Compounding::Daily => monthly_contribution * 12.0 / 365.0,
        }
    }
}

impl std::str::FromStr for Compounding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(Compounding::Monthly),
            "daily" => Ok(Compounding::Daily),
            other => Err(format!("unknown compounding '{}'", other)),
        }
    }
}

/// Future value of `principal` plus a stream of `contribution`s after
/// `periods` compounding periods.
///
/// `FV = PV(1+r)^n + PMT·((1+r)^n − 1)/r`, or `PV + PMT·n` when `r` is zero.
/// A negative `periods` returns `principal` unchanged.
pub fn project_future_value(
    principal: f64,
    contribution: f64,
    annual_rate_percent: f64,
    periods: f64,
    compounding: Compounding,
) -> f64 {
    if periods < 0.0 {
        return principal;
    }

    let r = compounding.rate_per_period(annual_rate_percent);
    if r == 0.0 {
        return principal + contribution * periods;
    }

    let growth = (1.0 + r).powf(periods);
    principal * growth + contribution * ((growth - 1.0) / r)
}

/// Compounding periods elapsed between `start` and `date`.
///
/// Monthly compounding counts whole months plus the fraction of the
/// following month; daily compounding counts days.
pub fn elapsed_periods(start: NaiveDate, date: NaiveDate, compounding: Compounding) -> f64 {
    match compounding {
        Compounding::Daily => (date - start).num_days() as f64,
        Compounding::Monthly => {
            if date < start {
                return -elapsed_periods(date, start, compounding);
            }
            let whole = whole_months_between(start, date).max(0) as u32;
            let anchor = add_months(start, whole);
            let remaining_days = (date - anchor).num_days() as f64;
            whole as f64 + remaining_days / days_in_month(anchor) as f64
        }
    }
}

/// Projected value of a goal on `date`, growing `principal` at the goal's
/// target return with its monthly investment from the goal start.
///
/// Goals without a start date project to `principal`.
pub fn project_goal_value(
    goal: &Goal,
    principal: f64,
    date: NaiveDate,
    compounding: Compounding,
) -> Result<f64> {
    let Some(start) = goal.start()? else {
        return Ok(principal);
    };

    let periods = elapsed_periods(start, date, compounding);
    let rate = goal.target_return_rate.unwrap_or(0.0);
    let contribution = compounding.contribution_per_period(goal.monthly_investment.unwrap_or(0.0));

    Ok(project_future_value(
        principal,
        contribution,
        rate,
        periods,
        compounding,
    ))
}
