//! Tick dates for goal progress charts.
//!
//! A [`DateIntervals`] is a plan: a window and a step. Iterating it yields
//! the dates lazily, and the plan can be iterated again any number of times.

use std::iter::FusedIterator;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ALL_MONTHLY_MAX_MONTHS, ALL_WEEKLY_MAX_DAYS, MONTHS_LOOK_BACK, MONTHS_LOOK_FORWARD,
    WEEKS_LOOK_BACK, WEEKS_LOOK_FORWARD, YEARS_LOOK_BACK, YEARS_LOOK_FORWARD,
};
use crate::dates::{add_months, sub_months, whole_months_between};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    Weeks,
    #[default]
    Months,
    Years,
    All,
}

impl TimePeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            TimePeriod::Weeks => "weeks",
            TimePeriod::Months => "months",
            TimePeriod::Years => "years",
            TimePeriod::All => "all",
        }
    }
}

impl std::str::FromStr for TimePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weeks" => Ok(TimePeriod::Weeks),
            "months" => Ok(TimePeriod::Months),
            "years" => Ok(TimePeriod::Years),
            "all" => Ok(TimePeriod::All),
            other => Err(format!("unknown time period '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Week,
    Month,
    Year,
}

impl Step {
    pub fn forward(self, anchor: NaiveDate, count: u32) -> NaiveDate {
        match self {
            Step::Week => anchor
                .checked_add_signed(Duration::weeks(count as i64))
                .unwrap_or(NaiveDate::MAX),
            Step::Month => add_months(anchor, count),
            Step::Year => add_months(anchor, count.saturating_mul(12)),
        }
    }

    pub fn back(self, anchor: NaiveDate, count: u32) -> NaiveDate {
        match self {
            Step::Week => anchor
                .checked_sub_signed(Duration::weeks(count as i64))
                .unwrap_or(NaiveDate::MIN),
            Step::Month => sub_months(anchor, count),
            Step::Year => sub_months(anchor, count.saturating_mul(12)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateIntervals {
    start: NaiveDate,
    end: NaiveDate,
    step: Step,
}

impl DateIntervals {
    /// A window `[start, end]` ticked every `step`. `end` is raised to
    /// `start` if it lies before it.
    pub fn new(start: NaiveDate, end: NaiveDate, step: Step) -> Self {
        Self {
            start,
            end: end.max(start),
            step,
        }
    }

    /// Ticks for a goal chart.
    ///
    /// `All` spans the goal's lifetime. The other periods center a fixed
    /// window on `today`, clamped to the goal's start and due dates; when the
    /// clamped window is empty it collapses to `[goal_start, goal_due]`.
    pub fn for_goal(
        period: TimePeriod,
        goal_start: Option<NaiveDate>,
        goal_due: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let (back, forward, step) = match period {
            TimePeriod::Weeks => (WEEKS_LOOK_BACK, WEEKS_LOOK_FORWARD, Step::Week),
            TimePeriod::Months => (MONTHS_LOOK_BACK, MONTHS_LOOK_FORWARD, Step::Month),
            TimePeriod::Years => (YEARS_LOOK_BACK, YEARS_LOOK_FORWARD, Step::Year),
            TimePeriod::All => {
                let start = goal_start.unwrap_or(today);
                let end = goal_due.unwrap_or_else(|| add_months(today, 12)).max(start);
                return Self::new(start, end, step_for_span(start, end));
            }
        };

        let mut start = step.back(today, back);
        let mut end = step.forward(today, forward);
        if let Some(goal_start) = goal_start {
            start = start.max(goal_start);
        }
        if let Some(goal_due) = goal_due {
            end = end.min(goal_due);
        }

        if start > end {
            let span_start = goal_start.unwrap_or(end);
            let span_end = goal_due.unwrap_or(span_start).max(span_start);
            return Self::new(span_start, span_end, step);
        }

        Self::new(start, end, step)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn iter(&self) -> IntervalIter {
        IntervalIter {
            plan: *self,
            index: 0,
            done: false,
        }
    }
}

impl IntoIterator for &DateIntervals {
    type Item = NaiveDate;
    type IntoIter = IntervalIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn step_for_span(start: NaiveDate, end: NaiveDate) -> Step {
    if (end - start).num_days() <= ALL_WEEKLY_MAX_DAYS {
        Step::Week
    } else if whole_months_between(start, end) <= ALL_MONTHLY_MAX_MONTHS as i32 {
        Step::Month
    } else {
        Step::Year
    }
}

/// Ticks computed as `start + k * step`, finishing with the window end.
#[derive(Debug, Clone)]
pub struct IntervalIter {
    plan: DateIntervals,
    index: u32,
    done: bool,
}

impl Iterator for IntervalIter {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let date = self.plan.step.forward(self.plan.start, self.index);
        if date >= self.plan.end {
            self.done = true;
            return Some(self.plan.end);
        }
        self.index += 1;
        Some(date)
    }
}

impl FusedIterator for IntervalIter {}
