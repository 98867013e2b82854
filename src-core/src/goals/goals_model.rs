use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{parse_date, parse_optional_date};
use crate::errors::Result;

#[derive(PartialEq, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub target_amount: f64,
    pub is_achieved: bool,
    pub target_return_rate: Option<f64>,
    pub due_date: Option<String>,
    pub monthly_investment: Option<f64>,
    pub start_date: Option<String>,
    pub initial_actual_value: Option<f64>,
}

impl Goal {
    pub fn start(&self) -> Result<Option<NaiveDate>> {
        parse_optional_date(self.start_date.as_deref())
    }

    pub fn due(&self) -> Result<Option<NaiveDate>> {
        parse_optional_date(self.due_date.as_deref())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewGoal {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub target_amount: f64,
    #[serde(default)]
    pub is_achieved: bool,
    pub target_return_rate: Option<f64>,
    pub due_date: Option<String>,
    pub monthly_investment: Option<f64>,
    pub start_date: Option<String>,
    pub initial_actual_value: Option<f64>,
}

impl NewGoal {
    pub fn into_goal(self, id: String) -> Goal {
        Goal {
            id,
            title: self.title,
            description: self.description,
            target_amount: self.target_amount,
            is_achieved: self.is_achieved,
            target_return_rate: self.target_return_rate,
            due_date: self.due_date,
            monthly_investment: self.monthly_investment,
            start_date: self.start_date,
            initial_actual_value: self.initial_actual_value,
        }
    }
}

/// Binding of part of an account to a goal.
///
/// Two schemas live side by side: the legacy `percent_allocation` /
/// `allocation_amount` / `start_date` / `end_date` fields and the current
/// `allocation_percentage` / `init_amount` / `allocation_date` fields. Use the
/// `effective_*` accessors instead of reading either set directly.
#[derive(PartialEq, Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct GoalsAllocation {
    pub id: String,
    #[serde(default)]
    pub percent_allocation: i32, // legacy whole-number percentage
    pub goal_id: String,
    pub account_id: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub init_amount: f64,
    #[serde(default)]
    pub allocation_amount: f64,
    #[serde(default)]
    pub allocation_percentage: f64,
    pub allocation_date: Option<String>,
}

impl GoalsAllocation {
    /// Percentage in the 0-100 range
    pub fn effective_percentage(&self) -> f64 {
        if self.allocation_percentage > 0.0 {
            self.allocation_percentage
        } else {
            self.percent_allocation as f64
        }
    }

    pub fn effective_start_date(&self) -> Option<&str> {
        self.allocation_date
            .as_deref()
            .or(self.start_date.as_deref())
    }

    pub fn effective_start(&self) -> Result<Option<NaiveDate>> {
        parse_optional_date(self.effective_start_date())
    }

    pub fn end(&self) -> Result<Option<NaiveDate>> {
        parse_optional_date(self.end_date.as_deref())
    }

    /// An allocation without any start date is never active.
    pub fn is_active_on(&self, date: NaiveDate) -> Result<bool> {
        let Some(start) = self.effective_start()? else {
            return Ok(false);
        };
        if start > date {
            return Ok(false);
        }
        Ok(match self.end()? {
            Some(end) => end >= date,
            None => true,
        })
    }

    pub fn is_active_on_str(&self, date: &str) -> Result<bool> {
        self.is_active_on(parse_date(date)?)
    }
}

#[derive(PartialEq, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AllocationVersion {
    pub id: String,
    pub allocation_id: String,
    pub allocation_percentage: f64,
    pub allocation_amount: f64,
    pub version_start_date: String,
    pub version_end_date: Option<String>,
    pub created_at: String,
}
