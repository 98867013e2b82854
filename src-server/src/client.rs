//! Typed HTTP client for the goals API.
//!
//! Mirrors the `/api/v1` routes one method per route so front ends and
//! scripts do not have to assemble URLs and bodies by hand.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use wealthgoals_core::goals::{
    AllocationVersion, Goal, GoalProgressHistory, GoalProgressSnapshot, GoalsAllocation, NewGoal,
    TimePeriod,
};
use wealthgoals_core::valuation::AccountValuation;

use crate::api::goals::{
    AllocationConflictValidationRequest, AllocationPercentageValidationRequest,
    AllocationValidationResponse, UnallocatedBalanceResponse, UnallocatedBalanceValidationRequest,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid base url '{0}'")]
    InvalidUrl(String),
    #[error("http {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidUrl(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

#[derive(Debug, Clone)]
pub struct GoalsApiClient {
    http: Client,
    base_url: Url,
}

impl GoalsApiClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// `base_url` is the server root, e.g. `http://127.0.0.1:8088`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let raw = base_url.into();
        let base_url = Url::parse(&raw)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ClientError::InvalidUrl(raw.clone()))?;
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("wealthgoals/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base_url })
    }

    /// Appends `segments` to the server root, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut full = vec!["api", "v1"];
        full.extend_from_slice(segments);
        self.endpoint(&full)
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let raw = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorBody>(&raw) {
            Ok(body) => (body.code, body.message),
            Err(_) => ("unknown".to_string(), raw),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            code,
            message,
        })
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    async fn send_empty(request: RequestBuilder) -> Result<(), ClientError> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    pub async fn get_goals(&self) -> Result<Vec<Goal>, ClientError> {
        Self::send_json(self.http.get(self.url(&["goals"])?)).await
    }

    pub async fn create_goal(&self, goal: &NewGoal) -> Result<Goal, ClientError> {
        Self::send_json(self.http.post(self.url(&["goals"])?).json(goal)).await
    }

    pub async fn update_goal(&self, goal: &Goal) -> Result<Goal, ClientError> {
        Self::send_json(self.http.put(self.url(&["goals"])?).json(goal)).await
    }

    pub async fn delete_goal(&self, goal_id: &str) -> Result<(), ClientError> {
        Self::send_empty(self.http.delete(self.url(&["goals", goal_id])?)).await
    }

    pub async fn load_goals_allocations(&self) -> Result<Vec<GoalsAllocation>, ClientError> {
        Self::send_json(self.http.get(self.url(&["goals", "allocations"])?)).await
    }

    pub async fn upsert_goal_allocations(
        &self,
        allocations: &[GoalsAllocation],
    ) -> Result<(), ClientError> {
        Self::send_empty(
            self.http
                .post(self.url(&["goals", "allocations"])?)
                .json(allocations),
        )
        .await
    }

    pub async fn delete_goal_allocation(&self, allocation_id: &str) -> Result<(), ClientError> {
        Self::send_empty(
            self.http
                .delete(self.url(&["goals", "allocations", allocation_id])?),
        )
        .await
    }

    pub async fn get_allocation_versions(
        &self,
        allocation_id: &str,
    ) -> Result<Vec<AllocationVersion>, ClientError> {
        Self::send_json(
            self.http
                .get(self.url(&["goals", "allocations", allocation_id, "versions"])?),
        )
        .await
    }

    pub async fn get_goal_progress(
        &self,
        goal_id: &str,
        date: Option<&str>,
    ) -> Result<GoalProgressSnapshot, ClientError> {
        let mut request = self
            .http
            .get(self.url(&["goals", goal_id, "progress"])?);
        if let Some(date) = date {
            request = request.query(&[("date", date)]);
        }
        Self::send_json(request).await
    }

    pub async fn get_goal_allocations_on_date(
        &self,
        goal_id: &str,
        date: Option<&str>,
    ) -> Result<Vec<GoalsAllocation>, ClientError> {
        let mut request = self
            .http
            .get(self.url(&["goals", goal_id, "allocations-on-date"])?);
        if let Some(date) = date {
            request = request.query(&[("date", date)]);
        }
        Self::send_json(request).await
    }

    pub async fn get_goal_valuation_history(
        &self,
        goal_id: &str,
        period: TimePeriod,
        today: Option<&str>,
    ) -> Result<GoalProgressHistory, ClientError> {
        let mut request = self
            .http
            .get(self.url(&["goals", goal_id, "valuation-history"])?)
            .query(&[("period", period.as_str())]);
        if let Some(today) = today {
            request = request.query(&[("today", today)]);
        }
        Self::send_json(request).await
    }

    pub async fn validate_allocation_conflict(
        &self,
        request: &AllocationConflictValidationRequest,
    ) -> Result<AllocationValidationResponse, ClientError> {
        Self::send_json(
            self.http
                .post(self.url(&["goals", "validate-allocation-conflict"])?)
                .json(request),
        )
        .await
    }

    pub async fn validate_allocation_percentages(
        &self,
        request: &AllocationPercentageValidationRequest,
    ) -> Result<AllocationValidationResponse, ClientError> {
        Self::send_json(
            self.http
                .post(self.url(&["goals", "validate-allocation-percentages"])?)
                .json(request),
        )
        .await
    }

    pub async fn validate_unallocated_balance(
        &self,
        request: &UnallocatedBalanceValidationRequest,
    ) -> Result<AllocationValidationResponse, ClientError> {
        Self::send_json(
            self.http
                .post(self.url(&["goals", "validate-unallocated-balance"])?)
                .json(request),
        )
        .await
    }

    pub async fn get_unallocated_balance(
        &self,
        account_id: &str,
        current_account_value: f64,
    ) -> Result<f64, ClientError> {
        let response: UnallocatedBalanceResponse = Self::send_json(
            self.http
                .get(self.url(&["accounts", account_id, "unallocated-balance"])?)
                .query(&[("currentAccountValue", current_account_value)]),
        )
        .await?;
        Ok(response.unallocated_balance)
    }

    pub async fn get_historical_valuations(
        &self,
        account_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<AccountValuation>, ClientError> {
        let mut request = self
            .http
            .get(self.url(&["valuations", "history"])?)
            .query(&[("accountId", account_id)]);
        if let Some(start) = start_date {
            request = request.query(&[("startDate", start)]);
        }
        if let Some(end) = end_date {
            request = request.query(&[("endDate", end)]);
        }
        Self::send_json(request).await
    }

    pub async fn upsert_valuations(
        &self,
        valuations: &[AccountValuation],
    ) -> Result<usize, ClientError> {
        Self::send_json(self.http.post(self.url(&["valuations"])?).json(valuations)).await
    }

    pub async fn healthz(&self) -> Result<(), ClientError> {
        Self::send_empty(self.http.get(self.endpoint(&["healthz"])?)).await
    }
}
