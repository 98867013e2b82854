use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;
use crate::valuation::valuation_model::AccountValuation;

/// Storage of account valuation history
#[async_trait]
pub trait ValuationRepositoryTrait: Send + Sync {
    /// Valuations sorted by date; both bounds are inclusive.
    fn get_historical_valuations(
        &self,
        account_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AccountValuation>>;

    /// Inserts or replaces on (account_id, valuation_date).
    async fn upsert_valuations(&self, valuations: Vec<AccountValuation>) -> Result<usize>;
}

#[async_trait]
pub trait ValuationServiceTrait: Send + Sync {
    async fn get_historical_valuations(
        &self,
        account_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AccountValuation>>;

    /// Latest value on or before `date`, carried forward from the last snapshot.
    async fn value_on_or_before(&self, account_id: &str, date: NaiveDate) -> Result<Option<f64>>;

    /// `value_on_or_before` for several accounts. Accounts without any
    /// earlier snapshot are left out.
    async fn values_at(&self, account_ids: &[String], date: NaiveDate)
        -> Result<HashMap<String, f64>>;

    async fn upsert_valuations(&self, valuations: Vec<AccountValuation>) -> Result<usize>;
}
