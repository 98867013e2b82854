use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;

use crate::errors::Result;
use crate::valuation::valuation_model::AccountValuation;
use crate::valuation::valuation_traits::ValuationRepositoryTrait;

/// Valuation history held in memory, one date-ordered map per account.
#[derive(Default)]
pub struct InMemoryValuationRepository {
    accounts: DashMap<String, BTreeMap<NaiveDate, f64>>,
}

impl InMemoryValuationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ValuationRepositoryTrait for InMemoryValuationRepository {
    fn get_historical_valuations(
        &self,
        account_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AccountValuation>> {
        let Some(history) = self.accounts.get(account_id) else {
            return Ok(Vec::new());
        };

        let start = start_date.unwrap_or(NaiveDate::MIN);
        let end = end_date.unwrap_or(NaiveDate::MAX);
        if start > end {
            return Ok(Vec::new());
        }

        Ok(history
            .range(start..=end)
            .map(|(date, value)| AccountValuation {
                account_id: account_id.to_string(),
                valuation_date: *date,
                total_value: *value,
            })
            .collect())
    }

    async fn upsert_valuations(&self, valuations: Vec<AccountValuation>) -> Result<usize> {
        let count = valuations.len();
        for valuation in valuations {
            self.accounts
                .entry(valuation.account_id)
                .or_default()
                .insert(valuation.valuation_date, valuation.total_value);
        }
        Ok(count)
    }
}
