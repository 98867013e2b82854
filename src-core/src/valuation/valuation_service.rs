//! Valuation Service - cached access to account valuation history
//!
//! Full per-account histories are cached and every write invalidates the
//! whole cache, so readers never see a history older than the last upsert.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::try_join_all;
use log::debug;
use moka::future::Cache;

use crate::constants::{VALUATION_CACHE_CAPACITY, VALUATION_CACHE_TTL_SECS};
use crate::errors::{Error, Result};
use crate::valuation::valuation_model::{value_on_or_before, AccountValuation};
use crate::valuation::valuation_traits::{ValuationRepositoryTrait, ValuationServiceTrait};

pub struct ValuationService {
    repository: Arc<dyn ValuationRepositoryTrait>,
    /// account_id -> full history sorted by date
    history_cache: Cache<String, Arc<Vec<AccountValuation>>>,
}

impl ValuationService {
    pub fn new(repository: Arc<dyn ValuationRepositoryTrait>) -> Self {
        let history_cache = Cache::builder()
            .max_capacity(VALUATION_CACHE_CAPACITY)
            .time_to_live(Duration::from_secs(VALUATION_CACHE_TTL_SECS))
            .build();
        Self {
            repository,
            history_cache,
        }
    }

    async fn account_history(&self, account_id: &str) -> Result<Arc<Vec<AccountValuation>>> {
        let repository = self.repository.clone();
        let id = account_id.to_string();
        self.history_cache
            .try_get_with(account_id.to_string(), async move {
                debug!("Loading valuation history for account {}", id);
                repository
                    .get_historical_valuations(&id, None, None)
                    .map(Arc::new)
            })
            .await
            .map_err(|e: Arc<Error>| Error::Valuation(e.to_string()))
    }
}

#[async_trait]
impl ValuationServiceTrait for ValuationService {
    async fn get_historical_valuations(
        &self,
        account_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AccountValuation>> {
        let history = self.account_history(account_id).await?;
        Ok(history
            .iter()
            .filter(|v| start_date.map_or(true, |start| v.valuation_date >= start))
            .filter(|v| end_date.map_or(true, |end| v.valuation_date <= end))
            .cloned()
            .collect())
    }

    async fn value_on_or_before(&self, account_id: &str, date: NaiveDate) -> Result<Option<f64>> {
        let history = self.account_history(account_id).await?;
        Ok(value_on_or_before(&history, date))
    }

    async fn values_at(
        &self,
        account_ids: &[String],
        date: NaiveDate,
    ) -> Result<HashMap<String, f64>> {
        let lookups = account_ids.iter().map(|account_id| async move {
            let value = self.value_on_or_before(account_id, date).await?;
            Ok::<_, Error>((account_id.clone(), value))
        });

        Ok(try_join_all(lookups)
            .await?
            .into_iter()
            .filter_map(|(account_id, value)| value.map(|v| (account_id, v)))
            .collect())
    }

    /// A history load already in flight when this runs may still land in
    /// the cache afterwards, so readers can see the pre-upsert history for up
    /// to `VALUATION_CACHE_TTL_SECS`.
    async fn upsert_valuations(&self, valuations: Vec<AccountValuation>) -> Result<usize> {
        let count = self.repository.upsert_valuations(valuations).await?;
        self.history_cache.invalidate_all();
        debug!("Upserted {} valuations, history cache invalidated", count);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use crate::valuation::InMemoryValuationRepository;

    fn valuation(account_id: &str, date: &str, total_value: f64) -> AccountValuation {
        AccountValuation {
            account_id: account_id.to_string(),
            valuation_date: parse_date(date).unwrap(),
            total_value,
        }
    }

    async fn service() -> ValuationService {
        let service = ValuationService::new(Arc::new(InMemoryValuationRepository::new()));
        service
            .upsert_valuations(vec![
                valuation("acc-1", "2025-01-01", 1_000.0),
                valuation("acc-1", "2025-01-03", 1_500.0),
                valuation("acc-1", "2025-01-02", 1_200.0),
                valuation("acc-2", "2025-01-02", 500.0),
            ])
            .await
            .unwrap();
        service
    }

    #[tokio::test]
    async fn range_queries_are_inclusive_and_sorted() {
        let service = service().await;
        let history = service
            .get_historical_valuations(
                "acc-1",
                Some(parse_date("2025-01-02").unwrap()),
                Some(parse_date("2025-01-03").unwrap()),
            )
            .await
            .unwrap();
        let values: Vec<f64> = history.iter().map(|v| v.total_value).collect();
        assert_eq!(values, vec![1_200.0, 1_500.0]);

        let unknown = service.get_historical_valuations("nope", None, None).await.unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn values_carry_forward() {
        let service = service().await;
        let d = |s| parse_date(s).unwrap();

        assert_eq!(service.value_on_or_before("acc-1", d("2024-12-31")).await.unwrap(), None);
        assert_eq!(
            service.value_on_or_before("acc-1", d("2025-01-02")).await.unwrap(),
            Some(1_200.0)
        );
        assert_eq!(
            service.value_on_or_before("acc-1", d("2025-06-01")).await.unwrap(),
            Some(1_500.0)
        );

        let ids = vec!["acc-1".to_string(), "acc-2".to_string(), "acc-3".to_string()];
        let values = service.values_at(&ids, d("2025-01-01")).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("acc-1"), Some(&1_000.0));
    }

    #[tokio::test]
    async fn upsert_invalidates_cached_history() {
        let service = service().await;
        let d = parse_date("2025-01-03").unwrap();
        assert_eq!(service.value_on_or_before("acc-1", d).await.unwrap(), Some(1_500.0));

        service
            .upsert_valuations(vec![valuation("acc-1", "2025-01-03", 1_750.0)])
            .await
            .unwrap();
        assert_eq!(service.value_on_or_before("acc-1", d).await.unwrap(), Some(1_750.0));
    }
}
