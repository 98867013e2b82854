use crate::constants::MAX_ALLOCATION_PERCENT;
use crate::dates::{format_date, parse_date, parse_optional_date, today};
use crate::errors::{Error, Result, ValidationError};
use crate::goals::allocation_calc::{calculate_segmented_growth, ranges_overlap};
use crate::goals::chart_intervals::{DateIntervals, TimePeriod};
use crate::goals::goal_progress_model::{GoalProgressHistory, GoalProgressSnapshot};
use crate::goals::goals_model::{AllocationVersion, Goal, GoalsAllocation, NewGoal};
use crate::goals::goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
use crate::goals::projection::{project_goal_value, Compounding};
use crate::goals::valuation_history::{
    allocation_detail, build_goal_valuation_history, goal_principal,
};
use crate::valuation::{AccountValuation, ValuationServiceTrait};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::future::try_join_all;
use log::{debug, info};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

/// Tunables for goal calculations
#[derive(Debug, Clone, Copy, Default)]
pub struct GoalSettings {
    pub compounding: Compounding,
}

pub struct GoalService<T: GoalRepositoryTrait> {
    goal_repo: Arc<T>,
    valuation_service: Arc<dyn ValuationServiceTrait>,
    settings: GoalSettings,
}

impl<T: GoalRepositoryTrait> GoalService<T> {
    pub fn new(
        goal_repo: Arc<T>,
        valuation_service: Arc<dyn ValuationServiceTrait>,
        settings: GoalSettings,
    ) -> Self {
        GoalService {
            goal_repo,
            valuation_service,
            settings,
        }
    }

    /// Sum of the percentages of `candidates` on `account_id` whose active
    /// range overlaps `[start, end]`. Candidates without a start are ignored.
    fn overlapping_percent<'a>(
        candidates: impl IntoIterator<Item = &'a GoalsAllocation>,
        account_id: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<f64> {
        let mut total = 0.0;
        for allocation in candidates {
            if allocation.account_id != account_id {
                continue;
            }
            let Some(alloc_start) = allocation.effective_start()? else {
                continue;
            };
            if ranges_overlap(alloc_start, allocation.end()?, start, end) {
                total += allocation.effective_percentage();
            }
        }
        Ok(total)
    }

    pub fn validate_allocation_conflicts(
        &self,
        account_id: &str,
        new_start_date: &str,
        new_end_date: &str,
        new_percent_allocation: f64,
        exclude_allocation_id: Option<&str>,
    ) -> Result<()> {
        let start = parse_date(new_start_date)?;
        let end = parse_optional_date(Some(new_end_date).filter(|s| !s.is_empty()))?;

        // Get allocations that overlap with the new allocation's date range
        let allocations = self.goal_repo.load_allocations_for_non_achieved_goals()?;
        let others = allocations
            .iter()
            .filter(|a| exclude_allocation_id.map_or(true, |exclude_id| a.id != exclude_id));

        let conflicting_percent =
            new_percent_allocation + Self::overlapping_percent(others, account_id, start, end)?;

        if conflicting_percent > MAX_ALLOCATION_PERCENT {
            return Err(Error::invalid_input(format!(
                "Total allocation {:.1}% exceeds 100% on account {} during this period",
                conflicting_percent, account_id
            )));
        }

        Ok(())
    }

    /// Calculate goal progress on a specific date
    /// Parameters:
    ///   goal: The goal to calculate progress for
    ///   allocations: The goal's allocations; only those active on query_date count
    ///   allocation_start_values: Map of allocation_id -> account value when the allocation started
    ///   current_account_values: Map of account_id -> account value at query_date
    ///   query_date: The date to calculate progress for (format: YYYY-MM-DD)
    pub fn calculate_goal_progress_on_date(
        &self,
        goal: &Goal,
        allocations: &[GoalsAllocation],
        allocation_start_values: &HashMap<String, f64>,
        current_account_values: &HashMap<String, f64>,
        query_date: &str,
    ) -> Result<GoalProgressSnapshot> {
        if goal.start_date.is_none() {
            return Err(ValidationError::MissingField("Goal must have a start_date".to_string()).into());
        }
        let date = parse_date(query_date)?;

        let mut init_value = 0.0;
        let mut growth = 0.0;
        let mut allocation_details = Vec::new();

        for allocation in allocations.iter().filter(|a| a.goal_id == goal.id) {
            if !allocation.is_active_on(date)? {
                continue;
            }
            let start_value = allocation_start_values
                .get(&allocation.id)
                .copied()
                .unwrap_or(0.0);
            let current_value = current_account_values
                .get(&allocation.account_id)
                .copied()
                .unwrap_or(0.0);

            let detail = allocation_detail(allocation, start_value, current_value);
            init_value += detail.init_amount;
            growth += detail.allocated_growth;
            allocation_details.push(detail);
        }

        let current_value = init_value + growth;
        let principal = goal_principal(goal, allocations);
        let projected_value = project_goal_value(goal, principal, date, self.settings.compounding)?;
        let progress_percent = if goal.target_amount > 0.0 {
            current_value / goal.target_amount * 100.0
        } else {
            0.0
        };

        Ok(GoalProgressSnapshot {
            goal_id: goal.id.clone(),
            goal_title: goal.title.clone(),
            query_date: query_date.to_string(),
            init_value,
            current_value,
            growth,
            projected_value,
            target_amount: goal.target_amount,
            progress_percent,
            on_track: current_value >= projected_value,
            allocation_details,
        })
    }

    /// Get all active allocations for a specific goal on a given date
    pub fn get_goal_allocations_on_date(
        &self,
        goal_id: &str,
        query_date: &str,
    ) -> Result<Vec<GoalsAllocation>> {
        // an empty account id spans every account
        let active = self
            .goal_repo
            .get_allocations_for_account_on_date("", query_date)?;
        Ok(active.into_iter().filter(|a| a.goal_id == goal_id).collect())
    }

    /// Get unallocated balance for an account
    /// Unallocated = account_current_value - sum(all_goal_allocations)
    pub fn get_unallocated_balance(
        &self,
        account_id: &str,
        current_account_value: f64,
    ) -> Result<f64> {
        let allocations = self.goal_repo.get_allocations_for_account(account_id)?;
        let total_allocated: f64 = allocations.iter().map(|a| a.allocation_amount).sum();
        Ok((current_account_value - total_allocated).max(0.0))
    }

    /// Validate that unallocated balance is sufficient for a new allocation
    pub fn validate_unallocated_balance(
        &self,
        account_id: &str,
        allocation_amount: f64,
        current_account_value: f64,
    ) -> Result<()> {
        let unallocated = self.get_unallocated_balance(account_id, current_account_value)?;

        if allocation_amount > unallocated {
            return Err(Error::invalid_input(format!(
                "Allocation amount {:.2} exceeds available unallocated balance {:.2}",
                allocation_amount, unallocated
            )));
        }

        Ok(())
    }

    /// Validate that total allocation percentages don't exceed 100%
    pub fn validate_allocation_percentages(
        &self,
        account_id: &str,
        new_percentage: f64,
        exclude_allocation_id: Option<&str>,
    ) -> Result<()> {
        let allocations = self.goal_repo.get_allocations_for_account(account_id)?;

        let total_percent = new_percentage
            + allocations
                .iter()
                .filter(|a| exclude_allocation_id.map_or(true, |exclude_id| a.id != exclude_id))
                .map(GoalsAllocation::effective_percentage)
                .sum::<f64>();

        if total_percent > MAX_ALLOCATION_PERCENT {
            return Err(Error::invalid_input(format!(
                "Total allocation percentage {:.1}% exceeds 100% on account {}",
                total_percent, account_id
            )));
        }

        Ok(())
    }

    /// Ensures that at the time of allocation, the account's initial
    /// contributions did not exceed its value.
    pub fn validate_historical_allocation(
        &self,
        account_id: &str,
        allocation_amount: f64,
        allocation_date: &str,
        account_value_at_allocation_date: f64,
    ) -> Result<()> {
        let date = parse_date(allocation_date)?;
        let mut total_allocated_at_date = allocation_amount;

        for alloc in self.goal_repo.get_allocations_for_account(account_id)? {
            if alloc.is_active_on(date)? {
                total_allocated_at_date += alloc.init_amount;
            }
        }

        if total_allocated_at_date > account_value_at_allocation_date {
            return Err(Error::invalid_input(format!(
                "On {}, total allocation {:.2} would exceed account value {:.2}",
                allocation_date, total_allocated_at_date, account_value_at_allocation_date
            )));
        }

        Ok(())
    }

    fn validate_goal_fields(
        title: &str,
        target_amount: f64,
        start_date: Option<&str>,
        due_date: Option<&str>,
    ) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::invalid_input("Goal title cannot be empty"));
        }
        if !(target_amount > 0.0) {
            return Err(Error::invalid_input("Goal target amount must be positive"));
        }
        if let (Some(start), Some(due)) = (parse_optional_date(start_date)?, parse_optional_date(due_date)?) {
            if start > due {
                return Err(Error::invalid_input(format!(
                    "Goal start date {} is after its due date {}",
                    start, due
                )));
            }
        }
        Ok(())
    }

    /// Checks every allocation of a batch against the stored allocations and
    /// the rest of the batch.
    fn validate_allocation_batch(
        &self,
        allocations: &[GoalsAllocation],
        goal_map: &HashMap<String, Goal>,
    ) -> Result<()> {
        let batch_ids: HashSet<&str> = allocations.iter().map(|a| a.id.as_str()).collect();
        let mut active: Vec<&GoalsAllocation> = Vec::new();

        for allocation in allocations {
            let goal = goal_map.get(&allocation.goal_id).ok_or_else(|| {
                Error::NotFound(format!(
                    "Goal '{}' for allocation '{}' not found",
                    allocation.goal_id, allocation.id
                ))
            })?;
            let percentage = allocation.effective_percentage();
            if !(0.0..=MAX_ALLOCATION_PERCENT).contains(&percentage) {
                return Err(Error::invalid_input(format!(
                    "Allocation percentage {:.1}% must be between 0 and 100",
                    percentage
                )));
            }
            if allocation.init_amount < 0.0 {
                return Err(Error::invalid_input("Initial contribution cannot be negative"));
            }
            if !goal.is_achieved {
                active.push(allocation);
            }
        }

        let stored = self.goal_repo.load_allocations_for_non_achieved_goals()?;
        for allocation in &active {
            let Some(start) = allocation.effective_start()? else {
                continue;
            };
            let others = stored
                .iter()
                .filter(|a| !batch_ids.contains(a.id.as_str()))
                .chain(active.iter().copied().filter(|a| a.id != allocation.id));
            let total = allocation.effective_percentage()
                + Self::overlapping_percent(others, &allocation.account_id, start, allocation.end()?)?;
            if total > MAX_ALLOCATION_PERCENT {
                return Err(Error::invalid_input(format!(
                    "Total allocation {:.1}% exceeds 100% on account {} during this period",
                    total, allocation.account_id
                )));
            }
        }
        Ok(())
    }

    /// Opens a new version for each allocation that is new or whose
    /// percentage or amount changed, closing the previous one the day before.
    /// An open version that has not started yet is amended in place.
    async fn record_allocation_versions(&self, allocations: &[GoalsAllocation]) -> Result<()> {
        let as_of = today();
        for allocation in allocations {
            let versions = self.goal_repo.get_allocation_versions(&allocation.id)?;
            let current = versions.iter().find(|v| v.version_end_date.is_none());

            let start = match current {
                None => match allocation.effective_start()? {
                    Some(start) => start,
                    None => as_of,
                },
                Some(v)
                    if v.allocation_percentage == allocation.effective_percentage()
                        && v.allocation_amount == allocation.allocation_amount =>
                {
                    continue
                }
                Some(v) if as_of <= parse_date(&v.version_start_date)? => {
                    self.goal_repo
                        .update_allocation_version(AllocationVersion {
                            allocation_percentage: allocation.effective_percentage(),
                            allocation_amount: allocation.allocation_amount,
                            ..v.clone()
                        })
                        .await?;
                    debug!("Amended pending allocation version for {}", allocation.id);
                    continue;
                }
                Some(_) => {
                    let end = as_of.pred_opt().unwrap_or(as_of);
                    self.goal_repo
                        .close_open_version(&allocation.id, &format_date(end))
                        .await?;
                    as_of
                }
            };

            self.goal_repo
                .insert_allocation_version(AllocationVersion {
                    id: Uuid::new_v4().to_string(),
                    allocation_id: allocation.id.clone(),
                    allocation_percentage: allocation.effective_percentage(),
                    allocation_amount: allocation.allocation_amount,
                    version_start_date: format_date(start),
                    version_end_date: None,
                    created_at: Utc::now().to_rfc3339(),
                })
                .await?;
            debug!("Recorded allocation version for {}", allocation.id);
        }
        Ok(())
    }

    fn resolve_date(date: Option<&str>) -> Result<NaiveDate> {
        match date {
            Some(d) => parse_date(d),
            None => Ok(today()),
        }
    }
}

#[async_trait]
impl<T: GoalRepositoryTrait + Send + Sync> GoalServiceTrait for GoalService<T> {
    fn get_goals(&self) -> Result<Vec<Goal>> {
        self.goal_repo.load_goals()
    }

    async fn create_goal(&self, new_goal: NewGoal) -> Result<Goal> {
        Self::validate_goal_fields(
            &new_goal.title,
            new_goal.target_amount,
            new_goal.start_date.as_deref(),
            new_goal.due_date.as_deref(),
        )?;
        let goal = self.goal_repo.insert_new_goal(new_goal).await?;
        info!("Created goal '{}' ({})", goal.title, goal.id);
        Ok(goal)
    }

    async fn update_goal(&self, updated_goal_data: Goal) -> Result<Goal> {
        Self::validate_goal_fields(
            &updated_goal_data.title,
            updated_goal_data.target_amount,
            updated_goal_data.start_date.as_deref(),
            updated_goal_data.due_date.as_deref(),
        )?;
        self.goal_repo.update_goal(updated_goal_data).await
    }

    async fn delete_goal(&self, goal_id_to_delete: String) -> Result<usize> {
        match self.goal_repo.delete_goal(goal_id_to_delete.clone()).await? {
            0 => Err(Error::NotFound(format!("Goal '{}' not found", goal_id_to_delete))),
            deleted => Ok(deleted),
        }
    }

    async fn upsert_goal_allocations(&self, mut allocations: Vec<GoalsAllocation>) -> Result<usize> {
        // Backfill allocation dates from their associated goals
        let goals = self.goal_repo.load_goals()?;
        let goal_map: HashMap<String, Goal> = goals
            .into_iter()
            .map(|g| (g.id.clone(), g))
            .collect();

        for allocation in &mut allocations {
            if allocation.id.is_empty() {
                allocation.id = Uuid::new_v4().to_string();
            }
            if let Some(goal) = goal_map.get(&allocation.goal_id) {
                if allocation.start_date.is_none() {
                    allocation.start_date = goal.start_date.clone();
                }
                if allocation.end_date.is_none() {
                    allocation.end_date = goal.due_date.clone();
                }
            }
            if allocation.allocation_date.is_none() {
                allocation.allocation_date = allocation.start_date.clone();
            }
        }

        self.validate_allocation_batch(&allocations, &goal_map)?;
        self.record_allocation_versions(&allocations).await?;
        let count = self.goal_repo.upsert_goal_allocations(allocations).await?;
        info!("Upserted {} goal allocation(s)", count);
        Ok(count)
    }

    fn load_goals_allocations(&self) -> Result<Vec<GoalsAllocation>> {
        self.goal_repo.load_allocations_for_non_achieved_goals()
    }

    async fn delete_goal_allocation(&self, allocation_id: String) -> Result<usize> {
        match self.goal_repo.delete_allocation(allocation_id.clone()).await? {
            0 => Err(Error::NotFound(format!("Allocation '{}' not found", allocation_id))),
            deleted => Ok(deleted),
        }
    }

    fn get_goal_allocations(&self, goal_id: &str) -> Result<Vec<GoalsAllocation>> {
        self.goal_repo.get_allocations_for_goal(goal_id)
    }

    fn get_goal_allocations_on_date(
        &self,
        goal_id: &str,
        query_date: &str,
    ) -> Result<Vec<GoalsAllocation>> {
        self.get_goal_allocations_on_date(goal_id, query_date)
    }

    fn get_allocation_versions(&self, allocation_id: &str) -> Result<Vec<AllocationVersion>> {
        self.goal_repo.get_allocation_versions(allocation_id)
    }

    async fn get_goal_progress(
        &self,
        goal_id: &str,
        query_date: Option<&str>,
    ) -> Result<GoalProgressSnapshot> {
        let goal = self.goal_repo.get_goal(goal_id)?;
        let date = Self::resolve_date(query_date)?;
        let allocations = self.goal_repo.get_allocations_for_goal(goal_id)?;

        let mut allocation_start_values = HashMap::new();
        for allocation in &allocations {
            if let Some(start) = allocation.effective_start()? {
                if let Some(value) = self
                    .valuation_service
                    .value_on_or_before(&allocation.account_id, start)
                    .await?
                {
                    allocation_start_values.insert(allocation.id.clone(), value);
                }
            }
        }

        let account_ids: Vec<String> = allocations
            .iter()
            .map(|a| a.account_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let current_account_values = self.valuation_service.values_at(&account_ids, date).await?;

        self.calculate_goal_progress_on_date(
            &goal,
            &allocations,
            &allocation_start_values,
            &current_account_values,
            &format_date(date),
        )
    }

    async fn get_goal_valuation_history(
        &self,
        goal_id: &str,
        period: TimePeriod,
        today_override: Option<&str>,
    ) -> Result<GoalProgressHistory> {
        let goal = self.goal_repo.get_goal(goal_id)?;
        let today = Self::resolve_date(today_override)?;
        let intervals = DateIntervals::for_goal(period, goal.start()?, goal.due()?, today);
        let allocations = self.goal_repo.get_allocations_for_goal(goal_id)?;

        let account_ids: BTreeSet<&str> = allocations.iter().map(|a| a.account_id.as_str()).collect();
        let end = intervals.end().min(today);
        let fetches = account_ids.into_iter().map(|account_id| async move {
            let history = self
                .valuation_service
                .get_historical_valuations(account_id, None, Some(end))
                .await?;
            Ok::<_, Error>((account_id.to_string(), history))
        });
        let histories: HashMap<String, Vec<AccountValuation>> =
            try_join_all(fetches).await?.into_iter().collect();

        let points = build_goal_valuation_history(
            &goal,
            &allocations,
            &histories,
            &intervals,
            today,
            self.settings.compounding,
        )?;

        Ok(GoalProgressHistory {
            goal_id: goal.id.clone(),
            goal_title: goal.title.clone(),
            period,
            start_date: format_date(intervals.start()),
            end_date: format_date(intervals.end()),
            target_amount: goal.target_amount,
            points,
        })
    }

    async fn calculate_allocation_segmented_growth(
        &self,
        allocation_id: &str,
        query_date: &str,
    ) -> Result<f64> {
        let allocation = self.goal_repo.get_allocation_by_id(allocation_id)?;
        let date = parse_date(query_date)?;
        let versions = self.goal_repo.get_allocation_versions(allocation_id)?;

        let periods: Vec<(f64, NaiveDate, Option<NaiveDate>)> = if versions.is_empty() {
            match allocation.effective_start()? {
                Some(start) => vec![(allocation.effective_percentage(), start, allocation.end()?)],
                None => Vec::new(),
            }
        } else {
            versions
                .iter()
                .map(|v| -> Result<(f64, NaiveDate, Option<NaiveDate>)> {
                    Ok((
                        v.allocation_percentage,
                        parse_date(&v.version_start_date)?,
                        parse_optional_date(v.version_end_date.as_deref())?,
                    ))
                })
                .collect::<Result<_>>()?
        };

        let mut segments = Vec::new();
        for (percentage, start, end) in periods {
            if start > date {
                continue;
            }
            let segment_end = end.map_or(date, |e| e.min(date));
            if segment_end < start {
                continue;
            }
            let account_id = &allocation.account_id;
            let start_value = self
                .valuation_service
                .value_on_or_before(account_id, start)
                .await?
                .unwrap_or(0.0);
            let end_value = self
                .valuation_service
                .value_on_or_before(account_id, segment_end)
                .await?
                .unwrap_or(0.0);
            segments.push((percentage, start_value, end_value));
        }

        Ok(calculate_segmented_growth(&segments))
    }

    fn validate_allocation_conflicts(
        &self,
        account_id: &str,
        start_date: &str,
        end_date: &str,
        percent_allocation: f64,
        exclude_allocation_id: Option<&str>,
    ) -> Result<()> {
        self.validate_allocation_conflicts(
            account_id,
            start_date,
            end_date,
            percent_allocation,
            exclude_allocation_id,
        )
    }

    fn get_unallocated_balance(&self, account_id: &str, current_account_value: f64) -> Result<f64> {
        self.get_unallocated_balance(account_id, current_account_value)
    }

    fn validate_unallocated_balance(
        &self,
        account_id: &str,
        allocation_amount: f64,
        current_account_value: f64,
    ) -> Result<()> {
        self.validate_unallocated_balance(account_id, allocation_amount, current_account_value)
    }

    fn validate_allocation_percentages(
        &self,
        account_id: &str,
        new_percentage: f64,
        exclude_allocation_id: Option<&str>,
    ) -> Result<()> {
        self.validate_allocation_percentages(account_id, new_percentage, exclude_allocation_id)
    }

    fn validate_historical_allocation(
        &self,
        account_id: &str,
        allocation_amount: f64,
        allocation_date: &str,
        account_value_at_allocation_date: f64,
    ) -> Result<()> {
        self.validate_historical_allocation(
            account_id,
            allocation_amount,
            allocation_date,
            account_value_at_allocation_date,
        )
    }

    async fn get_historical_valuations(
        &self,
        account_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<AccountValuation>> {
        let start = parse_optional_date(start_date)?;
        let end = parse_optional_date(end_date)?;
        self.valuation_service
            .get_historical_valuations(account_id, start, end)
            .await
    }

    async fn upsert_valuations(&self, valuations: Vec<AccountValuation>) -> Result<usize> {
        self.valuation_service.upsert_valuations(valuations).await
    }
}
