use crate::errors::Result;
use crate::goals::chart_intervals::TimePeriod;
use crate::goals::goal_progress_model::{GoalProgressHistory, GoalProgressSnapshot};
use crate::goals::goals_model::{AllocationVersion, Goal, GoalsAllocation, NewGoal};
use crate::valuation::AccountValuation;
use async_trait::async_trait;

/// Trait for goal repository operations
#[async_trait]
pub trait GoalRepositoryTrait: Send + Sync {
    fn load_goals(&self) -> Result<Vec<Goal>>;
    fn get_goal(&self, goal_id: &str) -> Result<Goal>;
    async fn insert_new_goal(&self, new_goal: NewGoal) -> Result<Goal>;
    async fn update_goal(&self, goal_update: Goal) -> Result<Goal>;
    /// Removes the goal together with its allocations and their versions.
    async fn delete_goal(&self, goal_id_to_delete: String) -> Result<usize>;
    fn load_allocations_for_non_achieved_goals(&self) -> Result<Vec<GoalsAllocation>>;
    async fn upsert_goal_allocations(&self, allocations: Vec<GoalsAllocation>) -> Result<usize>;
    /// An empty `account_id` matches every account.
    fn get_allocations_for_account_on_date(
        &self,
        account_id: &str,
        query_date: &str,
    ) -> Result<Vec<GoalsAllocation>>;
    fn get_allocations_for_goal(&self, goal_id: &str) -> Result<Vec<GoalsAllocation>>;
    fn get_allocation_versions(&self, allocation_id: &str) -> Result<Vec<AllocationVersion>>;
    fn get_allocation_by_id(&self, allocation_id: &str) -> Result<GoalsAllocation>;
    fn get_allocations_for_account(&self, account_id: &str) -> Result<Vec<GoalsAllocation>>;
    async fn insert_allocation_version(&self, version: AllocationVersion) -> Result<AllocationVersion>;
    /// Sets `version_end_date` on the allocation's open version, if any.
    async fn close_open_version(&self, allocation_id: &str, end_date: &str) -> Result<usize>;
    /// Replaces the stored version that has the same id.
    async fn update_allocation_version(&self, version: AllocationVersion) -> Result<AllocationVersion>;
    async fn delete_allocation(&self, allocation_id: String) -> Result<usize>;
}

/// Trait for goal service operations
#[async_trait]
pub trait GoalServiceTrait: Send + Sync {
    fn get_goals(&self) -> Result<Vec<Goal>>;
    async fn create_goal(&self, new_goal: NewGoal) -> Result<Goal>;
    async fn update_goal(&self, updated_goal_data: Goal) -> Result<Goal>;
    async fn delete_goal(&self, goal_id_to_delete: String) -> Result<usize>;
    async fn upsert_goal_allocations(&self, allocations: Vec<GoalsAllocation>) -> Result<usize>;
    fn load_goals_allocations(&self) -> Result<Vec<GoalsAllocation>>;
    async fn delete_goal_allocation(&self, allocation_id: String) -> Result<usize>;
    fn get_goal_allocations(&self, goal_id: &str) -> Result<Vec<GoalsAllocation>>;
    fn get_goal_allocations_on_date(
        &self,
        goal_id: &str,
        query_date: &str,
    ) -> Result<Vec<GoalsAllocation>>;
    fn get_allocation_versions(&self, allocation_id: &str) -> Result<Vec<AllocationVersion>>;
    async fn get_goal_progress(
        &self,
        goal_id: &str,
        query_date: Option<&str>,
    ) -> Result<GoalProgressSnapshot>;
    async fn get_goal_valuation_history(
        &self,
        goal_id: &str,
        period: TimePeriod,
        today: Option<&str>,
    ) -> Result<GoalProgressHistory>;
    async fn calculate_allocation_segmented_growth(
        &self,
        allocation_id: &str,
        query_date: &str,
    ) -> Result<f64>;
    fn validate_allocation_conflicts(
        &self,
        account_id: &str,
        start_date: &str,
        end_date: &str,
        percent_allocation: f64,
        exclude_allocation_id: Option<&str>,
    ) -> Result<()>;
    fn get_unallocated_balance(&self, account_id: &str, current_account_value: f64) -> Result<f64>;
    fn validate_unallocated_balance(
        &self,
        account_id: &str,
        allocation_amount: f64,
        current_account_value: f64,
    ) -> Result<()>;
    fn validate_allocation_percentages(
        &self,
        account_id: &str,
        new_percentage: f64,
        exclude_allocation_id: Option<&str>,
    ) -> Result<()>;
    fn validate_historical_allocation(
        &self,
        account_id: &str,
        allocation_amount: f64,
        allocation_date: &str,
        account_value_at_allocation_date: f64,
    ) -> Result<()>;
    async fn get_historical_valuations(
        &self,
        account_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<AccountValuation>>;
    async fn upsert_valuations(&self, valuations: Vec<AccountValuation>) -> Result<usize>;
}
