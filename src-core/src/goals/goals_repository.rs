use crate::dates::parse_date;
use crate::errors::{Error, Result};
use crate::goals::goals_model::{AllocationVersion, Goal, GoalsAllocation, NewGoal};
use crate::goals::goals_traits::GoalRepositoryTrait;
use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use uuid::Uuid;

/// Goal storage held in process memory.
///
/// Persistence belongs to the portfolio backend; this repository keeps the
/// same contract so the service can be exercised and served on its own.
#[derive(Default)]
pub struct GoalRepository {
    goals: DashMap<String, Goal>,
    allocations: DashMap<String, GoalsAllocation>,
    /// allocation_id -> versions ordered by version_start_date
    versions: DashMap<String, Vec<AllocationVersion>>,
}

impl GoalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a goal under its own id, replacing any goal with that id.
    pub fn insert_goal(&self, goal: Goal) {
        self.goals.insert(goal.id.clone(), goal);
    }

    fn sorted_allocations<F>(&self, predicate: F) -> Result<Vec<GoalsAllocation>>
    where
        F: Fn(&GoalsAllocation) -> Result<bool>,
    {
        let mut matched = Vec::new();
        for entry in self.allocations.iter() {
            if predicate(entry.value())? {
                matched.push(entry.value().clone());
            }
        }
        matched.sort_by(|a, b| {
            a.effective_start_date()
                .cmp(&b.effective_start_date())
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(matched)
    }

    fn remove_allocation(&self, allocation_id: &str) -> usize {
        self.versions.remove(allocation_id);
        usize::from(self.allocations.remove(allocation_id).is_some())
    }
}

#[async_trait]
impl GoalRepositoryTrait for GoalRepository {
    fn load_goals(&self) -> Result<Vec<Goal>> {
        let mut goals: Vec<Goal> = self.goals.iter().map(|e| e.value().clone()).collect();
        goals.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(goals)
    }

    fn get_goal(&self, goal_id: &str) -> Result<Goal> {
        self.goals
            .get(goal_id)
            .map(|g| g.value().clone())
            .ok_or_else(|| Error::NotFound(format!("Goal '{}' not found", goal_id)))
    }

    async fn insert_new_goal(&self, new_goal: NewGoal) -> Result<Goal> {
        let goal = new_goal.into_goal(Uuid::new_v4().to_string());
        self.goals.insert(goal.id.clone(), goal.clone());
        debug!("Inserted goal {}", goal.id);
        Ok(goal)
    }

    async fn update_goal(&self, goal_update: Goal) -> Result<Goal> {
        let mut existing = self
            .goals
            .get_mut(&goal_update.id)
            .ok_or_else(|| Error::NotFound(format!("Goal '{}' not found", goal_update.id)))?;
        *existing = goal_update.clone();
        Ok(goal_update)
    }

    async fn delete_goal(&self, goal_id_to_delete: String) -> Result<usize> {
        let Some(_) = self.goals.remove(&goal_id_to_delete) else {
            return Ok(0);
        };

        let orphaned: Vec<String> = self
            .allocations
            .iter()
            .filter(|e| e.value().goal_id == goal_id_to_delete)
            .map(|e| e.key().clone())
            .collect();
        for allocation_id in &orphaned {
            self.remove_allocation(allocation_id);
        }
        debug!(
            "Deleted goal {} and {} allocation(s)",
            goal_id_to_delete,
            orphaned.len()
        );
        Ok(1)
    }

    fn load_allocations_for_non_achieved_goals(&self) -> Result<Vec<GoalsAllocation>> {
        self.sorted_allocations(|a| {
            Ok(self
                .goals
                .get(&a.goal_id)
                .map_or(false, |g| !g.is_achieved))
        })
    }

    async fn upsert_goal_allocations(&self, allocations: Vec<GoalsAllocation>) -> Result<usize> {
        let mut affected_rows = 0;
        for allocation in allocations {
            self.allocations.insert(allocation.id.clone(), allocation);
            affected_rows += 1;
        }
        Ok(affected_rows)
    }

    fn get_allocations_for_account_on_date(
        &self,
        account_id: &str,
        query_date: &str,
    ) -> Result<Vec<GoalsAllocation>> {
        let date = parse_date(query_date)?;
        self.sorted_allocations(|a| {
            if !account_id.is_empty() && a.account_id != account_id {
                return Ok(false);
            }
            a.is_active_on(date)
        })
    }

    fn get_allocations_for_goal(&self, goal_id: &str) -> Result<Vec<GoalsAllocation>> {
        self.sorted_allocations(|a| Ok(a.goal_id == goal_id))
    }

    fn get_allocation_versions(&self, allocation_id: &str) -> Result<Vec<AllocationVersion>> {
        Ok(self
            .versions
            .get(allocation_id)
            .map(|v| v.value().clone())
            .unwrap_or_default())
    }

    fn get_allocation_by_id(&self, allocation_id: &str) -> Result<GoalsAllocation> {
        self.allocations
            .get(allocation_id)
            .map(|a| a.value().clone())
            .ok_or_else(|| Error::NotFound(format!("Allocation '{}' not found", allocation_id)))
    }

    fn get_allocations_for_account(&self, account_id: &str) -> Result<Vec<GoalsAllocation>> {
        self.sorted_allocations(|a| Ok(a.account_id == account_id))
    }

    async fn insert_allocation_version(
        &self,
        version: AllocationVersion,
    ) -> Result<AllocationVersion> {
        let mut versions = self.versions.entry(version.allocation_id.clone()).or_default();
        versions.push(version.clone());
        versions.sort_by(|a, b| a.version_start_date.cmp(&b.version_start_date));
        Ok(version)
    }

    async fn close_open_version(&self, allocation_id: &str, end_date: &str) -> Result<usize> {
        let Some(mut versions) = self.versions.get_mut(allocation_id) else {
            return Ok(0);
        };
        let mut closed = 0;
        for version in versions.iter_mut().filter(|v| v.version_end_date.is_none()) {
            version.version_end_date = Some(end_date.to_string());
            closed += 1;
        }
        Ok(closed)
    }

    async fn update_allocation_version(
        &self,
        version: AllocationVersion,
    ) -> Result<AllocationVersion> {
        let not_found = || Error::NotFound(format!("Allocation version '{}' not found", version.id));
        let mut versions = self
            .versions
            .get_mut(&version.allocation_id)
            .ok_or_else(not_found)?;
        let slot = versions
            .iter_mut()
            .find(|v| v.id == version.id)
            .ok_or_else(not_found)?;
        *slot = version.clone();
        Ok(version)
    }

    async fn delete_allocation(&self, allocation_id: String) -> Result<usize> {
        Ok(self.remove_allocation(&allocation_id))
    }
}
