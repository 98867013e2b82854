pub mod allocation_calc;
pub mod chart_intervals;
pub mod goal_progress_model;
pub mod goals_model;
pub mod goals_repository;
pub mod goals_service;
pub mod goals_traits;
pub mod projection;
pub mod valuation_history;

pub use chart_intervals::{DateIntervals, TimePeriod};
pub use goal_progress_model::{
    AllocationDetail, GoalProgressHistory, GoalProgressSnapshot, GoalValuationPoint,
};
pub use goals_model::{AllocationVersion, Goal, GoalsAllocation, NewGoal};
pub use goals_repository::GoalRepository;
pub use goals_service::{GoalService, GoalSettings};
pub use goals_traits::{GoalRepositoryTrait, GoalServiceTrait};
pub use projection::Compounding;
