use super::types::{HorizonContext, Trajectory, WaypointPlan};
use crate::common::{DomainResult, PlanningError};

/// Turns coarse per-agent waypoints into dense, dynamically feasible
/// trajectories. Pure and potentially slow; only ever called from the
/// background planning task.
pub trait TrajectoryOptimizer: Send + Sync {
    /// `continuity` holds the previous horizon's trajectories (empty on the
    /// first horizon) so consecutive horizons can be joined smoothly.
    fn solve(
        &self,
        waypoints: &[Trajectory],
        continuity: &[Trajectory],
        ctx: HorizonContext,
    ) -> DomainResult<Vec<Trajectory>>;
}

/// Source of per-horizon discrete plans.
pub trait WaypointSource: Send + Sync {
    /// Fails with [`PlanningError::HorizonOutOfRange`] once `horizon_id`
    /// reaches the number of available horizons.
    fn load_discrete_plan(&self, horizon_id: usize) -> Result<WaypointPlan, PlanningError>;

    /// Known after the first successful load.
    fn total_horizons(&self) -> Option<usize>;

    /// Time hints for every horizon, empty until the first load.
    fn times_array(&self) -> Vec<Vec<f64>>;
}

/// Source of complete, precomputed trajectories (one per agent).
pub trait TrajectorySource: Send + Sync {
    fn load_trajectories(&self, n_agents: usize) -> DomainResult<Vec<Trajectory>>;
}
