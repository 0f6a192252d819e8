use super::task::{PlanOutcome, PlanningTask, PlanningTaskStatus};
use crate::common::{PlanningError, PlanningResult};
use crate::domains::agent::AgentProxy;
use crate::domains::logger::DynLogger;
use crate::domains::trajectory::{
    HorizonContext, Trajectory, TrajectoryOptimizer, WaypointPlan, WaypointSource,
};
use std::sync::Arc;
use std::time::Duration;

/// Per-horizon guard flags. Reset together when a new horizon starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HorizonGuards {
    pub planning_initialized: bool,
    pub execution_initialized: bool,
}

impl HorizonGuards {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What the planning-phase entry did this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanningAction {
    /// Entry actions already ran for this horizon.
    AlreadyInitialized,
    Launched { horizon_id: usize },
    /// No horizons left; execution was marked ready up front.
    Exhausted { horizon_id: usize },
    /// Launch failed; execution marked ready so nothing waits on it.
    Degraded { error: PlanningError },
}

/// What the execution-phase entry did this tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionAction {
    AlreadyInitialized,
    /// A new horizon was pushed into every agent.
    Pushed { horizon_id: usize, horizon_len: usize },
    /// No result; agents keep the trajectory they already have.
    Degraded { error: PlanningError },
}

/// Alternates between launching background planning for the next horizon
/// and installing its result once execution of the current one is far
/// enough along.
pub struct PlanningPhaseScheduler {
    n_agents: usize,
    source: Arc<dyn WaypointSource>,
    optimizer: Arc<dyn TrajectoryOptimizer>,
    logger: DynLogger,
    timeout: Option<Duration>,
    horizon_id: usize,
    total_horizons: usize,
    guards: HorizonGuards,
    task: PlanningTask,
    previous: Vec<Trajectory>,
    staged: Option<WaypointPlan>,
}

impl PlanningPhaseScheduler {
    pub fn new(
        n_agents: usize,
        source: Arc<dyn WaypointSource>,
        optimizer: Arc<dyn TrajectoryOptimizer>,
        logger: DynLogger,
        timeout: Option<Duration>,
    ) -> Self {
        let total_horizons = source.total_horizons().unwrap_or(0);
        Self {
            n_agents,
            source,
            optimizer,
            logger,
            timeout,
            horizon_id: 0,
            total_horizons,
            guards: HorizonGuards::default(),
            task: PlanningTask::new(),
            previous: Vec::new(),
            staged: None,
        }
    }

    pub fn horizon_id(&self) -> usize {
        self.horizon_id
    }

    pub fn total_horizons(&self) -> usize {
        self.total_horizons
    }

    pub fn guards(&self) -> HorizonGuards {
        self.guards
    }

    pub fn task_status(&self) -> PlanningTaskStatus {
        self.task.status()
    }

    pub fn previous_trajectories(&self) -> &[Trajectory] {
        &self.previous
    }

    pub fn staged_waypoints(&self) -> Option<&WaypointPlan> {
        self.staged.as_ref()
    }

    pub fn reset_guards(&mut self) {
        self.guards.reset();
    }

    /// Called when a freshly pushed horizon sends its first setpoint. Clears
    /// the guards only if the previous cycle is closed (its result was
    /// consumed or given up on); the initial horizon's cycle is still open
    /// at that point. Returns whether the guards were cleared.
    pub fn begin_horizon(&mut self) -> bool {
        if !self.guards.execution_initialized {
            return false;
        }
        self.guards.reset();
        true
    }

    /// Stores externally supplied waypoints; the next launched horizon uses
    /// them instead of the waypoint source. Replaces anything staged before.
    pub fn stage_waypoints(&mut self, plan: WaypointPlan) {
        self.staged = Some(plan);
    }

    /// Plans horizon 0 and waits for it, so the fleet has a trajectory
    /// before the first tick. Returns the horizon length.
    pub async fn plan_initial(&mut self, agents: &mut [AgentProxy]) -> PlanningResult<usize> {
        let horizon_id = self.horizon_id;
        self.launch(horizon_id)?;
        self.horizon_id += 1;

        self.task.wait(self.timeout).await;
        let trajectories = self.task.take()?;
        self.refresh_total_horizons();
        self.logger.info(&format!(
            "Initial plan ready: horizon {} of {}, {} samples per agent",
            horizon_id,
            self.total_horizons,
            trajectories.first().map(Trajectory::len).unwrap_or(0)
        ));
        Ok(self.install(agents, trajectories))
    }

    /// Planning-phase entry actions; runs once per horizon.
    pub fn on_planning_phase(&mut self) -> PlanningAction {
        if self.guards.planning_initialized {
            return PlanningAction::AlreadyInitialized;
        }

        let horizon_id = self.horizon_id;
        let mut action = PlanningAction::Exhausted { horizon_id };
        if horizon_id < self.total_horizons {
            match self.launch(horizon_id) {
                Ok(()) => {
                    self.logger
                        .info(&format!("Planning started for horizon {}", horizon_id));
                    action = PlanningAction::Launched { horizon_id };
                }
                Err(error) => {
                    self.logger.warn(&format!(
                        "Could not start planning for horizon {}: {}",
                        horizon_id, error
                    ));
                    self.guards.execution_initialized = true;
                    action = PlanningAction::Degraded { error };
                }
            }
        }

        self.horizon_id += 1;
        if self.horizon_id > self.total_horizons {
            // Nothing was launched, so the execution phase must not wait for a result.
            self.guards.execution_initialized = true;
        }
        self.guards.planning_initialized = true;
        action
    }

    /// Execution-phase entry actions; runs once per horizon. This is the
    /// only place the control loop waits on the planner.
    pub async fn on_execution_phase(&mut self, agents: &mut [AgentProxy]) -> ExecutionAction {
        if self.guards.execution_initialized {
            return ExecutionAction::AlreadyInitialized;
        }
        self.guards.execution_initialized = true;

        self.task.wait(self.timeout).await;
        let horizon_id = self.task.horizon_id();
        match self.task.take() {
            Ok(trajectories) => {
                self.refresh_total_horizons();
                let horizon_id = horizon_id.unwrap_or(self.horizon_id.saturating_sub(1));
                let horizon_len = self.install(agents, trajectories);
                self.logger.info(&format!(
                    "Horizon {} installed on {} agents ({} samples)",
                    horizon_id,
                    agents.len(),
                    horizon_len
                ));
                ExecutionAction::Pushed {
                    horizon_id,
                    horizon_len,
                }
            }
            Err(error) => {
                let horizon = error
                    .horizon_id()
                    .map(|h| h.to_string())
                    .unwrap_or_else(|| "?".to_string());
                if error.is_out_of_range() {
                    self.logger.info(&format!(
                        "No plan for horizon {}: {}; continuing with current trajectory",
                        horizon, error
                    ));
                } else {
                    self.logger.warn(&format!(
                        "Planning for horizon {} failed: {}; continuing with current trajectory",
                        horizon, error
                    ));
                }
                ExecutionAction::Degraded { error }
            }
        }
    }

    fn launch(&mut self, horizon_id: usize) -> PlanningResult<()> {
        let source = Arc::clone(&self.source);
        let optimizer = Arc::clone(&self.optimizer);
        let continuity = self.previous.clone();
        let staged = self.staged.clone();
        let known_total = self.total_horizons;
        let n_agents = self.n_agents;
        // A refused or repeated launch leaves the staged waypoints for the next one.
        let fresh = matches!(
            self.task.status(),
            PlanningTaskStatus::NotStarted | PlanningTaskStatus::Consumed
        );

        self.task.launch(horizon_id, move || {
            let plan = match staged {
                Some(plan) => plan,
                None => source.load_discrete_plan(horizon_id)?,
            };
            let total = source.total_horizons().unwrap_or(known_total).max(horizon_id + 1);
            compute_horizon(
                optimizer.as_ref(),
                &plan,
                &continuity,
                HorizonContext::new(horizon_id, total),
                n_agents,
            )
        })?;
        if fresh {
            self.staged = None;
        }
        Ok(())
    }

    fn install(&mut self, agents: &mut [AgentProxy], trajectories: Vec<Trajectory>) -> usize {
        for (agent, trajectory) in agents.iter_mut().zip(trajectories.iter()) {
            agent.push_trajectory(trajectory.clone());
        }
        let horizon_len = trajectories.first().map(Trajectory::len).unwrap_or(0);
        self.previous = trajectories;
        horizon_len
    }

    fn refresh_total_horizons(&mut self) {
        if let Some(total) = self.source.total_horizons() {
            self.total_horizons = total;
        }
    }
}

/// Body of the background job: validate the discrete plan, run the
/// optimizer, validate its output.
fn compute_horizon(
    optimizer: &dyn TrajectoryOptimizer,
    plan: &WaypointPlan,
    continuity: &[Trajectory],
    ctx: HorizonContext,
    n_agents: usize,
) -> PlanOutcome {
    let horizon_id = ctx.horizon_id;
    if plan.agent_count() != n_agents {
        return Err(PlanningError::MalformedPlan {
            horizon_id,
            reason: format!(
                "expected waypoints for {} agents, got {}",
                n_agents,
                plan.agent_count()
            ),
        });
    }
    if let Some(agent) = plan.agents.iter().position(Trajectory::is_empty) {
        return Err(PlanningError::MalformedPlan {
            horizon_id,
            reason: format!("agent {} has no waypoints", agent),
        });
    }

    let trajectories = optimizer
        .solve(&plan.agents, continuity, ctx)
        .map_err(|e| PlanningError::TaskFailed {
            horizon_id,
            reason: e.to_string(),
        })?;

    if trajectories.len() != n_agents {
        return Err(PlanningError::TaskFailed {
            horizon_id,
            reason: format!(
                "optimizer returned {} trajectories for {} agents",
                trajectories.len(),
                n_agents
            ),
        });
    }
    let horizon_len = trajectories.first().map(Trajectory::len).unwrap_or(0);
    if horizon_len == 0 || trajectories.iter().any(|t| t.len() != horizon_len) {
        return Err(PlanningError::TaskFailed {
            horizon_id,
            reason: "agents disagree on horizon length".to_string(),
        });
    }
    Ok(trajectories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::outbound::{init_noop_logger, StaticWaypointSource};
    use crate::common::DomainResult;
    use crate::domains::trajectory::Vector3;

    struct Hold;

    impl TrajectoryOptimizer for Hold {
        fn solve(
            &self,
            waypoints: &[Trajectory],
            _continuity: &[Trajectory],
            _ctx: HorizonContext,
        ) -> DomainResult<Vec<Trajectory>> {
            Ok(waypoints.to_vec())
        }
    }

    fn plan(x: f64) -> WaypointPlan {
        let agent = Trajectory::from_positions(vec![Vector3::new(x, 0.0, 1.0)], 0.0, 0.1).unwrap();
        WaypointPlan::new(vec![agent], vec![x])
    }

    fn scheduler(horizons: Vec<WaypointPlan>) -> PlanningPhaseScheduler {
        let mut scheduler = PlanningPhaseScheduler::new(
            1,
            Arc::new(StaticWaypointSource::new(horizons)),
            Arc::new(Hold),
            init_noop_logger(),
            None,
        );
        scheduler.total_horizons = 3;
        scheduler.horizon_id = 1;
        scheduler
    }

    #[tokio::test]
    async fn refused_launch_keeps_staged_waypoints() {
        let mut scheduler = scheduler(vec![plan(0.0), plan(1.0), plan(2.0)]);
        // An unconsumed result from another horizon blocks the launch.
        scheduler.task.launch(7, || Ok(Vec::new())).unwrap();
        scheduler.stage_waypoints(plan(42.0));

        match scheduler.on_planning_phase() {
            PlanningAction::Degraded {
                error: PlanningError::PlanOutstanding { outstanding: 7, .. },
            } => {}
            other => panic!("expected a refused launch, got {:?}", other),
        }
        assert_eq!(
            scheduler.staged_waypoints().map(|p| p.times.clone()),
            Some(vec![42.0])
        );
    }

    #[tokio::test]
    async fn accepted_launch_consumes_staged_waypoints() {
        let mut scheduler = scheduler(vec![plan(0.0), plan(1.0), plan(2.0)]);
        scheduler.stage_waypoints(plan(42.0));

        assert_eq!(
            scheduler.on_planning_phase(),
            PlanningAction::Launched { horizon_id: 1 }
        );
        assert!(scheduler.staged_waypoints().is_none());

        scheduler.task.wait(None).await;
        let trajectories = scheduler.task.take().unwrap();
        assert_eq!(trajectories[0].positions()[0].x, 42.0);
    }
}
