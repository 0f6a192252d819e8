use super::events::SwarmEvent;
use super::ports::DynTelemetrySink;
use super::state::{FleetState, Phase, ProgressAggregation};
use crate::common::{DomainError, DomainResult, PlanningError, SwarmError, SwarmResult};
use crate::domains::agent::{AgentProxy, ExecutionStep, FlightController};
use crate::domains::logger::DynLogger;
use crate::domains::planning::{ExecutionAction, PlanningAction, PlanningPhaseScheduler};
use crate::domains::trajectory::{
    Trajectory, TrajectoryOptimizer, TrajectorySource, WaypointPlan, WaypointSource,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorSettings {
    pub swarm_id: String,
    /// Progress fraction below which the swarm is in the planning phase.
    pub replan_threshold: f64,
    pub progress_aggregation: ProgressAggregation,
    pub planning_timeout: Option<Duration>,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            swarm_id: "swarm-0".to_string(),
            replan_threshold: 0.5,
            progress_aggregation: ProgressAggregation::Max,
            planning_timeout: None,
        }
    }
}

enum PlanningMode {
    /// Receding-horizon planning in the background.
    Online(Box<PlanningPhaseScheduler>),
    /// Full trajectories loaded once; no phase logic.
    Predefined,
}

/// Fleet-wide lifecycle state machine and phase driver.
///
/// [`SwarmCoordinator::tick`] is called once per control period. It takes
/// `&mut self`, so overlapping ticks are impossible by construction.
pub struct SwarmCoordinator {
    swarm_id: String,
    agents: Vec<AgentProxy>,
    state: FleetState,
    phase: Phase,
    mode: PlanningMode,
    horizon_len: usize,
    replan_threshold: f64,
    aggregation: ProgressAggregation,
    last_progress: Option<f64>,
    tick_count: u64,
    telemetry: DynTelemetrySink,
    logger: DynLogger,
}

impl SwarmCoordinator {
    /// Builds an online-planning fleet and plans horizon 0 before returning.
    /// A failed initial plan is logged; the fleet is still built, with empty
    /// trajectory buffers.
    pub async fn online(
        controllers: Vec<Box<dyn FlightController>>,
        source: Arc<dyn WaypointSource>,
        optimizer: Arc<dyn TrajectoryOptimizer>,
        settings: CoordinatorSettings,
        telemetry: DynTelemetrySink,
        logger: DynLogger,
    ) -> Self {
        let scheduler = PlanningPhaseScheduler::new(
            controllers.len(),
            source,
            optimizer,
            logger.clone(),
            settings.planning_timeout,
        );
        let mut coordinator = Self::build(
            controllers,
            PlanningMode::Online(Box::new(scheduler)),
            settings,
            telemetry,
            logger,
        );

        let initial = match &mut coordinator.mode {
            PlanningMode::Online(scheduler) => {
                Some(scheduler.plan_initial(&mut coordinator.agents).await)
            }
            PlanningMode::Predefined => None,
        };
        match initial {
            Some(Ok(horizon_len)) => {
                coordinator.horizon_len = horizon_len;
                let trajectories = coordinator.buffered_trajectories();
                coordinator.telemetry.publish_trajectories(&trajectories);
                coordinator.emit(SwarmEvent::HorizonPlanned {
                    swarm_id: coordinator.swarm_id.clone(),
                    horizon_id: 0,
                    horizon_len,
                    timestamp: Utc::now(),
                });
            }
            Some(Err(error)) => {
                coordinator
                    .logger
                    .error(&format!("Error initializing the swarm: {}", error));
                coordinator.emit(SwarmEvent::PlanningDegraded {
                    swarm_id: coordinator.swarm_id.clone(),
                    horizon_id: error.horizon_id(),
                    reason: error.to_string(),
                    timestamp: Utc::now(),
                });
            }
            None => {}
        }
        coordinator
    }

    /// Builds a fleet that flies complete trajectories from `source`.
    pub fn predefined(
        controllers: Vec<Box<dyn FlightController>>,
        source: &dyn TrajectorySource,
        settings: CoordinatorSettings,
        telemetry: DynTelemetrySink,
        logger: DynLogger,
    ) -> DomainResult<Self> {
        let trajectories = source.load_trajectories(controllers.len())?;
        if trajectories.len() != controllers.len() {
            return Err(DomainError::InvalidCommand {
                reason: format!(
                    "{} trajectories loaded for {} agents",
                    trajectories.len(),
                    controllers.len()
                ),
            });
        }

        let mut coordinator = Self::build(
            controllers,
            PlanningMode::Predefined,
            settings,
            telemetry,
            logger,
        );
        for (agent, trajectory) in coordinator.agents.iter_mut().zip(trajectories.iter()) {
            agent.push_trajectory(trajectory.clone());
        }
        coordinator.horizon_len = trajectories.first().map(Trajectory::len).unwrap_or(0);
        coordinator.telemetry.publish_trajectories(&trajectories);
        coordinator.logger.info(&format!(
            "Loaded predefined trajectories for {} agents",
            trajectories.len()
        ));
        Ok(coordinator)
    }

    fn build(
        controllers: Vec<Box<dyn FlightController>>,
        mode: PlanningMode,
        settings: CoordinatorSettings,
        telemetry: DynTelemetrySink,
        logger: DynLogger,
    ) -> Self {
        let agents = controllers
            .into_iter()
            .enumerate()
            .map(|(id, controller)| AgentProxy::new(id, controller))
            .collect();
        Self {
            swarm_id: settings.swarm_id,
            agents,
            state: FleetState::Idle,
            phase: Phase::Planning,
            mode,
            horizon_len: 0,
            replan_threshold: settings.replan_threshold,
            aggregation: settings.progress_aggregation,
            last_progress: None,
            tick_count: 0,
            telemetry,
            logger,
        }
    }

    /// One control period.
    pub async fn tick(&mut self) {
        self.tick_count += 1;
        match self.state {
            FleetState::Idle => {}
            FleetState::Ready => self.arm_all(true),
            FleetState::Armed => self.takeoff_or_land_all(true),
            FleetState::Autonomous => {
                self.perform_phase_tasks().await;
                self.send_position_setpoints();
            }
            FleetState::Reached => self.takeoff_or_land_all(false),
        }
        self.check_swarm_for_state();
    }

    /// Stages the next horizon's raw waypoints. Only accepted while the
    /// swarm is planning; otherwise rejected without touching any state.
    ///
    /// Segment timing comes from the timestamps of `trajectory_hints`;
    /// `time_hints` is stored with the plan but the optimizer does not read it.
    pub fn set_waypoints(
        &mut self,
        trajectory_hints: Vec<Trajectory>,
        time_hints: Vec<f64>,
    ) -> SwarmResult<()> {
        if self.phase != Phase::Planning {
            self.logger.warn(&format!(
                "Swarm is not in the planning phase ({}). Waypoints rejected",
                self.phase
            ));
            self.emit(SwarmEvent::WaypointsRejected {
                swarm_id: self.swarm_id.clone(),
                phase: self.phase,
                timestamp: Utc::now(),
            });
            return Err(SwarmError::PhaseViolation {
                current_phase: self.phase.to_string(),
            });
        }
        if trajectory_hints.len() != self.agents.len() {
            return Err(SwarmError::InvalidWaypoints {
                reason: format!(
                    "{} waypoint sets for {} agents",
                    trajectory_hints.len(),
                    self.agents.len()
                ),
            });
        }

        match &mut self.mode {
            PlanningMode::Online(scheduler) => {
                scheduler.stage_waypoints(WaypointPlan::new(trajectory_hints, time_hints));
                self.logger.debug(&format!(
                    "Waypoints staged for horizon {}",
                    scheduler.horizon_id()
                ));
                Ok(())
            }
            PlanningMode::Predefined => Err(SwarmError::InvalidWaypoints {
                reason: "swarm flies predefined trajectories".to_string(),
            }),
        }
    }

    /// The fleet advances only when every agent reports the next state.
    fn check_swarm_for_state(&mut self) {
        if let Some(target) = self.state.next() {
            let all_in_target =
                !self.agents.is_empty() && self.agents.iter().all(|a| a.state() == target);
            if all_in_target {
                self.set_state(target);
            }
        }
        self.telemetry.publish_fleet_state(self.state);
    }

    fn set_state(&mut self, state: FleetState) {
        let from = self.state;
        self.state = state;
        self.logger.info(&format!("Set swarm state: {} -> {}", from, state));
        self.emit(SwarmEvent::FleetStateChanged {
            swarm_id: self.swarm_id.clone(),
            from,
            to: state,
            tick: self.tick_count,
            timestamp: Utc::now(),
        });
    }

    fn arm_all(&mut self, arm: bool) {
        for agent in &mut self.agents {
            agent.arm(arm);
        }
    }

    fn takeoff_or_land_all(&mut self, takeoff: bool) {
        for agent in &mut self.agents {
            agent.command_takeoff_or_land(takeoff);
        }
    }

    async fn perform_phase_tasks(&mut self) {
        let scheduler = match &mut self.mode {
            PlanningMode::Online(scheduler) => scheduler,
            PlanningMode::Predefined => return,
        };

        match self.phase {
            Phase::Planning => match scheduler.on_planning_phase() {
                PlanningAction::Degraded { error } => self.report_degraded(&error),
                PlanningAction::Launched { horizon_id } => {
                    self.logger
                        .debug(&format!("Background planning running for horizon {}", horizon_id));
                }
                PlanningAction::Exhausted { horizon_id } => {
                    self.logger.info(&format!(
                        "No horizons left to plan (horizon {}); flying current trajectory",
                        horizon_id
                    ));
                }
                PlanningAction::AlreadyInitialized => {}
            },
            Phase::Execution => {
                match scheduler.on_execution_phase(&mut self.agents).await {
                    ExecutionAction::Pushed {
                        horizon_id,
                        horizon_len,
                    } => {
                        self.horizon_len = horizon_len;
                        let trajectories = self.buffered_trajectories();
                        self.telemetry.publish_trajectories(&trajectories);
                        self.emit(SwarmEvent::HorizonPlanned {
                            swarm_id: self.swarm_id.clone(),
                            horizon_id,
                            horizon_len,
                            timestamp: Utc::now(),
                        });
                    }
                    ExecutionAction::Degraded { error } => self.report_degraded(&error),
                    ExecutionAction::AlreadyInitialized => {}
                }
            }
        }
    }

    fn send_position_setpoints(&mut self) {
        let steps: Vec<ExecutionStep> = self
            .agents
            .iter_mut()
            .filter_map(AgentProxy::execute_trajectory_step)
            .collect();
        if matches!(self.mode, PlanningMode::Online(_)) {
            self.set_swarm_phase(&steps);
        }
    }

    /// Decides the phase from the progress through the current horizon,
    /// using only agents that advanced this tick.
    fn set_swarm_phase(&mut self, steps: &[ExecutionStep]) {
        let indices = steps.iter().map(|s| s.sent_index);
        let index = match self.aggregation {
            ProgressAggregation::Max => indices.max(),
            ProgressAggregation::Min => indices.min(),
        };
        let index = match index {
            Some(index) if self.horizon_len > 0 => index,
            _ => return,
        };

        let progress = index as f64 / self.horizon_len as f64;
        self.last_progress = Some(progress);
        let previous = self.phase;

        if progress < self.replan_threshold {
            if index == 0 && steps.iter().any(|s| s.fresh) {
                if let PlanningMode::Online(scheduler) = &mut self.mode {
                    if scheduler.begin_horizon() {
                        self.logger.debug(&format!(
                            "Resetting planning and execution flags. exec: {} progress: {}",
                            index, progress
                        ));
                    }
                }
            }
            self.phase = Phase::Planning;
        } else {
            self.phase = Phase::Execution;
        }

        if previous != self.phase {
            self.emit(SwarmEvent::PhaseChanged {
                swarm_id: self.swarm_id.clone(),
                from: previous,
                to: self.phase,
                progress,
                tick: self.tick_count,
                timestamp: Utc::now(),
            });
        }
    }

    fn report_degraded(&self, error: &PlanningError) {
        self.emit(SwarmEvent::PlanningDegraded {
            swarm_id: self.swarm_id.clone(),
            horizon_id: error.horizon_id(),
            reason: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn emit(&self, event: SwarmEvent) {
        self.telemetry.publish_event(event);
    }

    fn buffered_trajectories(&self) -> Vec<Trajectory> {
        self.agents.iter().map(|a| a.trajectory().clone()).collect()
    }

    pub fn swarm_id(&self) -> &str {
        &self.swarm_id
    }

    pub fn state(&self) -> FleetState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn horizon_len(&self) -> usize {
        self.horizon_len
    }

    pub fn last_progress(&self) -> Option<f64> {
        self.last_progress
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn agents(&self) -> &[AgentProxy] {
        &self.agents
    }

    pub fn is_predefined(&self) -> bool {
        matches!(self.mode, PlanningMode::Predefined)
    }

    pub fn scheduler(&self) -> Option<&PlanningPhaseScheduler> {
        match &self.mode {
            PlanningMode::Online(scheduler) => Some(&**scheduler),
            PlanningMode::Predefined => None,
        }
    }
}
