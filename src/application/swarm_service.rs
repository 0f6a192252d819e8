use crate::adapters::outbound::{JsonTrajectorySource, JsonWaypointSource, SampledTrajectoryOptimizer};
use crate::common::{ApplicationError, ApplicationResult};
use crate::config::Config;
use crate::domains::agent::FlightController;
use crate::domains::logger::DynLogger;
use crate::domains::swarm::{DynTelemetrySink, FleetState, SwarmCoordinator};
use crate::domains::trajectory::{Trajectory, TrajectoryOptimizer, WaypointSource};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Why [`SwarmService::run_until`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The fleet reached its goal and the land command went out.
    Reached { ticks: u64 },
    TickLimit { ticks: u64 },
    Shutdown { ticks: u64 },
}

impl RunOutcome {
    pub fn ticks(&self) -> u64 {
        match self {
            RunOutcome::Reached { ticks }
            | RunOutcome::TickLimit { ticks }
            | RunOutcome::Shutdown { ticks } => *ticks,
        }
    }
}

/// Drives a [`SwarmCoordinator`] at a fixed rate.
///
/// A tick that overruns its period delays the next one instead of bunching
/// catch-up ticks together.
pub struct SwarmService {
    coordinator: SwarmCoordinator,
    period: Duration,
    max_ticks: Option<u64>,
    logger: DynLogger,
}

impl SwarmService {
    pub fn new(
        coordinator: SwarmCoordinator,
        period: Duration,
        max_ticks: Option<u64>,
        logger: DynLogger,
    ) -> Self {
        Self {
            coordinator,
            period,
            max_ticks,
            logger,
        }
    }

    /// Builds the coordinator described by `config`: online planning from the
    /// waypoint file, or predefined trajectories when `swarm.predefined` is set.
    pub async fn from_config(
        config: &Config,
        controllers: Vec<Box<dyn FlightController>>,
        telemetry: DynTelemetrySink,
        logger: DynLogger,
    ) -> ApplicationResult<Self> {
        if controllers.len() != config.swarm.n_drones {
            return Err(ApplicationError::Configuration(anyhow::anyhow!(
                "{} flight controllers for swarm.n_drones = {}",
                controllers.len(),
                config.swarm.n_drones
            )));
        }

        let settings = config.coordinator_settings();
        let coordinator = if config.swarm.predefined {
            let source = JsonTrajectorySource::new(config.trajectory_path());
            SwarmCoordinator::predefined(controllers, &source, settings, telemetry, logger.clone())?
        } else {
            let source: Arc<dyn WaypointSource> =
                Arc::new(JsonWaypointSource::new(config.plan_path()));
            let optimizer: Arc<dyn TrajectoryOptimizer> = Arc::new(SampledTrajectoryOptimizer::new(
                config.planning.max_velocity,
                config.planning.max_acceleration,
                config.swarm.frequency_hz,
            ));
            SwarmCoordinator::online(controllers, source, optimizer, settings, telemetry, logger.clone())
                .await
        };

        Ok(Self::new(
            coordinator,
            config.tick_period(),
            config.swarm.max_ticks,
            logger,
        ))
    }

    pub fn coordinator(&self) -> &SwarmCoordinator {
        &self.coordinator
    }

    pub fn into_coordinator(self) -> SwarmCoordinator {
        self.coordinator
    }

    /// Forwards externally supplied waypoints for the next horizon.
    pub fn set_waypoints(
        &mut self,
        trajectory_hints: Vec<Trajectory>,
        time_hints: Vec<f64>,
    ) -> ApplicationResult<()> {
        self.coordinator
            .set_waypoints(trajectory_hints, time_hints)
            .map_err(ApplicationError::from)
    }

    pub async fn run(&mut self) -> RunOutcome {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Ticks until the fleet has reached its goal and been told to land, the
    /// tick limit is hit, or `shutdown` resolves.
    pub async fn run_until<F>(&mut self, shutdown: F) -> RunOutcome
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        self.logger.info(&format!(
            "Swarm {} running at {:.1} Hz with {} agents",
            self.coordinator.swarm_id(),
            1.0 / self.period.as_secs_f64(),
            self.coordinator.agents().len()
        ));

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    let ticks = self.coordinator.tick_count();
                    self.logger.info(&format!("Shutdown requested after {} ticks", ticks));
                    return RunOutcome::Shutdown { ticks };
                }
                _ = interval.tick() => {}
            }

            let reached_before = self.coordinator.state() == FleetState::Reached;
            self.coordinator.tick().await;
            let ticks = self.coordinator.tick_count();

            if reached_before {
                self.logger
                    .info(&format!("Swarm reached its goal; landing after {} ticks", ticks));
                return RunOutcome::Reached { ticks };
            }
            if self.max_ticks.map_or(false, |max| ticks >= max) {
                self.logger.warn(&format!(
                    "Tick limit reached ({}) in state {}",
                    ticks,
                    self.coordinator.state()
                ));
                return RunOutcome::TickLimit { ticks };
            }
        }
    }
}
