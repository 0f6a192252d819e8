#![allow(dead_code)]

use drone_swarm::adapters::outbound::{
    init_noop_logger, InMemoryTelemetrySink, SimulatedDroneConfig, SimulatedFlightController,
    StaticWaypointSource,
};
use drone_swarm::common::{DomainError, DomainResult};
use drone_swarm::domains::agent::{AgentProxy, FlightController};
use drone_swarm::domains::logger::DomainLogger;
use drone_swarm::domains::swarm::{CoordinatorSettings, SwarmCoordinator};
use drone_swarm::domains::trajectory::{
    HorizonContext, Trajectory, TrajectoryOptimizer, Vector3, WaypointPlan,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DT: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct SolveCall {
    pub horizon_id: usize,
    pub continuity_len: usize,
    pub first_waypoint_x: f64,
    pub is_first: bool,
    pub is_last: bool,
}

/// Deterministic solver: agent `i` on horizon `h` flies `horizon_len`
/// samples at (x0, i, k) where x0 is its first waypoint's x.
pub struct ScriptedOptimizer {
    pub horizon_len: usize,
    pub fail_on: Option<usize>,
    pub slow_on: Option<(usize, Duration)>,
    pub calls: Mutex<Vec<SolveCall>>,
}

impl ScriptedOptimizer {
    pub fn new(horizon_len: usize) -> Self {
        Self {
            horizon_len,
            fail_on: None,
            slow_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_on(mut self, horizon_id: usize) -> Self {
        self.fail_on = Some(horizon_id);
        self
    }

    pub fn slow_on(mut self, horizon_id: usize, delay: Duration) -> Self {
        self.slow_on = Some((horizon_id, delay));
        self
    }

    pub fn calls(&self) -> Vec<SolveCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl TrajectoryOptimizer for ScriptedOptimizer {
    fn solve(
        &self,
        waypoints: &[Trajectory],
        continuity: &[Trajectory],
        ctx: HorizonContext,
    ) -> DomainResult<Vec<Trajectory>> {
        self.calls.lock().unwrap().push(SolveCall {
            horizon_id: ctx.horizon_id,
            continuity_len: continuity.len(),
            first_waypoint_x: waypoints[0].positions()[0].x,
            is_first: ctx.is_first,
            is_last: ctx.is_last,
        });
        if let Some((horizon_id, delay)) = self.slow_on {
            if horizon_id == ctx.horizon_id {
                std::thread::sleep(delay);
            }
        }
        if self.fail_on == Some(ctx.horizon_id) {
            return Err(DomainError::InvalidTrajectory {
                reason: "solver diverged".to_string(),
            });
        }

        let start = ctx.horizon_id as f64 * self.horizon_len as f64 * DT;
        waypoints
            .iter()
            .enumerate()
            .map(|(agent, w)| {
                let x0 = w.positions()[0].x;
                let positions = (0..self.horizon_len)
                    .map(|k| Vector3::new(x0, agent as f64, k as f64))
                    .collect();
                Trajectory::from_positions(positions, start, DT)
            })
            .collect()
    }
}

/// `n_horizons` plans; every agent's single waypoint on horizon `h` has x = h.
pub fn plans(n_horizons: usize, n_agents: usize) -> Vec<WaypointPlan> {
    (0..n_horizons)
        .map(|h| waypoint_plan(h as f64, n_agents))
        .collect()
}

pub fn waypoint_plan(x: f64, n_agents: usize) -> WaypointPlan {
    let agents = (0..n_agents)
        .map(|i| {
            Trajectory::from_positions(vec![Vector3::new(x, i as f64, 1.0)], 0.0, 1.0).unwrap()
        })
        .collect();
    WaypointPlan::new(agents, vec![x])
}

/// Drones that boot immediately. Goals, when given, are per drone.
pub fn fleet(
    n: usize,
    goals: &[Option<Vector3>],
) -> (Vec<SimulatedFlightController>, Vec<Box<dyn FlightController>>) {
    let drones: Vec<_> = (0..n)
        .map(|i| {
            SimulatedFlightController::new(
                i,
                SimulatedDroneConfig {
                    boot_ticks: 0,
                    goal: goals.get(i).copied().flatten(),
                    goal_tolerance: 1e-6,
                },
            )
        })
        .collect();
    let boxed = drones
        .iter()
        .cloned()
        .map(|d| Box::new(d) as Box<dyn FlightController>)
        .collect();
    (drones, boxed)
}

pub fn agents(n: usize) -> (Vec<SimulatedFlightController>, Vec<AgentProxy>) {
    let (drones, boxed) = fleet(n, &[]);
    let proxies = boxed
        .into_iter()
        .enumerate()
        .map(|(i, c)| AgentProxy::new(i, c))
        .collect();
    (drones, proxies)
}

pub struct Harness {
    pub coordinator: SwarmCoordinator,
    pub drones: Vec<SimulatedFlightController>,
    pub optimizer: Arc<ScriptedOptimizer>,
    pub telemetry: Arc<InMemoryTelemetrySink>,
}

pub async fn online_harness(
    n_agents: usize,
    n_horizons: usize,
    optimizer: ScriptedOptimizer,
    settings: CoordinatorSettings,
    goals: &[Option<Vector3>],
) -> Harness {
    let (drones, controllers) = fleet(n_agents, goals);
    let optimizer = Arc::new(optimizer);
    let telemetry = Arc::new(InMemoryTelemetrySink::new());
    let coordinator = SwarmCoordinator::online(
        controllers,
        Arc::new(StaticWaypointSource::new(plans(n_horizons, n_agents))),
        optimizer.clone(),
        settings,
        telemetry.clone(),
        init_noop_logger(),
    )
    .await;
    Harness {
        coordinator,
        drones,
        optimizer,
        telemetry,
    }
}

impl Harness {
    pub async fn tick_n(&mut self, n: usize) {
        for _ in 0..n {
            self.coordinator.tick().await;
        }
    }
}

/// Collects every line so tests can assert on what was logged.
#[derive(Default)]
pub struct CaptureLogger {
    pub messages: Mutex<Vec<String>>,
}

impl CaptureLogger {
    pub fn lines(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl DomainLogger for CaptureLogger {
    fn info(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("INFO:{}", msg));
    }
    fn warn(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("WARN:{}", msg));
    }
    fn error(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("ERR:{}", msg));
    }
    fn debug(&self, msg: &str) {
        self.messages.lock().unwrap().push(format!("DEBUG:{}", msg));
    }
}
