use crate::domains::agent::FlightController;
use crate::domains::swarm::FleetState;
use crate::domains::trajectory::{Setpoint, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlightCommand {
    Arm(bool),
    Takeoff,
    Land,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedDroneConfig {
    /// State polls spent in `Idle` before the drone reports `Ready`.
    pub boot_ticks: u32,
    /// The drone reports `Reached` once a setpoint lands within
    /// `goal_tolerance` of this point. `None` never reaches.
    pub goal: Option<Vector3>,
    pub goal_tolerance: f64,
}

impl Default for SimulatedDroneConfig {
    fn default() -> Self {
        Self {
            boot_ticks: 0,
            goal: None,
            goal_tolerance: 0.05,
        }
    }
}

#[derive(Debug)]
struct SimState {
    state: FleetState,
    boot_ticks_remaining: u32,
    landed: bool,
    forced: Option<FleetState>,
    goal: Option<Vector3>,
    goal_tolerance: f64,
    setpoints: Vec<Setpoint>,
    commands: Vec<FlightCommand>,
}

/// In-process stand-in for a drone's flight controller.
///
/// Walks `Idle -> Ready -> Armed -> Autonomous -> Reached` in response to
/// the commands it receives, the way an autopilot acknowledges them a tick
/// later. Clones share the same drone, so a test can keep a handle while the
/// coordinator owns the boxed controller.
#[derive(Debug, Clone)]
pub struct SimulatedFlightController {
    id: usize,
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedFlightController {
    pub fn new(id: usize, config: SimulatedDroneConfig) -> Self {
        let state = if config.boot_ticks == 0 {
            FleetState::Ready
        } else {
            FleetState::Idle
        };
        Self {
            id,
            inner: Arc::new(Mutex::new(SimState {
                state,
                boot_ticks_remaining: config.boot_ticks,
                landed: false,
                forced: None,
                goal: config.goal,
                goal_tolerance: config.goal_tolerance,
                setpoints: Vec::new(),
                commands: Vec::new(),
            })),
        }
    }

    /// `n` drones whose boot time is drawn from `boot_ticks` (inclusive),
    /// reproducible for a given `seed`.
    pub fn fleet(
        n: usize,
        boot_ticks: (u32, u32),
        goals: &[Option<Vector3>],
        goal_tolerance: f64,
        seed: u64,
    ) -> Vec<SimulatedFlightController> {
        let mut rng = StdRng::seed_from_u64(seed);
        let (lo, hi) = (boot_ticks.0.min(boot_ticks.1), boot_ticks.0.max(boot_ticks.1));
        (0..n)
            .map(|id| {
                let config = SimulatedDroneConfig {
                    boot_ticks: rng.gen_range(lo..=hi),
                    goal: goals.get(id).copied().flatten(),
                    goal_tolerance,
                };
                SimulatedFlightController::new(id, config)
            })
            .collect()
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Pins the reported state regardless of commands; `None` releases it.
    pub fn force_state(&self, state: Option<FleetState>) {
        self.lock().forced = state;
    }

    pub fn set_goal(&self, goal: Option<Vector3>) {
        self.lock().goal = goal;
    }

    pub fn setpoints(&self) -> Vec<Setpoint> {
        self.lock().setpoints.clone()
    }

    pub fn last_setpoint(&self) -> Option<Setpoint> {
        self.lock().setpoints.last().copied()
    }

    pub fn commands(&self) -> Vec<FlightCommand> {
        self.lock().commands.clone()
    }

    pub fn is_landed(&self) -> bool {
        self.lock().landed
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FlightController for SimulatedFlightController {
    fn arm(&mut self, arm: bool) {
        let mut sim = self.lock();
        sim.commands.push(FlightCommand::Arm(arm));
        match (sim.state, arm) {
            (FleetState::Ready, true) => sim.state = FleetState::Armed,
            (FleetState::Armed, false) => sim.state = FleetState::Ready,
            _ => {}
        }
    }

    fn command_takeoff_or_land(&mut self, takeoff: bool) {
        let mut sim = self.lock();
        if takeoff {
            sim.commands.push(FlightCommand::Takeoff);
            if sim.state == FleetState::Armed {
                sim.state = FleetState::Autonomous;
            }
        } else {
            sim.commands.push(FlightCommand::Land);
            if sim.state == FleetState::Reached {
                sim.landed = true;
            }
        }
    }

    fn send_position_setpoint(&mut self, setpoint: &Setpoint) {
        let mut sim = self.lock();
        sim.setpoints.push(*setpoint);
        if sim.state != FleetState::Autonomous {
            return;
        }
        if let Some(goal) = sim.goal {
            if setpoint.position.distance_to(&goal) <= sim.goal_tolerance {
                sim.state = FleetState::Reached;
            }
        }
    }

    fn state(&self) -> FleetState {
        let mut sim = self.lock();
        if sim.state == FleetState::Idle {
            sim.boot_ticks_remaining = sim.boot_ticks_remaining.saturating_sub(1);
            if sim.boot_ticks_remaining == 0 {
                sim.state = FleetState::Ready;
            }
        }
        sim.forced.unwrap_or(sim.state)
    }
}
