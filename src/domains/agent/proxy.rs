use super::ports::FlightController;
use crate::domains::swarm::FleetState;
use crate::domains::trajectory::Trajectory;

/// Outcome of a single execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionStep {
    /// Index of the setpoint just sent to the controller.
    pub sent_index: usize,
    /// Cursor after advancing; saturates at `len - 1`.
    pub cursor: usize,
    /// First step since the last trajectory push.
    pub fresh: bool,
}

/// Coordinator-side view of one drone: trajectory buffer plus execution
/// cursor. Owned exclusively by the coordinator; the controller only ever
/// sees the setpoint it is handed.
pub struct AgentProxy {
    id: usize,
    trajectory: Trajectory,
    cursor: usize,
    steps_since_push: u64,
    controller: Box<dyn FlightController>,
}

impl AgentProxy {
    pub fn new(id: usize, controller: Box<dyn FlightController>) -> Self {
        Self {
            id,
            trajectory: Trajectory::default(),
            cursor: 0,
            steps_since_push: 0,
            controller,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> FleetState {
        self.controller.state()
    }

    pub fn arm(&mut self, arm: bool) {
        self.controller.arm(arm);
    }

    pub fn command_takeoff_or_land(&mut self, takeoff: bool) {
        self.controller.command_takeoff_or_land(takeoff);
    }

    /// Replaces the buffer and rewinds the cursor.
    pub fn push_trajectory(&mut self, trajectory: Trajectory) {
        self.trajectory = trajectory;
        self.cursor = 0;
        self.steps_since_push = 0;
    }

    /// Sends the setpoint under the cursor and advances it. Returns `None`
    /// when there is nothing buffered.
    pub fn execute_trajectory_step(&mut self) -> Option<ExecutionStep> {
        let setpoint = self.trajectory.sample(self.cursor)?;
        self.controller.send_position_setpoint(&setpoint);

        let sent_index = self.cursor;
        let last = self.trajectory.len().saturating_sub(1);
        self.cursor = (self.cursor + 1).min(last);
        let fresh = self.steps_since_push == 0;
        self.steps_since_push = self.steps_since_push.saturating_add(1);

        Some(ExecutionStep {
            sent_index,
            cursor: self.cursor,
            fresh,
        })
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn horizon_len(&self) -> usize {
        self.trajectory.len()
    }
}

impl std::fmt::Debug for AgentProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentProxy")
            .field("id", &self.id)
            .field("cursor", &self.cursor)
            .field("horizon_len", &self.trajectory.len())
            .finish()
    }
}
