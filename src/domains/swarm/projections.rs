use super::events::SwarmEvent;
use super::state::{FleetState, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read model of one swarm, built purely from its telemetry events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetTelemetryProjection {
    pub swarm_id: String,
    pub current_state: FleetState,
    pub current_phase: Phase,
    /// (to, tick) for every fleet-state transition.
    pub transitions: Vec<(FleetState, u64)>,
    pub heartbeats: u64,
    pub horizons_planned: Vec<usize>,
    pub degraded_horizons: Vec<Option<usize>>,
    pub trajectory_snapshots: u64,
    pub rejected_waypoints: u64,
    pub last_updated: DateTime<Utc>,
}

impl FleetTelemetryProjection {
    pub fn new(swarm_id: String) -> Self {
        Self {
            swarm_id,
            current_state: FleetState::Idle,
            current_phase: Phase::Planning,
            transitions: Vec::new(),
            heartbeats: 0,
            horizons_planned: Vec::new(),
            degraded_horizons: Vec::new(),
            trajectory_snapshots: 0,
            rejected_waypoints: 0,
            last_updated: Utc::now(),
        }
    }

    pub fn apply_event(&mut self, event: &SwarmEvent) {
        match event {
            SwarmEvent::FleetStateReported {
                state, timestamp, ..
            } => {
                self.heartbeats += 1;
                self.current_state = *state;
                self.last_updated = *timestamp;
            }
            SwarmEvent::FleetStateChanged {
                to,
                tick,
                timestamp,
                ..
            } => {
                self.current_state = *to;
                self.transitions.push((*to, *tick));
                self.last_updated = *timestamp;
            }
            SwarmEvent::PhaseChanged { to, timestamp, .. } => {
                self.current_phase = *to;
                self.last_updated = *timestamp;
            }
            SwarmEvent::HorizonPlanned {
                horizon_id,
                timestamp,
                ..
            } => {
                self.horizons_planned.push(*horizon_id);
                self.last_updated = *timestamp;
            }
            SwarmEvent::PlanningDegraded {
                horizon_id,
                timestamp,
                ..
            } => {
                self.degraded_horizons.push(*horizon_id);
                self.last_updated = *timestamp;
            }
            SwarmEvent::TrajectoriesPublished { timestamp, .. } => {
                self.trajectory_snapshots += 1;
                self.last_updated = *timestamp;
            }
            SwarmEvent::WaypointsRejected { timestamp, .. } => {
                self.rejected_waypoints += 1;
                self.last_updated = *timestamp;
            }
        }
    }

    pub fn reached_goal(&self) -> bool {
        self.current_state == FleetState::Reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_transitions_and_planning() {
        let mut projection = FleetTelemetryProjection::new("s".to_string());
        let now = Utc::now();
        projection.apply_event(&SwarmEvent::FleetStateChanged {
            swarm_id: "s".to_string(),
            from: FleetState::Idle,
            to: FleetState::Ready,
            tick: 3,
            timestamp: now,
        });
        projection.apply_event(&SwarmEvent::HorizonPlanned {
            swarm_id: "s".to_string(),
            horizon_id: 1,
            horizon_len: 10,
            timestamp: now,
        });
        projection.apply_event(&SwarmEvent::PlanningDegraded {
            swarm_id: "s".to_string(),
            horizon_id: Some(2),
            reason: "out of range".to_string(),
            timestamp: now,
        });

        assert_eq!(projection.current_state, FleetState::Ready);
        assert_eq!(projection.transitions, vec![(FleetState::Ready, 3)]);
        assert_eq!(projection.horizons_planned, vec![1]);
        assert_eq!(projection.degraded_horizons, vec![Some(2)]);
        assert!(!projection.reached_goal());
    }
}
