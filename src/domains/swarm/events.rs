use super::state::{FleetState, Phase};
use crate::common::DomainEvent;
use crate::domains::trajectory::Trajectory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SwarmEvent {
    /// Heartbeat, emitted every tick whether or not the state changed.
    FleetStateReported {
        swarm_id: String,
        state: FleetState,
        timestamp: DateTime<Utc>,
    },
    FleetStateChanged {
        swarm_id: String,
        from: FleetState,
        to: FleetState,
        tick: u64,
        timestamp: DateTime<Utc>,
    },
    PhaseChanged {
        swarm_id: String,
        from: Phase,
        to: Phase,
        progress: f64,
        tick: u64,
        timestamp: DateTime<Utc>,
    },
    HorizonPlanned {
        swarm_id: String,
        horizon_id: usize,
        horizon_len: usize,
        timestamp: DateTime<Utc>,
    },
    PlanningDegraded {
        swarm_id: String,
        horizon_id: Option<usize>,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    TrajectoriesPublished {
        swarm_id: String,
        trajectories: Vec<Trajectory>,
        timestamp: DateTime<Utc>,
    },
    WaypointsRejected {
        swarm_id: String,
        phase: Phase,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent for SwarmEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SwarmEvent::FleetStateReported { .. } => "FleetStateReported",
            SwarmEvent::FleetStateChanged { .. } => "FleetStateChanged",
            SwarmEvent::PhaseChanged { .. } => "PhaseChanged",
            SwarmEvent::HorizonPlanned { .. } => "HorizonPlanned",
            SwarmEvent::PlanningDegraded { .. } => "PlanningDegraded",
            SwarmEvent::TrajectoriesPublished { .. } => "TrajectoriesPublished",
            SwarmEvent::WaypointsRejected { .. } => "WaypointsRejected",
        }
    }

    fn stream_id(&self) -> &str {
        match self {
            SwarmEvent::FleetStateReported { swarm_id, .. }
            | SwarmEvent::FleetStateChanged { swarm_id, .. }
            | SwarmEvent::PhaseChanged { swarm_id, .. }
            | SwarmEvent::HorizonPlanned { swarm_id, .. }
            | SwarmEvent::PlanningDegraded { swarm_id, .. }
            | SwarmEvent::TrajectoriesPublished { swarm_id, .. }
            | SwarmEvent::WaypointsRejected { swarm_id, .. } => swarm_id,
        }
    }

    fn event_version(&self) -> u64 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SwarmEvent::FleetStateReported { timestamp, .. }
            | SwarmEvent::FleetStateChanged { timestamp, .. }
            | SwarmEvent::PhaseChanged { timestamp, .. }
            | SwarmEvent::HorizonPlanned { timestamp, .. }
            | SwarmEvent::PlanningDegraded { timestamp, .. }
            | SwarmEvent::TrajectoriesPublished { timestamp, .. }
            | SwarmEvent::WaypointsRejected { timestamp, .. } => *timestamp,
        }
    }
}
