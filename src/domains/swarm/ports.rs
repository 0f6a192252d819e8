use super::events::SwarmEvent;
use super::state::FleetState;
use crate::domains::trajectory::Trajectory;
use std::sync::Arc;

/// Write-only presentation/telemetry port. Implementations must not block
/// the control loop; dropping a message is acceptable.
pub trait TelemetrySink: Send + Sync {
    fn publish_fleet_state(&self, state: FleetState);

    fn publish_trajectories(&self, trajectories: &[Trajectory]);

    /// Lifecycle, phase and planning events. Ignored unless overridden.
    fn publish_event(&self, _event: SwarmEvent) {}
}

pub type DynTelemetrySink = Arc<dyn TelemetrySink>;
