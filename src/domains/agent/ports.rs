use crate::domains::swarm::FleetState;
use crate::domains::trajectory::Setpoint;

/// Per-drone flight-controller binding.
///
/// Every command is fire-and-forget: the resulting state change is observed
/// on a later tick through [`FlightController::state`].
pub trait FlightController: Send {
    fn arm(&mut self, arm: bool);

    /// `true` requests takeoff, `false` requests landing.
    fn command_takeoff_or_land(&mut self, takeoff: bool);

    fn send_position_setpoint(&mut self, setpoint: &Setpoint);

    fn state(&self) -> FleetState;
}
