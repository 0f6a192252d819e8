use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle stage shared by the whole fleet. The fleet is in a state only
/// when every agent reports that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FleetState {
    Idle,
    Ready,
    Armed,
    Autonomous,
    Reached,
}

impl FleetState {
    /// The state every agent has to report before the fleet may leave `self`.
    /// `Reached` is terminal.
    pub fn next(self) -> Option<FleetState> {
        match self {
            FleetState::Idle => Some(FleetState::Ready),
            FleetState::Ready => Some(FleetState::Armed),
            FleetState::Armed => Some(FleetState::Autonomous),
            FleetState::Autonomous => Some(FleetState::Reached),
            FleetState::Reached => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for FleetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FleetState::Idle => "Idle",
            FleetState::Ready => "Ready",
            FleetState::Armed => "Armed",
            FleetState::Autonomous => "Autonomous",
            FleetState::Reached => "Reached",
        };
        f.write_str(s)
    }
}

/// Only meaningful while the fleet is `Autonomous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Planning,
    Execution,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Planning => f.write_str("Planning"),
            Phase::Execution => f.write_str("Execution"),
        }
    }
}

/// How the per-agent cursors of one tick collapse into a single progress
/// value. Only agents that actually advanced this tick take part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressAggregation {
    #[default]
    Max,
    Min,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_order() {
        let mut state = FleetState::Idle;
        let mut seen = vec![state];
        while let Some(next) = state.next() {
            state = next;
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                FleetState::Idle,
                FleetState::Ready,
                FleetState::Armed,
                FleetState::Autonomous,
                FleetState::Reached
            ]
        );
        assert!(FleetState::Reached.is_terminal());
    }
}
