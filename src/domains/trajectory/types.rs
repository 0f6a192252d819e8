use crate::common::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Vector3) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2) + (other.z - self.z).powi(2))
            .sqrt()
    }

    /// Linear interpolation, `t` in [0, 1].
    pub fn lerp(&self, other: &Vector3, t: f64) -> Vector3 {
        Vector3 {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
            z: self.z + t * (other.z - self.z),
        }
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// One sample handed to a flight controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    pub position: Vector3,
    /// Roll, pitch, yaw in radians.
    pub orientation: Vector3,
    pub time: f64,
}

/// Time-stamped position and orientation samples for one agent.
///
/// The three sequences always have the same length and `times` is strictly
/// increasing. Construct through [`Trajectory::new`] so that holds; the
/// serde path goes through the same check.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTrajectory")]
pub struct Trajectory {
    pos: Vec<Vector3>,
    rpy: Vec<Vector3>,
    times: Vec<f64>,
}

#[derive(Deserialize)]
struct RawTrajectory {
    pos: Vec<Vector3>,
    rpy: Vec<Vector3>,
    times: Vec<f64>,
}

impl TryFrom<RawTrajectory> for Trajectory {
    type Error = DomainError;

    fn try_from(raw: RawTrajectory) -> Result<Self, Self::Error> {
        Trajectory::new(raw.pos, raw.rpy, raw.times)
    }
}

impl Trajectory {
    pub fn new(pos: Vec<Vector3>, rpy: Vec<Vector3>, times: Vec<f64>) -> DomainResult<Self> {
        if pos.len() != rpy.len() || pos.len() != times.len() {
            return Err(DomainError::InvalidTrajectory {
                reason: format!(
                    "sequence lengths differ: pos={}, rpy={}, times={}",
                    pos.len(),
                    rpy.len(),
                    times.len()
                ),
            });
        }
        if let Some(i) = times.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(DomainError::InvalidTrajectory {
                reason: format!(
                    "timestamps must be strictly increasing (index {} -> {})",
                    i,
                    i + 1
                ),
            });
        }
        Ok(Self { pos, rpy, times })
    }

    /// Positions with zero orientation, timestamps `start + k * dt`.
    pub fn from_positions(positions: Vec<Vector3>, start: f64, dt: f64) -> DomainResult<Self> {
        let times = (0..positions.len()).map(|k| start + k as f64 * dt).collect();
        let rpy = vec![Vector3::ZERO; positions.len()];
        Self::new(positions, rpy, times)
    }

    pub fn len(&self) -> usize {
        self.pos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos.is_empty()
    }

    pub fn positions(&self) -> &[Vector3] {
        &self.pos
    }

    pub fn orientations(&self) -> &[Vector3] {
        &self.rpy
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn sample(&self, index: usize) -> Option<Setpoint> {
        Some(Setpoint {
            position: *self.pos.get(index)?,
            orientation: *self.rpy.get(index)?,
            time: *self.times.get(index)?,
        })
    }

    pub fn last_sample(&self) -> Option<Setpoint> {
        self.len().checked_sub(1).and_then(|i| self.sample(i))
    }

    pub fn duration(&self) -> f64 {
        match (self.times.first(), self.times.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }
}

/// Raw per-agent waypoints for one horizon, as produced by a waypoint source
/// or injected from outside. Each agent's waypoints reuse the trajectory
/// shape, and their timestamps are the segment timing the optimizer sees.
/// `times` carries the horizon's time hints as metadata (surfaced through
/// `WaypointSource::times_array`); it is not handed to the optimizer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WaypointPlan {
    pub agents: Vec<Trajectory>,
    pub times: Vec<f64>,
}

impl WaypointPlan {
    pub fn new(agents: Vec<Trajectory>, times: Vec<f64>) -> Self {
        Self { agents, times }
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }
}

/// Where a horizon sits in the overall plan; handed to the optimizer so it can
/// pin start and end conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HorizonContext {
    pub horizon_id: usize,
    pub total_horizons: usize,
    pub is_first: bool,
    pub is_last: bool,
}

impl HorizonContext {
    pub fn new(horizon_id: usize, total_horizons: usize) -> Self {
        Self {
            horizon_id,
            total_horizons,
            is_first: horizon_id == 0,
            is_last: horizon_id + 1 >= total_horizons,
        }
    }
}
