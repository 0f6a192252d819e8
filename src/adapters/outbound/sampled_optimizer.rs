use crate::common::{DomainError, DomainResult};
use crate::domains::trajectory::{HorizonContext, Trajectory, TrajectoryOptimizer, Vector3};

/// Reference solver: piecewise-linear motion through the waypoints, with
/// each segment stretched until it respects the velocity and acceleration
/// bounds, sampled at a fixed rate.
///
/// Every agent in a horizon gets the same number of samples; agents that
/// finish early hold their final waypoint. On later horizons each agent
/// starts from the last sample of its previous trajectory, and timestamps
/// continue from there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledTrajectoryOptimizer {
    pub max_velocity: f64,
    pub max_acceleration: f64,
    pub frequency_hz: f64,
}

impl Default for SampledTrajectoryOptimizer {
    fn default() -> Self {
        Self {
            max_velocity: 1.0,
            max_acceleration: 1.0,
            frequency_hz: 10.0,
        }
    }
}

/// Knot positions and their arrival times, starting at 0.
struct Schedule {
    knots: Vec<Vector3>,
    arrivals: Vec<f64>,
}

impl Schedule {
    fn duration(&self) -> f64 {
        self.arrivals.last().copied().unwrap_or(0.0)
    }

    /// Position and travel direction at `t`, holding the last knot past the end.
    fn at(&self, t: f64) -> (Vector3, Option<Vector3>) {
        for i in 1..self.knots.len() {
            if t <= self.arrivals[i] {
                let (a, b) = (self.knots[i - 1], self.knots[i]);
                let span = self.arrivals[i] - self.arrivals[i - 1];
                let frac = if span > 0.0 {
                    ((t - self.arrivals[i - 1]) / span).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                let dir = Vector3::new(b.x - a.x, b.y - a.y, b.z - a.z);
                return (a.lerp(&b, frac), Some(dir));
            }
        }
        (self.knots.last().copied().unwrap_or(Vector3::ZERO), None)
    }
}

impl SampledTrajectoryOptimizer {
    pub fn new(max_velocity: f64, max_acceleration: f64, frequency_hz: f64) -> Self {
        Self {
            max_velocity,
            max_acceleration,
            frequency_hz,
        }
    }

    /// Shortest time a rest-to-rest move of `distance` may take.
    fn min_segment_time(&self, distance: f64) -> f64 {
        let cruise = distance / self.max_velocity;
        let accel = 2.0 * (distance / self.max_acceleration).sqrt();
        cruise.max(accel)
    }

    fn schedule(&self, waypoints: &Trajectory, start: Option<Vector3>) -> Schedule {
        // hints[i] is the suggested duration of the segment into knots[i + 1].
        let mut knots = Vec::with_capacity(waypoints.len() + 1);
        let mut hints = Vec::with_capacity(waypoints.len());
        if let Some(start) = start {
            knots.push(start);
        }
        let times = waypoints.times();
        for (i, p) in waypoints.positions().iter().enumerate() {
            if i > 0 {
                hints.push(times[i] - times[i - 1]);
            } else if start.is_some() {
                hints.push(0.0);
            }
            knots.push(*p);
        }

        let mut arrivals = vec![0.0; knots.len()];
        for i in 1..knots.len() {
            let distance = knots[i - 1].distance_to(&knots[i]);
            let segment = hints[i - 1].max(self.min_segment_time(distance));
            arrivals[i] = arrivals[i - 1] + segment;
        }
        Schedule { knots, arrivals }
    }
}

impl TrajectoryOptimizer for SampledTrajectoryOptimizer {
    fn solve(
        &self,
        waypoints: &[Trajectory],
        continuity: &[Trajectory],
        ctx: HorizonContext,
    ) -> DomainResult<Vec<Trajectory>> {
        if !(self.max_velocity > 0.0 && self.max_acceleration > 0.0 && self.frequency_hz > 0.0) {
            return Err(DomainError::InvalidCommand {
                reason: "velocity, acceleration and frequency bounds must be positive".to_string(),
            });
        }
        if !continuity.is_empty() && continuity.len() != waypoints.len() {
            return Err(DomainError::InvalidTrajectory {
                reason: format!(
                    "continuity covers {} agents, waypoints cover {}",
                    continuity.len(),
                    waypoints.len()
                ),
            });
        }
        if let Some(agent) = waypoints.iter().position(Trajectory::is_empty) {
            return Err(DomainError::InvalidTrajectory {
                reason: format!("agent {} has no waypoints", agent),
            });
        }

        let dt = 1.0 / self.frequency_hz;
        let tails: Vec<_> = continuity.iter().map(Trajectory::last_sample).collect();
        let start_time = tails
            .iter()
            .flatten()
            .map(|s| s.time)
            .fold(None, |acc: Option<f64>, t| Some(acc.map_or(t, |a| a.max(t))))
            .map(|t| t + dt)
            .unwrap_or(0.0);

        let schedules: Vec<_> = waypoints
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let start = tails.get(i).copied().flatten().map(|s| s.position);
                self.schedule(w, start)
            })
            .collect();

        let duration = schedules.iter().map(Schedule::duration).fold(0.0, f64::max);
        let mut samples = (duration * self.frequency_hz).ceil() as usize + 1;
        if ctx.is_last {
            // One extra sample at the goal so the final setpoint is held.
            samples += 1;
        }
        let samples = samples.max(2);

        schedules
            .iter()
            .enumerate()
            .map(|(i, schedule)| {
                let mut yaw = tails
                    .get(i)
                    .copied()
                    .flatten()
                    .map(|s| s.orientation.z)
                    .unwrap_or(0.0);
                let mut pos = Vec::with_capacity(samples);
                let mut rpy = Vec::with_capacity(samples);
                let mut times = Vec::with_capacity(samples);
                for k in 0..samples {
                    let t = k as f64 * dt;
                    let (p, dir) = schedule.at(t);
                    if let Some(d) = dir {
                        if d.x.hypot(d.y) > f64::EPSILON {
                            yaw = d.y.atan2(d.x);
                        }
                    }
                    pos.push(p);
                    rpy.push(Vector3::new(0.0, 0.0, yaw));
                    times.push(start_time + t);
                }
                Trajectory::new(pos, rpy, times)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoints(points: &[[f64; 3]]) -> Trajectory {
        Trajectory::from_positions(points.iter().copied().map(Vector3::from).collect(), 0.0, 0.1)
            .unwrap()
    }

    #[test]
    fn agents_share_a_horizon_length() {
        let optimizer = SampledTrajectoryOptimizer::new(1.0, 2.0, 10.0);
        let result = optimizer
            .solve(
                &[
                    waypoints(&[[0.0, 0.0, 1.0], [2.0, 0.0, 1.0]]),
                    waypoints(&[[0.0, 1.0, 1.0], [0.5, 1.0, 1.0]]),
                ],
                &[],
                HorizonContext::new(0, 2),
            )
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].len(), result[1].len());
        assert_eq!(result[0].times()[0], 0.0);

        // The short mover holds its goal once it gets there.
        let last = result[1].last_sample().unwrap();
        assert!(last.position.distance_to(&Vector3::new(0.5, 1.0, 1.0)) < 1e-9);
    }

    #[test]
    fn respects_velocity_bound() {
        let optimizer = SampledTrajectoryOptimizer::new(0.5, 10.0, 20.0);
        let result = optimizer
            .solve(
                &[waypoints(&[[0.0, 0.0, 0.0], [3.0, 0.0, 0.0]])],
                &[],
                HorizonContext::new(0, 1),
            )
            .unwrap();
        let t = &result[0];
        for i in 1..t.len() {
            let dist = t.positions()[i - 1].distance_to(&t.positions()[i]);
            let dt = t.times()[i] - t.times()[i - 1];
            assert!(dist / dt <= 0.5 + 1e-9);
        }
        assert!(t.duration() >= 6.0);
    }

    #[test]
    fn continues_from_previous_horizon() {
        let optimizer = SampledTrajectoryOptimizer::default();
        let first = optimizer
            .solve(
                &[waypoints(&[[0.0, 0.0, 1.0], [1.0, 0.0, 1.0]])],
                &[],
                HorizonContext::new(0, 2),
            )
            .unwrap();
        let tail = first[0].last_sample().unwrap();

        let second = optimizer
            .solve(
                &[waypoints(&[[1.0, 1.0, 1.0]])],
                &first,
                HorizonContext::new(1, 2),
            )
            .unwrap();
        let head = second[0].sample(0).unwrap();
        assert_eq!(head.position, tail.position);
        assert!(head.time > tail.time);
        // Heading turns toward +y for the second leg.
        let yaw = second[0].orientations()[1].z;
        assert!((yaw - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn segment_timing_follows_waypoint_timestamps() {
        // 1 m at 1 m/s needs 2 s; the waypoints ask for 4 s.
        let optimizer = SampledTrajectoryOptimizer::new(1.0, 1.0, 10.0);
        let slow = Trajectory::from_positions(
            vec![Vector3::new(0.0, 0.0, 1.0), Vector3::new(1.0, 0.0, 1.0)],
            0.0,
            4.0,
        )
        .unwrap();
        let result = optimizer
            .solve(&[slow], &[], HorizonContext::new(0, 2))
            .unwrap();
        assert!((result[0].duration() - 4.0).abs() < 1e-9);
        let midway = result[0].sample(20).unwrap();
        assert!((midway.position.x - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_continuity_for_other_fleet_size() {
        let optimizer = SampledTrajectoryOptimizer::default();
        let previous = vec![waypoints(&[[0.0, 0.0, 0.0]]); 2];
        let err = optimizer
            .solve(&[waypoints(&[[1.0, 0.0, 0.0]])], &previous, HorizonContext::new(1, 2))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidTrajectory { .. }));
    }
}
