mod common;

use common::*;
use drone_swarm::domains::agent::ExecutionStep;
use drone_swarm::domains::trajectory::{Trajectory, Vector3};

fn line(len: usize, x: f64) -> Trajectory {
    let positions = (0..len).map(|k| Vector3::new(x, 0.0, k as f64)).collect();
    Trajectory::from_positions(positions, 0.0, DT).unwrap()
}

#[test]
fn test_first_step_returns_cursor_one() {
    let (drones, mut agents) = agents(1);
    agents[0].push_trajectory(line(4, 0.0));

    let step = agents[0].execute_trajectory_step().unwrap();
    assert_eq!(
        step,
        ExecutionStep {
            sent_index: 0,
            cursor: 1,
            fresh: true
        }
    );
    assert_eq!(drones[0].setpoints().len(), 1);
    assert_eq!(drones[0].last_setpoint().unwrap().position.z, 0.0);
}

#[test]
fn test_cursor_saturates_at_last_sample() {
    let (drones, mut agents) = agents(1);
    agents[0].push_trajectory(line(3, 0.0));

    let cursors: Vec<_> = (0..5)
        .map(|_| agents[0].execute_trajectory_step().unwrap().cursor)
        .collect();
    assert_eq!(cursors, vec![1, 2, 2, 2, 2]);

    // The final setpoint is re-sent while holding.
    let z: Vec<_> = drones[0].setpoints().iter().map(|s| s.position.z).collect();
    assert_eq!(z, vec![0.0, 1.0, 2.0, 2.0, 2.0]);
}

#[test]
fn test_new_trajectory_never_inherits_cursor() {
    let (drones, mut agents) = agents(1);
    agents[0].push_trajectory(line(3, 0.0));
    for _ in 0..6 {
        agents[0].execute_trajectory_step();
    }
    assert_eq!(agents[0].cursor(), 2);

    agents[0].push_trajectory(line(5, 1.0));
    assert_eq!(agents[0].cursor(), 0);
    let step = agents[0].execute_trajectory_step().unwrap();
    assert_eq!(step.sent_index, 0);
    assert_eq!(step.cursor, 1);
    assert!(step.fresh);
    assert_eq!(
        drones[0].last_setpoint().unwrap().position,
        Vector3::new(1.0, 0.0, 0.0)
    );

    assert!(!agents[0].execute_trajectory_step().unwrap().fresh);
}

#[test]
fn test_empty_buffer_sends_nothing() {
    let (drones, mut agents) = agents(1);
    assert!(agents[0].execute_trajectory_step().is_none());
    assert!(drones[0].setpoints().is_empty());
}

#[test]
fn test_single_sample_trajectory_holds() {
    let (_, mut agents) = agents(1);
    agents[0].push_trajectory(line(1, 0.0));
    let first = agents[0].execute_trajectory_step().unwrap();
    let second = agents[0].execute_trajectory_step().unwrap();
    assert_eq!((first.sent_index, first.cursor), (0, 0));
    assert_eq!((second.sent_index, second.cursor, second.fresh), (0, 0, false));
}
