mod common;

use common::*;
use drone_swarm::adapters::outbound::{init_noop_logger, StaticWaypointSource};
use drone_swarm::common::PlanningError;
use drone_swarm::domains::planning::{ExecutionAction, PlanningAction, PlanningPhaseScheduler};
use drone_swarm::domains::trajectory::{WaypointPlan, WaypointSource};
use std::sync::Arc;
use std::time::Duration;

fn scheduler(
    n_agents: usize,
    horizons: Vec<WaypointPlan>,
    optimizer: ScriptedOptimizer,
    timeout: Option<Duration>,
) -> (PlanningPhaseScheduler, Arc<ScriptedOptimizer>) {
    let optimizer = Arc::new(optimizer);
    let scheduler = PlanningPhaseScheduler::new(
        n_agents,
        Arc::new(StaticWaypointSource::new(horizons)),
        optimizer.clone(),
        init_noop_logger(),
        timeout,
    );
    (scheduler, optimizer)
}

#[tokio::test]
async fn test_initial_plan_installs_horizon_zero() {
    let (mut scheduler, _) = scheduler(2, plans(3, 2), ScriptedOptimizer::new(8), None);
    let (_, mut agents) = agents(2);
    assert_eq!(scheduler.total_horizons(), 0);

    let len = scheduler.plan_initial(&mut agents).await.unwrap();
    assert_eq!(len, 8);
    assert_eq!(scheduler.horizon_id(), 1);
    assert_eq!(scheduler.total_horizons(), 3);
    assert_eq!(scheduler.previous_trajectories().len(), 2);
    assert!(agents.iter().all(|a| a.horizon_len() == 8 && a.cursor() == 0));
}

#[tokio::test]
async fn test_planning_then_execution_pushes_next_horizon() {
    let (mut scheduler, optimizer) = scheduler(2, plans(3, 2), ScriptedOptimizer::new(8), None);
    let (_, mut agents) = agents(2);
    scheduler.plan_initial(&mut agents).await.unwrap();
    for agent in agents.iter_mut() {
        agent.execute_trajectory_step();
        agent.execute_trajectory_step();
    }

    assert_eq!(
        scheduler.on_planning_phase(),
        PlanningAction::Launched { horizon_id: 1 }
    );
    assert_eq!(scheduler.on_planning_phase(), PlanningAction::AlreadyInitialized);

    assert_eq!(
        scheduler.on_execution_phase(&mut agents).await,
        ExecutionAction::Pushed {
            horizon_id: 1,
            horizon_len: 8
        }
    );
    assert_eq!(
        scheduler.on_execution_phase(&mut agents).await,
        ExecutionAction::AlreadyInitialized
    );
    assert!(agents.iter().all(|a| a.cursor() == 0));
    assert_eq!(optimizer.calls()[1].continuity_len, 2);
}

#[tokio::test]
async fn test_no_horizons_left_marks_execution_ready() {
    let (mut scheduler, optimizer) = scheduler(1, plans(1, 1), ScriptedOptimizer::new(5), None);
    let (_, mut agents) = agents(1);
    scheduler.plan_initial(&mut agents).await.unwrap();

    assert_eq!(
        scheduler.on_planning_phase(),
        PlanningAction::Exhausted { horizon_id: 1 }
    );
    let guards = scheduler.guards();
    assert!(guards.planning_initialized);
    assert!(guards.execution_initialized);

    // Execution never waits on a plan that was not launched.
    assert_eq!(
        scheduler.on_execution_phase(&mut agents).await,
        ExecutionAction::AlreadyInitialized
    );
    assert_eq!(optimizer.calls().len(), 1);
}

#[tokio::test]
async fn test_solver_failure_degrades() {
    let (mut scheduler, _) = scheduler(
        2,
        plans(3, 2),
        ScriptedOptimizer::new(8).failing_on(1),
        None,
    );
    let (_, mut agents) = agents(2);
    scheduler.plan_initial(&mut agents).await.unwrap();
    for _ in 0..3 {
        agents[0].execute_trajectory_step();
    }

    scheduler.on_planning_phase();
    match scheduler.on_execution_phase(&mut agents).await {
        ExecutionAction::Degraded {
            error: PlanningError::TaskFailed { horizon_id, .. },
        } => assert_eq!(horizon_id, 1),
        other => panic!("expected degraded execution, got {:?}", other),
    }
    assert!(scheduler.guards().execution_initialized);
    assert_eq!(agents[0].cursor(), 3);
    assert_eq!(agents[0].trajectory().positions()[0].x, 0.0);
}

#[tokio::test]
async fn test_malformed_horizon_degrades() {
    let mut horizons = plans(3, 2);
    horizons[1] = WaypointPlan::new(Vec::new(), Vec::new());
    let (mut scheduler, _) = scheduler(2, horizons, ScriptedOptimizer::new(8), None);
    let (_, mut agents) = agents(2);
    scheduler.plan_initial(&mut agents).await.unwrap();

    assert_eq!(
        scheduler.on_planning_phase(),
        PlanningAction::Launched { horizon_id: 1 }
    );
    match scheduler.on_execution_phase(&mut agents).await {
        ExecutionAction::Degraded { error } => {
            assert!(matches!(error, PlanningError::MalformedPlan { horizon_id: 1, .. }))
        }
        other => panic!("expected degraded execution, got {:?}", other),
    }
}

#[tokio::test]
async fn test_wrong_agent_count_is_malformed() {
    let (mut scheduler, _) = scheduler(3, plans(2, 2), ScriptedOptimizer::new(8), None);
    let (_, mut agents) = agents(3);
    let err = scheduler.plan_initial(&mut agents).await.unwrap_err();
    assert!(matches!(err, PlanningError::MalformedPlan { horizon_id: 0, .. }));
    assert!(agents.iter().all(|a| a.horizon_len() == 0));
}

#[tokio::test]
async fn test_slow_planner_times_out() {
    let (mut scheduler, _) = scheduler(
        1,
        plans(3, 1),
        ScriptedOptimizer::new(4).slow_on(1, Duration::from_millis(300)),
        Some(Duration::from_millis(50)),
    );
    let (_, mut agents) = agents(1);
    scheduler.plan_initial(&mut agents).await.unwrap();
    agents[0].execute_trajectory_step();

    scheduler.on_planning_phase();
    match scheduler.on_execution_phase(&mut agents).await {
        ExecutionAction::Degraded { error } => assert_eq!(
            error,
            PlanningError::Timeout {
                horizon_id: 1,
                timeout_ms: 50
            }
        ),
        other => panic!("expected a timeout, got {:?}", other),
    }
    // The horizon that was already installed keeps flying.
    assert_eq!(agents[0].horizon_len(), 4);
    assert_eq!(agents[0].cursor(), 1);
}

/// Claims one more horizon than it can actually load.
struct OverCountingSource(StaticWaypointSource);

impl WaypointSource for OverCountingSource {
    fn load_discrete_plan(&self, horizon_id: usize) -> Result<WaypointPlan, PlanningError> {
        self.0.load_discrete_plan(horizon_id)
    }

    fn total_horizons(&self) -> Option<usize> {
        self.0.total_horizons().map(|n| n + 1)
    }

    fn times_array(&self) -> Vec<Vec<f64>> {
        self.0.times_array()
    }
}

#[tokio::test]
async fn test_out_of_range_horizon_in_background_degrades() {
    let mut scheduler = PlanningPhaseScheduler::new(
        1,
        Arc::new(OverCountingSource(StaticWaypointSource::new(plans(1, 1)))),
        Arc::new(ScriptedOptimizer::new(5)),
        init_noop_logger(),
        None,
    );
    let (_, mut agents) = agents(1);
    scheduler.plan_initial(&mut agents).await.unwrap();
    assert_eq!(scheduler.total_horizons(), 2);
    agents[0].execute_trajectory_step();
    let flying = agents[0].trajectory().clone();

    assert_eq!(
        scheduler.on_planning_phase(),
        PlanningAction::Launched { horizon_id: 1 }
    );
    assert_eq!(
        scheduler.on_execution_phase(&mut agents).await,
        ExecutionAction::Degraded {
            error: PlanningError::HorizonOutOfRange {
                horizon_id: 1,
                total_horizons: 1
            }
        }
    );
    assert!(scheduler.guards().execution_initialized);
    assert_eq!(agents[0].trajectory(), &flying);
    assert_eq!(agents[0].cursor(), 1);
}
