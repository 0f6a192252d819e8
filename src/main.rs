use drone_swarm::adapters::outbound::{
    init_buffered_logger, init_combined_logger, init_tracing_logger, JsonWaypointSource,
    SimulatedFlightController,
};
use drone_swarm::application::{RunOutcome, SwarmService, TelemetryPipeline};
use drone_swarm::domains::agent::FlightController;
use drone_swarm::domains::logger::DynLogger;
use drone_swarm::domains::trajectory::{Vector3, WaypointSource};
use drone_swarm::Config;
use std::error::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Installed without a `log` bridge so the fast_log file logger can own
    // the `log` facade.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting drone swarm coordinator");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = Config::load(&config_path)?;
    info!(
        "Configuration loaded from {}: {} drones at {} Hz",
        config_path, config.swarm.n_drones, config.swarm.frequency_hz
    );

    let logger = build_logger(&config);
    let telemetry = TelemetryPipeline::spawn(&config.swarm.swarm_id, &config.telemetry);

    let drones = SimulatedFlightController::fleet(
        config.swarm.n_drones,
        (config.simulation.boot_ticks_min, config.simulation.boot_ticks_max),
        &final_goals(&config),
        config.simulation.goal_tolerance,
        config.simulation.seed,
    );
    let controllers: Vec<Box<dyn FlightController>> = drones
        .iter()
        .cloned()
        .map(|d| Box::new(d) as Box<dyn FlightController>)
        .collect();

    let mut service =
        SwarmService::from_config(&config, controllers, telemetry.sink.clone(), logger).await?;

    let outcome = service
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    match outcome {
        RunOutcome::Reached { ticks } => info!("Swarm reached its goal after {} ticks", ticks),
        RunOutcome::TickLimit { ticks } => warn!("Stopped at the tick limit ({} ticks)", ticks),
        RunOutcome::Shutdown { ticks } => info!("Shut down after {} ticks", ticks),
    }

    drop(service);
    let summary = telemetry.shutdown().await;
    info!(
        "Telemetry: state {}, {} transitions, horizons planned {:?}, {} degraded, {} waypoint sets rejected",
        summary.current_state,
        summary.transitions.len(),
        summary.horizons_planned,
        summary.degraded_horizons.len(),
        summary.rejected_waypoints
    );

    Ok(())
}

fn build_logger(config: &Config) -> DynLogger {
    let base = match &config.logging.file_path {
        Some(path) => init_combined_logger(path, &config.logging.level, &config.swarm.swarm_id),
        None => init_tracing_logger(&config.swarm.swarm_id),
    };
    match config.logging.buffer_capacity {
        Some(capacity) => init_buffered_logger(base, capacity),
        None => base,
    }
}

/// Goal of each simulated drone: the last waypoint it is given in the
/// waypoint file. Predefined runs and unreadable files have no goals, so
/// those fleets only stop at the tick limit.
fn final_goals(config: &Config) -> Vec<Option<Vector3>> {
    if config.swarm.predefined {
        return Vec::new();
    }
    let source = JsonWaypointSource::new(config.plan_path());
    let total = match source.load_discrete_plan(0) {
        Ok(_) => source.total_horizons().unwrap_or(0),
        Err(e) => {
            warn!("Could not read waypoints for simulated goals: {}", e);
            return Vec::new();
        }
    };
    match total.checked_sub(1).map(|last| source.load_discrete_plan(last)) {
        Some(Ok(plan)) => plan
            .agents
            .iter()
            .map(|w| w.last_sample().map(|s| s.position))
            .collect(),
        _ => Vec::new(),
    }
}
