use crate::domains::swarm::{CoordinatorSettings, ProgressAggregation};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variables prefixed with this override file values, with `__`
/// between path segments: `DRONE_SWARM__SWARM__N_DRONES=5`.
pub const ENV_PREFIX: &str = "DRONE_SWARM";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub swarm: SwarmConfig,
    pub planning: PlanningConfig,
    pub waypoints: WaypointConfig,
    pub simulation: SimulationConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub swarm_id: String,
    pub n_drones: usize,
    pub frequency_hz: f64,
    pub replan_threshold: f64,
    pub progress_aggregation: ProgressAggregation,
    /// Fly full trajectories from `waypoints.trajectory_file` instead of
    /// planning online.
    pub predefined: bool,
    /// Stop after this many ticks even if the fleet has not reached its goal.
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    pub max_velocity: f64,
    pub max_acceleration: f64,
    /// Upper bound on how long the control loop waits for a planning result.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypointConfig {
    pub data_dir: PathBuf,
    pub plan_file: String,
    pub trajectory_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub boot_ticks_min: u32,
    pub boot_ticks_max: u32,
    pub goal_tolerance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub channel_capacity: usize,
    /// JSONL telemetry directory; telemetry stays in memory when unset.
    pub store_dir: Option<PathBuf>,
    pub record_heartbeats: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file_path: Option<String>,
    pub level: String,
    pub buffer_capacity: Option<usize>,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        let settings = CoordinatorSettings::default();
        Self {
            swarm_id: settings.swarm_id,
            n_drones: 3,
            frequency_hz: 10.0,
            replan_threshold: settings.replan_threshold,
            progress_aggregation: settings.progress_aggregation,
            predefined: false,
            max_ticks: None,
        }
    }
}

impl Default for PlanningConfig {
    fn default() -> Self {
        Self {
            max_velocity: 1.0,
            max_acceleration: 1.0,
            timeout_ms: None,
        }
    }
}

impl Default for WaypointConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("resources"),
            plan_file: "waypoints.json".to_string(),
            trajectory_file: "trajectories.json".to_string(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            boot_ticks_min: 1,
            boot_ticks_max: 5,
            goal_tolerance: 0.05,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            store_dir: None,
            record_heartbeats: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_path: None,
            level: "info".to_string(),
            buffer_capacity: None,
        }
    }
}

impl Config {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overlaid by `path` when it exists, overlaid by
    /// `DRONE_SWARM__*` environment variables.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: Config = ::config::Config::builder()
            .add_source(::config::File::from(path.as_ref()).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let swarm = &self.swarm;
        if swarm.n_drones == 0 {
            bail!("swarm.n_drones must be at least 1");
        }
        if !(swarm.frequency_hz > 0.0) {
            bail!("swarm.frequency_hz must be positive, got {}", swarm.frequency_hz);
        }
        // Progress tops out at (len - 1) / len, so a threshold of 1 would never switch to Execution.
        if !(swarm.replan_threshold > 0.0 && swarm.replan_threshold < 1.0) {
            bail!(
                "swarm.replan_threshold must be in (0, 1), got {}",
                swarm.replan_threshold
            );
        }
        if !(self.planning.max_velocity > 0.0 && self.planning.max_acceleration > 0.0) {
            bail!("planning velocity and acceleration bounds must be positive");
        }
        if self.simulation.boot_ticks_min > self.simulation.boot_ticks_max {
            bail!("simulation.boot_ticks_min exceeds simulation.boot_ticks_max");
        }
        if self.telemetry.channel_capacity == 0 {
            bail!("telemetry.channel_capacity must be at least 1");
        }
        Ok(())
    }

    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            swarm_id: self.swarm.swarm_id.clone(),
            replan_threshold: self.swarm.replan_threshold,
            progress_aggregation: self.swarm.progress_aggregation,
            planning_timeout: self.planning.timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.swarm.frequency_hz)
    }

    pub fn plan_path(&self) -> PathBuf {
        self.waypoints.data_dir.join(&self.waypoints.plan_file)
    }

    pub fn trajectory_path(&self) -> PathBuf {
        self.waypoints.data_dir.join(&self.waypoints.trajectory_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.tick_period(), Duration::from_millis(100));
        assert_eq!(config.plan_path(), PathBuf::from("resources/waypoints.json"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [swarm]
            n_drones = 5
            progress_aggregation = "min"

            [planning]
            timeout_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.swarm.n_drones, 5);
        assert_eq!(config.swarm.progress_aggregation, ProgressAggregation::Min);
        assert_eq!(config.swarm.replan_threshold, 0.5);
        assert_eq!(
            config.coordinator_settings().planning_timeout,
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn rejects_threshold_outside_unit_interval() {
        let mut config = Config::default();
        config.swarm.replan_threshold = 0.0;
        assert!(config.validate().is_err());
        config.swarm.replan_threshold = 1.5;
        assert!(config.validate().is_err());
        config.swarm.replan_threshold = 1.0;
        assert!(config.validate().is_err());
        config.swarm.replan_threshold = 0.9;
        assert!(config.validate().is_ok());
    }
}
