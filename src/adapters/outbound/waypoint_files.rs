use crate::common::{DomainError, DomainResult, PlanningError};
use crate::domains::trajectory::{Trajectory, TrajectorySource, WaypointPlan, WaypointSource};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// On-disk layout of a waypoint file: one discrete plan per horizon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaypointFile {
    pub horizons: Vec<WaypointPlan>,
}

impl WaypointFile {
    pub fn times_array(&self) -> Vec<Vec<f64>> {
        self.horizons.iter().map(|h| h.times.clone()).collect()
    }
}

fn plan_for(
    horizons: &[WaypointPlan],
    horizon_id: usize,
) -> Result<WaypointPlan, PlanningError> {
    let plan = horizons
        .get(horizon_id)
        .ok_or(PlanningError::HorizonOutOfRange {
            horizon_id,
            total_horizons: horizons.len(),
        })?;
    if plan.agents.is_empty() {
        return Err(PlanningError::MalformedPlan {
            horizon_id,
            reason: "horizon lists no agents".to_string(),
        });
    }
    Ok(plan.clone())
}

/// Waypoint source backed by a JSON [`WaypointFile`].
///
/// The file is read on the first request and cached; a read or parse failure
/// is reported as a malformed plan and retried on the next request.
pub struct JsonWaypointSource {
    path: PathBuf,
    loaded: Mutex<Option<WaypointFile>>,
}

impl JsonWaypointSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cache(&self) -> MutexGuard<'_, Option<WaypointFile>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_file(&self) -> Result<WaypointFile, String> {
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| format!("{}: {}", self.path.display(), e))?;
        serde_json::from_str(&contents).map_err(|e| format!("{}: {}", self.path.display(), e))
    }
}

impl WaypointSource for JsonWaypointSource {
    fn load_discrete_plan(&self, horizon_id: usize) -> Result<WaypointPlan, PlanningError> {
        let mut cache = self.cache();
        if cache.is_none() {
            let file = self
                .read_file()
                .map_err(|reason| PlanningError::MalformedPlan { horizon_id, reason })?;
            *cache = Some(file);
        }
        let horizons = cache.as_ref().map(|f| f.horizons.as_slice()).unwrap_or(&[]);
        plan_for(horizons, horizon_id)
    }

    fn total_horizons(&self) -> Option<usize> {
        self.cache().as_ref().map(|f| f.horizons.len())
    }

    fn times_array(&self) -> Vec<Vec<f64>> {
        self.cache()
            .as_ref()
            .map(WaypointFile::times_array)
            .unwrap_or_default()
    }
}

/// Waypoint source over plans already in memory. Like the file source it
/// only reveals its horizon count once something has been loaded.
pub struct StaticWaypointSource {
    file: WaypointFile,
    loaded: Mutex<bool>,
}

impl StaticWaypointSource {
    pub fn new(horizons: Vec<WaypointPlan>) -> Self {
        Self {
            file: WaypointFile { horizons },
            loaded: Mutex::new(false),
        }
    }

    fn is_loaded(&self) -> bool {
        *self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WaypointSource for StaticWaypointSource {
    fn load_discrete_plan(&self, horizon_id: usize) -> Result<WaypointPlan, PlanningError> {
        *self.loaded.lock().unwrap_or_else(PoisonError::into_inner) = true;
        plan_for(&self.file.horizons, horizon_id)
    }

    fn total_horizons(&self) -> Option<usize> {
        self.is_loaded().then(|| self.file.horizons.len())
    }

    fn times_array(&self) -> Vec<Vec<f64>> {
        if self.is_loaded() {
            self.file.times_array()
        } else {
            Vec::new()
        }
    }
}

/// Precomputed trajectories stored as a JSON array, one entry per agent.
pub struct JsonTrajectorySource {
    path: PathBuf,
}

impl JsonTrajectorySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TrajectorySource for JsonTrajectorySource {
    fn load_trajectories(&self, n_agents: usize) -> DomainResult<Vec<Trajectory>> {
        let contents = fs::read_to_string(&self.path).map_err(|e| {
            DomainError::InfrastructureError(format!("{}: {}", self.path.display(), e))
        })?;
        let mut trajectories: Vec<Trajectory> = serde_json::from_str(&contents)?;
        if trajectories.len() < n_agents {
            return Err(DomainError::InvalidTrajectory {
                reason: format!(
                    "{} holds {} trajectories, fleet has {} agents",
                    self.path.display(),
                    trajectories.len(),
                    n_agents
                ),
            });
        }
        trajectories.truncate(n_agents);
        Ok(trajectories)
    }
}
