use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid trajectory: {reason}")]
    InvalidTrajectory { reason: String },

    #[error("Invalid command: {reason}")]
    InvalidCommand { reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
}

/// Failures on the planning side. All of them are recoverable: the scheduler
/// converts them into the degrade path and the fleet keeps flying the
/// trajectory it already has.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    #[error("Horizon {horizon_id} is out of range (total horizons: {total_horizons})")]
    HorizonOutOfRange {
        horizon_id: usize,
        total_horizons: usize,
    },

    #[error("Malformed plan for horizon {horizon_id}: {reason}")]
    MalformedPlan { horizon_id: usize, reason: String },

    #[error("Planning task for horizon {horizon_id} failed: {reason}")]
    TaskFailed { horizon_id: usize, reason: String },

    #[error("Planning result unavailable: {reason}")]
    ResultRetrieval {
        horizon_id: Option<usize>,
        reason: String,
    },

    #[error("Planning task for horizon {horizon_id} timed out after {timeout_ms} ms")]
    Timeout { horizon_id: usize, timeout_ms: u64 },

    #[error("Cannot plan horizon {horizon_id}: result for horizon {outstanding} is still outstanding")]
    PlanOutstanding {
        horizon_id: usize,
        outstanding: usize,
    },
}

impl PlanningError {
    pub fn horizon_id(&self) -> Option<usize> {
        match self {
            PlanningError::HorizonOutOfRange { horizon_id, .. }
            | PlanningError::MalformedPlan { horizon_id, .. }
            | PlanningError::TaskFailed { horizon_id, .. }
            | PlanningError::Timeout { horizon_id, .. }
            | PlanningError::PlanOutstanding { horizon_id, .. } => Some(*horizon_id),
            PlanningError::ResultRetrieval { horizon_id, .. } => *horizon_id,
        }
    }

    /// True when the failure means "no more horizons" rather than a broken plan.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, PlanningError::HorizonOutOfRange { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwarmError {
    #[error("Swarm is not in the planning phase (current phase: {current_phase}); waypoints rejected")]
    PhaseViolation { current_phase: String },

    #[error("Invalid waypoints: {reason}")]
    InvalidWaypoints { reason: String },

    #[error(transparent)]
    Planning(#[from] PlanningError),
}

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Swarm error: {0}")]
    Swarm(#[from] SwarmError),

    #[error("Telemetry store error: {0}")]
    TelemetryStore(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] anyhow::Error),
}

pub type DomainResult<T> = Result<T, DomainError>;
pub type PlanningResult<T> = Result<T, PlanningError>;
pub type SwarmResult<T> = Result<T, SwarmError>;
pub type ApplicationResult<T> = Result<T, ApplicationError>;
