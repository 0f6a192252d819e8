use crate::common::{PlanningError, PlanningResult};
use crate::domains::trajectory::Trajectory;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

pub type PlanOutcome = Result<Vec<Trajectory>, PlanningError>;

/// Externally visible lifecycle of a [`PlanningTask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanningTaskStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
    Consumed,
}

enum TaskState {
    NotStarted,
    Running {
        horizon_id: usize,
        receiver: oneshot::Receiver<PlanOutcome>,
    },
    Completed {
        horizon_id: usize,
        trajectories: Vec<Trajectory>,
    },
    Failed {
        horizon_id: usize,
        error: PlanningError,
    },
    Consumed {
        horizon_id: usize,
    },
}

/// One background planning computation with a single-consumer handoff.
///
/// `NotStarted -> Running -> Completed | Failed -> Consumed`. The job runs on
/// tokio's blocking pool and delivers its outcome through a oneshot channel;
/// [`PlanningTask::take`] hands the terminal result out exactly once.
/// There is no cancellation: a launched job always runs to completion, even
/// when a timeout made the task give up waiting for it.
pub struct PlanningTask {
    state: TaskState,
}

impl Default for PlanningTask {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanningTask {
    pub fn new() -> Self {
        Self {
            state: TaskState::NotStarted,
        }
    }

    pub fn status(&self) -> PlanningTaskStatus {
        match self.state {
            TaskState::NotStarted => PlanningTaskStatus::NotStarted,
            TaskState::Running { .. } => PlanningTaskStatus::Running,
            TaskState::Completed { .. } => PlanningTaskStatus::Completed,
            TaskState::Failed { .. } => PlanningTaskStatus::Failed,
            TaskState::Consumed { .. } => PlanningTaskStatus::Consumed,
        }
    }

    pub fn horizon_id(&self) -> Option<usize> {
        match &self.state {
            TaskState::NotStarted => None,
            TaskState::Running { horizon_id, .. }
            | TaskState::Completed { horizon_id, .. }
            | TaskState::Failed { horizon_id, .. }
            | TaskState::Consumed { horizon_id } => Some(*horizon_id),
        }
    }

    /// Starts `job` for `horizon_id` on the blocking pool.
    ///
    /// Launching the horizon that is already outstanding is a no-op; a
    /// different horizon is refused until the outstanding result has been
    /// consumed.
    pub fn launch<F>(&mut self, horizon_id: usize, job: F) -> PlanningResult<()>
    where
        F: FnOnce() -> PlanOutcome + Send + 'static,
    {
        match &self.state {
            TaskState::Running { horizon_id: outstanding, .. }
            | TaskState::Completed { horizon_id: outstanding, .. }
            | TaskState::Failed { horizon_id: outstanding, .. } => {
                if *outstanding == horizon_id {
                    return Ok(());
                }
                return Err(PlanningError::PlanOutstanding {
                    horizon_id,
                    outstanding: *outstanding,
                });
            }
            TaskState::NotStarted | TaskState::Consumed { .. } => {}
        }

        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            PlanningError::TaskFailed {
                horizon_id,
                reason: format!("no async runtime available: {}", e),
            }
        })?;

        let (sender, receiver) = oneshot::channel();
        handle.spawn_blocking(move || {
            // The receiver may be gone after a timeout; nothing to do then.
            let _ = sender.send(job());
        });

        self.state = TaskState::Running {
            horizon_id,
            receiver,
        };
        Ok(())
    }

    /// Non-blocking poll: moves a finished `Running` task to its terminal state.
    pub fn refresh(&mut self) {
        let next = match &mut self.state {
            TaskState::Running {
                horizon_id,
                receiver,
            } => match receiver.try_recv() {
                Ok(outcome) => Some(Self::settle(*horizon_id, outcome)),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Closed) => Some(Self::broken(*horizon_id)),
            },
            _ => None,
        };
        if let Some(state) = next {
            self.state = state;
        }
    }

    /// Waits until the task reaches a terminal state. With a timeout, an
    /// overdue task is forced into `Failed`.
    pub async fn wait(&mut self, timeout: Option<Duration>) {
        let (horizon_id, receiver) = match &mut self.state {
            TaskState::Running {
                horizon_id,
                receiver,
            } => (*horizon_id, receiver),
            _ => return,
        };

        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, receiver).await,
            None => Ok(receiver.await),
        };

        self.state = match received {
            Ok(Ok(outcome)) => Self::settle(horizon_id, outcome),
            Ok(Err(_)) => Self::broken(horizon_id),
            Err(_) => TaskState::Failed {
                horizon_id,
                error: PlanningError::Timeout {
                    horizon_id,
                    timeout_ms: timeout.map(|t| t.as_millis() as u64).unwrap_or_default(),
                },
            },
        };
    }

    /// Consumes the terminal result. Anything but a fresh `Completed` or
    /// `Failed` yields [`PlanningError::ResultRetrieval`] or the stored failure.
    pub fn take(&mut self) -> PlanOutcome {
        self.refresh();
        match std::mem::replace(&mut self.state, TaskState::NotStarted) {
            TaskState::Completed {
                horizon_id,
                trajectories,
            } => {
                self.state = TaskState::Consumed { horizon_id };
                Ok(trajectories)
            }
            TaskState::Failed { horizon_id, error } => {
                self.state = TaskState::Consumed { horizon_id };
                Err(error)
            }
            TaskState::Running {
                horizon_id,
                receiver,
            } => {
                self.state = TaskState::Running {
                    horizon_id,
                    receiver,
                };
                Err(PlanningError::ResultRetrieval {
                    horizon_id: Some(horizon_id),
                    reason: "result is not ready yet".to_string(),
                })
            }
            TaskState::Consumed { horizon_id } => {
                self.state = TaskState::Consumed { horizon_id };
                Err(PlanningError::ResultRetrieval {
                    horizon_id: Some(horizon_id),
                    reason: "result was already consumed".to_string(),
                })
            }
            TaskState::NotStarted => Err(PlanningError::ResultRetrieval {
                horizon_id: None,
                reason: "no planning task was launched".to_string(),
            }),
        }
    }

    fn settle(horizon_id: usize, outcome: PlanOutcome) -> TaskState {
        match outcome {
            Ok(trajectories) => TaskState::Completed {
                horizon_id,
                trajectories,
            },
            Err(error) => TaskState::Failed { horizon_id, error },
        }
    }

    fn broken(horizon_id: usize) -> TaskState {
        TaskState::Failed {
            horizon_id,
            error: PlanningError::ResultRetrieval {
                horizon_id: Some(horizon_id),
                reason: "planning task ended without producing a result".to_string(),
            },
        }
    }
}

impl std::fmt::Debug for PlanningTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanningTask")
            .field("status", &self.status())
            .field("horizon_id", &self.horizon_id())
            .finish()
    }
}
