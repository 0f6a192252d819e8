use crate::domains::swarm::{FleetState, SwarmEvent, TelemetrySink};
use crate::domains::trajectory::Trajectory;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Forwards everything the coordinator publishes as [`SwarmEvent`]s onto a
/// bounded channel, typically drained by a `TelemetryRecorderActor`.
/// Publishing never waits: when the channel is full or closed the event is
/// dropped and counted.
pub struct ChannelTelemetrySink {
    swarm_id: String,
    sender: mpsc::Sender<SwarmEvent>,
    dropped: AtomicU64,
}

impl ChannelTelemetrySink {
    pub fn new(swarm_id: impl Into<String>, sender: mpsc::Sender<SwarmEvent>) -> Self {
        Self {
            swarm_id: swarm_id.into(),
            sender,
            dropped: AtomicU64::new(0),
        }
    }

    /// Sink plus the receiving end of a fresh channel of `capacity`.
    pub fn channel(
        swarm_id: impl Into<String>,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<SwarmEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(swarm_id, tx), rx)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn send(&self, event: SwarmEvent) {
        if self.sender.try_send(event).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl TelemetrySink for ChannelTelemetrySink {
    fn publish_fleet_state(&self, state: FleetState) {
        self.send(SwarmEvent::FleetStateReported {
            swarm_id: self.swarm_id.clone(),
            state,
            timestamp: Utc::now(),
        });
    }

    fn publish_trajectories(&self, trajectories: &[Trajectory]) {
        self.send(SwarmEvent::TrajectoriesPublished {
            swarm_id: self.swarm_id.clone(),
            trajectories: trajectories.to_vec(),
            timestamp: Utc::now(),
        });
    }

    fn publish_event(&self, event: SwarmEvent) {
        self.send(event);
    }
}

pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn publish_fleet_state(&self, _state: FleetState) {}

    fn publish_trajectories(&self, _trajectories: &[Trajectory]) {}
}

/// Keeps everything it is handed; for tests and offline inspection.
#[derive(Default)]
pub struct InMemoryTelemetrySink {
    states: Mutex<Vec<FleetState>>,
    trajectories: Mutex<Vec<Vec<Trajectory>>>,
    events: Mutex<Vec<SwarmEvent>>,
}

impl InMemoryTelemetrySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn states(&self) -> Vec<FleetState> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn trajectory_snapshots(&self) -> Vec<Vec<Trajectory>> {
        self.trajectories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events(&self) -> Vec<SwarmEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl TelemetrySink for InMemoryTelemetrySink {
    fn publish_fleet_state(&self, state: FleetState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(state);
    }

    fn publish_trajectories(&self, trajectories: &[Trajectory]) {
        self.trajectories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(trajectories.to_vec());
    }

    fn publish_event(&self, event: SwarmEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_channel_drops_instead_of_blocking() {
        let (sink, mut rx) = ChannelTelemetrySink::channel("s", 1);
        sink.publish_fleet_state(FleetState::Idle);
        sink.publish_fleet_state(FleetState::Ready);
        assert_eq!(sink.dropped(), 1);

        match rx.recv().await {
            Some(SwarmEvent::FleetStateReported { state, .. }) => {
                assert_eq!(state, FleetState::Idle)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn closed_channel_is_not_an_error() {
        let (sink, rx) = ChannelTelemetrySink::channel("s", 4);
        drop(rx);
        sink.publish_trajectories(&[]);
        assert_eq!(sink.dropped(), 1);
    }
}
