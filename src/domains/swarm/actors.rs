use super::events::SwarmEvent;
use super::projections::FleetTelemetryProjection;
use crate::common::{DomainEvent, EventEnvelope, EventMetadata, TelemetryStore};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Actor that drains swarm telemetry: persists events and keeps the
/// projection current. Stops once every sender is gone.
pub struct TelemetryRecorderActor {
    store: Arc<dyn TelemetryStore>,
    projection: Arc<RwLock<FleetTelemetryProjection>>,
    event_receiver: mpsc::Receiver<SwarmEvent>,
    record_heartbeats: bool,
    session_id: Uuid,
}

impl TelemetryRecorderActor {
    pub fn new(
        swarm_id: String,
        store: Arc<dyn TelemetryStore>,
        event_receiver: mpsc::Receiver<SwarmEvent>,
        record_heartbeats: bool,
    ) -> Self {
        Self {
            store,
            projection: Arc::new(RwLock::new(FleetTelemetryProjection::new(swarm_id))),
            event_receiver,
            record_heartbeats,
            session_id: Uuid::new_v4(),
        }
    }

    /// Shared handle to the projection, readable while the actor runs.
    pub fn projection(&self) -> Arc<RwLock<FleetTelemetryProjection>> {
        Arc::clone(&self.projection)
    }

    pub async fn run(&mut self) {
        while let Some(event) = self.event_receiver.recv().await {
            if let Err(e) = self.handle_event(event).await {
                tracing::error!("Failed to record swarm event: {}", e);
            }
        }
        tracing::debug!("Telemetry channel closed; recorder stopping");
    }

    async fn handle_event(&self, event: SwarmEvent) -> Result<(), String> {
        self.projection.write().await.apply_event(&event);

        if matches!(event, SwarmEvent::FleetStateReported { .. }) && !self.record_heartbeats {
            return Ok(());
        }

        let metadata = EventMetadata {
            correlation_id: Some(self.session_id),
            tick: match &event {
                SwarmEvent::FleetStateChanged { tick, .. } | SwarmEvent::PhaseChanged { tick, .. } => {
                    Some(*tick)
                }
                _ => None,
            },
            source: "TelemetryRecorderActor".to_string(),
        };
        let envelope = EventEnvelope::new(&event, "Swarm", metadata)
            .map_err(|e| format!("Failed to create event envelope: {}", e))?;

        self.store
            .append_events(event.stream_id(), vec![envelope])
            .await?;

        tracing::trace!("Recorded swarm event: {}", event.event_type());
        Ok(())
    }
}
