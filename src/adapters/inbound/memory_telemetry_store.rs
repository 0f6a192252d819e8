use crate::common::{EventEnvelope, TelemetryStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Telemetry kept in process memory, one stream per swarm.
#[derive(Debug, Default)]
pub struct InMemoryTelemetryStore {
    streams: RwLock<HashMap<String, Vec<EventEnvelope>>>,
}

impl InMemoryTelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stream_len(&self, stream_id: &str) -> usize {
        self.streams
            .read()
            .await
            .get(stream_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl TelemetryStore for InMemoryTelemetryStore {
    async fn append_events(
        &self,
        stream_id: &str,
        events: Vec<EventEnvelope>,
    ) -> Result<(), String> {
        let mut streams = self.streams.write().await;
        streams
            .entry(stream_id.to_string())
            .or_insert_with(Vec::new)
            .extend(events);
        Ok(())
    }

    async fn load_events(
        &self,
        stream_id: &str,
        from_offset: u64,
    ) -> Result<Vec<EventEnvelope>, String> {
        let streams = self.streams.read().await;
        Ok(streams
            .get(stream_id)
            .map(|events| events.iter().skip(from_offset as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn load_events_by_type(
        &self,
        event_type: &str,
        from_timestamp: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventEnvelope>, String> {
        let streams = self.streams.read().await;

        let mut matching: Vec<EventEnvelope> = streams
            .values()
            .flatten()
            .filter(|e| e.event_type == event_type)
            .filter(|e| from_timestamp.map_or(true, |from| e.occurred_at >= from))
            .cloned()
            .collect();

        matching.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));
        Ok(matching)
    }
}
