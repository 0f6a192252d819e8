use crate::common::{EventEnvelope, TelemetryStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Telemetry recorded as JSON Lines, one `<stream_id>.jsonl` file per swarm
/// under `base_path`. Files are only ever appended to, so a flight log can
/// be tailed while the swarm is running.
pub struct FileTelemetryStore {
    base_path: PathBuf,
}

impl FileTelemetryStore {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn stream_path(&self, stream_id: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", stream_id))
    }

    async fn ensure_base_dir(&self) -> Result<(), String> {
        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| format!("Failed to create telemetry directory: {}", e))
    }

    async fn read_stream(path: &Path) -> Result<Vec<EventEnvelope>, String> {
        let file = File::open(path)
            .await
            .map_err(|e| format!("Failed to open telemetry file {}: {}", path.display(), e))?;

        let mut lines = BufReader::new(file).lines();
        let mut events = Vec::new();
        let mut line_number = 0u64;
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| format!("Failed to read line: {}", e))?
        {
            line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let event: EventEnvelope = serde_json::from_str(&line).map_err(|e| {
                format!(
                    "Failed to deserialize event at {}:{}: {}",
                    path.display(),
                    line_number,
                    e
                )
            })?;
            events.push(event);
        }
        Ok(events)
    }
}

#[async_trait]
impl TelemetryStore for FileTelemetryStore {
    async fn append_events(
        &self,
        stream_id: &str,
        events: Vec<EventEnvelope>,
    ) -> Result<(), String> {
        self.ensure_base_dir().await?;
        let path = self.stream_path(stream_id);

        let mut buffer = String::new();
        for event in &events {
            let line = serde_json::to_string(event)
                .map_err(|e| format!("Failed to serialize event: {}", e))?;
            buffer.push_str(&line);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| format!("Failed to open telemetry file {}: {}", path.display(), e))?;
        file.write_all(buffer.as_bytes())
            .await
            .map_err(|e| format!("Failed to write events: {}", e))?;
        file.flush()
            .await
            .map_err(|e| format!("Failed to flush file: {}", e))?;
        Ok(())
    }

    async fn load_events(
        &self,
        stream_id: &str,
        from_offset: u64,
    ) -> Result<Vec<EventEnvelope>, String> {
        let path = self.stream_path(stream_id);
        if !path.exists() {
            return Ok(vec![]);
        }
        let events = Self::read_stream(&path).await?;
        Ok(events.into_iter().skip(from_offset as usize).collect())
    }

    async fn load_events_by_type(
        &self,
        event_type: &str,
        from_timestamp: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventEnvelope>, String> {
        self.ensure_base_dir().await?;

        let mut dir = tokio::fs::read_dir(&self.base_path)
            .await
            .map_err(|e| format!("Failed to read directory: {}", e))?;

        let mut matching = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| format!("Failed to read directory entry: {}", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("jsonl") {
                continue;
            }
            matching.extend(
                Self::read_stream(&path)
                    .await?
                    .into_iter()
                    .filter(|e| e.event_type == event_type)
                    .filter(|e| from_timestamp.map_or(true, |from| e.occurred_at >= from)),
            );
        }

        matching.sort_by(|a, b| a.occurred_at.cmp(&b.occurred_at));
        Ok(matching)
    }
}
