use crate::adapters::inbound::{FileTelemetryStore, InMemoryTelemetryStore};
use crate::adapters::outbound::ChannelTelemetrySink;
use crate::common::TelemetryStore;
use crate::config::TelemetryConfig;
use crate::domains::swarm::{DynTelemetrySink, FleetTelemetryProjection, TelemetryRecorderActor};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Sink for the coordinator plus the running recorder behind it.
pub struct TelemetryPipeline {
    pub sink: DynTelemetrySink,
    pub store: Arc<dyn TelemetryStore>,
    pub projection: Arc<RwLock<FleetTelemetryProjection>>,
    recorder: JoinHandle<()>,
}

impl TelemetryPipeline {
    /// Spawns the recorder actor. Must be called inside a tokio runtime.
    pub fn spawn(swarm_id: &str, config: &TelemetryConfig) -> Self {
        let store: Arc<dyn TelemetryStore> = match &config.store_dir {
            Some(dir) => Arc::new(FileTelemetryStore::new(dir.clone())),
            None => Arc::new(InMemoryTelemetryStore::new()),
        };
        Self::spawn_with_store(swarm_id, config, store)
    }

    pub fn spawn_with_store(
        swarm_id: &str,
        config: &TelemetryConfig,
        store: Arc<dyn TelemetryStore>,
    ) -> Self {
        let (sink, receiver) = ChannelTelemetrySink::channel(swarm_id, config.channel_capacity);
        let mut recorder = TelemetryRecorderActor::new(
            swarm_id.to_string(),
            Arc::clone(&store),
            receiver,
            config.record_heartbeats,
        );
        let projection = recorder.projection();
        let handle = tokio::spawn(async move { recorder.run().await });

        Self {
            sink: Arc::new(sink),
            store,
            projection,
            recorder: handle,
        }
    }

    /// Drops this pipeline's sink and waits for the recorder to drain. Other
    /// clones of the sink (e.g. inside a coordinator) must be dropped first.
    pub async fn shutdown(self) -> FleetTelemetryProjection {
        let TelemetryPipeline {
            sink,
            projection,
            recorder,
            ..
        } = self;
        drop(sink);
        if let Err(e) = recorder.await {
            tracing::error!("Telemetry recorder task failed: {}", e);
        }
        let snapshot = projection.read().await.clone();
        snapshot
    }
}
