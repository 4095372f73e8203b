use std::sync::Arc;
use std::time::Instant;

use crate::auth::StaffAuthState;
use crate::camera::FrameCache;
use crate::config::ServerConfig;
use crate::queue::{public_payload, recompute, QueuePayload, ScheduledEncounter};
use crate::realtime::QueueHub;
use crate::store::{AuditLog, EncounterStore};

/// Main server state shared across all handlers
pub struct ServerState {
    pub config: ServerConfig,
    pub store: EncounterStore,
    pub frame_cache: Arc<FrameCache>,
    pub hub: QueueHub,
    pub audit: AuditLog,
    pub auth: Arc<StaffAuthState>,
    pub start_time: Instant,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let auth = Arc::new(StaffAuthState::new(
            &config.staff_password,
            config.session_timeout_seconds,
        ));
        let frame_cache = Arc::new(FrameCache::new(config.scan_freshness, config.scan_reemit));
        let hub = QueueHub::new(config.viewer_queue_capacity);
        let store = EncounterStore::new(config.initial_providers);

        Self {
            config,
            store,
            frame_cache,
            hub,
            audit: AuditLog::new(),
            auth,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Totally recompute the queue ordering from the current snapshot
    pub fn scheduled_queue(&self) -> Vec<ScheduledEncounter> {
        recompute(
            self.store.list_active(),
            self.store.providers(),
            &self.config.avg_visit_min,
        )
    }

    /// Current public snapshot payload
    pub fn queue_payload(&self) -> QueuePayload {
        public_payload(&self.scheduled_queue(), self.store.providers())
    }

    /// Recompute and fan the fresh snapshot out to every subscribed viewer.
    /// Called after every mutation that can change scheduler output.
    pub fn publish_queue_update(&self) {
        let payload = self.queue_payload();
        self.hub.publish(&payload);
    }

    /// Estimated wait for one encounter, from a fresh recompute
    pub fn wait_for(&self, encounter_id: uuid::Uuid) -> u32 {
        self.scheduled_queue()
            .iter()
            .find(|s| s.encounter.id == encounter_id)
            .map(|s| s.estimated_wait_min)
            .unwrap_or(0)
    }
}
