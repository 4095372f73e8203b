use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of audit events retained
const DEFAULT_CAPACITY: usize = 200;

/// One operational audit event
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub ts: DateTime<Utc>,
    pub kind: String,
    pub details: serde_json::Value,
}

/// Bounded in-memory ring of operational events (check-ins, status
/// changes, provider changes, logins). Oldest entries fall off the back.
pub struct AuditLog {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Record an event, evicting the oldest when full
    pub fn record(&self, kind: &str, details: serde_json::Value) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(AuditEvent {
            ts: Utc::now(),
            kind: kind.to_string(),
            details,
        });
    }

    /// All retained events, oldest first
    pub fn tail(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_and_tail() {
        let log = AuditLog::new();
        log.record("checkin", json!({"token": "UC-1234"}));
        log.record("status_change", json!({"status": "called"}));

        let tail = log.tail();
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].kind, "checkin");
        assert_eq!(tail[1].kind, "status_change");
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let log = AuditLog::with_capacity(3);
        for i in 0..5 {
            log.record("event", json!({ "i": i }));
        }
        let tail = log.tail();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[0].details["i"], 2);
        assert_eq!(tail[2].details["i"], 4);
    }
}
