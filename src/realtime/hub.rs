//! Fan-out of queue snapshots to connected viewers.
//!
//! Every viewer owns a bounded send queue. Publication never waits on any
//! of them: a viewer whose queue is full or whose receiver is gone is
//! dropped on the spot, so one stalled waiting-room display can never
//! hold back the rest. Viewers reconnect with backoff and get the current
//! snapshot on subscribe, so there is nothing to replay.

use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::queue::QueuePayload;

/// Registry of connected queue viewers
pub struct QueueHub {
    viewers: RwLock<HashMap<Uuid, mpsc::Sender<String>>>,
    queue_capacity: usize,
}

impl QueueHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a viewer; the receiver drives its socket send loop
    pub fn subscribe(&self) -> (Uuid, mpsc::Receiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.viewers.write().insert(id, tx);
        info!(viewer = %id, "Queue viewer connected");
        (id, rx)
    }

    /// Remove a viewer (disconnect or drop)
    pub fn unsubscribe(&self, id: &Uuid) {
        if self.viewers.write().remove(id).is_some() {
            info!(viewer = %id, "Queue viewer disconnected");
        }
    }

    /// Fan a snapshot out to every viewer without blocking on any of them
    pub fn publish(&self, payload: &QueuePayload) {
        let json = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(err) => {
                warn!("Failed to serialize queue snapshot: {err}");
                return;
            }
        };

        let mut dropped: Vec<Uuid> = Vec::new();
        {
            let viewers = self.viewers.read();
            for (id, tx) in viewers.iter() {
                match tx.try_send(json.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(viewer = %id, "Viewer queue full; dropping slow viewer");
                        dropped.push(*id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!(viewer = %id, "Viewer receiver gone");
                        dropped.push(*id);
                    }
                }
            }
        }
        if !dropped.is_empty() {
            let mut viewers = self.viewers.write();
            for id in dropped {
                viewers.remove(&id);
            }
        }
    }

    pub fn viewer_count(&self) -> usize {
        self.viewers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::public_payload;

    fn payload() -> QueuePayload {
        public_payload(&[], 1)
    }

    #[tokio::test]
    async fn test_publish_reaches_all_viewers() {
        let hub = QueueHub::new(4);
        let (_a, mut rx_a) = hub.subscribe();
        let (_b, mut rx_b) = hub.subscribe();

        hub.publish(&payload());

        let got_a = rx_a.recv().await.unwrap();
        let got_b = rx_b.recv().await.unwrap();
        assert!(got_a.contains("queue_update"));
        assert_eq!(got_a, got_b);
    }

    #[tokio::test]
    async fn test_slow_viewer_dropped_others_delivered() {
        let hub = QueueHub::new(1);
        let (slow_id, _rx_slow) = hub.subscribe();
        let (_fast, mut rx_fast) = hub.subscribe();

        // First publish fills the slow viewer's queue (it never drains)
        hub.publish(&payload());
        rx_fast.recv().await.unwrap();

        // Second publish overflows it: the slow viewer is dropped, the
        // fast one still gets the snapshot
        hub.publish(&payload());
        rx_fast.recv().await.unwrap();
        assert_eq!(hub.viewer_count(), 1);

        // The dropped viewer's id is gone
        hub.unsubscribe(&slow_id);
        assert_eq!(hub.viewer_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_receiver_reaped_on_publish() {
        let hub = QueueHub::new(4);
        let (_id, rx) = hub.subscribe();
        drop(rx);

        hub.publish(&payload());
        assert_eq!(hub.viewer_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let hub = QueueHub::new(4);
        let (id, _rx) = hub.subscribe();
        assert_eq!(hub.viewer_count(), 1);
        hub.unsubscribe(&id);
        assert_eq!(hub.viewer_count(), 0);
    }
}
