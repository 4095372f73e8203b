//! The capture loop.
//!
//! One dedicated background task owns the frame source and continuously
//! grabs, decodes, and publishes. It never takes the encounter store's
//! lock; its only shared touchpoint is the frame cache swap. A dead or
//! absent device degrades to the placeholder frame and retries on capped
//! backoff; check-in stays available through manual code entry the whole
//! time.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::cache::FrameCache;
use super::codes::decode_frame;
use super::source::{CaptureError, FrameSource};

/// Upper bound on the retry delay while the device is down
const MAX_BACKOFF: Duration = Duration::from_secs(10);
/// Log every Nth consecutive failure after the first
const FAILURE_LOG_EVERY: u32 = 40;

/// Background capture worker
pub struct CameraWorker {
    source: Box<dyn FrameSource>,
    cache: Arc<FrameCache>,
    placeholder: Arc<Vec<u8>>,
    interval: Duration,
    consecutive_failures: u32,
}

impl CameraWorker {
    pub fn new(
        source: Box<dyn FrameSource>,
        cache: Arc<FrameCache>,
        placeholder: Vec<u8>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            placeholder: Arc::new(placeholder),
            interval,
            consecutive_failures: 0,
        }
    }

    /// Run the capture loop forever
    pub async fn run(mut self) {
        info!("Camera worker started on {}", self.source.describe());
        // Serve the placeholder until the first real frame lands
        self.cache.publish_placeholder(self.placeholder.clone());
        loop {
            let delay = self.cycle().await;
            tokio::time::sleep(delay).await;
        }
    }

    /// One grab-decode-publish cycle; returns the delay before the next
    pub async fn cycle(&mut self) -> Duration {
        match self.source.grab().await {
            Ok(frame) => {
                if self.consecutive_failures > 0 {
                    info!(
                        "Camera recovered after {} failed cycles",
                        self.consecutive_failures
                    );
                    self.consecutive_failures = 0;
                }
                if let Some(value) = decode_frame(&frame) {
                    if self.cache.record_scan(&value) {
                        info!("Decoded check-in code from camera frame");
                    }
                }
                self.cache.publish_frame(Arc::new(frame));
                self.interval
            }
            Err(err) => {
                self.on_failure(&err);
                self.backoff()
            }
        }
    }

    fn on_failure(&mut self, err: &CaptureError) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures == 1 {
            warn!(
                "Camera read failed ({err}); serving placeholder and retrying on backoff"
            );
        } else if self.consecutive_failures % FAILURE_LOG_EVERY == 0 {
            warn!(
                "Camera still down after {} cycles ({err})",
                self.consecutive_failures
            );
        } else {
            debug!("Camera read failed: {err}");
        }
        self.cache.publish_placeholder(self.placeholder.clone());
    }

    /// Exponential backoff from the base interval, capped
    fn backoff(&self) -> Duration {
        let exp = self.consecutive_failures.min(6);
        let delay = self.interval.saturating_mul(1u32 << exp);
        delay.min(MAX_BACKOFF)
    }
}
