//! Shared frame and scan cache.
//!
//! Exactly one writer (the capture worker) and many readers. Publication
//! is a single reference swap under a narrow lock, so readers never see a
//! half-written frame and the lock is never held across I/O.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Last decoded scan as seen by consumers
#[derive(Debug, Clone, PartialEq)]
pub struct LastScan {
    pub value: String,
    /// Whether the decode is still inside the freshness window.
    /// Stale scans must be treated as absence, not acted on.
    pub fresh: bool,
}

struct CacheInner {
    frame: Option<Arc<Vec<u8>>>,
    /// False while the placeholder is being served
    live: bool,
    scan: Option<(String, Instant)>,
    last_emitted: Option<(String, Instant)>,
}

/// Single most-recent frame plus the last decoded code
pub struct FrameCache {
    inner: Mutex<CacheInner>,
    freshness: Duration,
    reemit: Duration,
}

impl FrameCache {
    pub fn new(freshness: Duration, reemit: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                frame: None,
                live: false,
                scan: None,
                last_emitted: None,
            }),
            freshness,
            reemit,
        }
    }

    /// Publish a freshly captured frame
    pub fn publish_frame(&self, jpeg: Arc<Vec<u8>>) {
        let mut inner = self.inner.lock();
        inner.frame = Some(jpeg);
        inner.live = true;
    }

    /// Publish the no-signal placeholder; `decoded_at` stops advancing
    pub fn publish_placeholder(&self, jpeg: Arc<Vec<u8>>) {
        let mut inner = self.inner.lock();
        inner.frame = Some(jpeg);
        inner.live = false;
    }

    /// Record a decoded value.
    ///
    /// An identical value seen again inside the re-emit window only
    /// refreshes nothing: one code held in front of the camera must not
    /// retrigger check-in every frame. Returns whether the scan was
    /// accepted as a new emission.
    pub fn record_scan(&self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() {
            return false;
        }
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let accept = match &inner.last_emitted {
            Some((last, at)) => last != value || now.duration_since(*at) > self.reemit,
            None => true,
        };
        if accept {
            inner.scan = Some((value.to_string(), now));
            inner.last_emitted = Some((value.to_string(), now));
        }
        accept
    }

    /// Latest published frame, placeholder included
    pub fn latest_frame(&self) -> Option<Arc<Vec<u8>>> {
        self.inner.lock().frame.clone()
    }

    /// Whether the latest frame came from a real capture
    pub fn is_live(&self) -> bool {
        self.inner.lock().live
    }

    /// Last decoded scan with its freshness verdict
    pub fn last_scan(&self) -> Option<LastScan> {
        let inner = self.inner.lock();
        inner.scan.as_ref().map(|(value, at)| LastScan {
            value: value.clone(),
            fresh: at.elapsed() <= self.freshness,
        })
    }
}
