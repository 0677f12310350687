// Session metrics
//
// Lock-free counters describing what a session did, logged on shutdown

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for one session
///
/// Shared between the session loop and the tracker callback, which runs on
/// the tracker's own thread.
#[derive(Debug)]
pub struct SessionMetrics {
    /// Wearables attached to the scene
    pub models_loaded: AtomicUsize,

    /// Load requests dropped by the guard
    pub loads_rejected: AtomicUsize,

    /// Wearable loads that failed to fetch
    pub load_failures: AtomicUsize,

    /// Time spent between load acceptance and attach, in milliseconds
    pub total_load_time_ms: AtomicU64,

    /// Frames reported by the tracker
    pub frames_processed: AtomicU64,

    /// Frames in which the tracked limb was detected
    pub frames_detected: AtomicU64,

    start_time: Instant,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self {
            models_loaded: AtomicUsize::new(0),
            loads_rejected: AtomicUsize::new(0),
            load_failures: AtomicUsize::new(0),
            total_load_time_ms: AtomicU64::new(0),
            frames_processed: AtomicU64::new(0),
            frames_detected: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_model_loaded(&self, duration: Duration) {
        self.models_loaded.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_load_rejected(&self) {
        self.loads_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame(&self, detected: bool) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
        if detected {
            self.frames_detected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average time from load acceptance to attach, in milliseconds
    pub fn avg_load_time_ms(&self) -> f64 {
        let total = self.total_load_time_ms.load(Ordering::Relaxed);
        let count = self.models_loaded.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    }

    /// Share of processed frames with a detection
    pub fn detection_rate(&self) -> f64 {
        let processed = self.frames_processed.load(Ordering::Relaxed);
        if processed > 0 {
            self.frames_detected.load(Ordering::Relaxed) as f64 / processed as f64
        } else {
            0.0
        }
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Session Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Models: {} loaded (avg {:.2}ms), {} rejected requests, {} failures",
            self.models_loaded.load(Ordering::Relaxed),
            self.avg_load_time_ms(),
            self.loads_rejected.load(Ordering::Relaxed),
            self.load_failures.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Frames: {} processed, detection rate {:.1}%",
            self.frames_processed.load(Ordering::Relaxed),
            self.detection_rate() * 100.0
        );
    }
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
