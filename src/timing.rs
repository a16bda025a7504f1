//! Stage timing.

use std::time::Instant;

/// Measures one pipeline stage and logs how long it took.
pub struct Timer {
    name: String,
    start: Instant,
}

impl Timer {
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Log the elapsed time and return it in seconds.
    pub fn finish(self) -> f64 {
        let secs = self.start.elapsed().as_secs_f64();
        if secs >= 60.0 {
            tracing::info!("[{:.1}m] {}", secs / 60.0, self.name);
        } else {
            tracing::info!("[{:.1}s] {}", secs, self.name);
        }
        secs
    }
}
