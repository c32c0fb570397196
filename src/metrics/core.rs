//! Timing helpers shared by the phase metrics

use std::time::Instant;

/// A timing guard that records its elapsed seconds into a histogram when dropped
pub struct TimingGuard {
    start: Instant,
    histogram_name: &'static str,
    step: Option<&'static str>,
}

impl TimingGuard {
    pub fn new(histogram_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            histogram_name,
            step: None,
        }
    }

    /// Tag the recorded duration with a `step` label
    pub fn with_step(mut self, step: &'static str) -> Self {
        self.step = Some(step);
        self
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        match self.step {
            Some(step) => ::metrics::histogram!(self.histogram_name, "step" => step).record(duration),
            None => ::metrics::histogram!(self.histogram_name).record(duration),
        }
    }
}

/// Convenience function to create a timing guard
pub fn time_operation(histogram_name: &'static str) -> TimingGuard {
    TimingGuard::new(histogram_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_timing_guard_measures_elapsed() {
        let guard = time_operation("etl_test_duration_seconds").with_step("unit");
        thread::sleep(Duration::from_millis(5));
        assert!(guard.elapsed_secs() >= 0.005);
    }
}
