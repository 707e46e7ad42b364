use hdrhistogram::Histogram;
use log::{info, warn};
use std::time::Duration;

/// Tick duration histogram, in microseconds.
pub struct TickStats {
    histogram: Option<Histogram<u64>>,
}

impl TickStats {
    pub fn new() -> Self {
        // 1 us .. 60 s at 3 significant figures
        let histogram = Histogram::new_with_bounds(1, 60_000_000, 3)
            .map_err(|e| warn!("Tick statistics disabled: {}", e))
            .ok();
        Self { histogram }
    }

    pub fn record(&mut self, duration: Duration) {
        if let Some(histogram) = self.histogram.as_mut() {
            let micros = (duration.as_micros() as u64).clamp(1, histogram.high());
            // Value is clamped into range, so recording cannot fail
            let _ = histogram.record(micros);
        }
    }

    pub fn count(&self) -> u64 {
        self.histogram.as_ref().map_or(0, |h| h.len())
    }

    pub fn log_summary(&self) {
        let Some(h) = self.histogram.as_ref().filter(|h| !h.is_empty()) else {
            return;
        };
        info!(
            "Tick timing over {} ticks: mean {:.0}us, p50 {}us, p99 {}us, max {}us",
            h.len(),
            h.mean(),
            h.value_at_quantile(0.5),
            h.value_at_quantile(0.99),
            h.max()
        );
    }
}

impl Default for TickStats {
    fn default() -> Self {
        Self::new()
    }
}
