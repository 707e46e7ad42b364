use log::warn;
use std::time::{Duration, Instant};

/// Fixed-rate tick driver: runs one tick, then sleeps out the rest of the
/// timestep.
pub struct TickScheduler {
    timestep: Duration,
    ticks: u64,
}

impl TickScheduler {
    /// `ticks_per_second` must be non-zero; zero is treated as one.
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            timestep: Duration::from_secs_f64(1.0 / ticks_per_second.max(1) as f64),
            ticks: 0,
        }
    }

    pub fn timestep(&self) -> Duration {
        self.timestep
    }

    /// Number of ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs `tick` once and paces to the fixed timestep.
    ///
    /// Returns how long the tick itself took.
    pub fn execute_once<F: FnOnce()>(&mut self, tick: F) -> Duration {
        let start = Instant::now();
        tick();
        self.ticks += 1;

        let elapsed = start.elapsed();
        if elapsed < self.timestep {
            spin_sleep::sleep(self.timestep - elapsed);
        } else if self.timestep > Duration::from_millis(5) {
            // Only worth reporting when the budget is large enough to matter
            warn!(
                "Tick {} exceeded budget: {:?} > {:?}",
                self.ticks, elapsed, self.timestep
            );
        }
        elapsed
    }

    /// Runs ticks until `tick` returns `false`.
    pub fn run_while<F: FnMut(u64) -> bool>(&mut self, mut tick: F) {
        let mut running = true;
        while running {
            let index = self.ticks;
            self.execute_once(|| running = tick(index));
        }
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new(30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestep_follows_rate() {
        assert_eq!(TickScheduler::new(20).timestep(), Duration::from_millis(50));
        assert_eq!(TickScheduler::new(0).timestep(), Duration::from_secs(1));
    }

    #[test]
    fn run_while_counts_ticks_and_paces() {
        let mut scheduler = TickScheduler::new(200);
        let start = Instant::now();
        let mut seen = Vec::new();
        scheduler.run_while(|tick| {
            seen.push(tick);
            tick < 3
        });
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(scheduler.ticks(), 4);
        assert!(start.elapsed() >= Duration::from_millis(19));
    }
}
