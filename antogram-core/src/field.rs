use crate::{Bit, Point, SimulationMode};

/// Source/destination pair for one job, before it enters a queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobSpec {
    pub source: Point,
    pub destination: Point,
}

/// Everything the field builder hands to the simulation for one run.
///
/// Both the job specs and the target pool are filled in, so either
/// targeting strategy can drive the same field.
#[derive(Debug, Clone, Default)]
pub struct PreparedField {
    pub mode: SimulationMode,
    pub bits: Vec<Bit>,
    pub jobs: Vec<JobSpec>,
    /// Destinations for bits that do not store their own target.
    pub target_pool: Vec<Point>,
}

impl PreparedField {
    pub fn empty(mode: SimulationMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}
