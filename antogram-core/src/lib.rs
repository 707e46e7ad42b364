//! Data model shared by every Antogram crate: bits, jobs, the job queue,
//! identifiers, colors, the canvas and the fixed-rate tick scheduler.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod bit;
pub mod entity;
pub mod field;
pub mod job;
pub mod scheduler;

pub use bit::{Bit, PICKUP_STEP};
pub use entity::{AgentId, BitId, JobId};
pub use field::{JobSpec, PreparedField};
pub use job::{Job, JobQueue, JobStatus, ORDER_BIAS};
pub use scheduler::TickScheduler;

/// 2D point/vector type used for every position and velocity.
pub type Point = glam::Vec2;

/// Uniform offset in `[-amount, amount]`; zero for a non-positive amount.
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, amount: f32) -> f32 {
    if amount > 0.0 {
        rng.gen_range(-amount..=amount)
    } else {
        0.0
    }
}

// --- Errors ---

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("bit {0} is already carried")]
    BitCarried(BitId),

    #[error("bit {0} has already been delivered")]
    BitDelivered(BitId),

    #[error("bit {0} is not being carried")]
    BitNotCarried(BitId),

    #[error("unknown job {0}")]
    UnknownJob(JobId),

    #[error("job {0} is not reserved")]
    JobNotReserved(JobId),

    #[error("jobs have already been presorted for this field")]
    AlreadyPresorted,
}

// --- Color ---

/// 8-bit RGB color of a bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from floating-point channels, clamping each to [0, 255].
    pub fn from_clamped(r: f32, g: f32, b: f32) -> Self {
        let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
        Self::new(channel(r), channel(g), channel(b))
    }
}

// --- Mode ---

/// Orientation of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Scattered bits are assembled into the target picture.
    #[default]
    Forward,
    /// The picture is taken apart into scattered destinations.
    Reverse,
}

impl SimulationMode {
    pub fn is_forward(self) -> bool {
        self == SimulationMode::Forward
    }
}

// --- Canvas ---

/// The coordinate space `(0,0)..=(width,height)` every agent and bit lives in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

impl Canvas {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Clamps a point into the canvas bounds.
    #[inline]
    pub fn clamp(&self, point: Point) -> Point {
        Point::new(point.x.clamp(0.0, self.width), point.y.clamp(0.0, self.height))
    }

    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        point.x >= 0.0 && point.x <= self.width && point.y >= 0.0 && point.y <= self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_from_clamped_saturates() {
        assert_eq!(Rgb::from_clamped(300.0, -12.0, 37.6), Rgb::new(255, 0, 38));
    }

    #[test]
    fn canvas_clamp_keeps_points_inside() {
        let canvas = Canvas::new(400.0, 300.0);
        assert_eq!(canvas.clamp(Point::new(-5.0, 320.0)), Point::new(0.0, 300.0));
        assert!(canvas.contains(Point::new(400.0, 0.0)));
        assert!(!canvas.contains(Point::new(400.1, 0.0)));
    }

    #[test]
    fn jitter_stays_within_amount() {
        use rand::rngs::StdRng;
        use rand::SeedableRng;

        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(jitter(&mut rng, 0.0), 0.0);
        assert_eq!(jitter(&mut rng, -1.0), 0.0);
        for _ in 0..200 {
            assert!(jitter(&mut rng, 2.0).abs() <= 2.0);
        }
    }

    #[test]
    fn mode_deserializes_lowercase() {
        let mode: SimulationMode = serde_json::from_str("\"reverse\"").unwrap();
        assert_eq!(mode, SimulationMode::Reverse);
    }
}
