use antogram_core::Rgb;
use serde::{Deserialize, Serialize};

/// Everything needed to draw one frame, in draw order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub progress: f32,
    pub bits: Vec<BitFrame>,
    pub agents: Vec<AgentFrame>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BitFrame {
    pub x: f32,
    pub y: f32,
    pub color: Rgb,
    pub carried: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentFrame {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    /// Radians, 0 pointing along +x.
    pub heading: f32,
    pub walk_frame: u8,
    pub carrying: bool,
}
