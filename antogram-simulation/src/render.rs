//! Draw-order contract between a simulation frame and a display surface.

use crate::snapshot::{AgentFrame, FrameSnapshot};
use antogram_core::{Point, Rgb};

pub const BIT_DIAMETER: f32 = 7.0;

// Ant sprite sheet geometry
pub const ANT_FRAME_WIDTH: f32 = 96.0;
pub const ANT_FRAME_HEIGHT: f32 = 101.0;
pub const ANT_SCALE: f32 = 0.25;
pub const ANT_FRAME_COUNT: u8 = 4;
/// Distance walked per full walk cycle.
pub const PIXELS_PER_STEP: f32 = 8.0;

/// Something a frame can be drawn onto.
pub trait Surface {
    fn clear(&mut self);
    fn fill_circle(&mut self, center: Point, diameter: f32, color: Rgb);
    fn draw_agent(&mut self, agent: &AgentFrame);
}

/// Clears `surface`, then draws every bit before any agent.
pub fn render(snapshot: &FrameSnapshot, surface: &mut dyn Surface) {
    surface.clear();
    for bit in &snapshot.bits {
        surface.fill_circle(Point::new(bit.x, bit.y), BIT_DIAMETER, bit.color);
    }
    for agent in &snapshot.agents {
        surface.draw_agent(agent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::BitFrame;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl Surface for Recorder {
        fn clear(&mut self) {
            self.calls.push("clear".into());
        }
        fn fill_circle(&mut self, center: Point, diameter: f32, _color: Rgb) {
            self.calls.push(format!("bit {} {} {}", center.x, center.y, diameter));
        }
        fn draw_agent(&mut self, agent: &AgentFrame) {
            self.calls.push(format!("agent {}", agent.id));
        }
    }

    #[test]
    fn bits_are_drawn_beneath_agents() {
        let snapshot = FrameSnapshot {
            frame: 1,
            progress: 0.0,
            bits: vec![
                BitFrame { x: 1.0, y: 2.0, color: Rgb::new(1, 2, 3), carried: false },
                BitFrame { x: 3.0, y: 4.0, color: Rgb::new(1, 2, 3), carried: true },
            ],
            agents: vec![AgentFrame {
                id: 0,
                x: 0.0,
                y: 0.0,
                heading: 0.0,
                walk_frame: 0,
                carrying: true,
            }],
        };
        let mut recorder = Recorder::default();
        render(&snapshot, &mut recorder);
        assert_eq!(recorder.calls, vec!["clear", "bit 1 2 7", "bit 3 4 7", "agent 0"]);
    }
}
