use crate::TransportError;
use antogram_core::{Canvas, Point, Rgb};
use antogram_simulation::render::{render, Surface, ANT_FRAME_WIDTH, ANT_SCALE};
use antogram_simulation::{AgentFrame, FrameSnapshot};
use image::{ImageFormat, Rgba, RgbaImage};
use log::{debug, info};
use std::path::{Path, PathBuf};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const ANT_COLOR: Rgba<u8> = Rgba([28, 20, 16, 255]);

/// Software surface that rasterizes frames into an RGBA image.
pub struct PixelCanvas {
    image: RgbaImage,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), BACKGROUND),
        }
    }

    pub fn for_canvas(canvas: Canvas) -> Self {
        Self::new(canvas.width.round() as u32, canvas.height.round() as u32)
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), TransportError> {
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }

    /// Fills pixels whose centers lie within `radius` of `center`.
    fn disc(&mut self, center: Point, radius: f32, color: Rgba<u8>) {
        let (width, height) = self.image.dimensions();
        let x0 = (center.x - radius).floor().max(0.0) as u32;
        let y0 = (center.y - radius).floor().max(0.0) as u32;
        let x1 = ((center.x + radius).ceil().max(0.0) as u32).min(width);
        let y1 = ((center.y + radius).ceil().max(0.0) as u32).min(height);
        let r2 = radius * radius;

        for y in y0..y1 {
            for x in x0..x1 {
                let d = Point::new(x as f32 + 0.5, y as f32 + 0.5) - center;
                if d.length_squared() <= r2 {
                    self.image.put_pixel(x, y, color);
                }
            }
        }
    }

    fn line(&mut self, from: Point, to: Point, color: Rgba<u8>) {
        let steps = from.distance(to).ceil().max(1.0) as u32;
        for i in 0..=steps {
            let p = from.lerp(to, i as f32 / steps as f32);
            if p.x >= 0.0 && p.y >= 0.0 {
                let (x, y) = (p.x as u32, p.y as u32);
                if x < self.image.width() && y < self.image.height() {
                    self.image.put_pixel(x, y, color);
                }
            }
        }
    }
}

impl Surface for PixelCanvas {
    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = BACKGROUND;
        }
    }

    fn fill_circle(&mut self, center: Point, diameter: f32, color: Rgb) {
        self.disc(center, diameter / 2.0, Rgba([color.r, color.g, color.b, 255]));
    }

    /// Procedural ant: abdomen, thorax and head along the heading, with three
    /// pairs of legs that swing with the walk frame.
    fn draw_agent(&mut self, agent: &AgentFrame) {
        let length = ANT_FRAME_WIDTH * ANT_SCALE;
        let center = Point::new(agent.x, agent.y);
        let forward = Point::from_angle(agent.heading);
        let side = forward.perp();

        let swing = [-1.0f32, 0.0, 1.0, 0.0][(agent.walk_frame % 4) as usize] * 0.15;
        for (i, base) in [-0.35f32, 0.0, 0.35].iter().enumerate() {
            // Alternating tripod gait
            let phase = if i % 2 == 0 { swing } else { -swing };
            for flip in [-1.0f32, 1.0] {
                let direction = Point::from_angle(agent.heading + flip * (std::f32::consts::FRAC_PI_2 + base + phase));
                self.line(center, center + direction * length * 0.35, ANT_COLOR);
            }
        }

        self.disc(center - forward * length * 0.3, length * 0.17, ANT_COLOR);
        self.disc(center, length * 0.11, ANT_COLOR);
        self.disc(center + forward * length * 0.3, length * 0.1, ANT_COLOR);
        // Mandibles
        let jaw = center + forward * length * 0.4;
        self.line(jaw, jaw + (forward + side * 0.5) * length * 0.12, ANT_COLOR);
        self.line(jaw, jaw + (forward - side * 0.5) * length * 0.12, ANT_COLOR);
    }
}

/// Writes a PNG of every `frequency`-th frame into a directory.
pub struct PngRecorder {
    directory: PathBuf,
    frequency: u64,
    canvas: PixelCanvas,
    saved: usize,
}

impl PngRecorder {
    pub fn new(directory: impl Into<PathBuf>, frequency: u32, canvas: Canvas) -> Result<Self, TransportError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        info!("Recording PNG frames to {}", directory.display());
        Ok(Self {
            directory,
            frequency: frequency.max(1) as u64,
            canvas: PixelCanvas::for_canvas(canvas),
            saved: 0,
        })
    }

    /// Renders and saves `snapshot` if its frame is due.
    pub fn record(&mut self, snapshot: &FrameSnapshot) -> Result<Option<PathBuf>, TransportError> {
        if snapshot.frame % self.frequency != 0 {
            return Ok(None);
        }
        let path = self.directory.join(format!("frame_{:06}.png", snapshot.frame));
        self.write(snapshot, &path)?;
        Ok(Some(path))
    }

    pub fn save_final(&mut self, snapshot: &FrameSnapshot) -> Result<PathBuf, TransportError> {
        let path = self.directory.join("final.png");
        self.write(snapshot, &path)?;
        info!("Saved {} PNG frames, final image at {}", self.saved, path.display());
        Ok(path)
    }

    fn write(&mut self, snapshot: &FrameSnapshot, path: &Path) -> Result<(), TransportError> {
        render(snapshot, &mut self.canvas);
        self.canvas.save_png(path)?;
        self.saved += 1;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    pub fn saved(&self) -> usize {
        self.saved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antogram_simulation::BitFrame;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    const BIT: Rgb = Rgb::new(200, 30, 30);

    fn snapshot(frame: u64) -> FrameSnapshot {
        FrameSnapshot {
            frame,
            progress: 0.0,
            bits: vec![
                BitFrame { x: 20.0, y: 20.0, color: BIT, carried: true },
                BitFrame { x: 50.0, y: 10.0, color: BIT, carried: false },
            ],
            agents: vec![AgentFrame {
                id: 0,
                x: 20.0,
                y: 20.0,
                heading: 0.0,
                walk_frame: 1,
                carrying: true,
            }],
        }
    }

    #[test]
    fn bits_are_drawn_beneath_agents() {
        let mut canvas = PixelCanvas::new(64, 40);
        render(&snapshot(0), &mut canvas);

        assert_eq!(canvas.pixel(20, 20), Some(ANT_COLOR.0));
        assert_eq!(canvas.pixel(50, 10), Some([200, 30, 30, 255]));
        assert_eq!(canvas.pixel(60, 35), Some(BACKGROUND.0));
    }

    #[test]
    fn clear_resets_to_background() {
        let mut canvas = PixelCanvas::new(10, 10);
        canvas.fill_circle(Point::new(5.0, 5.0), 7.0, BIT);
        canvas.clear();
        assert!(canvas.image().pixels().all(|p| *p == BACKGROUND));
    }

    #[test]
    fn recorder_writes_due_frames_and_final_image() {
        let dir = TempDir::new().unwrap();
        let mut recorder = PngRecorder::new(dir.path().join("frames"), 2, Canvas::new(64.0, 40.0)).unwrap();

        assert!(recorder.record(&snapshot(0)).unwrap().is_some());
        assert!(recorder.record(&snapshot(1)).unwrap().is_none());
        recorder.save_final(&snapshot(1)).unwrap();

        assert!(dir.child("frames/frame_000000.png").path().exists());
        assert!(!dir.child("frames/frame_000001.png").path().exists());
        assert!(dir.child("frames/final.png").path().exists());
        assert_eq!(recorder.saved(), 2);

        let saved = image::open(dir.path().join("frames/final.png")).unwrap();
        assert_eq!((saved.width(), saved.height()), (64, 40));
    }
}
