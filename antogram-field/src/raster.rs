use antogram_core::Point;
use image::RgbaImage;

/// Offscreen RGBA buffer the field builder draws into and samples from.
#[derive(Debug, Clone)]
pub struct RasterBuffer {
    image: RgbaImage,
}

impl RasterBuffer {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width.max(1), height.max(1)),
        }
    }

    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::from_pixel(width.max(1), height.max(1), image::Rgba(rgba)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Fills an axis-aligned rectangle, clipped to the buffer.
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, rgba: [u8; 4]) {
        let x0 = x.round().max(0.0) as u32;
        let y0 = y.round().max(0.0) as u32;
        let x1 = ((x + width).round().max(0.0) as u32).min(self.width());
        let y1 = ((y + height).round().max(0.0) as u32).min(self.height());

        for py in y0..y1 {
            for px in x0..x1 {
                self.image.put_pixel(px, py, image::Rgba(rgba));
            }
        }
    }

    /// Copies `source` with its top-left corner at `(x, y)`, clipped.
    pub fn blit(&mut self, source: &RgbaImage, x: u32, y: u32) {
        image::imageops::replace(&mut self.image, source, x as i64, y as i64);
    }

    /// Grid samples every `step` pixels, column by column, keeping those
    /// `keep` accepts.
    pub fn sample<F>(&self, step: u32, keep: F) -> Vec<(Point, [u8; 4])>
    where
        F: Fn([u8; 4]) -> bool,
    {
        let step = step.max(1) as usize;
        let mut samples = Vec::new();
        for x in (0..self.width()).step_by(step) {
            for y in (0..self.height()).step_by(step) {
                let rgba = self.image.get_pixel(x, y).0;
                if keep(rgba) {
                    samples.push((Point::new(x as f32, y as f32), rgba));
                }
            }
        }
        samples
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Draws text into a [`RasterBuffer`].
///
/// Widths and drawing share one font size unit so layout and rendering agree.
pub trait TextRasterizer: Send + Sync {
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    /// Draws one line of `text` centered on `center`.
    fn draw_text(
        &self,
        buffer: &mut RasterBuffer,
        text: &str,
        center: Point,
        font_size: f32,
        rgba: [u8; 4],
    );
}
