use crate::font::BitmapFontRasterizer;
use crate::raster::{RasterBuffer, TextRasterizer};
use crate::source::FieldContent;
use antogram_config::FieldSettings;
use antogram_core::{jitter, Bit, BitId, Canvas, JobSpec, Point, PreparedField, Rgb, SimulationMode};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{debug, info};
use rand::Rng;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

/// One sampled pixel of the target picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub position: Point,
    pub color: Rgb,
}

/// Wrapped lines and the font size they fit at.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub font_size: f32,
    pub line_height: f32,
    pub lines: Vec<String>,
}

impl TextLayout {
    pub fn total_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }
}

/// Builds [`PreparedField`]s for one canvas size.
pub struct FieldBuilder<T: TextRasterizer = BitmapFontRasterizer> {
    settings: FieldSettings,
    canvas: Canvas,
    rasterizer: T,
}

impl FieldBuilder<BitmapFontRasterizer> {
    pub fn new(settings: FieldSettings, canvas: Canvas) -> Self {
        Self::with_rasterizer(settings, canvas, BitmapFontRasterizer::new())
    }
}

impl<T: TextRasterizer> FieldBuilder<T> {
    pub fn with_rasterizer(settings: FieldSettings, canvas: Canvas, rasterizer: T) -> Self {
        Self {
            settings,
            canvas,
            rasterizer,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn buffer_size(&self) -> (u32, u32) {
        (
            self.canvas.width.round().max(1.0) as u32,
            self.canvas.height.round().max(1.0) as u32,
        )
    }

    // --- Text ---

    /// Greedy word wrap at `max_width`.
    fn wrap(&self, text: &str, font_size: f32, max_width: f32) -> Vec<String> {
        let mut words = text.split(' ');
        let mut current = words.next().unwrap_or_default().to_string();
        let mut lines = Vec::new();

        for word in words {
            let candidate = format!("{} {}", current, word);
            if self.rasterizer.text_width(&candidate, font_size) < max_width {
                current = candidate;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_string()));
            }
        }
        lines.push(current);
        lines
    }

    /// Wraps at the fill width and shrinks the font until the block fits the
    /// fill height, or the minimum font size is reached.
    pub fn layout_text(&self, text: &str) -> TextLayout {
        let s = &self.settings;
        let max_width = self.canvas.width * s.fill_ratio;
        let max_height = self.canvas.height * s.fill_ratio;

        let mut font_size = s.initial_font_size;
        loop {
            let lines = self.wrap(text, font_size, max_width);
            let layout = TextLayout {
                font_size,
                line_height: font_size * s.line_spacing,
                lines,
            };
            // A single word wider than the canvas also counts as overflow
            let widest = layout
                .lines
                .iter()
                .map(|line| self.rasterizer.text_width(line, font_size))
                .fold(0.0f32, f32::max);
            let overflows = layout.total_height() > max_height || widest > max_width;

            if !overflows || font_size <= s.min_font_size {
                return layout;
            }
            font_size = (font_size - s.font_size_step).max(s.min_font_size);
        }
    }

    /// Renders the laid-out text black on white, lines centered.
    pub fn render_text(&self, text: &str) -> RasterBuffer {
        let (width, height) = self.buffer_size();
        let mut buffer = RasterBuffer::filled(width, height, WHITE);
        let layout = self.layout_text(text);

        let start_y = (self.canvas.height - layout.total_height()) / 2.0 + layout.line_height / 2.0;
        for (i, line) in layout.lines.iter().enumerate() {
            let center = Point::new(self.canvas.width / 2.0, start_y + i as f32 * layout.line_height);
            self.rasterizer
                .draw_text(&mut buffer, line, center, layout.font_size, BLACK);
        }
        debug!(
            "Laid out {} line(s) at font size {}",
            layout.lines.len(),
            layout.font_size
        );
        buffer
    }

    /// Dark pixels of the rendered text, each with a jittered soil color.
    pub fn sample_text<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> Vec<SamplePoint> {
        let s = &self.settings;
        let buffer = self.render_text(text);
        buffer
            .sample(s.text_step, |p| p[3] > s.alpha_threshold && p[0] < s.darkness_threshold)
            .into_iter()
            .map(|(position, _)| SamplePoint {
                position,
                color: self.soil_color(rng),
            })
            .collect()
    }

    pub fn soil_color<R: Rng + ?Sized>(&self, rng: &mut R) -> Rgb {
        let [r, g, b] = self.settings.soil_color;
        let [jr, jg, jb] = self.settings.soil_jitter;
        Rgb::from_clamped(
            r as f32 + jitter(rng, jr),
            g as f32 + jitter(rng, jg),
            b as f32 + jitter(rng, jb),
        )
    }

    // --- Image ---

    /// Scales `image` to fit the canvas, centered on a transparent buffer.
    pub fn render_image(&self, image: &RgbaImage) -> RasterBuffer {
        let (width, height) = self.buffer_size();
        let mut buffer = RasterBuffer::new(width, height);
        if image.width() == 0 || image.height() == 0 {
            return buffer;
        }

        let scale = (width as f32 / image.width() as f32).min(height as f32 / image.height() as f32);
        let scaled_w = ((image.width() as f32 * scale).round() as u32).clamp(1, width);
        let scaled_h = ((image.height() as f32 * scale).round() as u32).clamp(1, height);
        let scaled = imageops::resize(image, scaled_w, scaled_h, FilterType::Triangle);

        buffer.blit(&scaled, (width - scaled_w) / 2, (height - scaled_h) / 2);
        buffer
    }

    /// Opaque pixels of the fitted image, keeping their own colors.
    pub fn sample_image(&self, image: &RgbaImage) -> Vec<SamplePoint> {
        let s = &self.settings;
        self.render_image(image)
            .sample(s.image_step, |p| p[3] > s.alpha_threshold)
            .into_iter()
            .map(|(position, [r, g, b, _])| SamplePoint {
                position,
                color: Rgb::new(r, g, b),
            })
            .collect()
    }

    // --- Destinations ---

    /// `count` points inside the scatter margin, each tried a bounded number
    /// of times for minimum separation. The last candidate is kept if none
    /// qualifies.
    pub fn scatter_targets<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<Point> {
        let s = &self.settings;
        let margin_x = s.scatter_margin.min(self.canvas.width / 2.0);
        let margin_y = s.scatter_margin.min(self.canvas.height / 2.0);
        let sample = |rng: &mut R| {
            Point::new(
                margin_x + rng.gen::<f32>() * (self.canvas.width - 2.0 * margin_x),
                margin_y + rng.gen::<f32>() * (self.canvas.height - 2.0 * margin_y),
            )
        };

        let mut targets: Vec<Point> = Vec::with_capacity(count);
        for _ in 0..count {
            let mut candidate = sample(rng);
            for _ in 1..s.scatter_attempts.max(1) {
                if targets
                    .iter()
                    .all(|t| t.distance(candidate) >= s.scatter_separation)
                {
                    break;
                }
                candidate = sample(rng);
            }
            targets.push(candidate);
        }
        targets
    }

    fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(
            rng.gen::<f32>() * self.canvas.width,
            rng.gen::<f32>() * self.canvas.height,
        )
    }

    // --- Assembly ---

    /// Samples `content` and lays out bits and jobs for `mode`.
    ///
    /// Forward: bits start at random canvas positions and their jobs end at
    /// the samples. Reverse: bits start on the picture (slightly jittered) and
    /// their jobs end at scattered destinations.
    pub fn build<R: Rng + ?Sized>(
        &self,
        content: &FieldContent,
        mode: SimulationMode,
        rng: &mut R,
    ) -> PreparedField {
        let (samples, bits_store_targets) = match content {
            FieldContent::Text(text) => (self.sample_text(text, rng), false),
            FieldContent::Image(image) => (self.sample_image(image), true),
        };

        let mut field = PreparedField::empty(mode);
        field.bits.reserve(samples.len());
        field.jobs.reserve(samples.len());

        match mode {
            SimulationMode::Forward => {
                for (i, sample) in samples.iter().enumerate() {
                    let start = self.random_point(rng);
                    let mut bit = Bit::new(BitId::new(i), start, sample.color);
                    if bits_store_targets {
                        bit = bit.with_target(sample.position);
                    } else {
                        field.target_pool.push(sample.position);
                    }
                    field.bits.push(bit);
                    field.jobs.push(JobSpec {
                        source: start,
                        destination: sample.position,
                    });
                }
            }
            SimulationMode::Reverse => {
                let targets = self.scatter_targets(samples.len(), rng);
                let j = self.settings.reverse_jitter;
                for (i, (sample, target)) in samples.iter().zip(targets).enumerate() {
                    let start = self
                        .canvas
                        .clamp(sample.position + Point::new(jitter(rng, j), jitter(rng, j)));
                    field
                        .bits
                        .push(Bit::new(BitId::new(i), start, sample.color).with_target(target));
                    field.jobs.push(JobSpec {
                        source: start,
                        destination: target,
                    });
                }
            }
        }

        info!(
            "Prepared {:?} field with {} bits on {}x{} canvas",
            mode,
            field.bits.len(),
            self.canvas.width,
            self.canvas.height
        );
        field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn builder(width: f32, height: f32) -> FieldBuilder {
        FieldBuilder::new(FieldSettings::default(), Canvas::new(width, height))
    }

    #[test]
    fn text_samples_lie_on_canvas_with_soil_colors() {
        let b = builder(400.0, 400.0);
        let mut rng = StdRng::seed_from_u64(7);
        let samples = b.sample_text("HI", &mut rng);

        assert!(!samples.is_empty());
        for s in &samples {
            assert!(s.position.x >= 0.0 && s.position.x < 400.0);
            assert!(s.position.y >= 0.0 && s.position.y < 400.0);
            assert_eq!(s.position.x % 4.0, 0.0);
            assert!((45..=125).contains(&s.color.r));
            assert!((8..=68).contains(&s.color.g));
            assert!((8..=68).contains(&s.color.b));
        }
    }

    #[test]
    fn empty_text_yields_empty_field() {
        let b = builder(400.0, 400.0);
        let mut rng = StdRng::seed_from_u64(1);
        let field = b.build(&FieldContent::Text(String::new()), SimulationMode::Forward, &mut rng);
        assert!(field.is_empty());
        assert!(field.jobs.is_empty());
    }

    #[test]
    fn long_text_wraps_and_shrinks() {
        let b = builder(400.0, 300.0);
        let text = "THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG";
        let layout = b.layout_text(text);

        assert!(layout.lines.len() > 1);
        assert!(layout.font_size < 120.0);
        assert!(layout.font_size >= 20.0);
        assert!(layout.total_height() <= 300.0 * 0.9);
        assert_eq!(layout.lines.join(" "), text);
    }

    #[test]
    fn short_text_keeps_initial_size() {
        let layout = builder(800.0, 600.0).layout_text("HI");
        assert_eq!(layout.font_size, 120.0);
        assert_eq!(layout.lines, vec!["HI".to_string()]);
    }

    #[test]
    fn image_is_fitted_and_centered() {
        let b = builder(64.0, 32.0);
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([200, 10, 10, 255]));
        // left half transparent
        for y in 0..4 {
            for x in 0..2 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
        let samples = b.sample_image(&img);

        assert!(!samples.is_empty());
        for s in &samples {
            // fitted to 32x32 at x offset 16, opaque half is x in [32, 48)
            assert!(s.position.x >= 24.0 && s.position.x < 48.0, "{:?}", s.position);
            assert!(s.color.r > 100);
        }
        assert!(samples.iter().any(|s| s.position.x == 40.0 && s.color.r >= 190));
    }

    #[test]
    fn scattered_targets_respect_margin() {
        let b = builder(400.0, 400.0);
        let mut rng = StdRng::seed_from_u64(99);
        let targets = b.scatter_targets(50, &mut rng);

        assert_eq!(targets.len(), 50);
        for t in &targets {
            assert!(t.x >= 50.0 && t.x <= 350.0);
            assert!(t.y >= 50.0 && t.y <= 350.0);
        }
    }

    #[test]
    fn scattered_targets_keep_their_distance() {
        let b = builder(400.0, 400.0);
        let mut rng = StdRng::seed_from_u64(17);
        let targets = b.scatter_targets(20, &mut rng);

        assert_eq!(targets.len(), 20);
        for (i, a) in targets.iter().enumerate() {
            for other in &targets[i + 1..] {
                assert!(a.distance(*other) >= 30.0, "{:?} and {:?} too close", a, other);
            }
        }
    }

    #[test]
    fn crowded_scatter_gives_up_after_attempts() {
        // 200 points 30 apart cannot fit in the 60x60 area left inside the margin
        let b = builder(160.0, 160.0);
        let mut rng = StdRng::seed_from_u64(18);
        let targets = b.scatter_targets(200, &mut rng);

        assert_eq!(targets.len(), 200);
        for t in &targets {
            assert!((50.0..=110.0).contains(&t.x) && (50.0..=110.0).contains(&t.y), "{:?}", t);
        }
    }

    #[test]
    fn forward_and_reverse_builds_pair_bits_with_jobs() {
        let b = builder(400.0, 400.0);
        let content = FieldContent::Text("A".into());

        let mut rng = StdRng::seed_from_u64(3);
        let forward = b.build(&content, SimulationMode::Forward, &mut rng);
        assert!(!forward.is_empty());
        assert_eq!(forward.bits.len(), forward.jobs.len());
        assert_eq!(forward.target_pool.len(), forward.bits.len());
        assert!(forward.bits.iter().all(|bit| bit.target.is_none()));
        for (bit, job) in forward.bits.iter().zip(&forward.jobs) {
            assert_eq!(bit.position, job.source);
            assert!(forward.target_pool.contains(&job.destination));
        }

        let mut rng = StdRng::seed_from_u64(3);
        let reverse = b.build(&content, SimulationMode::Reverse, &mut rng);
        assert_eq!(reverse.mode, SimulationMode::Reverse);
        assert!(reverse.target_pool.is_empty());
        for (bit, job) in reverse.bits.iter().zip(&reverse.jobs) {
            assert_eq!(bit.target, Some(job.destination));
            assert_eq!(bit.position, job.source);
        }
    }

    #[test]
    fn image_bits_store_their_targets() {
        let b = builder(32.0, 32.0);
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
        let mut rng = StdRng::seed_from_u64(5);
        let field = b.build(&FieldContent::Image(img), SimulationMode::Forward, &mut rng);

        assert_eq!(field.bits.len(), 16);
        assert!(field.target_pool.is_empty());
        for (bit, job) in field.bits.iter().zip(&field.jobs) {
            assert_eq!(bit.target, Some(job.destination));
            assert_eq!(bit.color, Rgb::new(0, 255, 0));
        }
    }
}
