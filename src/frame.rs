use std::path::Path;

use fontdue::{Font, FontSettings};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use tracing::debug;

use crate::error::{Result, VideoError};
use crate::images::ImageSearchService;

pub(crate) const FRAME_WIDTH: u32 = 1280;
pub(crate) const FRAME_HEIGHT: u32 = 720;
pub(crate) const WRAP_COLUMNS: usize = 50;

const FONT_SIZE: f32 = 32.0;
const STROKE_THICKNESS: i32 = 2;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

static EMBEDDED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");

/// Wraps at [`WRAP_COLUMNS`]. Tabs expand to 8-column stops and every other
/// whitespace character becomes one space, so runs are kept, not collapsed.
/// Words longer than the width are left whole.
pub(crate) fn wrap_sentence(sentence: &str) -> Vec<String> {
    if sentence.trim().is_empty() {
        return Vec::new();
    }
    let spaced = spaces_for_whitespace(sentence);
    let options = textwrap::Options::new(WRAP_COLUMNS)
        .break_words(false)
        .word_separator(textwrap::WordSeparator::AsciiSpace);
    textwrap::wrap(&spaced, options)
        .into_iter()
        .map(|line| line.trim_end().to_string())
        .collect()
}

fn spaces_for_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut column = 0;
    for c in text.chars() {
        match c {
            '\t' => {
                let width = 8 - column % 8;
                out.extend(std::iter::repeat(' ').take(width));
                column += width;
            }
            '\n' | '\r' => {
                out.push(' ');
                column = 0;
            }
            c if c.is_whitespace() => {
                out.push(' ');
                column += 1;
            }
            c => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

/// Baseline of the first line. Height is one line's ascent, so a wrapped
/// block hangs below the centre instead of being centred as a whole.
pub(crate) fn text_origin(text_width: i32, text_height: i32) -> (i32, i32) {
    (
        (FRAME_WIDTH as i32 - text_width) / 2,
        (FRAME_HEIGHT as i32 + text_height) / 2,
    )
}

pub(crate) struct TextPainter {
    font: Font,
    font_size: f32,
}

impl TextPainter {
    pub(crate) fn embedded() -> Result<Self> {
        Self::from_bytes(EMBEDDED_FONT, FONT_SIZE)
    }

    pub(crate) fn load(font_path: &Path) -> Result<Self> {
        let bytes = std::fs::read(font_path).map_err(|e| {
            VideoError::Font(format!("cannot read font '{}': {}", font_path.display(), e))
        })?;
        Self::from_bytes(&bytes, FONT_SIZE)
    }

    pub(crate) fn from_bytes(bytes: &[u8], font_size: f32) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|e| VideoError::Font(format!("cannot parse font: {}", e)))?;
        Ok(Self { font, font_size })
    }

    fn ascent(&self) -> i32 {
        self.font
            .horizontal_line_metrics(self.font_size)
            .map(|metrics| metrics.ascent)
            .unwrap_or(self.font_size)
            .round() as i32
    }

    fn line_height(&self) -> i32 {
        self.font
            .horizontal_line_metrics(self.font_size)
            .map(|metrics| metrics.new_line_size)
            .unwrap_or(self.font_size * 1.2)
            .round() as i32
    }

    pub(crate) fn line_width(&self, line: &str) -> i32 {
        let mut width = 0.0;
        let mut previous = None;
        for ch in line.chars() {
            if let Some(prev) = previous {
                width += self
                    .font
                    .horizontal_kern(prev, ch, self.font_size)
                    .unwrap_or(0.0);
            }
            width += self.font.metrics(ch, self.font_size).advance_width;
            previous = Some(ch);
        }
        width.round() as i32 + STROKE_THICKNESS - 1
    }

    /// Width of the widest line and height of a single line.
    pub(crate) fn measure(&self, lines: &[String]) -> (i32, i32) {
        let width = lines
            .iter()
            .map(|line| self.line_width(line))
            .max()
            .unwrap_or(0);
        (width, self.ascent())
    }

    fn draw_line(&self, canvas: &mut RgbImage, x: i32, baseline: i32, line: &str) {
        let mut pen_x = x as f32;
        let mut previous = None;
        for ch in line.chars() {
            if let Some(prev) = previous {
                pen_x += self
                    .font
                    .horizontal_kern(prev, ch, self.font_size)
                    .unwrap_or(0.0);
            }
            let (metrics, coverage) = self.font.rasterize(ch, self.font_size);
            let left = pen_x.round() as i32 + metrics.xmin;
            let top = baseline - metrics.ymin - metrics.height as i32;
            for dy in 0..STROKE_THICKNESS {
                for dx in 0..STROKE_THICKNESS {
                    blend_glyph(
                        canvas,
                        left + dx,
                        top + dy,
                        metrics.width,
                        metrics.height,
                        &coverage,
                    );
                }
            }
            pen_x += metrics.advance_width;
            previous = Some(ch);
        }
    }
}

fn blend_glyph(
    canvas: &mut RgbImage,
    left: i32,
    top: i32,
    width: usize,
    height: usize,
    coverage: &[u8],
) {
    let (canvas_w, canvas_h) = (canvas.width() as i32, canvas.height() as i32);
    for gy in 0..height {
        let y = top + gy as i32;
        if y < 0 || y >= canvas_h {
            continue;
        }
        for gx in 0..width {
            let x = left + gx as i32;
            if x < 0 || x >= canvas_w {
                continue;
            }
            let alpha = coverage[gy * width + gx] as u32;
            if alpha == 0 {
                continue;
            }
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            for (channel, target) in pixel.0.iter_mut().zip(TEXT_COLOR.0) {
                *channel = ((target as u32 * alpha + *channel as u32 * (255 - alpha)) / 255) as u8;
            }
        }
    }
}

pub(crate) struct FrameComposer {
    painter: TextPainter,
}

impl FrameComposer {
    pub(crate) fn new(painter: TextPainter) -> Self {
        Self { painter }
    }

    /// Downloads `url` into `scratch_path`, decodes it and renders `sentence` on top.
    pub(crate) async fn compose<S: ImageSearchService>(
        &self,
        images: &S,
        sentence: &str,
        url: &str,
        scratch_path: &Path,
    ) -> Result<RgbImage> {
        let bytes = images.download(url).await?;
        tokio::fs::write(scratch_path, &bytes).await?;
        debug!("Downloaded {} bytes to {}", bytes.len(), scratch_path.display());

        let background = ImageReader::open(scratch_path)?
            .with_guessed_format()?
            .decode()
            .map_err(|source| VideoError::Decode {
                url: url.to_string(),
                source,
            })?;

        Ok(self.render(sentence, &background))
    }

    pub(crate) fn render(&self, sentence: &str, background: &DynamicImage) -> RgbImage {
        let mut canvas = imageops::resize(
            &background.to_rgb8(),
            FRAME_WIDTH,
            FRAME_HEIGHT,
            FilterType::Triangle,
        );

        let lines = wrap_sentence(sentence);
        let (text_width, text_height) = self.painter.measure(&lines);
        let (x, y) = text_origin(text_width, text_height);
        let line_height = self.painter.line_height();
        for (i, line) in lines.iter().enumerate() {
            self.painter
                .draw_line(&mut canvas, x, y + i as i32 * line_height, line);
        }
        canvas
    }
}
