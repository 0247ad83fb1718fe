//! Rasterizer: paints a settled region into an RGBA bitmap.
//!
//! Painting goes through `vello_cpu`, one device tile at a time, and text is
//! shaped with the embedded faces from [`fonts`](crate::rendering::fonts).

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use sha2::{Digest, Sha256};
use vello_cpu::kurbo::{Affine, Rect};
use vello_cpu::peniko::{Blob, Color, FontData};
use vello_cpu::{Glyph, Pixmap, RenderContext};

use crate::error::{CaptureError, Error, Result};
use crate::rendering::fonts::{self, Face, ShapedGlyph, TextShaper, ADVANCE};
use crate::rendering::paint::{build_display_list, PaintCommand};
use crate::rendering::style::{parse_color, Rgba};
use crate::rendering::RegionHandle;

/// Device pixels per CSS pixel in every capture
pub const CAPTURE_SCALE: u32 = 2;

/// Immutable RGBA bitmap of one capture.
///
/// `width` and `height` are non-zero and `pixels.len() == width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSnapshot {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RenderSnapshot {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::RenderError(format!(
                "snapshot dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| Error::RenderError(format!("snapshot {}x{} is too large", width, height)))?;
        if pixels.len() != expected {
            return Err(Error::RenderError(format!(
                "snapshot {}x{} needs {} bytes of RGBA, got {}",
                width,
                height,
                expected,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    /// A snapshot filled with one colour
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self> {
        let count = (width as usize).saturating_mul(height as usize);
        Self::new(width, height, rgba.repeat(count))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.pixels[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Hex SHA-256 over the dimensions and pixel data
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.width.to_be_bytes());
        hasher.update(self.height.to_be_bytes());
        hasher.update(&self.pixels);
        hex::encode(hasher.finalize())
    }

    /// RGB bytes with any translucency composited over white
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() / 4 * 3);
        for px in self.pixels.chunks_exact(4) {
            let a = px[3] as u32;
            for &c in &px[..3] {
                out.push(((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8);
            }
        }
        out
    }

    /// PNG encoding of `to_rgb()`. Same pixels, same bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let encoder = PngEncoder::new_with_quality(&mut out, CompressionType::Default, FilterType::Adaptive);
        encoder
            .write_image(&self.to_rgb(), self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(|e| Error::Assembly(format!("PNG encoding failed: {}", e)))?;
        Ok(out)
    }
}

/// Device tiles are at most this many pixels on a side
const TILE: u32 = 1024;

/// Captures a mounted region at a fixed scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rasterizer {
    scale: u32,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self { scale: CAPTURE_SCALE }
    }
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Wait for the region to settle, then paint it over `background`.
    ///
    /// Fails without producing anything if the region is gone or any colour on
    /// it (the background included) cannot be interpreted.
    pub async fn capture(&self, region: &RegionHandle, background: &str) -> std::result::Result<RenderSnapshot, CaptureError> {
        let layout = region.settle().await?;
        let fill = parse_color(background).map_err(|e| {
            log::debug!("cannot paint background: {}", e);
            CaptureError::unsupported("background-color", background.trim())
        })?;
        let commands = build_display_list(&layout)?;

        let mut painter = Painter::new(self.scale);
        let marks = painter.prepare(&commands);
        let pixels = painter.render(&marks, layout.width, layout.height, fill);
        let (width, height) = (layout.width * self.scale, layout.height * self.scale);
        log::debug!(
            "captured {}x{} region as {}x{} bitmap ({} paint commands)",
            layout.width,
            layout.height,
            width,
            height,
            commands.len()
        );

        Ok(RenderSnapshot { width, height, pixels })
    }
}

/// Paint commands resolved to geometry in CSS pixels
#[derive(Debug, Clone, PartialEq)]
enum Mark {
    Fill {
        rect: Rect,
        rgba: Rgba,
    },
    Glyphs {
        face: Face,
        font_size: f32,
        x: f32,
        baseline: f32,
        glyphs: Vec<ShapedGlyph>,
        rgba: Rgba,
    },
}

struct Painter {
    scale: u32,
    shaper: TextShaper,
    fonts: [FontData; 4],
}

impl Painter {
    fn new(scale: u32) -> Self {
        Self {
            scale,
            shaper: TextShaper::new(),
            fonts: Face::ALL.map(|face| FontData::new(Blob::from(face.bytes().to_vec()), 0)),
        }
    }

    fn font(&self, face: Face) -> &FontData {
        let index = Face::ALL.iter().position(|f| *f == face).unwrap_or(0);
        &self.fonts[index]
    }

    /// Shape text and expand outlines and decorations into plain fills.
    fn prepare(&mut self, commands: &[PaintCommand]) -> Vec<Mark> {
        let mut marks = Vec::with_capacity(commands.len());
        for command in commands {
            match command {
                PaintCommand::SolidRect { x, y, width, height, rgba } => {
                    marks.push(fill(*x as f64, *y as f64, *width as f64, *height as f64, *rgba));
                }
                PaintCommand::StrokeRect { x, y, width, height, rgba } => {
                    let (x, y, w, h) = (*x as f64, *y as f64, *width as f64, *height as f64);
                    if w < 2.0 || h < 2.0 {
                        marks.push(fill(x, y, w, h, *rgba));
                        continue;
                    }
                    marks.push(fill(x, y, w, 1.0, *rgba));
                    marks.push(fill(x, y + h - 1.0, w, 1.0, *rgba));
                    marks.push(fill(x, y + 1.0, 1.0, h - 2.0, *rgba));
                    marks.push(fill(x + w - 1.0, y + 1.0, 1.0, h - 2.0, *rgba));
                }
                PaintCommand::Text {
                    x,
                    y,
                    text,
                    size,
                    rgba,
                    bold,
                    italic,
                    strike,
                    underline,
                } => {
                    let face = Face::select(*bold, *italic);
                    let font_size = fonts::font_size(*size);
                    let baseline = *y as f32 + fonts::baseline(*size);
                    marks.push(Mark::Glyphs {
                        face,
                        font_size,
                        x: *x as f32,
                        baseline,
                        glyphs: self.shaper.shape(text, *size, face),
                        rgba: *rgba,
                    });

                    let span = (text.chars().count() as u32 * ADVANCE * size) as f64;
                    let thickness = (*size as f64 / 2.0).max(1.0);
                    if *strike {
                        let top = baseline as f64 - 0.3 * font_size as f64 - thickness / 2.0;
                        marks.push(fill(*x as f64, top, span, thickness, *rgba));
                    }
                    if *underline {
                        let top = baseline as f64 + *size as f64;
                        marks.push(fill(*x as f64, top, span, thickness, *rgba));
                    }
                }
            }
        }
        marks
    }

    /// Straight RGBA pixels of a `width` x `height` CSS pixel region at `self.scale`.
    fn render(&self, marks: &[Mark], width: u32, height: u32, background: Rgba) -> Vec<u8> {
        let (device_width, device_height) = (width * self.scale, height * self.scale);
        let row_bytes = device_width as usize * 4;
        let mut pixels = vec![0u8; row_bytes * device_height as usize];

        let mut top = 0;
        while top < device_height {
            let tile_height = (device_height - top).min(TILE);
            let mut left = 0;
            while left < device_width {
                let tile_width = (device_width - left).min(TILE);
                let tile = self.paint_tile(marks, (left, top), (tile_width, tile_height), (width, height), background);
                let tile_row = tile_width as usize * 4;
                for (row, src) in tile.data_as_u8_slice().chunks_exact(tile_row).enumerate() {
                    let start = (top as usize + row) * row_bytes + left as usize * 4;
                    for (dst, px) in pixels[start..start + tile_row].chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                        dst.copy_from_slice(&unpremultiply(px));
                    }
                }
                left += tile_width;
            }
            top += tile_height;
        }
        pixels
    }

    fn paint_tile(
        &self,
        marks: &[Mark],
        (left, top): (u32, u32),
        (width, height): (u32, u32),
        (region_width, region_height): (u32, u32),
        background: Rgba,
    ) -> Pixmap {
        // tiles never exceed TILE, well inside u16
        let (width, height) = (width as u16, height as u16);
        let mut ctx = RenderContext::new(width, height);
        ctx.set_transform(Affine::translate((-(left as f64), -(top as f64))) * Affine::scale(self.scale as f64));

        ctx.set_paint(color(background));
        ctx.fill_rect(&Rect::new(0.0, 0.0, region_width as f64, region_height as f64));
        for mark in marks {
            match mark {
                Mark::Fill { rect, rgba } => {
                    ctx.set_paint(color(*rgba));
                    ctx.fill_rect(rect);
                }
                Mark::Glyphs {
                    face,
                    font_size,
                    x,
                    baseline,
                    glyphs,
                    rgba,
                } => {
                    ctx.set_paint(color(*rgba));
                    let run = glyphs.iter().map(|g| Glyph {
                        id: g.id,
                        x: *x + g.x,
                        y: *baseline + g.y,
                    });
                    ctx.glyph_run(self.font(*face)).font_size(*font_size).fill_glyphs(run);
                }
            }
        }

        ctx.flush();
        let mut pixmap = Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);
        pixmap
    }
}

fn fill(x: f64, y: f64, width: f64, height: f64, rgba: Rgba) -> Mark {
    Mark::Fill {
        rect: Rect::new(x, y, x + width, y + height),
        rgba,
    }
}

fn color(rgba: Rgba) -> Color {
    let [r, g, b, a] = rgba.0;
    Color::from_rgba8(r, g, b, a)
}

fn unpremultiply(px: &[u8]) -> [u8; 4] {
    let a = px[3] as u32;
    match a {
        0 => [0, 0, 0, 0],
        255 => [px[0], px[1], px[2], 255],
        _ => {
            let c = |v: u8| ((v as u32 * 255 + a / 2) / a).min(255) as u8;
            [c(px[0]), c(px[1]), c(px[2]), a as u8]
        }
    }
}
