//! Embedded typeface and text shaping for captures.
//!
//! DejaVu Sans Mono is compiled into the crate, so a capture never depends on
//! the fonts installed on the machine. The face is monospaced, which lets layout
//! measure text on a fixed cell grid: a cell is `ADVANCE * size` CSS pixels wide
//! and `LINE_HEIGHT * size` tall, and the em size is chosen so that one glyph
//! advance spans exactly one cell.

use std::borrow::Cow;

use parley::layout::PositionedLayoutItem;
use parley::style::{FontStack, FontStyle, FontWeight, StyleProperty};
use parley::{FontContext, Layout, LayoutContext};

/// Cell width in CSS pixels per unit of glyph size
pub const ADVANCE: u32 = 5;
/// Line box height in CSS pixels per unit of glyph size
pub const LINE_HEIGHT: u32 = 11;

const FAMILY: &str = "DejaVu Sans Mono";
const UNITS_PER_EM: f32 = 2048.0;
const GLYPH_ADVANCE: f32 = 1233.0;
const ASCENT: f32 = 1901.0;
const DESCENT: f32 = 483.0;

const REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono.ttf");
const BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono-Bold.ttf");
const OBLIQUE: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono-Oblique.ttf");
const BOLD_OBLIQUE: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono-BoldOblique.ttf");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Oblique,
    BoldOblique,
}

impl Face {
    pub const ALL: [Face; 4] = [Face::Regular, Face::Bold, Face::Oblique, Face::BoldOblique];

    pub fn select(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Face::Regular,
            (true, false) => Face::Bold,
            (false, true) => Face::Oblique,
            (true, true) => Face::BoldOblique,
        }
    }

    pub fn bytes(self) -> &'static [u8] {
        match self {
            Face::Regular => REGULAR,
            Face::Bold => BOLD,
            Face::Oblique => OBLIQUE,
            Face::BoldOblique => BOLD_OBLIQUE,
        }
    }

    fn weight(self) -> FontWeight {
        match self {
            Face::Bold | Face::BoldOblique => FontWeight::BOLD,
            Face::Regular | Face::Oblique => FontWeight::NORMAL,
        }
    }

    fn style(self) -> FontStyle {
        match self {
            Face::Oblique | Face::BoldOblique => FontStyle::Italic,
            Face::Regular | Face::Bold => FontStyle::Normal,
        }
    }
}

/// Em size that makes one glyph advance fill one cell of glyph size `size`
pub fn font_size(size: u32) -> f32 {
    (ADVANCE * size) as f32 * UNITS_PER_EM / GLYPH_ADVANCE
}

/// Distance from the top of a line box to the baseline, text centred in the box
pub fn baseline(size: u32) -> f32 {
    let em = font_size(size) / UNITS_PER_EM;
    let content = (ASCENT + DESCENT) * em;
    ((LINE_HEIGHT * size) as f32 - content) / 2.0 + ASCENT * em
}

/// A glyph id placed relative to the start of its line, `y` measured from the baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapedGlyph {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// Shapes single lines of text with the embedded faces only.
pub struct TextShaper {
    font_ctx: FontContext,
    layout_ctx: LayoutContext<()>,
    family: String,
}

impl Default for TextShaper {
    fn default() -> Self {
        Self::new()
    }
}

impl TextShaper {
    pub fn new() -> Self {
        let mut font_ctx = FontContext::default();
        let mut family = None;
        for face in Face::ALL {
            let registered = font_ctx
                .collection
                .register_fonts(parley::fontique::Blob::from(face.bytes().to_vec()), None);
            if family.is_none() {
                family = registered
                    .first()
                    .and_then(|(id, _)| font_ctx.collection.family_name(*id))
                    .map(str::to_string);
            }
        }
        Self {
            font_ctx,
            layout_ctx: LayoutContext::new(),
            family: family.unwrap_or_else(|| FAMILY.to_string()),
        }
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn shape(&mut self, text: &str, size: u32, face: Face) -> Vec<ShapedGlyph> {
        let family = self.family.clone();
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(StyleProperty::FontStack(FontStack::Source(Cow::Owned(family))));
        builder.push_default(StyleProperty::FontSize(font_size(size)));
        builder.push_default(StyleProperty::FontWeight(face.weight()));
        builder.push_default(StyleProperty::FontStyle(face.style()));

        let mut layout: Layout<()> = builder.build(text);
        layout.break_all_lines(None);

        let mut glyphs = Vec::with_capacity(text.len());
        for line in layout.lines() {
            for item in line.items() {
                let PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let mut pen = run.offset();
                for glyph in run.glyphs() {
                    glyphs.push(ShapedGlyph {
                        id: glyph.id,
                        x: pen + glyph.x,
                        y: -glyph.y,
                    });
                    pen += glyph.advance;
                }
            }
        }
        glyphs
    }
}
