//! Display list built from a settled layout.
//!
//! This is where computed colour strings are interpreted. A colour the
//! rasterizer cannot reproduce aborts the whole list with
//! `CaptureError::UnsupportedStyle`.

use crate::error::CaptureError;
use crate::rendering::layout::{LayoutItem, LayoutTree};
use crate::rendering::style::{parse_color, Rgba};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    /// One-pixel outline, used for task checkboxes
    StrokeRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        rgba: Rgba,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        size: u32,
        rgba: Rgba,
        bold: bool,
        italic: bool,
        strike: bool,
        underline: bool,
    },
}

fn resolve(property: &str, value: &str) -> Result<Rgba, CaptureError> {
    parse_color(value).map_err(|e| {
        log::debug!("cannot paint {}: {}", property, e);
        CaptureError::unsupported(property, value.trim())
    })
}

/// Interpret every colour in `layout` and emit paint commands in layout order.
pub fn build_display_list(layout: &LayoutTree) -> Result<Vec<PaintCommand>, CaptureError> {
    let mut commands = Vec::with_capacity(layout.items.len());
    for item in &layout.items {
        match item {
            LayoutItem::Fill { rect, color, property } => {
                let rgba = resolve(property, color)?;
                if rgba.alpha() == 0 || rect.width == 0 || rect.height == 0 {
                    continue;
                }
                commands.push(PaintCommand::SolidRect {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    rgba,
                });
            }
            LayoutItem::Text { x, y, text, size, style } => {
                let rgba = resolve("color", &style.color)?;
                commands.push(PaintCommand::Text {
                    x: *x,
                    y: *y,
                    text: text.clone(),
                    size: *size,
                    rgba,
                    bold: style.bold,
                    italic: style.italic,
                    strike: style.strike,
                    underline: style.underline,
                });
            }
            LayoutItem::Checkbox { rect, checked, color } => {
                let rgba = resolve("border-color", color)?;
                commands.push(PaintCommand::StrokeRect {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    rgba,
                });
                if *checked && rect.width > 6 && rect.height > 6 {
                    commands.push(PaintCommand::SolidRect {
                        x: rect.x + 3,
                        y: rect.y + 3,
                        width: rect.width - 6,
                        height: rect.height - 6,
                        rgba,
                    });
                }
            }
        }
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::layout::{Rect, TextStyle};

    fn tree(items: Vec<LayoutItem>) -> LayoutTree {
        LayoutTree {
            width: 100,
            height: 100,
            items,
        }
    }

    #[test]
    fn solid_fill_resolves_hex() {
        let list = build_display_list(&tree(vec![LayoutItem::Fill {
            rect: Rect::new(0, 0, 10, 10),
            color: "#ff0000".into(),
            property: "background-color",
        }]))
        .unwrap();
        match &list[0] {
            PaintCommand::SolidRect { width, rgba, .. } => {
                assert_eq!(*width, 10);
                assert_eq!(*rgba, Rgba([255, 0, 0, 255]));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn transparent_fills_are_dropped() {
        let list = build_display_list(&tree(vec![LayoutItem::Fill {
            rect: Rect::new(0, 0, 10, 10),
            color: "transparent".into(),
            property: "background-color",
        }]))
        .unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn oklch_text_colour_is_rejected() {
        let err = build_display_list(&tree(vec![LayoutItem::Text {
            x: 0,
            y: 0,
            text: "hi".into(),
            size: 2,
            style: TextStyle {
                color: "oklch(0.21 0.034 264.665)".into(),
                ..Default::default()
            },
        }]))
        .unwrap_err();
        assert_eq!(err, CaptureError::unsupported("color", "oklch(0.21 0.034 264.665)"));
        assert!(err.mentions_oklch());
    }

    #[test]
    fn checked_box_is_filled() {
        let list = build_display_list(&tree(vec![LayoutItem::Checkbox {
            rect: Rect::new(0, 0, 14, 14),
            checked: true,
            color: "black".into(),
        }]))
        .unwrap();
        assert_eq!(list.len(), 2);
    }
}
