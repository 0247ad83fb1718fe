//! Computed-style colour interpretation used while painting a capture.
//!
//! Only the notations the rasterizer can reproduce are accepted. Anything else
//! (the CSS Color 4 spaces such as `oklch()` in particular) is an error, never a
//! silent fallback, so a capture cannot come out with wrong colours.

use std::fmt;

/// Straight (non-premultiplied) RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba([0, 0, 0, 0]);
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);

    pub fn alpha(&self) -> u8 {
        self.0[3]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleError {
    /// A colour function the rasterizer does not implement
    UnsupportedFunction { function: String, value: String },
    /// Not a colour at all, or malformed arguments
    Unparseable { value: String },
}

impl fmt::Display for StyleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleError::UnsupportedFunction { function, value } => {
                write!(f, "unsupported color function {}() in `{}`", function, value)
            }
            StyleError::Unparseable { value } => write!(f, "unparseable color `{}`", value),
        }
    }
}

impl std::error::Error for StyleError {}

const UNSUPPORTED_FUNCTIONS: &[&str] = &["oklch", "oklab", "lab", "lch", "color", "hwb", "color-mix"];

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("orange", [255, 165, 0]),
    ("purple", [128, 0, 128]),
    ("fuchsia", [255, 0, 255]),
    ("magenta", [255, 0, 255]),
    ("aqua", [0, 255, 255]),
    ("cyan", [0, 255, 255]),
    ("teal", [0, 128, 128]),
    ("navy", [0, 0, 128]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("darkgray", [169, 169, 169]),
    ("darkgrey", [169, 169, 169]),
    ("lightgray", [211, 211, 211]),
    ("lightgrey", [211, 211, 211]),
    ("dimgray", [105, 105, 105]),
    ("dimgrey", [105, 105, 105]),
    ("whitesmoke", [245, 245, 245]),
    ("gainsboro", [220, 220, 220]),
    ("crimson", [220, 20, 60]),
    ("tomato", [255, 99, 71]),
    ("gold", [255, 215, 0]),
    ("pink", [255, 192, 203]),
    ("brown", [165, 42, 42]),
    ("indigo", [75, 0, 130]),
    ("violet", [238, 130, 238]),
    ("skyblue", [135, 206, 235]),
    ("steelblue", [70, 130, 180]),
    ("royalblue", [65, 105, 225]),
    ("slategray", [112, 128, 144]),
    ("slategrey", [112, 128, 144]),
    ("rebeccapurple", [102, 51, 153]),
];

/// Parse a CSS colour value.
pub fn parse_color(value: &str) -> Result<Rgba, StyleError> {
    let raw = value.trim().trim_end_matches("!important").trim();
    let lower = raw.to_ascii_lowercase();
    let unparseable = || StyleError::Unparseable {
        value: value.trim().to_string(),
    };

    if lower == "transparent" {
        return Ok(Rgba::TRANSPARENT);
    }
    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(unparseable);
    }
    if let Some(open) = lower.find('(') {
        if !lower.ends_with(')') {
            return Err(unparseable());
        }
        let function = lower[..open].trim();
        let args = &lower[open + 1..lower.len() - 1];
        return match function {
            "rgb" | "rgba" => parse_rgb_args(args).ok_or_else(unparseable),
            "hsl" | "hsla" => parse_hsl_args(args).ok_or_else(unparseable),
            f if UNSUPPORTED_FUNCTIONS.contains(&f) => Err(StyleError::UnsupportedFunction {
                function: f.to_string(),
                value: value.trim().to_string(),
            }),
            _ => Err(unparseable()),
        };
    }
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, [r, g, b])| Rgba([*r, *g, *b, 255]))
        .ok_or_else(unparseable)
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// Split legacy (`a, b, c, d`) and modern (`a b c / d`) argument lists.
fn split_args(args: &str) -> Option<(Vec<&str>, Option<&str>)> {
    if args.contains(',') {
        let parts: Vec<&str> = args.split(',').map(str::trim).collect();
        return match parts.len() {
            3 => Some((parts, None)),
            4 => Some((parts[..3].to_vec(), Some(parts[3]))),
            _ => None,
        };
    }
    let (channels, alpha) = match args.split_once('/') {
        Some((c, a)) => (c, Some(a.trim())),
        None => (args, None),
    };
    let parts: Vec<&str> = channels.split_whitespace().collect();
    (parts.len() == 3).then_some((parts, alpha))
}

fn parse_alpha(alpha: Option<&str>) -> Option<u8> {
    let Some(a) = alpha else { return Some(255) };
    let value = match a.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok()? / 100.0,
        None => a.parse::<f32>().ok()?,
    };
    value.is_finite().then(|| (value.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn parse_rgb_args(args: &str) -> Option<Rgba> {
    let (parts, alpha) = split_args(args)?;
    let mut rgb = [0u8; 3];
    for (slot, part) in rgb.iter_mut().zip(parts) {
        let v = match part.strip_suffix('%') {
            Some(pct) => pct.trim().parse::<f32>().ok()? * 2.55,
            None => part.parse::<f32>().ok()?,
        };
        if !v.is_finite() {
            return None;
        }
        *slot = v.clamp(0.0, 255.0).round() as u8;
    }
    Some(Rgba([rgb[0], rgb[1], rgb[2], parse_alpha(alpha)?]))
}

fn parse_hsl_args(args: &str) -> Option<Rgba> {
    let (parts, alpha) = split_args(args)?;
    let hue = parts[0].trim_end_matches("deg").parse::<f32>().ok()?;
    let sat = parts[1].strip_suffix('%')?.trim().parse::<f32>().ok()? / 100.0;
    let light = parts[2].strip_suffix('%')?.trim().parse::<f32>().ok()? / 100.0;
    if !(hue.is_finite() && sat.is_finite() && light.is_finite()) {
        return None;
    }
    let [r, g, b] = hsl_to_rgb(hue, sat.clamp(0.0, 1.0), light.clamp(0.0, 1.0));
    Some(Rgba([r, g, b, parse_alpha(alpha)?]))
}

fn hsl_to_rgb(hue: f32, sat: f32, light: f32) -> [u8; 3] {
    let h = hue.rem_euclid(360.0) / 360.0;
    let q = if light < 0.5 {
        light * (1.0 + sat)
    } else {
        light + sat - light * sat
    };
    let p = 2.0 * light - q;
    let channel = |t: f32| {
        let t = t.rem_euclid(1.0);
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

/// Split an inline `style` attribute into lower-cased property/value pairs.
pub fn declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim();
            (!prop.is_empty() && !value.is_empty()).then(|| (prop, value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_forms() {
        assert_eq!(parse_color("#fff").unwrap(), Rgba::WHITE);
        assert_eq!(parse_color("#11182780").unwrap(), Rgba([0x11, 0x18, 0x27, 0x80]));
        assert_eq!(parse_color("#2563EB").unwrap(), Rgba([0x25, 0x63, 0xeb, 255]));
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#ggg").is_err());
    }

    #[test]
    fn functional_forms() {
        assert_eq!(parse_color("rgb(255, 0, 0)").unwrap(), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("rgba(0,0,0,0.5)").unwrap(), Rgba([0, 0, 0, 128]));
        assert_eq!(parse_color("rgb(0 128 255 / 50%)").unwrap(), Rgba([0, 128, 255, 128]));
        assert_eq!(parse_color("hsl(0, 100%, 50%)").unwrap(), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("hsl(120deg 100% 25%)").unwrap(), Rgba([0, 128, 0, 255]));
    }

    #[test]
    fn named_and_transparent() {
        assert_eq!(parse_color("Navy").unwrap(), Rgba([0, 0, 128, 255]));
        assert_eq!(parse_color("transparent").unwrap(), Rgba::TRANSPARENT);
        assert_eq!(parse_color("red !important").unwrap(), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn color4_spaces_are_unsupported() {
        let err = parse_color("oklch(0.21 0.034 264.665)").unwrap_err();
        assert_eq!(
            err,
            StyleError::UnsupportedFunction {
                function: "oklch".into(),
                value: "oklch(0.21 0.034 264.665)".into()
            }
        );
        for v in ["lab(50% 40 59)", "color(display-p3 1 0 0)", "oklab(0.5 0.1 0.1)", "color-mix(in srgb, red, blue)"] {
            assert!(matches!(parse_color(v), Err(StyleError::UnsupportedFunction { .. })), "{}", v);
        }
        assert!(matches!(parse_color("bluish"), Err(StyleError::Unparseable { .. })));
    }

    #[test]
    fn inline_declarations() {
        let decls = declarations("Color: red; background-color : #000 ;;bogus");
        assert_eq!(
            decls,
            vec![
                ("color".to_string(), "red".to_string()),
                ("background-color".to_string(), "#000".to_string())
            ]
        );
    }
}
