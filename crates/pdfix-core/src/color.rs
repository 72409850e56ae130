//! Color strings as produced by the editing canvas.
//!
//! Accepted forms are `#RRGGBB` (the `#` is optional), `rgb(r, g, b)` and
//! `rgba(r, g, b, a)`. Vector drawing only needs the RGB triple; the raster
//! painter also honours the alpha channel and the `transparent` keyword.

/// RGB components normalized to the 0-1 range used by PDF color operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };
    pub const WHITE: Rgb = Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };
}

/// 8-bit RGBA color for the raster painter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Parse a color string, falling back to black for anything unrecognized.
pub fn parse_color(color: &str) -> Rgb {
    parse_components(color)
        .map(|(r, g, b, _)| Rgb {
            r: (r as f32 / 255.0).min(1.0),
            g: (g as f32 / 255.0).min(1.0),
            b: (b as f32 / 255.0).min(1.0),
        })
        .unwrap_or(Rgb::BLACK)
}

/// Parse a color for painting. `None` means nothing is painted
/// (`transparent`, empty, or fully transparent `rgba`). Unrecognized
/// strings paint black, as a canvas context does with its default style.
pub fn parse_paint(color: &str) -> Option<Rgba8> {
    let trimmed = color.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("transparent") || trimmed == "none" {
        return None;
    }
    let (r, g, b, a) = parse_components(trimmed).unwrap_or((0, 0, 0, 1.0));
    let a = (a.clamp(0.0, 1.0) * 255.0).round() as u8;
    if a == 0 {
        return None;
    }
    Some(Rgba8 {
        r: r.min(255) as u8,
        g: g.min(255) as u8,
        b: b.min(255) as u8,
        a,
    })
}

fn parse_components(color: &str) -> Option<(u32, u32, u32, f32)> {
    let trimmed = color.trim();
    parse_hex(trimmed).or_else(|| parse_functional(trimmed))
}

fn parse_hex(color: &str) -> Option<(u32, u32, u32, f32)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let r = u32::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u32::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u32::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b, 1.0))
}

fn parse_functional(color: &str) -> Option<(u32, u32, u32, f32)> {
    let start = color.find("rgb")?;
    let rest = &color[start + 3..];
    let rest = rest.strip_prefix('a').unwrap_or(rest);
    let inner = rest.trim_start().strip_prefix('(')?;
    let inner = inner.split(')').next()?;

    let mut parts = inner.split(',').map(str::trim);
    let r = parts.next()?.parse::<u32>().ok()?;
    let g = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    let a = match parts.next() {
        Some(alpha) => alpha.parse::<f32>().unwrap_or(1.0),
        None => 1.0,
    };
    Some((r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_and_rgb_agree() {
        assert_eq!(parse_color("#FF8000"), parse_color("rgb(255, 128, 0)"));
        assert_eq!(parse_color("ff8000"), parse_color("rgba(255,128,0,0.5)"));
    }

    #[test]
    fn test_hex_is_case_insensitive() {
        assert_eq!(parse_color("#abcdef"), parse_color("#ABCDEF"));
    }

    #[test]
    fn test_unparseable_is_black() {
        assert_eq!(parse_color("not a color"), Rgb::BLACK);
        assert_eq!(parse_color(""), Rgb::BLACK);
        assert_eq!(parse_color("#12345"), Rgb::BLACK);
        assert_eq!(parse_color("rgb(1, 2)"), Rgb::BLACK);
    }

    #[test]
    fn test_components_clamped_to_one() {
        let c = parse_color("rgb(300, 0, 0)");
        assert_eq!(c.r, 1.0);
    }

    #[test]
    fn test_white() {
        assert_eq!(parse_color("#ffffff"), Rgb::WHITE);
    }

    #[test]
    fn test_paint_alpha() {
        let paint = parse_paint("rgba(255,255,0,0.35)").unwrap();
        assert_eq!((paint.r, paint.g, paint.b), (255, 255, 0));
        assert_eq!(paint.a, 89);
    }

    #[test]
    fn test_paint_transparent() {
        assert_eq!(parse_paint("transparent"), None);
        assert_eq!(parse_paint(""), None);
        assert_eq!(parse_paint("rgba(0,0,0,0)"), None);
    }
}
