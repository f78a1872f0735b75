//! Colours as they are written in lesson code: hex literals and CSS style strings.
//!
//! A [`Color`] stores sRGB components in `0.0..=1.0`. Shading happens in linear space,
//! so everything that ends up in a uniform goes through [`Color::to_linear`] first.

use std::str::FromStr;

use anyhow::bail;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

const NAMED: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("white", 0xffffff),
    ("red", 0xff0000),
    ("green", 0x008000),
    ("lime", 0x00ff00),
    ("blue", 0x0000ff),
    ("yellow", 0xffff00),
    ("cyan", 0x00ffff),
    ("magenta", 0xff00ff),
    ("orange", 0xffa500),
    ("pink", 0xffc0cb),
    ("purple", 0x800080),
    ("gray", 0x808080),
    ("grey", 0x808080),
];

impl Color {
    pub const WHITE: Color = Color::from_hex(0xffffff);
    pub const BLACK: Color = Color::from_hex(0x000000);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB`
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_hex(&self) -> u32 {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }

    /// Parse `#rrggbb`, `#rgb` or a CSS colour name.
    pub fn parse(style: &str) -> anyhow::Result<Self> {
        let style = style.trim();
        if let Some(hex) = style.strip_prefix('#') {
            let value = match hex.len() {
                6 => u32::from_str_radix(hex, 16)?,
                3 => {
                    let short = u32::from_str_radix(hex, 16)?;
                    let r = (short >> 8) & 0xf;
                    let g = (short >> 4) & 0xf;
                    let b = short & 0xf;
                    (r * 0x11) << 16 | (g * 0x11) << 8 | b * 0x11
                }
                n => bail!("hex colour {style} has {n} digits, expected 3 or 6"),
            };
            return Ok(Self::from_hex(value));
        }
        let lower = style.to_ascii_lowercase();
        match NAMED.iter().find(|(name, _)| *name == lower) {
            Some((_, hex)) => Ok(Self::from_hex(*hex)),
            None => bail!("unknown colour {style}"),
        }
    }

    /// Lenient variant of [`Color::parse`]: an unknown style is reported and the colour
    /// stays white.
    pub fn from_style(style: &str) -> Self {
        match Self::parse(style) {
            Ok(color) => color,
            Err(e) => {
                log::warn!("{e}, falling back to white");
                Self::WHITE
            }
        }
    }

    pub fn lerp(&self, other: &Color, alpha: f32) -> Color {
        Color {
            r: self.r + (other.r - self.r) * alpha,
            g: self.g + (other.g - self.g) * alpha,
            b: self.b + (other.b - self.b) * alpha,
        }
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub fn to_linear(&self) -> [f32; 3] {
        [
            srgb_to_linear(self.r),
            srgb_to_linear(self.g),
            srgb_to_linear(self.b),
        ]
    }

    /// Clear colours are written to an sRGB surface, so they are converted as well.
    pub fn to_wgpu(&self) -> wgpu::Color {
        let [r, g, b] = self.to_linear();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Self::from_hex(hex)
    }
}

impl From<[f32; 3]> for Color {
    fn from([r, g, b]: [f32; 3]) -> Self {
        Self { r, g, b }
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(Color::parse("#ff88cc").unwrap().to_hex(), 0xff88cc);
        assert_eq!(Color::parse("#f8c").unwrap().to_hex(), 0xff88cc);
        assert_eq!("#262837".parse::<Color>().unwrap(), Color::from_hex(0x262837));
    }

    #[test]
    fn parses_named_colours_case_insensitively() {
        assert_eq!(Color::parse("Red").unwrap(), Color::from_hex(0xff0000));
    }

    #[test]
    fn hex_without_hash_is_not_a_style() {
        assert!(Color::parse("b9d5ff").is_err());
        assert_eq!(Color::from_style("b9d5ff"), Color::WHITE);
        assert!(Color::parse("#12345").is_err());
    }

    #[test]
    fn lerp_hits_both_ends() {
        let inside = Color::from_hex(0xff6030);
        let outside = Color::from_hex(0x1b3984);
        assert_eq!(inside.lerp(&outside, 0.0), inside);
        let end = inside.lerp(&outside, 1.0);
        assert_relative_eq!(end.r, outside.r);
        assert_relative_eq!(end.b, outside.b);
    }

    #[test]
    fn linear_conversion_keeps_extremes() {
        assert_relative_eq!(srgb_to_linear(0.0), 0.0);
        assert_relative_eq!(srgb_to_linear(1.0), 1.0, epsilon = 1e-5);
        assert_relative_eq!(srgb_to_linear(0.5), 0.21404, epsilon = 1e-4);
    }
}
