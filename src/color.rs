use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while reading a CSS color string.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColorError {
    #[error("color string is empty")]
    Empty,
    #[error("unsupported color syntax: {0}")]
    Unsupported(String),
    #[error("invalid hex color: {0}")]
    InvalidHex(String),
    #[error("invalid component `{component}` in {style}")]
    InvalidComponent { style: String, component: String },
}

/// Current color of the page: hue in degrees, saturation and lightness in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsla {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub alpha: f64,
}

impl Default for Hsla {
    fn default() -> Self {
        Self {
            hue: 0.0,
            saturation: 32.0,
            lightness: 25.0,
            alpha: 1.0,
        }
    }
}

impl Hsla {
    pub fn new(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Self {
        Self {
            hue: normalize_hue(hue),
            saturation: clamp_percent(saturation),
            lightness: clamp_percent(lightness),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Starting color with an integer hue picked at random in `[0, 360]`.
    pub fn random_hue() -> Self {
        let hue = rand::random::<f64>() * 361.0;
        Self::new(hue.round(), 32.0, 25.0, 1.0)
    }

    /// Formats the color as `hsla(h, s%, l%, a)`.
    pub fn to_hsl_string(&self) -> String {
        format!(
            "hsla({}, {}%, {}%, {})",
            normalize_hue(self.hue),
            self.saturation,
            self.lightness,
            self.alpha
        )
    }

    /// Formats the color as a six digit `#rrggbb` string. Alpha is dropped.
    pub fn to_hex_string(&self) -> String {
        let [r, g, b] = self.to_rgb8();
        format!("#{r:02x}{g:02x}{b:02x}")
    }

    pub fn to_rgb8(&self) -> [u8; 3] {
        hsl_to_rgb(self.hue, self.saturation, self.lightness).map(channel_to_u8)
    }

    pub fn to_rgb(&self) -> Vec3 {
        let [r, g, b] = hsl_to_rgb(self.hue, self.saturation, self.lightness);
        Vec3::new(r as f32, g as f32, b as f32)
    }
}

impl fmt::Display for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hsl_string())
    }
}

/// Wraps any finite angle into `[0, 360)`.
pub fn normalize_hue(angle: f64) -> f64 {
    let wrapped = ((angle % 360.0) + 360.0) % 360.0;
    // -0.0 prints as "-0"
    if wrapped == 0.0 {
        0.0
    } else {
        wrapped
    }
}

pub fn clamp_percent(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Converts HSL (degrees, percent, percent) to RGB channels in `[0, 1]`.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [f64; 3] {
    let hue = normalize_hue(hue);
    let l = clamp_percent(lightness) / 100.0;
    let a = clamp_percent(saturation) / 100.0 * l.min(1.0 - l);
    let channel = |n: f64| {
        let k = (n + hue / 30.0) % 12.0;
        l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0)
    };
    [channel(0.0), channel(8.0), channel(4.0)]
}

fn channel_to_u8(value: f64) -> u8 {
    (255.0 * value).round().clamp(0.0, 255.0) as u8
}

/// Parses the color strings sinks receive: `#rgb`, `#rrggbb`, `rgb()`,
/// `rgba()`, `hsl()` and `hsla()`. Returns sRGB channels in `[0, 1]`; alpha
/// is accepted but not returned.
pub fn parse_color_style(style: &str) -> Result<Vec3, ColorError> {
    let style = style.trim();
    if style.is_empty() {
        return Err(ColorError::Empty);
    }
    if let Some(hex) = style.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| ColorError::InvalidHex(style.to_string()));
    }

    let lower = style.to_ascii_lowercase();
    let (function, args) = lower
        .split_once('(')
        .and_then(|(name, rest)| rest.strip_suffix(')').map(|args| (name.trim(), args)))
        .ok_or_else(|| ColorError::Unsupported(style.to_string()))?;
    let components: Vec<&str> = args
        .split(|c: char| c == ',' || c == '/' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    if components.len() < 3 {
        return Err(ColorError::Unsupported(style.to_string()));
    }

    let number = |raw: &str| -> Result<f64, ColorError> {
        raw.trim_end_matches('%')
            .trim_end_matches("deg")
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| ColorError::InvalidComponent {
                style: style.to_string(),
                component: raw.to_string(),
            })
    };

    match function {
        "hsl" | "hsla" => {
            let [r, g, b] = hsl_to_rgb(
                number(components[0])?,
                number(components[1])?,
                number(components[2])?,
            );
            Ok(Vec3::new(r as f32, g as f32, b as f32))
        }
        "rgb" | "rgba" => {
            let mut rgb = [0.0f32; 3];
            for (slot, raw) in rgb.iter_mut().zip(&components) {
                let value = number(raw)?;
                let scaled = if raw.ends_with('%') {
                    value / 100.0
                } else {
                    value / 255.0
                };
                *slot = scaled.clamp(0.0, 1.0) as f32;
            }
            Ok(Vec3::from_array(rgb))
        }
        _ => Err(ColorError::Unsupported(style.to_string())),
    }
}

fn parse_hex(hex: &str) -> Option<Vec3> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digits: Vec<u8> = match hex.len() {
        3 => hex
            .chars()
            .map(|c| c.to_digit(16).map(|d| (d * 17) as u8))
            .collect::<Option<_>>()?,
        6 => (0..3)
            .map(|i| u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok())
            .collect::<Option<_>>()?,
        _ => return None,
    };
    Some(Vec3::new(
        digits[0] as f32 / 255.0,
        digits[1] as f32 / 255.0,
        digits[2] as f32 / 255.0,
    ))
}

/// Formats sRGB channels in `[0, 1]` as `#rrggbb`.
pub fn rgb_to_hex(color: Vec3) -> String {
    let [r, g, b] = color
        .to_array()
        .map(|c| channel_to_u8(f64::from(c)));
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(h: f64, s: f64, l: f64) -> String {
        Hsla::new(h, s, l, 1.0).to_hex_string()
    }

    #[test]
    fn primary_hues_convert_to_hex() {
        assert_eq!(hex(0.0, 100.0, 50.0), "#ff0000");
        assert_eq!(hex(120.0, 100.0, 50.0), "#00ff00");
        assert_eq!(hex(240.0, 100.0, 50.0), "#0000ff");
        assert_eq!(hex(0.0, 0.0, 50.0), "#808080");
    }

    #[test]
    fn default_page_color_has_expected_hex() {
        // hsl(200, 32%, 25%) -> rgb(43, 71, 84)
        assert_eq!(hex(200.0, 32.0, 25.0), "#2b4754");
    }

    #[test]
    fn hue_wraps_into_range() {
        assert_eq!(normalize_hue(360.0), 0.0);
        assert_eq!(normalize_hue(-90.0), 270.0);
        assert_eq!(normalize_hue(725.0), 5.0);
        assert_eq!(normalize_hue(-720.0), 0.0);
    }

    #[test]
    fn hsl_string_uses_shortest_numbers() {
        let color = Hsla::new(200.0, 32.0, 25.0, 1.0);
        assert_eq!(color.to_hsl_string(), "hsla(200, 32%, 25%, 1)");
        let faded = Hsla::new(10.5, 100.0, 50.0, 0.5);
        assert_eq!(faded.to_hsl_string(), "hsla(10.5, 100%, 50%, 0.5)");
    }

    #[test]
    fn parses_hex_styles() {
        assert_eq!(parse_color_style("#ff0000").unwrap(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(
            parse_color_style("#111").unwrap(),
            Vec3::splat(17.0 / 255.0)
        );
        assert!(matches!(
            parse_color_style("#12345"),
            Err(ColorError::InvalidHex(_))
        ));
    }

    #[test]
    fn parses_functional_styles() {
        let green = parse_color_style("hsla(120, 100%, 50%, 1)").unwrap();
        assert!((green - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-6);
        let blue = parse_color_style("rgb(0, 0, 255)").unwrap();
        assert_eq!(blue, Vec3::new(0.0, 0.0, 1.0));
        let half = parse_color_style("rgba(50%, 0%, 100%, 0.3)").unwrap();
        assert_eq!(half, Vec3::new(0.5, 0.0, 1.0));
    }

    #[test]
    fn rejects_unknown_styles() {
        assert_eq!(parse_color_style("  "), Err(ColorError::Empty));
        assert!(matches!(
            parse_color_style("papayawhip"),
            Err(ColorError::Unsupported(_))
        ));
        assert!(matches!(
            parse_color_style("hsl(a, 1%, 2%)"),
            Err(ColorError::InvalidComponent { .. })
        ));
    }

    #[test]
    fn rejects_non_finite_components() {
        let cases = [
            ("hsl(1e999, 50%, 50%)", "1e999"),
            ("hsl(inf, 50%, 50%)", "inf"),
            ("rgb(0, NaN, 0)", "nan"),
        ];
        for (style, bad) in cases {
            match parse_color_style(style) {
                Err(ColorError::InvalidComponent { component, .. }) => assert_eq!(component, bad),
                other => panic!("{style} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn hsl_and_hex_strings_describe_the_same_color() {
        let color = Hsla::new(37.0, 80.0, 60.0, 1.0);
        let from_hsl = parse_color_style(&color.to_hsl_string()).unwrap();
        assert_eq!(rgb_to_hex(from_hsl), color.to_hex_string());
    }
}
