//! Named colormaps for filled contours and colorbars.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RenderError;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Linear color interpolation
pub fn interpolate_color(color1: Color, color2: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;
    let mix = |a: u8, b: u8| (a as f64 * t_inv + b as f64 * t).round() as u8;

    Color::new(
        mix(color1.r, color2.r),
        mix(color1.g, color2.g),
        mix(color1.b, color2.b),
        mix(color1.a, color2.a),
    )
}

/// A colormap as a list of `(position, color)` stops over `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Colormap {
    /// Diverging blue-white-red
    #[default]
    Coolwarm,
    Viridis,
    Plasma,
    /// Purple-blue-cyan-green-yellow-red surface temperature ramp
    Temperature,
    Greys,
}

const COOLWARM: &[(f64, Color)] = &[
    (0.0, Color::rgb(59, 76, 192)),
    (0.25, Color::rgb(144, 178, 254)),
    (0.5, Color::rgb(221, 221, 221)),
    (0.75, Color::rgb(245, 156, 125)),
    (1.0, Color::rgb(180, 4, 38)),
];

const VIRIDIS: &[(f64, Color)] = &[
    (0.0, Color::rgb(68, 1, 84)),
    (0.25, Color::rgb(59, 82, 139)),
    (0.5, Color::rgb(33, 145, 140)),
    (0.75, Color::rgb(94, 201, 98)),
    (1.0, Color::rgb(253, 231, 37)),
];

const PLASMA: &[(f64, Color)] = &[
    (0.0, Color::rgb(13, 8, 135)),
    (0.25, Color::rgb(126, 3, 168)),
    (0.5, Color::rgb(204, 71, 120)),
    (0.75, Color::rgb(248, 149, 64)),
    (1.0, Color::rgb(240, 249, 33)),
];

// Stops at -50, -30, 0, 10, 20, 30, 40 and 50 °C over a -50..50 °C range
const TEMPERATURE: &[(f64, Color)] = &[
    (0.0, Color::rgb(25, 0, 76)),
    (0.2, Color::rgb(0, 0, 255)),
    (0.5, Color::rgb(0, 255, 255)),
    (0.6, Color::rgb(0, 255, 0)),
    (0.7, Color::rgb(255, 255, 0)),
    (0.8, Color::rgb(255, 165, 0)),
    (0.9, Color::rgb(255, 0, 0)),
    (1.0, Color::rgb(139, 0, 0)),
];

const GREYS: &[(f64, Color)] = &[(0.0, Color::rgb(255, 255, 255)), (1.0, Color::rgb(0, 0, 0))];

impl Colormap {
    pub const ALL: [Colormap; 5] = [
        Colormap::Coolwarm,
        Colormap::Viridis,
        Colormap::Plasma,
        Colormap::Temperature,
        Colormap::Greys,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Coolwarm => "coolwarm",
            Self::Viridis => "viridis",
            Self::Plasma => "plasma",
            Self::Temperature => "temperature",
            Self::Greys => "greys",
        }
    }

    fn stops(&self) -> &'static [(f64, Color)] {
        match self {
            Self::Coolwarm => COOLWARM,
            Self::Viridis => VIRIDIS,
            Self::Plasma => PLASMA,
            Self::Temperature => TEMPERATURE,
            Self::Greys => GREYS,
        }
    }

    /// Color at normalized position `t` (clamped to `[0, 1]`).
    pub fn sample(&self, t: f64) -> Color {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        for pair in stops.windows(2) {
            let (p0, c0) = pair[0];
            let (p1, c1) = pair[1];
            if t <= p1 {
                let span = p1 - p0;
                let local = if span > 0.0 { (t - p0) / span } else { 0.0 };
                return interpolate_color(c0, c1, local);
            }
        }
        stops[stops.len() - 1].1
    }

    /// `n` evenly spaced colors from the low end to the high end.
    pub fn discrete(&self, n: usize) -> Vec<Color> {
        match n {
            0 => Vec::new(),
            1 => vec![self.sample(0.5)],
            _ => (0..n)
                .map(|i| self.sample(i as f64 / (n - 1) as f64))
                .collect(),
        }
    }
}

impl FromStr for Colormap {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coolwarm" => Ok(Self::Coolwarm),
            "viridis" => Ok(Self::Viridis),
            "plasma" => Ok(Self::Plasma),
            "temperature" | "temp" => Ok(Self::Temperature),
            "greys" | "grays" | "gray" | "grey" => Ok(Self::Greys),
            _ => Err(RenderError::UnknownColormap(s.to_string())),
        }
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolate_midpoint() {
        let mid = interpolate_color(Color::rgb(0, 0, 0), Color::rgb(255, 255, 255), 0.5);
        assert_eq!(mid, Color::rgb(128, 128, 128));
    }

    #[test]
    fn test_sample_clamps() {
        assert_eq!(Colormap::Viridis.sample(-1.0), Colormap::Viridis.sample(0.0));
        assert_eq!(Colormap::Viridis.sample(2.0), Colormap::Viridis.sample(1.0));
        assert_eq!(Colormap::Viridis.sample(f64::NAN), Colormap::Viridis.sample(0.0));
    }

    #[test]
    fn test_discrete_count() {
        assert_eq!(Colormap::Coolwarm.discrete(20).len(), 20);
        assert!(Colormap::Coolwarm.discrete(0).is_empty());
    }

    #[test]
    fn test_parse_names() {
        for cmap in Colormap::ALL {
            assert_eq!(cmap.name().parse::<Colormap>().unwrap(), cmap);
        }
        assert!("jet".parse::<Colormap>().is_err());
    }
}
