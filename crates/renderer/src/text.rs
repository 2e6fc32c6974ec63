//! Text drawing for titles and colorbar labels.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};

use crate::error::{RenderError, RenderResult};

/// Fonts tried when no font path is configured.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
];

/// Load a TrueType font from disk.
pub fn load_font(path: &Path) -> RenderResult<Font<'static>> {
    let data = std::fs::read(path).map_err(|e| RenderError::Font {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Font::try_from_vec(data).ok_or_else(|| RenderError::Font {
        path: path.display().to_string(),
        message: "not a valid TrueType font".to_string(),
    })
}

/// Resolve the font for a figure: the configured path if given, otherwise
/// the first system font found. Returns `None` when nothing loads, in which
/// case text is skipped.
pub fn resolve_font(configured: Option<&Path>) -> Option<Font<'static>> {
    if let Some(path) = configured {
        match load_font(path) {
            Ok(font) => return Some(font),
            Err(e) => tracing::warn!(error = %e, "Configured font unavailable, trying system fonts"),
        }
    }

    let found = SYSTEM_FONT_PATHS
        .iter()
        .map(PathBuf::from)
        .filter(|p| p.exists())
        .find_map(|p| load_font(&p).ok());

    if found.is_none() {
        tracing::warn!("No usable font found; title and labels will not be drawn");
    }
    found
}

/// Horizontal anchor for a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Center,
    Right,
}

/// Pixel size of `text` at `size`.
pub fn measure(font: &Font<'_>, size: f32, text: &str) -> (i32, i32) {
    text_size(Scale::uniform(size), font, text)
}

/// Font size and fill for a run of text.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub size: f32,
    pub color: Rgba<u8>,
}

impl TextStyle {
    pub fn new(size: f32, color: Rgba<u8>) -> Self {
        Self { size, color }
    }
}

/// Draw `text` with its top edge at `y` and the given horizontal anchor at `x`.
pub fn draw_label(
    img: &mut RgbaImage,
    font: &Font<'_>,
    style: TextStyle,
    (x, y): (i32, i32),
    anchor: Anchor,
    text: &str,
) {
    let (w, _) = measure(font, style.size, text);
    let left = match anchor {
        Anchor::Left => x,
        Anchor::Center => x - w / 2,
        Anchor::Right => x - w,
    };
    draw_text_mut(img, style.color, left, y, Scale::uniform(style.size), font, text);
}

/// Format a tick value, dropping the fraction when the step is whole.
pub fn format_value(value: f64, step: f64) -> String {
    let whole = (step - step.round()).abs() < 1e-9;
    if whole {
        format!("{:.0}", value.round())
    } else if (step * 10.0 - (step * 10.0).round()).abs() < 1e-9 {
        format!("{:.1}", (value * 10.0).round() / 10.0)
    } else {
        format!("{:.2}", (value * 100.0).round() / 100.0)
    }
}
