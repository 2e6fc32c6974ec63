//! Map axes: a projected extent fitted into a pixel frame.

use grid_common::BoundingBox;
use projection::{MapProjection, PlanarBounds};

use crate::error::RenderResult;

/// Pixel rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px <= self.right() && py >= self.y && py <= self.bottom()
    }

    pub fn to_skia(&self) -> Option<tiny_skia::Rect> {
        tiny_skia::Rect::from_xywh(self.x, self.y, self.width, self.height)
    }
}

/// Geographic axes drawn under a map projection.
///
/// The extent's projected bounds are scaled uniformly to fit the available
/// area and centred in it, so the map keeps its aspect ratio.
#[derive(Debug, Clone)]
pub struct MapAxes {
    projection: MapProjection,
    extent: BoundingBox,
    bounds: PlanarBounds,
    frame: PixelRect,
    scale: f64,
}

impl MapAxes {
    pub fn new(
        projection: MapProjection,
        extent: BoundingBox,
        available: PixelRect,
    ) -> RenderResult<Self> {
        let bounds = projection.projected_bounds(&extent)?;

        let scale = (available.width as f64 / bounds.width())
            .min(available.height as f64 / bounds.height());
        let width = (bounds.width() * scale) as f32;
        let height = (bounds.height() * scale) as f32;
        let frame = PixelRect::new(
            available.x + (available.width - width) / 2.0,
            available.y + (available.height - height) / 2.0,
            width,
            height,
        );

        Ok(Self {
            projection,
            extent,
            bounds,
            frame,
            scale,
        })
    }

    pub fn projection(&self) -> &MapProjection {
        &self.projection
    }

    pub fn extent(&self) -> &BoundingBox {
        &self.extent
    }

    /// Pixel area the map occupies.
    pub fn frame(&self) -> PixelRect {
        self.frame
    }

    /// Pixel position of a geographic point (may fall outside the frame).
    pub fn to_pixel(&self, lat: f64, lon: f64) -> Option<(f32, f32)> {
        let (x, y) = self.projection.forward(lat, lon)?;
        let px = self.frame.x as f64 + (x - self.bounds.min_x) * self.scale;
        let py = self.frame.y as f64 + (self.bounds.max_y - y) * self.scale;
        Some((px as f32, py as f32))
    }

    /// Geographic point under a pixel position.
    pub fn from_pixel(&self, px: f32, py: f32) -> Option<(f64, f64)> {
        let x = self.bounds.min_x + (px - self.frame.x) as f64 / self.scale;
        let y = self.bounds.max_y - (py - self.frame.y) as f64 / self.scale;
        self.projection.inverse(x, y)
    }
}
