//! Owned map figure: projection, extent, filled contours, boundaries,
//! colorbar, title and point markers.
//!
//! Every drawing call takes the figure by value and returns it, so a figure is
//! assembled as a chain and rasterised once by [`Figure::render`]. Layers are
//! drawn in a fixed order: fill, boundaries, markers, frame, colorbar, text.

use grid_common::{BoundingBox, LatLonMesh, NdArray};
use image::RgbaImage;
use projection::MapProjection;
use rayon::prelude::*;
use rusttype::Font;
use tiny_skia::{
    FillRule, Mask, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Rect, Stroke, Transform,
};
use tracing::{debug, warn};

use crate::axes::{MapAxes, PixelRect};
use crate::boundaries::{BoundaryLayer, BoundaryResolution};
use crate::colormap::{Color, Colormap};
use crate::contour::{filled_levels, ContourSet, GridSampler};
use crate::error::{RenderError, RenderResult};
use crate::png;
use crate::text::{self, Anchor, TextStyle};

/// Height of the band above the map reserved for the title.
pub const TITLE_BAND: f32 = 50.0;
/// Width of the band right of the map reserved for the colorbar.
pub const COLORBAR_BAND: f32 = 90.0;
/// Outer margin on the remaining sides.
pub const MARGIN: f32 = 20.0;

const MIN_CANVAS: (u32, u32) = (200, 150);
const COLORBAR_WIDTH: f32 = 18.0;
const COLORBAR_GAP: f32 = 16.0;
const MAX_TICK_LABELS: usize = 10;
const TITLE_SIZE: f32 = 18.0;
const LABEL_SIZE: f32 = 12.0;
const MARKER_RADIUS: f32 = 1.5;
const BOUNDARY_COLOR: Color = Color::rgb(40, 40, 40);
const TEXT_COLOR: Color = Color::BLACK;

/// Contoured data retained until the figure is rasterised.
#[derive(Debug, Clone)]
struct FilledContours {
    mesh: LatLonMesh,
    values: NdArray,
    contours: ContourSet,
}

#[derive(Debug, Clone)]
pub struct Figure {
    width: u32,
    height: u32,
    axes: MapAxes,
    fill: Option<FilledContours>,
    boundaries: Option<BoundaryLayer>,
    colorbar: Option<String>,
    title: Option<String>,
    markers: Vec<(f64, f64)>,
    font: Option<Font<'static>>,
}

impl Figure {
    /// Empty figure showing `extent` under `projection`.
    pub fn new(
        width: u32,
        height: u32,
        projection: MapProjection,
        extent: BoundingBox,
    ) -> RenderResult<Self> {
        if width < MIN_CANVAS.0 || height < MIN_CANVAS.1 {
            return Err(RenderError::InvalidCanvas { width, height });
        }
        extent
            .validate()
            .map_err(|e| RenderError::InvalidCoordinates(e.to_string()))?;

        let available = PixelRect::new(
            MARGIN,
            TITLE_BAND,
            width as f32 - 2.0 * MARGIN - COLORBAR_BAND,
            height as f32 - TITLE_BAND - MARGIN,
        );
        let axes = MapAxes::new(projection, extent, available)?;

        Ok(Self {
            width,
            height,
            axes,
            fill: None,
            boundaries: None,
            colorbar: None,
            title: None,
            markers: Vec::new(),
            font: None,
        })
    }

    /// Font used for the title and colorbar; without one text is skipped.
    pub fn with_font(mut self, font: Option<Font<'static>>) -> Self {
        self.font = font;
        self
    }

    pub fn axes(&self) -> &MapAxes {
        &self.axes
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Contour set of the filled layer, if one was added.
    pub fn contours(&self) -> Option<&ContourSet> {
        self.fill.as_ref().map(|f| &f.contours)
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Filled contours of `values` over `mesh` with up to `levels` bands.
    ///
    /// The grids must share one 2-D shape; anything else is rejected rather
    /// than truncated.
    pub fn contourf(
        mut self,
        mesh: &LatLonMesh,
        values: &NdArray,
        levels: usize,
        colormap: Colormap,
    ) -> RenderResult<Self> {
        let sampler = GridSampler::new(mesh, values)?;
        let (min, max) = values
            .min_max()
            .ok_or_else(|| RenderError::NoData(format!("{:?} value grid", values.shape())))?;

        let contours = ContourSet::new(filled_levels(min, max, levels)?, colormap)?;
        if !sampler.has_area() {
            warn!(
                shape = ?sampler.shape(),
                "Grid has fewer than 2x2 points; fill skipped, markers still drawn"
            );
        }
        debug!(
            bands = contours.band_count(),
            min,
            max,
            colormap = %colormap,
            "Filled contour levels"
        );

        self.fill = Some(FilledContours {
            mesh: mesh.clone(),
            values: values.clone(),
            contours,
        });
        Ok(self)
    }

    /// Boundary lines, simplified for `resolution`.
    pub fn add_boundaries(mut self, layer: &BoundaryLayer, resolution: BoundaryResolution) -> Self {
        let decimated = layer.decimated(resolution);
        debug!(
            resolution = %resolution,
            vertices = decimated.vertex_count(),
            original = layer.vertex_count(),
            "Boundary overlay"
        );
        self.boundaries = Some(decimated);
        self
    }

    /// Colorbar for the filled layer, labelled with `label` (usually units).
    pub fn colorbar(mut self, label: impl Into<String>) -> Self {
        self.colorbar = Some(label.into());
        self
    }

    pub fn set_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// A marker at every point of `mesh`.
    pub fn scatter(mut self, mesh: &LatLonMesh) -> Self {
        self.markers.extend(mesh.points());
        self
    }

    /// Rasterise every layer.
    pub fn render(&self) -> RenderResult<RgbaImage> {
        let mut pixmap = Pixmap::new(self.width, self.height).ok_or(RenderError::InvalidCanvas {
            width: self.width,
            height: self.height,
        })?;
        pixmap.fill(tiny_skia::Color::WHITE);

        let clip = self.frame_mask()?;

        if let Some(fill) = &self.fill {
            self.draw_fill(&mut pixmap, fill)?;
        }
        if let Some(boundaries) = &self.boundaries {
            self.draw_boundaries(&mut pixmap, boundaries, &clip);
        }
        self.draw_markers(&mut pixmap, &clip);
        self.draw_frame(&mut pixmap);

        let colorbar = match (&self.colorbar, &self.fill) {
            (Some(_), Some(fill)) => Some(self.draw_colorbar(&mut pixmap, &fill.contours)),
            (Some(_), None) => {
                warn!("Colorbar requested without filled contours; skipped");
                None
            }
            _ => None,
        };

        let mut image = to_image(&pixmap)?;
        self.draw_text(&mut image, colorbar.as_ref());
        Ok(image)
    }

    /// Rasterise and encode as PNG, with the title as a text chunk.
    pub fn to_png(&self) -> RenderResult<Vec<u8>> {
        let image = self.render()?;
        let mut meta = vec![("Software", "forecast-map")];
        if let Some(title) = &self.title {
            meta.push(("Title", title.as_str()));
        }
        png::encode_rgba_with_text(image.as_raw(), self.width, self.height, &meta)
    }

    fn frame_mask(&self) -> RenderResult<Mask> {
        let mut mask = Mask::new(self.width, self.height).ok_or(RenderError::InvalidCanvas {
            width: self.width,
            height: self.height,
        })?;
        if let Some(rect) = self.axes.frame().to_skia() {
            let path = PathBuilder::from_rect(rect);
            mask.fill_path(&path, FillRule::Winding, false, Transform::identity());
        }
        Ok(mask)
    }

    /// Colour every frame pixel by the band of the value interpolated under it.
    fn draw_fill(&self, pixmap: &mut Pixmap, fill: &FilledContours) -> RenderResult<()> {
        let sampler = GridSampler::new(&fill.mesh, &fill.values)?;
        if !sampler.has_area() {
            return Ok(());
        }

        let frame = self.axes.frame();
        let x0 = frame.x.floor().max(0.0) as u32;
        let x1 = (frame.right().ceil() as u32).min(self.width);
        let y0 = frame.y.floor().max(0.0) as u32;
        let y1 = (frame.bottom().ceil() as u32).min(self.height);
        if x0 >= x1 || y0 >= y1 {
            return Ok(());
        }

        let axes = &self.axes;
        let rows: Vec<Vec<Option<Color>>> = (y0..y1)
            .into_par_iter()
            .map(|py| {
                (x0..x1)
                    .map(|px| {
                        let (lat, lon) = axes.from_pixel(px as f32 + 0.5, py as f32 + 0.5)?;
                        let value = sampler.sample(lat, lon)?;
                        fill.contours.color_for(value)
                    })
                    .collect()
            })
            .collect();

        let width = self.width as usize;
        let pixels = pixmap.pixels_mut();
        for (row, py) in rows.into_iter().zip(y0..y1) {
            for (color, px) in row.into_iter().zip(x0..x1) {
                if let Some(color) = color {
                    pixels[py as usize * width + px as usize] = premultiplied(color);
                }
            }
        }
        Ok(())
    }

    fn draw_boundaries(&self, pixmap: &mut Pixmap, layer: &BoundaryLayer, clip: &Mask) {
        let mut pb = PathBuilder::new();
        for line in &layer.lines {
            let mut pen_down = false;
            for &(lon, lat) in line {
                match self.axes.to_pixel(lat, lon) {
                    Some((x, y)) if pen_down => pb.line_to(x, y),
                    Some((x, y)) => {
                        pb.move_to(x, y);
                        pen_down = true;
                    }
                    None => pen_down = false,
                }
            }
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(BOUNDARY_COLOR.to_skia());
        paint.anti_alias = true;
        let stroke = Stroke {
            width: 0.8,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), Some(clip));
    }

    fn draw_markers(&self, pixmap: &mut Pixmap, clip: &Mask) {
        let mut pb = PathBuilder::new();
        for &(lat, lon) in &self.markers {
            if let Some((x, y)) = self.axes.to_pixel(lat, lon) {
                pb.push_circle(x, y, MARKER_RADIUS);
            }
        }
        let Some(path) = pb.finish() else {
            return;
        };

        let mut paint = Paint::default();
        paint.set_color(Color::BLACK.to_skia());
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), Some(clip));
    }

    fn draw_frame(&self, pixmap: &mut Pixmap) {
        if let Some(rect) = self.axes.frame().to_skia() {
            let path = PathBuilder::from_rect(rect);
            let mut paint = Paint::default();
            paint.set_color(Color::BLACK.to_skia());
            let stroke = Stroke {
                width: 1.0,
                ..Stroke::default()
            };
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }
    }

    /// Draw the bar and tick marks; returns the labels to place once text
    /// can be drawn.
    fn draw_colorbar(&self, pixmap: &mut Pixmap, contours: &ContourSet) -> ColorbarLayout {
        let frame = self.axes.frame();
        let bar = PixelRect::new(
            frame.right() + COLORBAR_GAP,
            frame.y,
            COLORBAR_WIDTH,
            frame.height,
        );

        let lo = contours.levels[0];
        let hi = contours.levels[contours.levels.len() - 1];
        let level_y = |level: f64| -> f32 {
            let t = ((level - lo) / (hi - lo)).clamp(0.0, 1.0) as f32;
            bar.bottom() - t * bar.height
        };

        let mut paint = Paint::default();
        for (i, color) in contours.colors.iter().enumerate() {
            let top = level_y(contours.levels[i + 1]);
            let bottom = level_y(contours.levels[i]);
            if let Some(rect) = Rect::from_ltrb(bar.x, top, bar.right(), bottom) {
                paint.set_color(color.to_skia());
                pixmap.fill_rect(rect, &paint, Transform::identity(), None);
            }
        }

        paint.set_color(Color::BLACK.to_skia());
        let stroke = Stroke {
            width: 1.0,
            ..Stroke::default()
        };
        if let Some(rect) = bar.to_skia() {
            let outline = PathBuilder::from_rect(rect);
            pixmap.stroke_path(&outline, &paint, &stroke, Transform::identity(), None);
        }

        let stride = contours.levels.len().div_ceil(MAX_TICK_LABELS).max(1);
        let step = (contours.levels[1] - contours.levels[0]) * stride as f64;
        let mut ticks = Vec::new();
        let mut pb = PathBuilder::new();
        for level in contours.levels.iter().step_by(stride) {
            let y = level_y(*level);
            pb.move_to(bar.right(), y);
            pb.line_to(bar.right() + 4.0, y);
            ticks.push((y, text::format_value(*level, step)));
        }
        if let Some(path) = pb.finish() {
            pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
        }

        ColorbarLayout { bar, ticks }
    }

    fn draw_text(&self, image: &mut RgbaImage, colorbar: Option<&ColorbarLayout>) {
        let wants_text = self.title.is_some() || colorbar.is_some();
        let Some(font) = &self.font else {
            if wants_text {
                warn!("No font configured; title and colorbar labels skipped");
            }
            return;
        };

        if let Some(title) = &self.title {
            // Shrink long titles until they fit the canvas.
            let max_width = self.width as i32 - 2 * MARGIN as i32;
            let mut size = TITLE_SIZE;
            while size > 8.0 && text::measure(font, size, title).0 > max_width {
                size -= 1.0;
            }
            let y = ((TITLE_BAND - size) / 2.0).max(0.0) as i32;
            let centre = (self.axes.frame().x + self.axes.frame().width / 2.0) as i32;
            text::draw_label(
                image,
                font,
                TextStyle::new(size, TEXT_COLOR.to_rgba()),
                (centre, y),
                Anchor::Center,
                title,
            );
        }

        if let Some(layout) = colorbar {
            let style = TextStyle::new(LABEL_SIZE, TEXT_COLOR.to_rgba());
            let x = (layout.bar.right() + 6.0) as i32;
            for (y, label) in &layout.ticks {
                let top = (*y - LABEL_SIZE / 2.0) as i32;
                text::draw_label(image, font, style, (x, top), Anchor::Left, label);
            }
            if let Some(label) = &self.colorbar {
                let centre = (layout.bar.x + layout.bar.width / 2.0) as i32;
                let top = (layout.bar.y - LABEL_SIZE - 6.0) as i32;
                text::draw_label(image, font, style, (centre, top), Anchor::Center, label);
            }
        }
    }
}

struct ColorbarLayout {
    bar: PixelRect,
    ticks: Vec<(f32, String)>,
}

fn premultiplied(color: Color) -> PremultipliedColorU8 {
    color.to_skia().premultiply().to_color_u8()
}

/// Copy a pixmap into an RGBA image, undoing premultiplied alpha.
fn to_image(pixmap: &Pixmap) -> RenderResult<RgbaImage> {
    let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data).ok_or(RenderError::InvalidCanvas {
        width: pixmap.width(),
        height: pixmap.height(),
    })
}
