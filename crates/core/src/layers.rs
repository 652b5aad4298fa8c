//! Layer compositor
//!
//! Three surfaces stacked bottom to top:
//! - base: the page raster (content-level flipped)
//! - marks: finalized segments, retained between pointer events
//! - preview: the live segment, fully repainted on every pointer move
//!
//! All three always have identical dimensions and draw in surface space, so
//! one [`ViewTransform`] positions the whole stack.

use crate::coords::{BasePoint, SurfacePoint};
use crate::error::{MeasureError, MeasureResult};
use crate::measurement::Measurement;
use crate::settings::StrokeStyle;
use crate::transform::{FlipAxis, ViewTransform};
use image::{imageops, Rgba, RgbaImage};
use tiny_skia::{ColorU8, LineCap, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};
use tracing::debug;

/// Identifies one surface of the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Base,
    Marks,
    Preview,
}

pub struct LayerStack {
    base: RgbaImage,
    marks: Pixmap,
    preview: Pixmap,
    mark_stroke: StrokeStyle,
    preview_stroke: StrokeStyle,
}

impl std::fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStack").field("dimensions", &self.dimensions()).finish()
    }
}

impl LayerStack {
    /// Blank stack of `width` x `height`
    pub fn new(
        width: u32,
        height: u32,
        mark_stroke: StrokeStyle,
        preview_stroke: StrokeStyle,
    ) -> MeasureResult<Self> {
        Ok(Self {
            base: RgbaImage::new(width, height),
            marks: allocate(width, height)?,
            preview: allocate(width, height)?,
            mark_stroke,
            preview_stroke,
        })
    }

    pub fn width(&self) -> u32 {
        self.base.width()
    }

    pub fn height(&self) -> u32 {
        self.base.height()
    }

    /// Dimensions of base, marks and preview, in that order
    pub fn dimensions(&self) -> [(u32, u32); 3] {
        [
            self.base.dimensions(),
            (self.marks.width(), self.marks.height()),
            (self.preview.width(), self.preview.height()),
        ]
    }

    pub fn base(&self) -> &RgbaImage {
        &self.base
    }

    pub fn marks(&self) -> &Pixmap {
        &self.marks
    }

    pub fn preview(&self) -> &Pixmap {
        &self.preview
    }

    pub fn is_blank(&self, kind: LayerKind) -> bool {
        match kind {
            LayerKind::Base => self.base.pixels().all(|p| p.0[3] == 0),
            LayerKind::Marks => self.marks.pixels().iter().all(|p| p.alpha() == 0),
            LayerKind::Preview => self.preview.pixels().iter().all(|p| p.alpha() == 0),
        }
    }

    /// Replace all three surfaces with blank ones of the new size
    ///
    /// Surfaces are allocated before any is swapped in, so a failure leaves
    /// the stack exactly as it was.
    pub fn resize_all(&mut self, width: u32, height: u32) -> MeasureResult<()> {
        let marks = allocate(width, height)?;
        let preview = allocate(width, height)?;
        self.base = RgbaImage::new(width, height);
        self.marks = marks;
        self.preview = preview;
        debug!(width, height, "layers resized");
        Ok(())
    }

    /// Install `raster` as the base layer, resizing the overlays to match
    pub fn install_base(&mut self, raster: RgbaImage) -> MeasureResult<()> {
        let (width, height) = raster.dimensions();
        let marks = allocate(width, height)?;
        let preview = allocate(width, height)?;
        self.base = raster;
        self.marks = marks;
        self.preview = preview;
        debug!(width, height, "base raster installed");
        Ok(())
    }

    /// Mirror the base raster content in place
    pub fn flip_base(&mut self, axis: FlipAxis) {
        mirror_raster(&mut self.base, axis);
    }

    /// Repaint every finalized segment from its base-space geometry
    pub fn redraw_persistent(&mut self, marks: &[Measurement], transform: &ViewTransform) {
        self.marks.fill(tiny_skia::Color::TRANSPARENT);
        for mark in marks {
            stroke_segment(
                &mut self.marks,
                transform.to_surface(mark.start()),
                transform.to_surface(mark.end()),
                &self.mark_stroke,
            );
        }
    }

    pub fn clear_persistent(&mut self) {
        self.marks.fill(tiny_skia::Color::TRANSPARENT);
    }

    /// Repaint the preview layer with a single segment
    pub fn redraw_preview(&mut self, from: BasePoint, to: BasePoint, transform: &ViewTransform) {
        self.preview.fill(tiny_skia::Color::TRANSPARENT);
        stroke_segment(
            &mut self.preview,
            transform.to_surface(from),
            transform.to_surface(to),
            &self.preview_stroke,
        );
    }

    pub fn clear_preview(&mut self) {
        self.preview.fill(tiny_skia::Color::TRANSPARENT);
    }

    /// Composite base and marks into a new image; the preview is excluded
    pub fn flatten(&self) -> MeasureResult<RgbaImage> {
        let (width, height) = self.base.dimensions();
        let mut canvas = allocate(width, height)?;

        for (dst, src) in canvas.pixels_mut().iter_mut().zip(self.base.pixels()) {
            let [r, g, b, a] = src.0;
            *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
        }

        canvas.draw_pixmap(
            0,
            0,
            self.marks.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );

        let mut output = RgbaImage::new(width, height);
        for (dst, src) in output.pixels_mut().zip(canvas.pixels()) {
            let color = src.demultiply();
            *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        }

        Ok(output)
    }
}

/// Mirror a raster in place about its own center line
pub fn mirror_raster(raster: &mut RgbaImage, axis: FlipAxis) {
    match axis {
        FlipAxis::Horizontal => imageops::flip_horizontal_in_place(raster),
        FlipAxis::Vertical => imageops::flip_vertical_in_place(raster),
    }
}

fn allocate(width: u32, height: u32) -> MeasureResult<Pixmap> {
    Pixmap::new(width, height).ok_or(MeasureError::LayerAllocation { width, height })
}

fn stroke_segment(pixmap: &mut Pixmap, from: SurfacePoint, to: SurfacePoint, style: &StrokeStyle) {
    let mut pb = PathBuilder::new();
    pb.move_to(from.x as f32, from.y as f32);
    pb.line_to(to.x as f32, to.y as f32);
    let Some(path) = pb.finish() else {
        return;
    };

    let [r, g, b, a] = style.color;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    let stroke = Stroke { width: style.width, line_cap: LineCap::Round, ..Default::default() };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}
