//! View transform model
//!
//! Maps between view space (pointer coordinates) and base space (the page
//! raster at scale 1). The forward mapping is flip, then scale, then pan:
//!
//! ```text
//! surface = scale * mirror(base)
//! view    = surface + pan
//! ```
//!
//! where `mirror` reflects about the raster edge on each flipped axis. The
//! inverse undoes pan, scale and mirror in that order. Flip is applied to the
//! raster content itself by the layer compositor; the flags here keep the
//! coordinate mapping consistent with that content.

use crate::coords::{BaseExtent, BasePoint, SurfacePoint, ViewPoint};
use crate::error::{MeasureError, MeasureResult};
use crate::render::raster_size;
use serde::{Deserialize, Serialize};

/// Mirror axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlipAxis {
    /// Mirror left/right
    Horizontal,
    /// Mirror top/bottom
    Vertical,
}

/// Translation of the layer stack, in view pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PanOffset {
    pub dx: f64,
    pub dy: f64,
}

impl PanOffset {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

/// Current view transform of the page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    scale: f64,
    pan: PanOffset,
    flip_horizontal: bool,
    flip_vertical: bool,
    extent: BaseExtent,
}

impl ViewTransform {
    /// Create a transform for a page of the given base extent
    pub fn new(extent: BaseExtent, scale: f64) -> MeasureResult<Self> {
        validate_scale(scale)?;
        Ok(Self { scale, pan: PanOffset::default(), flip_horizontal: false, flip_vertical: false, extent })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pan(&self) -> PanOffset {
        self.pan
    }

    pub fn extent(&self) -> BaseExtent {
        self.extent
    }

    pub fn is_flipped(&self, axis: FlipAxis) -> bool {
        match axis {
            FlipAxis::Horizontal => self.flip_horizontal,
            FlipAxis::Vertical => self.flip_vertical,
        }
    }

    /// Flipped axes, horizontal first
    pub fn flipped_axes(&self) -> Vec<FlipAxis> {
        let mut axes = Vec::with_capacity(2);
        if self.flip_horizontal {
            axes.push(FlipAxis::Horizontal);
        }
        if self.flip_vertical {
            axes.push(FlipAxis::Vertical);
        }
        axes
    }

    /// Set an absolute scale
    pub fn set_scale(&mut self, scale: f64) -> MeasureResult<()> {
        validate_scale(scale)?;
        self.scale = scale;
        Ok(())
    }

    /// Multiply the current scale by `factor`, returning the new scale
    pub fn apply_zoom(&mut self, factor: f64) -> MeasureResult<f64> {
        let scale = self.scale * factor;
        validate_scale(scale)?;
        self.scale = scale;
        Ok(scale)
    }

    /// Scale that results from zooming by `factor`, without applying it
    pub fn zoomed_scale(&self, factor: f64) -> MeasureResult<f64> {
        let scale = self.scale * factor;
        validate_scale(scale)?;
        Ok(scale)
    }

    pub fn set_pan(&mut self, pan: PanOffset) -> MeasureResult<()> {
        validate_pan(pan.dx, pan.dy)?;
        self.pan = pan;
        Ok(())
    }

    /// Shift the pan; the pan is left unchanged if the result is not finite
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> MeasureResult<()> {
        let pan = PanOffset::new(self.pan.dx + dx, self.pan.dy + dy);
        validate_pan(pan.dx, pan.dy)?;
        self.pan = pan;
        Ok(())
    }

    /// Toggle the flip flag for `axis`
    pub fn apply_flip(&mut self, axis: FlipAxis) {
        match axis {
            FlipAxis::Horizontal => self.flip_horizontal = !self.flip_horizontal,
            FlipAxis::Vertical => self.flip_vertical = !self.flip_vertical,
        }
    }

    /// Restore `scale` and clear the pan; flip flags are left alone
    pub fn reset(&mut self, scale: f64) -> MeasureResult<()> {
        validate_scale(scale)?;
        self.scale = scale;
        self.pan = PanOffset::default();
        Ok(())
    }

    pub fn to_surface(&self, point: BasePoint) -> SurfacePoint {
        let (x, y) = self.mirror(point.x, point.y);
        SurfacePoint::new(x * self.scale, y * self.scale)
    }

    pub fn surface_to_base(&self, point: SurfacePoint) -> BasePoint {
        let (x, y) = self.mirror(point.x / self.scale, point.y / self.scale);
        BasePoint::new(x, y)
    }

    pub fn to_view(&self, point: BasePoint) -> ViewPoint {
        let surface = self.to_surface(point);
        ViewPoint::new(surface.x + self.pan.dx, surface.y + self.pan.dy)
    }

    pub fn to_base(&self, point: ViewPoint) -> BasePoint {
        let surface = SurfacePoint::new(point.x - self.pan.dx, point.y - self.pan.dy);
        self.surface_to_base(surface)
    }

    // Reflection about the raster edge, which is the page extent rounded to
    // whole surface pixels. Its own inverse, so both directions share it.
    fn mirror(&self, x: f64, y: f64) -> (f64, f64) {
        let (width, height) = raster_size(self.extent, self.scale);
        let x = if self.flip_horizontal { f64::from(width) / self.scale - x } else { x };
        let y = if self.flip_vertical { f64::from(height) / self.scale - y } else { y };
        (x, y)
    }
}

/// Scale that fits the page width to the container width
pub fn fit_scale(container_width: f64, extent: BaseExtent) -> MeasureResult<f64> {
    let scale = container_width / extent.width;
    validate_scale(scale)?;
    Ok(scale)
}

fn validate_pan(dx: f64, dy: f64) -> MeasureResult<()> {
    if dx.is_finite() && dy.is_finite() {
        Ok(())
    } else {
        Err(MeasureError::InvalidPan { dx, dy })
    }
}

pub(crate) fn validate_scale(scale: f64) -> MeasureResult<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(MeasureError::InvalidScale(scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_view_close(a: ViewPoint, b: ViewPoint) {
        assert!((a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS, "{a:?} != {b:?}");
    }

    fn page() -> BaseExtent {
        BaseExtent::new(612.0, 792.0)
    }

    #[test]
    fn identity_transform_maps_points_unchanged() {
        let transform = ViewTransform::new(page(), 1.0).unwrap();
        let base = transform.to_base(ViewPoint::new(12.5, 40.0));
        assert_eq!(base, BasePoint::new(12.5, 40.0));
    }

    #[test]
    fn round_trip_over_scales_pans_and_flips() {
        let points = [
            ViewPoint::new(0.0, 0.0),
            ViewPoint::new(123.4, 567.8),
            ViewPoint::new(-40.0, 1200.5),
            ViewPoint::new(999.9, -3.25),
        ];
        let scales = [0.25, 1.0, 1.5, 3.75];
        let pans = [PanOffset::new(0.0, 0.0), PanOffset::new(-80.0, 35.5), PanOffset::new(12.0, -7.0)];
        let flips = [(false, false), (true, false), (false, true), (true, true)];

        for scale in scales {
            for pan in pans {
                for (h, v) in flips {
                    let mut transform = ViewTransform::new(page(), scale).unwrap();
                    transform.set_pan(pan).unwrap();
                    if h {
                        transform.apply_flip(FlipAxis::Horizontal);
                    }
                    if v {
                        transform.apply_flip(FlipAxis::Vertical);
                    }
                    for p in points {
                        assert_view_close(transform.to_view(transform.to_base(p)), p);
                    }
                }
            }
        }
    }

    #[test]
    fn to_base_undoes_pan_then_scale() {
        let mut transform = ViewTransform::new(page(), 2.0).unwrap();
        transform.set_pan(PanOffset::new(10.0, 20.0)).unwrap();
        assert_eq!(transform.to_base(ViewPoint::new(110.0, 220.0)), BasePoint::new(50.0, 100.0));
    }

    #[test]
    fn horizontal_flip_mirrors_about_page_width() {
        let mut transform = ViewTransform::new(page(), 1.0).unwrap();
        transform.apply_flip(FlipAxis::Horizontal);

        assert_eq!(transform.to_base(ViewPoint::new(0.0, 10.0)), BasePoint::new(612.0, 10.0));
        assert_eq!(transform.to_surface(BasePoint::new(12.0, 10.0)), SurfacePoint::new(600.0, 10.0));
    }

    #[test]
    fn vertical_flip_mirrors_scaled_content() {
        let mut transform = ViewTransform::new(page(), 0.5).unwrap();
        transform.apply_flip(FlipAxis::Vertical);

        // bottom edge of the page lands on the top of the surface
        assert_eq!(transform.to_surface(BasePoint::new(0.0, 792.0)), SurfacePoint::new(0.0, 0.0));
        assert_eq!(transform.to_surface(BasePoint::new(0.0, 0.0)), SurfacePoint::new(0.0, 396.0));
    }

    #[test]
    fn double_flip_is_identity() {
        let mut transform = ViewTransform::new(page(), 1.5).unwrap();
        let before = transform.to_base(ViewPoint::new(33.0, 44.0));
        transform.apply_flip(FlipAxis::Vertical);
        transform.apply_flip(FlipAxis::Vertical);
        assert_eq!(transform.to_base(ViewPoint::new(33.0, 44.0)), before);
        assert!(transform.flipped_axes().is_empty());
    }

    #[test]
    fn rejects_non_positive_scales() {
        assert!(matches!(ViewTransform::new(page(), 0.0), Err(MeasureError::InvalidScale(_))));

        let mut transform = ViewTransform::new(page(), 1.0).unwrap();
        assert!(transform.set_scale(-2.0).is_err());
        assert!(transform.set_scale(f64::NAN).is_err());
        assert!(transform.apply_zoom(0.0).is_err());
        assert_eq!(transform.scale(), 1.0);
    }

    #[test]
    fn rejects_non_finite_pans() {
        let mut transform = ViewTransform::new(page(), 1.0).unwrap();
        transform.pan_by(5.0, 5.0).unwrap();

        assert!(matches!(transform.pan_by(f64::NAN, 0.0), Err(MeasureError::InvalidPan { .. })));
        assert!(transform.pan_by(0.0, f64::INFINITY).is_err());
        assert!(transform.pan_by(f64::MAX, 0.0).is_ok());
        assert!(transform.pan_by(f64::MAX, 0.0).is_err());
        assert!(transform.set_pan(PanOffset::new(f64::NEG_INFINITY, 0.0)).is_err());

        assert_eq!(transform.pan().dy, 5.0);
        assert!(transform.to_base(ViewPoint::new(10.0, 10.0)).x.is_finite());
    }

    #[test]
    fn flip_mirrors_about_rounded_raster_edge() {
        // 100.3pt wide page rasterizes to 200 px at scale 2, not 200.6
        let mut transform = ViewTransform::new(BaseExtent::new(100.3, 50.0), 2.0).unwrap();
        transform.apply_flip(FlipAxis::Horizontal);

        assert_eq!(transform.to_surface(BasePoint::new(0.0, 0.0)), SurfacePoint::new(200.0, 0.0));
        assert_eq!(transform.to_surface(BasePoint::new(100.0, 0.0)), SurfacePoint::new(0.0, 0.0));
        assert_view_close(transform.to_view(transform.to_base(ViewPoint::new(37.0, 9.0))), ViewPoint::new(37.0, 9.0));
    }

    #[test]
    fn reset_keeps_flip_state() {
        let mut transform = ViewTransform::new(page(), 1.0).unwrap();
        transform.apply_zoom(2.0).unwrap();
        transform.pan_by(15.0, -5.0).unwrap();
        transform.apply_flip(FlipAxis::Horizontal);

        transform.reset(1.0).unwrap();

        assert_eq!(transform.scale(), 1.0);
        assert_eq!(transform.pan(), PanOffset::default());
        assert!(transform.is_flipped(FlipAxis::Horizontal));
    }

    #[test]
    fn fit_scale_matches_container_width() {
        let scale = fit_scale(918.0, page()).unwrap();
        assert!((scale - 1.5).abs() < EPS);
        assert!(fit_scale(0.0, page()).is_err());
    }
}
