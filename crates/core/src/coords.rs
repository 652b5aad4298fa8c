//! Coordinate spaces used by the measurement engine
//!
//! Every point carries its space in its type:
//! - `ViewPoint`: pointer/client coordinates as delivered by the display surface
//! - `SurfacePoint`: pixel grid of the layer surfaces (current scale and flip, no pan)
//! - `BasePoint`: native page raster grid at scale 1, anchored to the page content
//!
//! Conversions between the spaces exist only as methods on
//! [`crate::transform::ViewTransform`].

use serde::{Deserialize, Serialize};

/// Pointer coordinate in view space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewPoint {
    pub x: f64,
    pub y: f64,
}

impl ViewPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Pixel coordinate on the layer surfaces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfacePoint {
    pub x: f64,
    pub y: f64,
}

impl SurfacePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Coordinate in the untransformed page raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BasePoint {
    pub x: f64,
    pub y: f64,
}

impl BasePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in base pixels
    pub fn distance_to(&self, other: &BasePoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Size of the page in base pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseExtent {
    pub width: f64,
    pub height: f64,
}

impl BaseExtent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}
