//! VectorMeasure Core Library
//!
//! Coordinate model, calibration and measurement state for measuring
//! distances on rendered drawing pages.

pub mod calibration;
pub mod coords;
pub mod error;
pub mod label;
pub mod layers;
pub mod measurement;
pub mod render;
pub mod session;
pub mod settings;
pub mod transform;
pub mod viewer;

pub use calibration::{Calibration, DEFAULT_UNIT, NOMINAL_UNITS_PER_PIXEL};
pub use coords::{BaseExtent, BasePoint, SurfacePoint, ViewPoint};
pub use error::{MeasureError, MeasureResult};
pub use layers::{LayerKind, LayerStack};
pub use measurement::{Measurement, MeasurementId};
pub use render::{PageHandle, PageRenderer, RenderError, RenderTicket};
pub use session::{ClickOutcome, MeasureState, MeasurementSession, Preview};
pub use settings::{MeasureSettings, StrokeStyle};
pub use transform::{fit_scale, FlipAxis, PanOffset, ViewTransform};
pub use viewer::Viewer;
