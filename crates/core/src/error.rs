use crate::render::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum MeasureError {
    #[error("invalid calibration input: {0}")]
    InvalidCalibrationInput(String),
    #[error("invalid scale {0}: must be positive and finite")]
    InvalidScale(f64),
    #[error("invalid pan ({dx}, {dy}): must be finite")]
    InvalidPan { dx: f64, dy: f64 },
    #[error("no document loaded")]
    NoDocument,
    #[error("cannot allocate {width}x{height} layer surface")]
    LayerAllocation { width: u32, height: u32 },
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

pub type MeasureResult<T> = Result<T, MeasureError>;
