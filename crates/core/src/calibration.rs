//! Calibration store
//!
//! Holds the scale-independent calibration constant: real-world units per
//! base-space pixel. Because the constant is defined against the scale-1
//! raster, zooming and panning never require re-calibration. Loading a new
//! document must call [`Calibration::reset`].

use crate::error::{MeasureError, MeasureResult};
use crate::label;
use crate::measurement::Measurement;
use tracing::{debug, info};

/// Nominal constant used until the user calibrates: 1px ≈ 0.02470 m
pub const NOMINAL_UNITS_PER_PIXEL: f64 = 1.0 / 40.48;

/// Default linear unit
pub const DEFAULT_UNIT: &str = "m";

#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    units_per_base_pixel: f64,
    nominal: f64,
    calibrated: bool,
    unit: String,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(NOMINAL_UNITS_PER_PIXEL, DEFAULT_UNIT)
    }
}

impl Calibration {
    /// Uncalibrated store using `nominal` as its default constant
    pub fn new(nominal: f64, unit: impl Into<String>) -> Self {
        Self { units_per_base_pixel: nominal, nominal, calibrated: false, unit: unit.into() }
    }

    /// Store already calibrated to `units_per_base_pixel`
    pub fn with_units_per_pixel(units_per_base_pixel: f64, unit: impl Into<String>) -> Self {
        Self {
            units_per_base_pixel,
            nominal: NOMINAL_UNITS_PER_PIXEL,
            calibrated: true,
            unit: unit.into(),
        }
    }

    pub fn units_per_base_pixel(&self) -> f64 {
        self.units_per_base_pixel
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    /// Derive the constant from a finalized measurement of known length
    ///
    /// Fails without touching the current constant when there is no
    /// measurement, the measurement has zero length, or `known_length` is
    /// not a positive finite number.
    pub fn calibrate(
        &mut self,
        measurement: Option<&Measurement>,
        known_length: f64,
    ) -> MeasureResult<f64> {
        let measurement = measurement.ok_or_else(|| {
            MeasureError::InvalidCalibrationInput("measure a distance first".to_owned())
        })?;

        if !known_length.is_finite() || known_length <= 0.0 {
            return Err(MeasureError::InvalidCalibrationInput(format!(
                "known length must be a positive number, got {known_length}"
            )));
        }

        let pixel_length = measurement.pixel_length();
        if !pixel_length.is_finite() {
            return Err(MeasureError::InvalidCalibrationInput(format!(
                "measurement length is not a finite number ({pixel_length})"
            )));
        }
        if pixel_length <= 0.0 {
            return Err(MeasureError::InvalidCalibrationInput(
                "measurement has zero length".to_owned(),
            ));
        }

        self.units_per_base_pixel = known_length / pixel_length;
        self.calibrated = true;

        debug!(pixel_length, known_length, "calibration input");
        info!(units_per_base_pixel = self.units_per_base_pixel, unit = %self.unit, "calibrated");

        Ok(self.units_per_base_pixel)
    }

    /// Convert a base-space pixel length to real-world units
    pub fn units_for(&self, base_pixel_length: f64) -> f64 {
        base_pixel_length * self.units_per_base_pixel
    }

    /// Discard any calibration and return to the nominal constant
    pub fn reset(&mut self) {
        self.units_per_base_pixel = self.nominal;
        self.calibrated = false;
    }

    pub fn status_text(&self) -> String {
        let per_pixel = label::format_units_per_pixel(self.units_per_base_pixel, &self.unit);
        if self.calibrated {
            format!("Calibrated: 1px = {per_pixel}")
        } else {
            format!("Default calibration: 1px ≈ {per_pixel}")
        }
    }
}
