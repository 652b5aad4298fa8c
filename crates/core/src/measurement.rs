//! Finalized two-point measurements
//!
//! Geometry is stored in base space so a measurement stays valid across
//! zoom, pan and flip.

use crate::calibration::Calibration;
use crate::coords::BasePoint;
use crate::label;
use serde::{Deserialize, Serialize};

/// Unique identifier for measurements
pub type MeasurementId = uuid::Uuid;

/// A completed segment with its calibrated value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Unique identifier
    id: MeasurementId,
    /// First clicked point
    start: BasePoint,
    /// Second clicked point
    end: BasePoint,
    /// Length in base pixels
    pixel_length: f64,
    /// Length in real-world units at the time of finalization
    value: f64,
    /// Display label, e.g. "3.04 m"
    label: String,
}

impl Measurement {
    /// Finalize a segment against the current calibration
    pub fn finalize(start: BasePoint, end: BasePoint, calibration: &Calibration) -> Self {
        let pixel_length = start.distance_to(&end);
        let value = calibration.units_for(pixel_length);
        Self {
            id: MeasurementId::new_v4(),
            start,
            end,
            pixel_length,
            value,
            label: label::format_final(value, calibration.unit()),
        }
    }

    pub fn id(&self) -> MeasurementId {
        self.id
    }

    pub fn start(&self) -> BasePoint {
        self.start
    }

    pub fn end(&self) -> BasePoint {
        self.end
    }

    pub fn pixel_length(&self) -> f64 {
        self.pixel_length
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Recompute value and label after the calibration changed
    pub fn relabel(&mut self, calibration: &Calibration) {
        self.value = calibration.units_for(self.pixel_length);
        self.label = label::format_final(self.value, calibration.unit());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_computes_length_and_label() {
        let calibration = Calibration::with_units_per_pixel(0.1, "m");
        let measurement =
            Measurement::finalize(BasePoint::new(0.0, 0.0), BasePoint::new(30.4, 0.0), &calibration);

        assert!((measurement.pixel_length() - 30.4).abs() < 1e-9);
        assert!((measurement.value() - 3.04).abs() < 1e-9);
        assert_eq!(measurement.label(), "3.04 m");
    }

    #[test]
    fn whole_values_are_labelled_without_decimals() {
        let calibration = Calibration::with_units_per_pixel(0.1, "m");
        let measurement =
            Measurement::finalize(BasePoint::new(0.0, 0.0), BasePoint::new(18.0, 24.0), &calibration);

        assert_eq!(measurement.label(), "3 m");
    }

    #[test]
    fn relabel_follows_new_calibration() {
        let mut measurement = Measurement::finalize(
            BasePoint::new(0.0, 0.0),
            BasePoint::new(100.0, 0.0),
            &Calibration::with_units_per_pixel(0.01, "m"),
        );
        assert_eq!(measurement.label(), "1 m");

        measurement.relabel(&Calibration::with_units_per_pixel(0.025, "ft"));
        assert_eq!(measurement.label(), "2.50 ft");
    }
}
