//! User-tunable settings for a measuring session

use crate::calibration::{DEFAULT_UNIT, NOMINAL_UNITS_PER_PIXEL};
use serde::{Deserialize, Serialize};

/// Stroke used to draw a segment on a layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    /// RGBA, straight alpha
    pub color: [u8; 4],
    /// Width in surface pixels
    pub width: f32,
}

impl StrokeStyle {
    pub fn new(color: [u8; 4], width: f32) -> Self {
        Self { color, width }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureSettings {
    /// Linear unit shown in labels
    pub unit: String,
    /// Units per base pixel before calibration
    pub nominal_units_per_pixel: f64,
    /// Width the page is fitted to on open and on reset
    pub container_width: f64,
    /// Factor applied by a single zoom step
    pub zoom_step: f64,
    pub mark_stroke: StrokeStyle,
    pub preview_stroke: StrokeStyle,
}

impl Default for MeasureSettings {
    fn default() -> Self {
        Self {
            unit: DEFAULT_UNIT.to_owned(),
            nominal_units_per_pixel: NOMINAL_UNITS_PER_PIXEL,
            container_width: 1000.0,
            zoom_step: 1.25,
            mark_stroke: StrokeStyle::new([255, 0, 0, 255], 3.0),
            preview_stroke: StrokeStyle::new([255, 0, 0, 128], 2.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: MeasureSettings =
            serde_json::from_str(r#"{ "unit": "ft" }"#).expect("partial settings should parse");

        assert_eq!(settings.unit, "ft");
        assert_eq!(settings.zoom_step, 1.25);
        assert_eq!(settings.mark_stroke, MeasureSettings::default().mark_stroke);
    }

    #[test]
    fn settings_survive_json() {
        let settings = MeasureSettings { container_width: 640.0, ..MeasureSettings::default() };
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: MeasureSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, settings);
    }
}
