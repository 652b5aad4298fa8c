//! Distance label formatting
//!
//! Finalized segments and the live preview use different rounding rules:
//! - finalized: two decimals, collapsed to a whole number when the value
//!   rounds to `.00` (`3.04 m`, `3 m`)
//! - live preview: floored to one decimal, always printed with one decimal
//!   (`3.0 m` for 3.049)

// Absorbs representation error such as 0.7 * 10 == 6.999999999999999.
const FLOOR_EPSILON: f64 = 1e-9;

/// Label for a finalized measurement
pub fn format_final(value: f64, unit: &str) -> String {
    let hundredths = (value * 100.0).round();
    if hundredths % 100.0 == 0.0 {
        format!("{:.0} {unit}", hundredths / 100.0)
    } else {
        format!("{:.2} {unit}", hundredths / 100.0)
    }
}

/// Label for the live preview segment
pub fn format_live(value: f64, unit: &str) -> String {
    let floored = (value * 10.0 + FLOOR_EPSILON).floor() / 10.0;
    format!("{floored:.1} {unit}")
}

/// Calibration constant rendered as "1px = 0.02470 m"
pub fn format_units_per_pixel(units_per_pixel: f64, unit: &str) -> String {
    format!("{units_per_pixel:.5} {unit}")
}
