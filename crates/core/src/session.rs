//! Two-click measurement state machine
//!
//! ```text
//!            click                    click
//!   Idle ─────────────▶ AwaitingSecondPoint ─────▶ Idle (+ finalized Measurement)
//!     ▲                        │
//!     └── cancel/clear/flip/zoom/pan/reset
//! ```
//!
//! `measuring_enabled` gates clicks independently of the state. The session
//! never draws; callers apply the returned outcomes to the layer stack.

use crate::calibration::Calibration;
use crate::coords::{BasePoint, ViewPoint};
use crate::label;
use crate::measurement::Measurement;
use crate::transform::ViewTransform;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeasureState {
    Idle,
    AwaitingSecondPoint { start: BasePoint },
}

/// Result of feeding a click to the session
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Measuring is disabled or the point was unusable
    Ignored,
    /// First point captured
    Started(BasePoint),
    /// Second point captured, segment finalized
    Finalized(Measurement),
}

/// Live segment following the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub start: BasePoint,
    pub end: BasePoint,
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct MeasurementSession {
    state: MeasureState,
    measuring_enabled: bool,
    last_finalized: Option<Measurement>,
    /// Finalized marks of the current measuring pass, oldest first
    marks: Vec<Measurement>,
}

impl Default for MeasurementSession {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self { state: MeasureState::Idle, measuring_enabled: false, last_finalized: None, marks: Vec::new() }
    }

    pub fn state(&self) -> MeasureState {
        self.state
    }

    pub fn pending(&self) -> Option<BasePoint> {
        match self.state {
            MeasureState::Idle => None,
            MeasureState::AwaitingSecondPoint { start } => Some(start),
        }
    }

    pub fn is_measuring_enabled(&self) -> bool {
        self.measuring_enabled
    }

    pub fn last_finalized(&self) -> Option<&Measurement> {
        self.last_finalized.as_ref()
    }

    pub fn marks(&self) -> &[Measurement] {
        &self.marks
    }

    /// Start a new measuring pass; marks of the previous pass are dropped
    pub fn enable_measuring(&mut self) {
        self.reset();
        self.measuring_enabled = true;
    }

    pub fn handle_click(
        &mut self,
        point: ViewPoint,
        transform: &ViewTransform,
        calibration: &Calibration,
    ) -> ClickOutcome {
        if !self.measuring_enabled {
            return ClickOutcome::Ignored;
        }
        if !point.is_finite() {
            warn!(?point, "ignoring non-finite click");
            return ClickOutcome::Ignored;
        }

        let base = transform.to_base(point);

        match self.state {
            MeasureState::Idle => {
                self.state = MeasureState::AwaitingSecondPoint { start: base };
                debug!(x = base.x, y = base.y, "measurement started");
                ClickOutcome::Started(base)
            }
            MeasureState::AwaitingSecondPoint { start } => {
                let measurement = Measurement::finalize(start, base, calibration);
                debug!(
                    pixels = measurement.pixel_length(),
                    label = measurement.label(),
                    "measurement finalized"
                );
                self.marks.push(measurement.clone());
                self.last_finalized = Some(measurement.clone());
                self.state = MeasureState::Idle;
                ClickOutcome::Finalized(measurement)
            }
        }
    }

    /// Live segment from the pending point to the pointer, if one is pending
    pub fn handle_pointer_move(
        &self,
        point: ViewPoint,
        transform: &ViewTransform,
        calibration: &Calibration,
    ) -> Option<Preview> {
        let MeasureState::AwaitingSecondPoint { start } = self.state else {
            return None;
        };
        if !self.measuring_enabled || !point.is_finite() {
            return None;
        }

        let end = transform.to_base(point);
        let value = calibration.units_for(start.distance_to(&end));
        Some(Preview { start, end, value, label: label::format_live(value, calibration.unit()) })
    }

    /// Wipe everything and disable measuring
    pub fn clear(&mut self) {
        self.reset();
        self.measuring_enabled = false;
    }

    /// External cancel signal; same effect as [`MeasurementSession::clear`]
    pub fn cancel(&mut self) {
        self.clear();
    }

    /// Drop a pending first point. Returns whether one was pending.
    pub fn invalidate_pending(&mut self) -> bool {
        let had_pending = self.pending().is_some();
        self.state = MeasureState::Idle;
        had_pending
    }

    /// Remove and return the last finalized measurement
    pub fn take_last_finalized(&mut self) -> Option<Measurement> {
        self.last_finalized.take()
    }

    /// Recompute labels of all marks against `calibration`
    pub fn relabel_marks(&mut self, calibration: &Calibration) {
        for mark in &mut self.marks {
            mark.relabel(calibration);
        }
        if let Some(last) = self.last_finalized.as_mut() {
            last.relabel(calibration);
        }
    }

    fn reset(&mut self) {
        self.state = MeasureState::Idle;
        self.last_finalized = None;
        self.marks.clear();
    }
}
