//! Measuring viewer
//!
//! Owns every piece of session state (renderer, transform, calibration,
//! measurement session and layers) and sequences the operations so that the
//! layer stack and the transform never disagree. This is the surface the UI
//! layer talks to.

use crate::calibration::Calibration;
use crate::coords::{BaseExtent, ViewPoint};
use crate::error::{MeasureError, MeasureResult};
use crate::label;
use crate::layers::{mirror_raster, LayerStack};
use crate::render::{PageHandle, PageRenderer, RenderError, RenderTicket};
use crate::session::{ClickOutcome, MeasurementSession};
use crate::settings::MeasureSettings;
use crate::transform::{fit_scale, validate_scale, FlipAxis, ViewTransform};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use tracing::{debug, info, warn};

/// Page currently shown by the viewer
#[derive(Debug)]
struct LoadedPage {
    page: PageHandle,
    fit_scale: f64,
    /// Unflipped raster at the fit scale, restored by reset
    pristine: RgbaImage,
    transform: ViewTransform,
    layers: LayerStack,
}

pub struct Viewer<R: PageRenderer> {
    renderer: R,
    settings: MeasureSettings,
    document: Option<LoadedPage>,
    calibration: Calibration,
    session: MeasurementSession,
    render_generation: u64,
    pending_render: Option<RenderTicket>,
    /// Set after a failed render; measuring input stays blocked until a render succeeds
    render_failed: bool,
    distance_label: Option<String>,
    live_label: Option<String>,
    status: String,
}

impl<R: PageRenderer> Viewer<R> {
    pub fn new(renderer: R, settings: MeasureSettings) -> Self {
        let calibration = Calibration::new(settings.nominal_units_per_pixel, settings.unit.clone());
        let status = calibration.status_text();
        Self {
            renderer,
            settings,
            document: None,
            calibration,
            session: MeasurementSession::new(),
            render_generation: 0,
            pending_render: None,
            render_failed: false,
            distance_label: None,
            live_label: None,
            status,
        }
    }

    /// Load a page, fit it to the container and reset calibration
    ///
    /// Any calibration from a previous page is discarded: the constant
    /// belongs to the raster it was measured on.
    pub fn open(&mut self, page: PageHandle) -> MeasureResult<()> {
        let loaded = match self.load_page(page) {
            Ok(loaded) => loaded,
            Err(err) => {
                warn!(page = page.0, %err, "failed to open page");
                self.status = format!("Error rendering page: {err}");
                return Err(err);
            }
        };

        info!(
            page = page.0,
            scale = loaded.transform.scale(),
            width = loaded.layers.width(),
            height = loaded.layers.height(),
            "page opened"
        );

        self.document = Some(loaded);
        self.render_generation += 1;
        self.pending_render = None;
        self.render_failed = false;
        self.calibration.reset();
        self.session = MeasurementSession::new();
        self.distance_label = None;
        self.live_label = None;
        self.status = self.calibration.status_text();
        Ok(())
    }

    fn load_page(&self, page: PageHandle) -> MeasureResult<LoadedPage> {
        let extent: BaseExtent = self.renderer.page_size(page)?;
        let fit = fit_scale(self.settings.container_width, extent)?;
        let raster = self.renderer.render(page, fit)?;

        let transform = ViewTransform::new(extent, fit)?;
        let mut layers =
            LayerStack::new(1, 1, self.settings.mark_stroke, self.settings.preview_stroke)?;
        layers.install_base(raster.clone())?;

        Ok(LoadedPage { page, fit_scale: fit, pristine: raster, transform, layers })
    }

    pub fn settings(&self) -> &MeasureSettings {
        &self.settings
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn session(&self) -> &MeasurementSession {
        &self.session
    }

    pub fn transform(&self) -> Option<&ViewTransform> {
        self.document.as_ref().map(|doc| &doc.transform)
    }

    pub fn layers(&self) -> Option<&LayerStack> {
        self.document.as_ref().map(|doc| &doc.layers)
    }

    pub fn pending_render(&self) -> Option<RenderTicket> {
        self.pending_render
    }

    /// Whether pointer input is currently dropped
    pub fn is_input_blocked(&self) -> bool {
        self.document.is_none() || self.pending_render.is_some() || self.render_failed
    }

    pub fn enable_measuring(&mut self) {
        self.session.enable_measuring();
        if let Some(doc) = self.document.as_mut() {
            doc.layers.clear_persistent();
            doc.layers.clear_preview();
        }
        self.distance_label = None;
        self.live_label = None;
        self.status = "Click two points to measure.".to_owned();
    }

    /// Feed a pointer click in view coordinates
    pub fn click(&mut self, point: ViewPoint) -> ClickOutcome {
        if self.is_input_blocked() {
            debug!(?point, "click dropped while input is blocked");
            return ClickOutcome::Ignored;
        }
        let Some(doc) = self.document.as_mut() else {
            return ClickOutcome::Ignored;
        };

        let outcome = self.session.handle_click(point, &doc.transform, &self.calibration);
        if let ClickOutcome::Finalized(measurement) = &outcome {
            doc.layers.redraw_persistent(self.session.marks(), &doc.transform);
            doc.layers.clear_preview();
            self.live_label = None;
            self.distance_label = Some(measurement.label().to_owned());
            self.status = format!("Segment: {}", measurement.label());
        }
        outcome
    }

    /// Feed a pointer move; returns the live label while a segment is open
    pub fn pointer_move(&mut self, point: ViewPoint) -> Option<&str> {
        if self.is_input_blocked() {
            return None;
        }
        let doc = self.document.as_mut()?;

        match self.session.handle_pointer_move(point, &doc.transform, &self.calibration) {
            Some(preview) => {
                doc.layers.redraw_preview(preview.start, preview.end, &doc.transform);
                self.live_label = Some(preview.label);
            }
            None => self.live_label = None,
        }
        self.live_label.as_deref()
    }

    pub fn clear(&mut self) {
        self.wipe_measurements();
        self.status = "Measurements cleared.".to_owned();
    }

    /// External cancel signal (Escape)
    pub fn cancel(&mut self) {
        self.wipe_measurements();
        self.status = "Measuring mode stopped by ESC.".to_owned();
    }

    fn wipe_measurements(&mut self) {
        self.session.clear();
        if let Some(doc) = self.document.as_mut() {
            doc.layers.clear_persistent();
            doc.layers.clear_preview();
        }
        self.distance_label = None;
        self.live_label = None;
    }

    /// Calibrate against the last finalized measurement
    ///
    /// The measurement is consumed: calibrating again requires a new one.
    /// Labels of the marks on screen are recomputed with the new constant.
    pub fn calibrate(&mut self, known_length: f64) -> MeasureResult<f64> {
        let constant = match self.calibration.calibrate(self.session.last_finalized(), known_length) {
            Ok(constant) => constant,
            Err(err) => {
                warn!(%err, "calibration rejected");
                self.status = format!("Measure a distance first, then enter a valid real-world value ({err})");
                return Err(err);
            }
        };

        if let Some(mut measurement) = self.session.take_last_finalized() {
            measurement.relabel(&self.calibration);
            self.distance_label = Some(measurement.label().to_owned());
        }
        self.session.relabel_marks(&self.calibration);
        self.status = self.calibration.status_text();
        Ok(constant)
    }

    /// Mirror the page content about `axis`
    pub fn flip(&mut self, axis: FlipAxis) -> MeasureResult<()> {
        let doc = self.document.as_mut().ok_or(MeasureError::NoDocument)?;

        doc.transform.apply_flip(axis);
        doc.layers.flip_base(axis);
        self.session.invalidate_pending();
        doc.layers.clear_preview();
        doc.layers.redraw_persistent(self.session.marks(), &doc.transform);
        self.live_label = None;

        debug!(?axis, "page flipped");
        self.status = match axis {
            FlipAxis::Horizontal => "Page flipped horizontally".to_owned(),
            FlipAxis::Vertical => "Page flipped vertically".to_owned(),
        };
        Ok(())
    }

    /// Zoom by `factor` relative to the current scale
    pub fn zoom(&mut self, factor: f64) -> MeasureResult<()> {
        let doc = self.document.as_ref().ok_or(MeasureError::NoDocument)?;
        let scale = doc.transform.zoomed_scale(factor)?;
        self.set_scale(scale)
    }

    pub fn zoom_in(&mut self) -> MeasureResult<()> {
        self.zoom(self.settings.zoom_step)
    }

    pub fn zoom_out(&mut self) -> MeasureResult<()> {
        self.zoom(1.0 / self.settings.zoom_step)
    }

    /// Re-render at `scale` and resize every layer to the new raster
    pub fn set_scale(&mut self, scale: f64) -> MeasureResult<()> {
        let ticket = self.begin_render(scale)?;
        let result = self.renderer.render(ticket.page, ticket.scale);
        self.finish_render(ticket, result).map(|_| ())
    }

    /// Start a re-render at `scale`
    ///
    /// Until the returned ticket is finished, pointer input is dropped. Any
    /// pending measurement point is discarded immediately.
    pub fn begin_render(&mut self, scale: f64) -> MeasureResult<RenderTicket> {
        validate_scale(scale)?;
        let doc = self.document.as_mut().ok_or(MeasureError::NoDocument)?;

        self.render_generation += 1;
        let ticket = RenderTicket { page: doc.page, scale, generation: self.render_generation };

        self.session.invalidate_pending();
        doc.layers.clear_preview();
        self.live_label = None;
        self.pending_render = Some(ticket);

        debug!(scale, generation = ticket.generation, "render requested");
        Ok(ticket)
    }

    /// Complete a render started with [`Viewer::begin_render`]
    ///
    /// Returns `Ok(false)` when the ticket was superseded and its raster
    /// discarded. On failure the transform and layers keep their last good
    /// state and input stays blocked until a later render succeeds.
    pub fn finish_render(
        &mut self,
        ticket: RenderTicket,
        result: Result<RgbaImage, RenderError>,
    ) -> MeasureResult<bool> {
        if self.pending_render != Some(ticket) {
            debug!(generation = ticket.generation, "discarding stale render");
            return Ok(false);
        }
        self.pending_render = None;

        let Some(doc) = self.document.as_mut() else {
            return Err(MeasureError::NoDocument);
        };

        let mut raster = match result {
            Ok(raster) => raster,
            Err(err) => {
                warn!(scale = ticket.scale, %err, "render failed");
                self.render_failed = true;
                self.status = format!("Error rendering page: {err}");
                return Err(err.into());
            }
        };

        for axis in doc.transform.flipped_axes() {
            mirror_raster(&mut raster, axis);
        }
        if let Err(err) = doc.layers.install_base(raster) {
            self.render_failed = true;
            self.status = format!("Error rendering page: {err}");
            return Err(err);
        }
        doc.transform.set_scale(ticket.scale)?;
        self.session.invalidate_pending();
        doc.layers.redraw_persistent(self.session.marks(), &doc.transform);
        self.render_failed = false;

        self.status = format!(
            "Zoom: {:.2}x | 1px = {}",
            ticket.scale,
            label::format_units_per_pixel(self.calibration.units_per_base_pixel(), self.calibration.unit())
        );
        Ok(true)
    }

    /// Translate the page in view space
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> MeasureResult<()> {
        let doc = self.document.as_mut().ok_or(MeasureError::NoDocument)?;
        doc.transform.pan_by(dx, dy)?;
        self.session.invalidate_pending();
        doc.layers.clear_preview();
        self.live_label = None;
        Ok(())
    }

    /// Back to the fit scale with no pan, restoring the raster captured on open
    ///
    /// The renderer is not consulted. Flip state is kept: the current flips
    /// are re-applied to the restored raster. An outstanding render is
    /// abandoned.
    pub fn reset_view(&mut self) -> MeasureResult<()> {
        let doc = self.document.as_mut().ok_or(MeasureError::NoDocument)?;

        let mut raster = doc.pristine.clone();
        for axis in doc.transform.flipped_axes() {
            mirror_raster(&mut raster, axis);
        }
        doc.layers.install_base(raster)?;
        doc.transform.reset(doc.fit_scale)?;

        self.render_generation += 1;
        self.pending_render = None;
        self.render_failed = false;
        self.session.invalidate_pending();
        doc.layers.redraw_persistent(self.session.marks(), &doc.transform);
        self.live_label = None;

        debug!(scale = doc.fit_scale, "view reset");
        self.status = "View reset to original state".to_owned();
        Ok(())
    }

    /// Label of the most recent finalized segment, e.g. "3.04 m"
    pub fn current_distance_label(&self) -> Option<&str> {
        self.distance_label.as_deref()
    }

    /// Label following the pointer while a segment is open
    pub fn live_label(&self) -> Option<&str> {
        self.live_label.as_deref()
    }

    pub fn calibration_status_text(&self) -> String {
        self.calibration.status_text()
    }

    /// Last user-facing status line
    pub fn status_message(&self) -> &str {
        &self.status
    }

    /// Base raster with marks composited on top
    pub fn flattened_image(&self) -> MeasureResult<RgbaImage> {
        let doc = self.document.as_ref().ok_or(MeasureError::NoDocument)?;
        doc.layers.flatten()
    }

    /// PNG encoding of [`Viewer::flattened_image`]
    pub fn export_flattened_png(&self) -> MeasureResult<Vec<u8>> {
        let image = self.flattened_image()?;
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }
}
