//! Renderer collaborator contract
//!
//! The page rasterizer is external to the engine. Given a page and a scale it
//! returns a fixed-size raster; the engine never stretches rasters itself.

use crate::coords::BaseExtent;
use image::RgbaImage;

/// Opaque handle identifying the page to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("unknown page handle {0}")]
    UnknownPage(u64),
    #[error("renderer rejected the request: {0}")]
    Rejected(String),
}

pub trait PageRenderer {
    /// Page size at scale 1, in base pixels
    fn page_size(&self, page: PageHandle) -> Result<BaseExtent, RenderError>;

    /// Rasterize the page at `scale`
    fn render(&self, page: PageHandle, scale: f64) -> Result<RgbaImage, RenderError>;
}

impl<R: PageRenderer + ?Sized> PageRenderer for Box<R> {
    fn page_size(&self, page: PageHandle) -> Result<BaseExtent, RenderError> {
        (**self).page_size(page)
    }

    fn render(&self, page: PageHandle, scale: f64) -> Result<RgbaImage, RenderError> {
        (**self).render(page, scale)
    }
}

/// Ticket for an outstanding render request
///
/// Tickets are numbered by generation; finishing a ticket from an older
/// generation than the latest request is a no-op.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTicket {
    pub page: PageHandle,
    pub scale: f64,
    pub generation: u64,
}

/// Expected raster size for a page at a given scale
pub fn raster_size(extent: BaseExtent, scale: f64) -> (u32, u32) {
    let width = (extent.width * scale).round().max(1.0) as u32;
    let height = (extent.height * scale).round().max(1.0) as u32;
    (width, height)
}
