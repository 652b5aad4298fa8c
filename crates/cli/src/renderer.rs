use measure_core::{BaseExtent, PageHandle, PageRenderer, RenderError};
use pdf_engine::{PdfDocument, PdfEngineError, RenderRequest};
use image::RgbaImage;

/// Serves pages of one PDF to the viewer; handles are 1-based page numbers
#[derive(Debug)]
pub struct PdfPageRenderer {
    document: PdfDocument,
}

impl PdfPageRenderer {
    pub fn new(document: PdfDocument) -> Self {
        Self { document }
    }

    pub fn page_count(&self) -> u32 {
        self.document.page_count()
    }

    fn page_index(&self, page: PageHandle) -> Result<u32, RenderError> {
        match u32::try_from(page.0) {
            Ok(number) if number >= 1 && number <= self.document.page_count() => Ok(number - 1),
            _ => Err(RenderError::UnknownPage(page.0)),
        }
    }
}

impl PageRenderer for PdfPageRenderer {
    fn page_size(&self, page: PageHandle) -> Result<BaseExtent, RenderError> {
        let index = self.page_index(page)?;
        let size = self.document.page_size(index).map_err(|err| to_render_error(page, err))?;
        Ok(BaseExtent::new(f64::from(size.width_pt), f64::from(size.height_pt)))
    }

    fn render(&self, page: PageHandle, scale: f64) -> Result<RgbaImage, RenderError> {
        let page_index = self.page_index(page)?;
        self.document
            .render_page(RenderRequest { page_index, scale: scale as f32 })
            .map_err(|err| to_render_error(page, err))
    }
}

fn to_render_error(page: PageHandle, err: PdfEngineError) -> RenderError {
    match err {
        PdfEngineError::PageOutOfRange { .. } => RenderError::UnknownPage(page.0),
        other => RenderError::Rejected(other.to_string()),
    }
}
