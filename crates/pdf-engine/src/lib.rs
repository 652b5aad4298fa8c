//! Vector page rasterizer
//!
//! Loads a PDF with lopdf and paints the path operators of each page's
//! content stream with tiny-skia. Text, images and XObjects are skipped:
//! measuring only needs the linework of a drawing.

use image::{ImageBuffer, Rgba};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId};
use std::fs;
use std::path::{Path, PathBuf};
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Stroke, Transform};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

/// Page size used when a page carries no usable MediaBox (US Letter)
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

/// Ancestor levels searched for inherited page attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
    #[error("invalid render scale {0}")]
    InvalidScale(f32),
    #[error("cannot allocate a {width}x{height} raster")]
    RasterAllocation { width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy)]
struct PageRecord {
    id: ObjectId,
    size: PageSize,
    /// Lower-left corner of the MediaBox
    origin: (f32, f32),
}

/// An opened PDF document
#[derive(Debug)]
pub struct PdfDocument {
    doc: Document,
    pages: Vec<PageRecord>,
}

impl PdfDocument {
    pub fn open(source: impl Into<OpenSource>) -> Result<Self, PdfEngineError> {
        let bytes = match source.into() {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(&bytes)?;
        let mut pages = Vec::new();
        for (_, id) in doc.get_pages() {
            let (size, origin) = media_box(&doc, id).unwrap_or((DEFAULT_PAGE_SIZE, (0.0, 0.0)));
            pages.push(PageRecord { id, size, origin });
        }

        if pages.is_empty() {
            return Err(PdfEngineError::NoPages);
        }

        Ok(Self { doc, pages })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn page_size(&self, page_index: u32) -> Result<PageSize, PdfEngineError> {
        Ok(self.page(page_index)?.size)
    }

    /// Rasterize a page: white background, path operators painted on top
    pub fn render_page(&self, request: RenderRequest) -> Result<RgbaImage, PdfEngineError> {
        let scale = request.scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PdfEngineError::InvalidScale(scale));
        }

        let page = self.page(request.page_index)?;
        let width = (page.size.width_pt * scale).round().max(1.0) as u32;
        let height = (page.size.height_pt * scale).round().max(1.0) as u32;

        let mut pixmap =
            Pixmap::new(width, height).ok_or(PdfEngineError::RasterAllocation { width, height })?;
        pixmap.fill(Color::WHITE);

        // PDF user space has y up; the raster has y down
        let (x0, y0) = page.origin;
        let page_to_raster =
            Transform::from_row(scale, 0.0, 0.0, -scale, -x0 * scale, (y0 + page.size.height_pt) * scale);

        let content = self.doc.get_page_content(page.id)?;
        let content = Content::decode(&content)?;
        paint_operations(&mut pixmap, &content.operations, page_to_raster);

        let mut image = RgbaImage::new(width, height);
        for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
            let color = src.demultiply();
            *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
        }
        Ok(image)
    }

    fn page(&self, page_index: u32) -> Result<&PageRecord, PdfEngineError> {
        self.pages.get(page_index as usize).ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: self.pages.len() as u32,
        })
    }
}

/// Size and origin of the page's MediaBox, following Parent links
fn media_box(doc: &Document, page_id: ObjectId) -> Option<(PageSize, (f32, f32))> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(array) = node.get(b"MediaBox").and_then(|obj| doc.dereference(obj)).map(|(_, obj)| obj) {
            let array = array.as_array().ok()?;
            if array.len() != 4 {
                return None;
            }
            let x0 = array[0].as_float().ok()?;
            let y0 = array[1].as_float().ok()?;
            let x1 = array[2].as_float().ok()?;
            let y1 = array[3].as_float().ok()?;
            let size = PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() };
            return Some((size, (x0.min(x1), y0.min(y1))));
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Transform,
    line_width: f32,
    stroke_color: Color,
    fill_color: Color,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Transform::identity(),
            line_width: 1.0,
            stroke_color: Color::BLACK,
            fill_color: Color::BLACK,
        }
    }
}

fn paint_operations(pixmap: &mut Pixmap, operations: &[Operation], page_to_raster: Transform) {
    let mut state = GraphicsState::default();
    let mut saved = Vec::new();
    let mut path = PathBuilder::new();
    let mut current = (0.0f32, 0.0f32);

    for op in operations {
        let Some(args) = operands(op) else {
            continue;
        };

        match (op.operator.as_str(), args.as_slice()) {
            ("q", _) => saved.push(state),
            ("Q", _) => {
                if let Some(previous) = saved.pop() {
                    state = previous;
                }
            }
            ("cm", &[a, b, c, d, e, f]) => {
                state.ctm = state.ctm.pre_concat(Transform::from_row(a, b, c, d, e, f));
            }
            ("w", &[width]) => state.line_width = width.max(0.0),
            ("G", &[gray]) => state.stroke_color = gray_color(gray),
            ("g", &[gray]) => state.fill_color = gray_color(gray),
            ("RG", &[r, g, b]) => state.stroke_color = rgb_color(r, g, b),
            ("rg", &[r, g, b]) => state.fill_color = rgb_color(r, g, b),
            ("K", &[c, m, y, k]) => state.stroke_color = cmyk_color(c, m, y, k),
            ("k", &[c, m, y, k]) => state.fill_color = cmyk_color(c, m, y, k),
            ("m", &[x, y]) => {
                path.move_to(x, y);
                current = (x, y);
            }
            ("l", &[x, y]) => {
                path.line_to(x, y);
                current = (x, y);
            }
            ("c", &[x1, y1, x2, y2, x3, y3]) => {
                path.cubic_to(x1, y1, x2, y2, x3, y3);
                current = (x3, y3);
            }
            ("v", &[x2, y2, x3, y3]) => {
                path.cubic_to(current.0, current.1, x2, y2, x3, y3);
                current = (x3, y3);
            }
            ("y", &[x1, y1, x3, y3]) => {
                path.cubic_to(x1, y1, x3, y3, x3, y3);
                current = (x3, y3);
            }
            ("h", _) => path.close(),
            ("re", &[x, y, w, h]) => {
                path.move_to(x, y);
                path.line_to(x + w, y);
                path.line_to(x + w, y + h);
                path.line_to(x, y + h);
                path.close();
                current = (x, y);
            }
            ("S", _) => paint(pixmap, &mut path, &state, page_to_raster, PaintMode::Stroke),
            ("s", _) => {
                path.close();
                paint(pixmap, &mut path, &state, page_to_raster, PaintMode::Stroke);
            }
            ("f" | "F", _) => {
                paint(pixmap, &mut path, &state, page_to_raster, PaintMode::Fill(FillRule::Winding))
            }
            ("f*", _) => {
                paint(pixmap, &mut path, &state, page_to_raster, PaintMode::Fill(FillRule::EvenOdd))
            }
            ("B" | "b", _) => {
                if op.operator == "b" {
                    path.close();
                }
                paint(pixmap, &mut path, &state, page_to_raster, PaintMode::FillStroke(FillRule::Winding));
            }
            ("B*" | "b*", _) => {
                if op.operator == "b*" {
                    path.close();
                }
                paint(pixmap, &mut path, &state, page_to_raster, PaintMode::FillStroke(FillRule::EvenOdd));
            }
            ("n", _) => path.clear(),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PaintMode {
    Stroke,
    Fill(FillRule),
    FillStroke(FillRule),
}

/// Paint and consume the current path
fn paint(
    pixmap: &mut Pixmap,
    builder: &mut PathBuilder,
    state: &GraphicsState,
    page_to_raster: Transform,
    mode: PaintMode,
) {
    let Some(path) = std::mem::take(builder).finish() else {
        return;
    };
    let transform = page_to_raster.pre_concat(state.ctm);

    let mut paint = Paint::default();
    paint.anti_alias = true;

    if let PaintMode::Fill(rule) | PaintMode::FillStroke(rule) = mode {
        paint.set_color(state.fill_color);
        pixmap.fill_path(&path, &paint, rule, transform, None);
    }
    if let PaintMode::Stroke | PaintMode::FillStroke(_) = mode {
        paint.set_color(state.stroke_color);
        // zero width is a hairline in both PDF and tiny-skia
        let stroke = Stroke { width: state.line_width, ..Default::default() };
        pixmap.stroke_path(&path, &paint, &stroke, transform, None);
    }
}

/// Numeric operands of `op`, or `None` if any operand is not a number
fn operands(op: &Operation) -> Option<Vec<f32>> {
    op.operands.iter().map(number).collect()
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

fn gray_color(gray: f32) -> Color {
    rgb_color(gray, gray, gray)
}

fn rgb_color(r: f32, g: f32, b: f32) -> Color {
    Color::from_rgba(r.clamp(0.0, 1.0), g.clamp(0.0, 1.0), b.clamp(0.0, 1.0), 1.0).unwrap_or(Color::BLACK)
}

fn cmyk_color(c: f32, m: f32, y: f32, k: f32) -> Color {
    let k = 1.0 - k.clamp(0.0, 1.0);
    rgb_color((1.0 - c.clamp(0.0, 1.0)) * k, (1.0 - m.clamp(0.0, 1.0)) * k, (1.0 - y.clamp(0.0, 1.0)) * k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// Single-page PDF whose content stream is `content`
    fn drawing_pdf(media_box: [i64; 4], content: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => media_box.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("fixture should serialize");
        bytes
    }

    fn dark(image: &RgbaImage, x: u32, y: u32) -> bool {
        image.get_pixel(x, y).0[0] < 128
    }

    #[test]
    fn reads_page_count_and_media_box() {
        let pdf = PdfDocument::open(drawing_pdf([0, 0, 200, 100], "")).expect("open should succeed");

        assert_eq!(pdf.page_count(), 1);
        assert_eq!(pdf.page_size(0).unwrap(), PageSize { width_pt: 200.0, height_pt: 100.0 });
    }

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! { "Type" => "Page", "Parent" => pages_id });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 150.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();

        let pdf = PdfDocument::open(bytes).unwrap();

        assert_eq!(pdf.page_size(0).unwrap(), PageSize { width_pt: 300.0, height_pt: 150.0 });
    }

    #[test]
    fn render_size_follows_scale() {
        let pdf = PdfDocument::open(drawing_pdf([0, 0, 200, 100], "")).unwrap();

        let image = pdf.render_page(RenderRequest { page_index: 0, scale: 1.5 }).unwrap();

        assert_eq!(image.dimensions(), (300, 150));
        assert_eq!(image.get_pixel(150, 75).0, [255, 255, 255, 255]);
    }

    #[test]
    fn strokes_are_painted_with_y_axis_flipped() {
        // horizontal line 20pt above the bottom edge
        let pdf = PdfDocument::open(drawing_pdf([0, 0, 200, 100], "4 w 10 20 m 190 20 l S")).unwrap();

        let image = pdf.render_page(RenderRequest { page_index: 0, scale: 2.0 }).unwrap();

        assert!(dark(&image, 200, 160));
        assert!(!dark(&image, 200, 40));
    }

    #[test]
    fn filled_rectangle_respects_color_and_ctm() {
        let pdf = PdfDocument::open(drawing_pdf(
            [0, 0, 100, 100],
            "q 1 0 0 1 50 50 cm 1 0 0 rg 0 0 20 20 re f Q",
        ))
        .unwrap();

        let image = pdf.render_page(RenderRequest::default()).unwrap();

        assert_eq!(image.get_pixel(60, 40).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(10, 90).0, [255, 255, 255, 255]);
    }

    #[test]
    fn rejects_bad_scale_and_page_index() {
        let pdf = PdfDocument::open(drawing_pdf([0, 0, 10, 10], "")).unwrap();

        assert!(matches!(
            pdf.render_page(RenderRequest { page_index: 0, scale: 0.0 }),
            Err(PdfEngineError::InvalidScale(_))
        ));
        assert!(matches!(
            pdf.page_size(3),
            Err(PdfEngineError::PageOutOfRange { page: 3, page_count: 1 })
        ));
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let err = PdfDocument::open(b"not a pdf".to_vec()).unwrap_err();
        assert!(matches!(err, PdfEngineError::Parse(_)));
    }
}
