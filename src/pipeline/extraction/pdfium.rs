//! PDF backend via Google PDFium.
//!
//! Supplies the native text layer of each page and renders pages to PNG for
//! OCR. The document bytes are held in memory; each operation binds a fresh
//! `Pdfium` instance because the upstream type is `!Send`. The OS caches
//! `dlopen`/`LoadLibrary` calls, so repeat loads are near-free.

use std::io::Cursor;
use std::path::Path;

use image::ImageOutputFormat;
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};

use super::types::{PageImage, PageSource};
use super::ExtractionError;

/// Maximum dimension (width or height) for rendered page images.
/// Prevents OOM on extremely large pages or absurd DPI settings.
const MAX_DIMENSION_PX: u32 = 4096;

/// PDF points per inch (standard PDF unit).
const POINTS_PER_INCH: f32 = 72.0;

/// A PDF document loaded into memory.
pub struct PdfiumDocument {
    file_name: Option<String>,
    bytes: Vec<u8>,
    page_count: usize,
}

impl PdfiumDocument {
    /// Read and validate a PDF file.
    pub fn open(path: &Path) -> Result<Self, ExtractionError> {
        info!(path = %path.display(), "Opening PDF");
        let bytes = std::fs::read(path)?;
        let mut document = Self::from_bytes(bytes)?;
        document.file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Ok(document)
    }

    /// Validate an in-memory PDF. Fails when PDFium cannot load it.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ExtractionError> {
        let pdfium = load_pdfium()?;
        let page_count = {
            let document = pdfium
                .load_pdf_from_byte_slice(&bytes, None)
                .map_err(map_load_error)?;
            document.pages().len() as usize
        };
        info!(pages = page_count, "PDF loaded");

        Ok(Self {
            file_name: None,
            bytes,
            page_count,
        })
    }

    /// File name of the document when it was opened from disk.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Load the document and run `op` on one page (0-based).
    fn with_page<T>(
        &self,
        page_index: usize,
        op: impl FnOnce(&PdfPage<'_>) -> Result<T, ExtractionError>,
    ) -> Result<T, ExtractionError> {
        let pdfium = load_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(&self.bytes, None)
            .map_err(map_load_error)?;
        let pages = document.pages();

        let index = u16::try_from(page_index).map_err(|_| ExtractionError::PageText {
            page: page_index + 1,
            reason: format!("Page index {page_index} exceeds u16 maximum"),
        })?;

        let page = pages.get(index).map_err(|_| ExtractionError::PageText {
            page: page_index + 1,
            reason: format!(
                "Page {} out of range (document has {} pages)",
                page_index + 1,
                pages.len()
            ),
        })?;

        op(&page)
    }
}

/// Load the PDFium dynamic library.
///
/// Discovery order:
/// 1. `PDFIUM_DYNAMIC_LIB_PATH` env var (explicit path)
/// 2. Alongside the running executable
/// 3. System library search paths
fn load_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var("PDFIUM_DYNAMIC_LIB_PATH") {
        debug!(path = %path, "Loading PDFium from env var");
        let bindings = Pdfium::bind_to_library(&path).map_err(|e| {
            ExtractionError::PdfiumUnavailable(format!("Failed to load PDFium from {path}: {e}"))
        })?;
        return Ok(Pdfium::new(bindings));
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let lib_path =
            Pdfium::pdfium_platform_library_name_at_path(exe_dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            debug!(dir = %exe_dir.display(), "Loaded PDFium next to executable");
            return Ok(Pdfium::new(bindings));
        }
    }

    let bindings = Pdfium::bind_to_system_library().map_err(|e| {
        ExtractionError::PdfiumUnavailable(format!(
            "PDFium library not found. Set PDFIUM_DYNAMIC_LIB_PATH or install PDFium: {e}"
        ))
    })?;
    Ok(Pdfium::new(bindings))
}

/// Map PDF load errors, detecting encrypted PDFs.
fn map_load_error(e: PdfiumError) -> ExtractionError {
    let msg = format!("{e}");
    let lower = msg.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfParsing(format!("Failed to load PDF: {e}"))
    }
}

/// Compute pixel dimensions for rendering, applying the dimension guard.
///
/// Returns (width_px, height_px), both clamped to [1, MAX_DIMENSION_PX].
/// Preserves aspect ratio when capping.
fn compute_render_dimensions(width_points: f32, height_points: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let raw_w = (width_points * scale).max(1.0);
    let raw_h = (height_points * scale).max(1.0);

    let max_dim = raw_w.max(raw_h);
    if max_dim > MAX_DIMENSION_PX as f32 {
        let ratio = MAX_DIMENSION_PX as f32 / max_dim;
        let w = ((raw_w * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        let h = ((raw_h * ratio) as u32).clamp(1, MAX_DIMENSION_PX);
        (w, h)
    } else {
        (raw_w as u32, raw_h as u32)
    }
}

impl PageSource for PdfiumDocument {
    fn page_count(&self) -> Result<usize, ExtractionError> {
        Ok(self.page_count)
    }

    fn native_text(&self, page_number: usize) -> Result<Option<String>, ExtractionError> {
        let page_index = page_number
            .checked_sub(1)
            .ok_or_else(|| ExtractionError::PageText {
                page: page_number,
                reason: "Page numbers start at 1".into(),
            })?;

        self.with_page(page_index, |page| {
            let text = page.text().map_err(|e| ExtractionError::PageText {
                page: page_number,
                reason: format!("Text layer unreadable: {e}"),
            })?;
            Ok(Some(text.all()))
        })
    }

    fn render_page(&self, page_index: usize, dpi: u32) -> Result<PageImage, ExtractionError> {
        let rendering_error = |reason: String| ExtractionError::PdfRendering {
            page: page_index + 1,
            reason,
        };

        self.with_page(page_index, |page| {
            let width_points = page.width().value;
            let height_points = page.height().value;
            let (target_w, target_h) = compute_render_dimensions(width_points, height_points, dpi);

            let uncapped_w = (width_points * dpi as f32 / POINTS_PER_INCH) as u32;
            let uncapped_h = (height_points * dpi as f32 / POINTS_PER_INCH) as u32;
            if target_w != uncapped_w || target_h != uncapped_h {
                warn!(
                    page = page_index + 1,
                    raw_width = uncapped_w,
                    raw_height = uncapped_h,
                    capped_width = target_w,
                    capped_height = target_h,
                    "Page dimensions capped to {MAX_DIMENSION_PX}px",
                );
            }

            let config = PdfRenderConfig::new()
                .set_target_width(target_w as i32)
                .set_maximum_height(target_h as i32);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| rendering_error(format!("Rendering failed: {e}")))?;

            let dynamic_image = bitmap.as_image();
            let mut cursor = Cursor::new(Vec::new());
            dynamic_image
                .write_to(&mut cursor, ImageOutputFormat::Png)
                .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encoding failed: {e}")))?;

            let png_bytes = cursor.into_inner();

            debug!(
                page = page_index + 1,
                dpi,
                width = target_w,
                height = target_h,
                png_size = png_bytes.len(),
                "Rendered PDF page to PNG"
            );

            Ok(PageImage::new(page_index, target_w, target_h, png_bytes))
        })
    }
}
