use std::num::NonZeroUsize;

use serde::Serialize;

use super::ExtractionError;

/// Final text of a single document page.
///
/// Page numbers are 1-based. An empty `text` means nothing could be
/// extracted for the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    page_number: NonZeroUsize,
    text: String,
}

impl Page {
    pub fn new(page_number: NonZeroUsize, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }

    pub fn page_number(&self) -> usize {
        self.page_number.get()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

/// A rendered raster of one page, PNG-encoded.
///
/// Owned by whoever requested the render; dropping it frees the buffer.
#[derive(Debug, Clone)]
pub struct PageImage {
    page_index: usize,
    width: u32,
    height: u32,
    png: Vec<u8>,
}

impl PageImage {
    pub fn new(page_index: usize, width: u32, height: u32, png: Vec<u8>) -> Self {
        Self {
            page_index,
            width,
            height,
            png,
        }
    }

    /// Zero-based index of the page this image was rendered from.
    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }
}

/// Document backend: native text per page and page rasterization.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> Result<usize, ExtractionError>;

    /// Native text layer of one page (1-based). `None` when the page has no
    /// text layer at all.
    fn native_text(&self, page_number: usize) -> Result<Option<String>, ExtractionError>;

    /// Render one page (0-based index) at the given resolution.
    fn render_page(&self, page_index: usize, dpi: u32) -> Result<PageImage, ExtractionError>;
}
