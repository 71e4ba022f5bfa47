pub mod types;
pub mod options;
pub mod merge;
pub mod tessdata;
pub mod ocr;
pub mod probe;
pub mod pdfium;
pub mod orchestrator;

#[cfg(test)]
mod testing;

pub use types::*;
pub use options::*;
pub use merge::*;
pub use ocr::{OcrEngine, OcrEngineFactory, OcrError, OcrPageResult};
pub use probe::*;
pub use pdfium::PdfiumDocument;
pub use orchestrator::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDFium library unavailable: {0}")]
    PdfiumUnavailable(String),

    #[error("PDF is encrypted or password-protected")]
    PdfEncrypted,

    #[error("Failed to read text of page {page}: {reason}")]
    PageText { page: usize, reason: String },

    #[error("Failed to render page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("Image processing error: {0}")]
    ImageProcessing(String),
}
