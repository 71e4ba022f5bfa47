//! Per-page text extraction with an OCR fallback.
//!
//! Native text-layer extraction is tried first for every page. Pages whose
//! text layer is blank or too short are rendered and run through Tesseract,
//! and the two results are merged. When the OCR engine cannot run in this
//! process the pipeline degrades to native text only instead of failing.

pub mod config;
pub mod pipeline;

pub use pipeline::extraction::{
    merge_text, CapabilityState, ExtractionError, ExtractionOptions, OcrError, Page,
    PageExtractor, PageSource, PdfiumDocument,
};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// Honors `RUST_LOG`, falling back to [`config::default_log_filter`].
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
