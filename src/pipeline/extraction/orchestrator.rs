use std::num::NonZeroUsize;

use tracing::{debug, info, trace, warn};

use super::merge::merge_text;
use super::ocr::{default_engine_factory, OcrEngineFactory};
use super::options::ExtractionOptions;
use super::probe::{CapabilityState, OcrCapabilityProbe};
use super::tessdata::TessdataResolver;
use super::types::{Page, PageSource};
use super::ExtractionError;

/// Extracts the text of every page of a document, OCR-ing pages whose native
/// text layer is blank or too short.
///
/// Owns the OCR capability state for its lifetime: once OCR turns out to be
/// unavailable, later documents extracted with the same instance skip it too.
pub struct PageExtractor {
    options: ExtractionOptions,
    probe: OcrCapabilityProbe,
}

impl PageExtractor {
    /// Extractor using this build's OCR engine and the system tessdata lookup.
    pub fn new(options: ExtractionOptions) -> Self {
        Self::with_ocr(options, default_engine_factory(), TessdataResolver::system())
    }

    /// Extractor with an injected OCR engine factory and tessdata resolver.
    pub fn with_ocr(
        options: ExtractionOptions,
        factory: Box<dyn OcrEngineFactory>,
        resolver: TessdataResolver,
    ) -> Self {
        let explicit_tessdata = options.tessdata_dir().map(|dir| dir.to_path_buf());
        Self {
            probe: OcrCapabilityProbe::new(factory, resolver, explicit_tessdata),
            options,
        }
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    pub fn capability_state(&self) -> CapabilityState {
        self.probe.state()
    }

    /// Extract text for every page, in page order.
    ///
    /// Only document-level read failures are returned as errors. Rendering
    /// and OCR failures leave the affected page with its native text.
    pub fn extract_pages(&self, document: &dyn PageSource) -> Result<Vec<Page>, ExtractionError> {
        let total_pages = document.page_count()?;
        debug!(total_pages, "Extracting text from pages");

        let mut pages = Vec::with_capacity(total_pages);
        let mut ocr_attempts = 0usize;

        for page_index in 0..total_pages {
            let page_number = NonZeroUsize::MIN.saturating_add(page_index);
            let native = document
                .native_text(page_number.get())?
                .map(|text| text.trim().to_string())
                .unwrap_or_default();
            trace!(
                page = page_number.get(),
                chars = native.chars().count(),
                "Native text extracted"
            );

            let text = if self.needs_ocr(&native) {
                debug!(
                    page = page_number.get(),
                    native_chars = native.chars().count(),
                    "Native text insufficient; attempting OCR"
                );
                ocr_attempts += 1;
                let ocr = self.ocr_page(document, page_index, page_number.get());
                merge_text(&native, &ocr)
            } else {
                native
            };

            pages.push(Page::new(page_number, text));
        }

        info!(
            pages = pages.len(),
            ocr_attempts,
            ocr_state = ?self.probe.state(),
            "Page extraction complete"
        );

        Ok(pages)
    }

    fn needs_ocr(&self, native: &str) -> bool {
        native.trim().is_empty() || native.chars().count() < self.options.min_native_text_length()
    }

    /// OCR one page. Every failure degrades to an empty string.
    fn ocr_page(&self, document: &dyn PageSource, page_index: usize, page_number: usize) -> String {
        let Some(handle) = self.probe.acquire() else {
            trace!(page = page_number, "OCR unavailable; keeping native text");
            return String::new();
        };

        let image = match document.render_page(page_index, self.options.ocr_dpi()) {
            Ok(image) => image,
            Err(e) => {
                warn!(page = page_number, error = %e, "Failed to render page for OCR");
                return String::new();
            }
        };

        let result = handle.recognize(&image);
        drop(image);

        match result {
            Ok(ocr) => {
                let text = ocr.text.trim().to_string();
                debug!(
                    page = page_number,
                    chars = text.chars().count(),
                    confidence = ocr.confidence,
                    "OCR complete"
                );
                text
            }
            Err(e) => {
                warn!(page = page_number, error = %e, "OCR failed");
                String::new()
            }
        }
    }
}
