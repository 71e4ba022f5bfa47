//! Test doubles for the extraction pipeline: a scripted document backend
//! and an OCR engine factory that count every call.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::ocr::{OcrEngine, OcrEngineFactory, OcrError, OcrPageResult};
use super::types::{PageImage, PageSource};
use super::ExtractionError;

// ── Document backend ──────────────────────────────────────

/// In-memory document with scripted native text per page.
#[derive(Default)]
pub struct MockPageSource {
    native: Vec<Option<String>>,
    failing_renders: HashSet<usize>,
    failing_native: HashSet<usize>,
    unreadable: bool,
    pub page_count_calls: AtomicUsize,
    pub native_text_calls: AtomicUsize,
    pub render_calls: AtomicUsize,
}

impl MockPageSource {
    pub fn with_pages(native: Vec<Option<String>>) -> Self {
        Self {
            native,
            ..Self::default()
        }
    }

    pub fn from_texts(texts: &[&str]) -> Self {
        Self::with_pages(texts.iter().map(|t| Some(t.to_string())).collect())
    }

    pub fn unreadable() -> Self {
        Self {
            unreadable: true,
            ..Self::default()
        }
    }

    /// Make rendering of the given zero-based page index fail.
    pub fn failing_render(mut self, page_index: usize) -> Self {
        self.failing_renders.insert(page_index);
        self
    }

    /// Make reading the text layer of the given 1-based page fail.
    pub fn failing_native(mut self, page_number: usize) -> Self {
        self.failing_native.insert(page_number);
        self
    }

    pub fn page_counts(&self) -> usize {
        self.page_count_calls.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.render_calls.load(Ordering::SeqCst)
    }

    pub fn native_reads(&self) -> usize {
        self.native_text_calls.load(Ordering::SeqCst)
    }
}

impl PageSource for MockPageSource {
    fn page_count(&self) -> Result<usize, ExtractionError> {
        self.page_count_calls.fetch_add(1, Ordering::SeqCst);
        if self.unreadable {
            return Err(ExtractionError::PdfParsing("not a pdf".into()));
        }
        Ok(self.native.len())
    }

    fn native_text(&self, page_number: usize) -> Result<Option<String>, ExtractionError> {
        self.native_text_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_native.contains(&page_number) {
            return Err(ExtractionError::PageText {
                page: page_number,
                reason: "scripted failure".into(),
            });
        }
        self.native
            .get(page_number - 1)
            .cloned()
            .ok_or_else(|| ExtractionError::PageText {
                page: page_number,
                reason: "out of range".into(),
            })
    }

    fn render_page(&self, page_index: usize, dpi: u32) -> Result<PageImage, ExtractionError> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_renders.contains(&page_index) {
            return Err(ExtractionError::PdfRendering {
                page: page_index,
                reason: "scripted failure".into(),
            });
        }
        Ok(PageImage::new(page_index, dpi, dpi, vec![0x89, b'P', b'N', b'G']))
    }
}

// ── OCR engine ────────────────────────────────────────────

type Script = dyn Fn(&PageImage) -> Result<OcrPageResult, OcrError> + Send + Sync;

#[derive(Default)]
pub struct OcrCounters {
    pub creates: AtomicUsize,
    pub recognitions: AtomicUsize,
    pub tessdata_seen: Mutex<Vec<Option<PathBuf>>>,
}

impl OcrCounters {
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn recognitions(&self) -> usize {
        self.recognitions.load(Ordering::SeqCst)
    }
}

/// Factory whose construction outcome and per-image output are scripted.
#[derive(Clone)]
pub struct ScriptedOcrFactory {
    init_error: Option<OcrError>,
    script: Arc<Script>,
    pub counters: Arc<OcrCounters>,
}

impl ScriptedOcrFactory {
    /// Engine answering `OCR-<page number>` for every image.
    pub fn page_labels() -> Self {
        Self::with_script(|image| Ok(ok_text(&format!("OCR-{}", image.page_index() + 1))))
    }

    pub fn with_script(
        script: impl Fn(&PageImage) -> Result<OcrPageResult, OcrError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            init_error: None,
            script: Arc::new(script),
            counters: Arc::new(OcrCounters::default()),
        }
    }

    /// Factory whose construction always fails with `error`.
    pub fn failing(error: OcrError) -> Self {
        Self {
            init_error: Some(error),
            ..Self::page_labels()
        }
    }
}

pub fn ok_text(text: &str) -> OcrPageResult {
    OcrPageResult {
        text: text.to_string(),
        confidence: 0.9,
    }
}

struct ScriptedEngine {
    script: Arc<Script>,
    counters: Arc<OcrCounters>,
}

impl OcrEngine for ScriptedEngine {
    fn recognize(&mut self, image: &PageImage) -> Result<OcrPageResult, OcrError> {
        self.counters.recognitions.fetch_add(1, Ordering::SeqCst);
        (self.script)(image)
    }
}

impl OcrEngineFactory for ScriptedOcrFactory {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn create(
        &self,
        tessdata_dir: Option<&Path>,
        _language: &str,
    ) -> Result<Box<dyn OcrEngine + Send>, OcrError> {
        self.counters.creates.fetch_add(1, Ordering::SeqCst);
        self.counters
            .tessdata_seen
            .lock()
            .unwrap()
            .push(tessdata_dir.map(Path::to_path_buf));
        if let Some(err) = &self.init_error {
            return Err(err.clone());
        }
        Ok(Box::new(ScriptedEngine {
            script: Arc::clone(&self.script),
            counters: Arc::clone(&self.counters),
        }))
    }
}
