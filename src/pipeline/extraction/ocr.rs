use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::PageImage;

/// Recognition language. Multi-language OCR is not supported.
pub const OCR_LANGUAGE: &str = "eng";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OcrError {
    #[error("OCR engine is not available in this build: {0}")]
    Unavailable(String),

    #[error("Tessdata not found at: {0}")]
    TessdataNotFound(PathBuf),

    #[error("OCR engine initialization failed: {0}")]
    Init(String),

    #[error("OCR input image rejected: {0}")]
    InvalidImage(String),

    #[error("OCR recognition failed: {0}")]
    Recognition(String),

    #[error("OCR engine failure: {0}")]
    EngineFailure(String),
}

impl OcrError {
    /// Whether the engine itself is unusable, as opposed to one bad call.
    pub fn is_engine_fatal(&self) -> bool {
        match self {
            OcrError::Unavailable(_)
            | OcrError::TessdataNotFound(_)
            | OcrError::Init(_)
            | OcrError::EngineFailure(_) => true,
            OcrError::InvalidImage(_) | OcrError::Recognition(_) => false,
        }
    }
}

/// Raw OCR result from the engine
#[derive(Debug, Clone, PartialEq)]
pub struct OcrPageResult {
    pub text: String,
    /// Mean word confidence in `[0, 1]`.
    pub confidence: f32,
}

/// A constructed OCR engine. Calls are serialized by the caller.
pub trait OcrEngine {
    fn recognize(&mut self, image: &PageImage) -> Result<OcrPageResult, OcrError>;
}

/// Builds the OCR engine. Construction may be expensive and may fail when
/// the native runtime is missing.
pub trait OcrEngineFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn create(
        &self,
        tessdata_dir: Option<&Path>,
        language: &str,
    ) -> Result<Box<dyn OcrEngine + Send>, OcrError>;
}

/// The factory for this build: Tesseract with the `ocr` feature, otherwise
/// one that always reports OCR as unavailable.
pub fn default_engine_factory() -> Box<dyn OcrEngineFactory> {
    #[cfg(feature = "ocr")]
    {
        Box::new(TesseractFactory)
    }
    #[cfg(not(feature = "ocr"))]
    {
        Box::new(UnavailableOcr)
    }
}

/// Factory used when no OCR binding is compiled in.
pub struct UnavailableOcr;

impl OcrEngineFactory for UnavailableOcr {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn create(
        &self,
        _tessdata_dir: Option<&Path>,
        _language: &str,
    ) -> Result<Box<dyn OcrEngine + Send>, OcrError> {
        Err(OcrError::Unavailable(
            "built without the `ocr` feature".into(),
        ))
    }
}

// ── Tesseract ──────────────────────────────────────────────

#[cfg(feature = "ocr")]
pub struct TesseractFactory;

#[cfg(feature = "ocr")]
impl OcrEngineFactory for TesseractFactory {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn create(
        &self,
        tessdata_dir: Option<&Path>,
        language: &str,
    ) -> Result<Box<dyn OcrEngine + Send>, OcrError> {
        Ok(Box::new(BundledTesseract::new(tessdata_dir, language)?))
    }
}

/// Tesseract engine bound to one tessdata directory and language.
///
/// The upstream API consumes the engine when an image is set, so the
/// initialized instance is taken out for each call and put back on success.
/// A call that loses it (bad image) re-initializes on the next call.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: Option<PathBuf>,
    language: String,
    engine: Option<tesseract::Tesseract>,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Initialize with an optional tessdata directory. `None` lets Tesseract
    /// use its compiled-in default location.
    pub fn new(tessdata_dir: Option<&Path>, language: &str) -> Result<Self, OcrError> {
        if let Some(dir) = tessdata_dir {
            if !dir.join(format!("{language}.traineddata")).exists() {
                return Err(OcrError::TessdataNotFound(dir.to_path_buf()));
            }
        }

        let engine = init_tesseract(tessdata_dir, language)?;
        tracing::info!(
            tessdata = ?tessdata_dir,
            language,
            "Tesseract OCR initialized"
        );

        Ok(Self {
            tessdata_dir: tessdata_dir.map(Path::to_path_buf),
            language: language.to_string(),
            engine: Some(engine),
        })
    }
}

#[cfg(feature = "ocr")]
fn init_tesseract(
    tessdata_dir: Option<&Path>,
    language: &str,
) -> Result<tesseract::Tesseract, OcrError> {
    let datapath = tessdata_dir
        .map(|dir| {
            dir.to_str()
                .ok_or_else(|| OcrError::Init("Invalid tessdata path".into()))
        })
        .transpose()?;

    tesseract::Tesseract::new(datapath, Some(language)).map_err(|e| OcrError::Init(format!("{e:?}")))
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn recognize(&mut self, image: &PageImage) -> Result<OcrPageResult, OcrError> {
        let tess = match self.engine.take() {
            Some(tess) => tess,
            None => init_tesseract(self.tessdata_dir.as_deref(), &self.language)
                .map_err(|e| OcrError::EngineFailure(e.to_string()))?,
        };

        let mut tess = tess
            .set_image_from_mem(image.png())
            .map_err(|e| OcrError::InvalidImage(format!("{e:?}")))?;

        // Null text means recognition of this image failed, not the engine.
        let text = tess
            .get_text()
            .map_err(|e| OcrError::Recognition(format!("{e:?}")))?;

        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;
        self.engine = Some(tess);

        Ok(OcrPageResult { text, confidence })
    }
}
