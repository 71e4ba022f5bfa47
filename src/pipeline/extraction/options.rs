use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config;

/// Default rendering DPI for OCR.
pub const DEFAULT_OCR_DPI: u32 = 300;

/// Native text shorter than this (in characters) is augmented with OCR.
pub const DEFAULT_MIN_NATIVE_TEXT_LENGTH: usize = 32;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OptionsError {
    #[error("OCR DPI must be positive")]
    ZeroDpi,

    #[error("Tessdata directory does not exist or is not a directory: {0}")]
    TessdataNotADirectory(PathBuf),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

/// Settings for one extraction run. Validated on construction, immutable after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionOptions {
    ocr_dpi: u32,
    tessdata_dir: Option<PathBuf>,
    min_native_text_length: usize,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            ocr_dpi: DEFAULT_OCR_DPI,
            tessdata_dir: None,
            min_native_text_length: DEFAULT_MIN_NATIVE_TEXT_LENGTH,
        }
    }
}

impl ExtractionOptions {
    pub fn builder() -> ExtractionOptionsBuilder {
        ExtractionOptionsBuilder::default()
    }

    /// Defaults overridden by `PAGETEXT_*` environment variables.
    pub fn from_env() -> Result<Self, OptionsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, OptionsError> {
        Self::builder().apply_lookup(lookup)?.build()
    }

    pub fn ocr_dpi(&self) -> u32 {
        self.ocr_dpi
    }

    pub fn tessdata_dir(&self) -> Option<&Path> {
        self.tessdata_dir.as_deref()
    }

    pub fn min_native_text_length(&self) -> usize {
        self.min_native_text_length
    }

    /// Start a builder pre-filled with these values.
    pub fn to_builder(&self) -> ExtractionOptionsBuilder {
        ExtractionOptionsBuilder {
            ocr_dpi: self.ocr_dpi,
            tessdata_dir: self.tessdata_dir.clone(),
            min_native_text_length: self.min_native_text_length,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionOptionsBuilder {
    ocr_dpi: u32,
    tessdata_dir: Option<PathBuf>,
    min_native_text_length: usize,
}

impl Default for ExtractionOptionsBuilder {
    fn default() -> Self {
        ExtractionOptions::default().to_builder()
    }
}

impl ExtractionOptionsBuilder {
    pub fn ocr_dpi(mut self, dpi: u32) -> Self {
        self.ocr_dpi = dpi;
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata_dir = Some(dir.into());
        self
    }

    pub fn min_native_text_length(mut self, length: usize) -> Self {
        self.min_native_text_length = length;
        self
    }

    /// Apply `PAGETEXT_*` overrides from `lookup`. Empty values are ignored.
    pub fn apply_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, OptionsError> {
        let var = |name: &'static str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(|value| (name, value))
        };

        if let Some((name, value)) = var(config::ENV_OCR_DPI) {
            self.ocr_dpi = value
                .parse()
                .map_err(|_| OptionsError::InvalidEnv { name, value })?;
        }
        if let Some((_, value)) = var(config::ENV_TESSDATA_DIR) {
            self.tessdata_dir = Some(PathBuf::from(value));
        }
        if let Some((name, value)) = var(config::ENV_MIN_NATIVE_TEXT) {
            self.min_native_text_length = value
                .parse()
                .map_err(|_| OptionsError::InvalidEnv { name, value })?;
        }
        Ok(self)
    }

    pub fn build(self) -> Result<ExtractionOptions, OptionsError> {
        if self.ocr_dpi == 0 {
            return Err(OptionsError::ZeroDpi);
        }
        if let Some(dir) = &self.tessdata_dir {
            if !dir.is_dir() {
                return Err(OptionsError::TessdataNotADirectory(dir.clone()));
            }
        }
        Ok(ExtractionOptions {
            ocr_dpi: self.ocr_dpi,
            tessdata_dir: self.tessdata_dir,
            min_native_text_length: self.min_native_text_length,
        })
    }
}
