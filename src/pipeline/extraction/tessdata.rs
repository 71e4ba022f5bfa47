//! Locating Tesseract's `tessdata` directory.
//!
//! Resolution order, first match wins:
//! 1. `TESSDATA_PREFIX` pointing at the tessdata directory itself,
//!    then `TESSERACT_HOME` pointing at its parent (`<dir>/tessdata`)
//! 2. Package-manager install locations for the current platform
//!
//! A candidate matches only when it holds `<language>.traineddata`.
//! Nothing is cached; the probe calls this at most once per run.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Points directly at the tessdata directory.
pub const TESSDATA_PREFIX_ENV: &str = "TESSDATA_PREFIX";
/// Points at the directory containing `tessdata/`.
pub const TESSERACT_HOME_ENV: &str = "TESSERACT_HOME";

/// The slice of the process environment the resolver looks at.
pub trait Environment: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
    fn is_file(&self, path: &Path) -> bool;
}

/// The real process environment and filesystem.
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|value| !value.trim().is_empty())
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

#[cfg(target_os = "linux")]
const PLATFORM_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
];

#[cfg(target_os = "macos")]
const PLATFORM_TESSDATA_DIRS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/local/share/tessdata",
];

#[cfg(target_os = "windows")]
const PLATFORM_TESSDATA_DIRS: &[&str] = &[
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const PLATFORM_TESSDATA_DIRS: &[&str] = &["/usr/local/share/tessdata", "/usr/share/tessdata"];

pub struct TessdataResolver {
    env: Box<dyn Environment>,
    well_known: Vec<PathBuf>,
}

impl TessdataResolver {
    /// Resolver over the real environment and this platform's install paths.
    pub fn system() -> Self {
        Self::new(
            Box::new(SystemEnvironment),
            PLATFORM_TESSDATA_DIRS.iter().map(PathBuf::from).collect(),
        )
    }

    pub fn new(env: Box<dyn Environment>, well_known: Vec<PathBuf>) -> Self {
        Self { env, well_known }
    }

    /// Find a tessdata directory holding the model for `language`.
    pub fn resolve(&self, language: &str) -> Option<PathBuf> {
        let model = format!("{language}.traineddata");
        let found = self
            .candidates()
            .into_iter()
            .find(|dir| self.env.is_file(&dir.join(&model)));

        match &found {
            Some(dir) => debug!(dir = %dir.display(), language, "Resolved tessdata directory"),
            None => debug!(language, "No tessdata directory found, using engine default"),
        }
        found
    }

    fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::with_capacity(self.well_known.len() + 2);
        if let Some(dir) = self.env.var(TESSDATA_PREFIX_ENV) {
            candidates.push(PathBuf::from(dir));
        }
        if let Some(parent) = self.env.var(TESSERACT_HOME_ENV) {
            candidates.push(PathBuf::from(parent).join("tessdata"));
        }
        candidates.extend(self.well_known.iter().cloned());
        candidates
    }
}
