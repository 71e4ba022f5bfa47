/// Application-level constants
pub const APP_NAME: &str = "pagetext";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment override for the OCR rendering resolution.
pub const ENV_OCR_DPI: &str = "PAGETEXT_OCR_DPI";
/// Environment override for an explicit tessdata directory.
pub const ENV_TESSDATA_DIR: &str = "PAGETEXT_TESSDATA_DIR";
/// Environment override for the native-text sufficiency threshold.
pub const ENV_MIN_NATIVE_TEXT: &str = "PAGETEXT_MIN_NATIVE_TEXT";

/// Log filter used when `RUST_LOG` is unset or unparsable.
///
/// Debug builds log per-page decisions; release builds stay at `info`.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "pagetext=debug,warn"
    } else {
        "pagetext=info,warn"
    }
}
