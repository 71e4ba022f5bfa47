//! Combining native text-layer output with OCR output.

/// Separator placed between native and OCR text when both contribute.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Merge the native text of a page with the OCR text of the same page.
///
/// 1. Blank native text yields the OCR text as-is.
/// 2. Blank OCR text yields the native text.
/// 3. OCR text already contained in the native text adds nothing.
/// 4. Otherwise the OCR text is appended on a new line.
///
/// The containment check is an exact substring match.
pub fn merge_text(native: &str, ocr: &str) -> String {
    if native.trim().is_empty() {
        return ocr.to_string();
    }
    if ocr.trim().is_empty() {
        return native.to_string();
    }
    if native.contains(ocr) {
        return native.to_string();
    }
    format!("{native}{LINE_SEPARATOR}{ocr}")
}
