// MIME resolver: maps a file name's extension to the content type sent to
// Beekeeper when registering an upload. Unknown extensions fall back to a
// generic binary type.

use std::path::Path;

/// Content type used for any extension missing from the table.
pub const FALLBACK_MIME: &str = "application/octet-stream";

/// Resolve the content type of `file_name` from its extension
/// (case-insensitive).
pub fn resolve_mime(file_name: impl AsRef<Path>) -> &'static str {
    let ext = match file_name.as_ref().extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return FALLBACK_MIME,
    };

    match ext.as_str() {
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "csv" => "text/csv",
        _ => FALLBACK_MIME,
    }
}
