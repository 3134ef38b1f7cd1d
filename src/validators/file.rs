//! File name, size and type checks.

use std::path::Path;

use super::ValidationResult;
use crate::config::IMAGE_EXTENSIONS;

/// Lower-cased extension including the dot, or an empty string.
fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Extension (case-insensitive, with dot) must be in `allowed`.
pub fn validate_file_extension(filename: &str, allowed: &[&str]) -> ValidationResult {
    let ext = extension_of(filename);

    if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
        Ok(())
    } else {
        Err(format!(
            "File extension '{}' is not allowed. Allowed extensions: {}",
            ext,
            allowed.join(", ")
        ))
    }
}

fn human_size(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;

    if bytes < 1024 {
        format!("{} bytes", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / KB)
    } else {
        format!("{:.1} MB", bytes as f64 / MB)
    }
}

pub fn validate_file_size(size: i64, max_size: i64) -> ValidationResult {
    if size > max_size {
        return Err(format!(
            "File size ({:.1} MB) exceeds the maximum allowed size ({})",
            size as f64 / (1024.0 * 1024.0),
            human_size(max_size)
        ));
    }
    Ok(())
}

/// Image check by extension.
pub fn validate_image_file(filename: &str) -> ValidationResult {
    let ext = extension_of(filename);

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(format!(
            "'{}' is not an allowed image format. Allowed formats: {}",
            ext,
            IMAGE_EXTENSIONS.join(", ")
        ))
    }
}

/// Image format recognised from the leading magic bytes.
pub fn sniff_image_format(header: &[u8]) -> Option<&'static str> {
    match header {
        [0xFF, 0xD8, 0xFF, ..] => Some("jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("gif"),
        [b'B', b'M', ..] => Some("bmp"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        _ => None,
    }
}

/// Declared MIME type must be in `allowed`. Parameters such as `; charset=` are ignored.
pub fn validate_mime_type(mime_type: &str, allowed: &[&str]) -> ValidationResult {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if allowed.iter().any(|a| a.eq_ignore_ascii_case(&essence)) {
        Ok(())
    } else {
        Err(format!(
            "File type ({}) is not allowed. Allowed types: {}",
            essence,
            allowed.join(", ")
        ))
    }
}
