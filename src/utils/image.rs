//! Image payload helpers

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Media type used when sniffing fails.
pub const FALLBACK_IMAGE_MIME: &str = "image/png";

// Enough decoded bytes for every magic number `infer` knows about images.
const SNIFF_PREFIX_CHARS: usize = 64;

/// Guess MIME by inspecting bytes (magic numbers)
pub fn guess_mime_from_bytes(bytes: &[u8]) -> Option<String> {
    infer::get(bytes).map(|k| k.mime_type().to_string())
}

/// Sniff the media type of base64 image data from its leading bytes.
pub fn guess_mime_from_base64(data: &str) -> Option<String> {
    let trimmed = data.trim_start();
    let take = trimmed.len().min(SNIFF_PREFIX_CHARS) / 4 * 4;
    let prefix = trimmed.get(..take)?;
    let bytes = STANDARD.decode(prefix).ok()?;
    guess_mime_from_bytes(&bytes).filter(|m| m.starts_with("image/"))
}

/// Build a `data:` URL, sniffing the media type when none was given.
pub fn to_data_url(data: &str, media_type: Option<&str>) -> String {
    let mime = match media_type {
        Some(m) if !m.trim().is_empty() => m.to_string(),
        _ => guess_mime_from_base64(data).unwrap_or_else(|| {
            tracing::debug!("could not sniff image type; assuming {FALLBACK_IMAGE_MIME}");
            FALLBACK_IMAGE_MIME.to_string()
        }),
    };
    format!("data:{mime};base64,{data}")
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG / minimal JPEG header
    const PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";
    const JPEG: &str = "/9j/4AAQSkZJRgABAQEASABIAAD/2wBDAP//////////////////////////////";

    #[test]
    fn sniffs_png_and_jpeg() {
        assert_eq!(guess_mime_from_base64(PNG).as_deref(), Some("image/png"));
        assert_eq!(guess_mime_from_base64(JPEG).as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn explicit_media_type_wins() {
        assert_eq!(
            to_data_url("AAAA", Some("image/webp")),
            "data:image/webp;base64,AAAA"
        );
    }

    #[test]
    fn unknown_bytes_fall_back() {
        assert_eq!(guess_mime_from_base64("not base64!"), None);
        assert!(to_data_url("AAAAAAAA", None).starts_with("data:image/png;base64,"));
    }
}
