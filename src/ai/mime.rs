use crate::{Error, Result};

/// Sniff the media type of an image attachment from its magic bytes.
///
/// Only formats every provider accepts as vision input are recognised.
pub fn detect_image_mime(bytes: &[u8]) -> Result<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Ok("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Ok("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Ok("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Ok("image/webp"),
        _ => Err(Error::InvalidInput(format!(
            "Unsupported image format (first 4 bytes: {:02X?}); expected JPEG, PNG, GIF or WebP",
            &bytes[..bytes.len().min(4)]
        ))),
    }
}
