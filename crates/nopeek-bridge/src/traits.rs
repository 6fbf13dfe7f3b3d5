// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native image persistence.
//
// The native file manager is callback based; here every call is an awaitable
// operation with an explicit `Result`, carrying the same fields.

use async_trait::async_trait;
use nopeek_core::error::Result;

/// A stored image read back from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// `data:<mime>;base64,<payload>` of the file contents.
    pub data_url: String,
    /// Pixel width, 0 when the bytes could not be probed.
    pub width: u32,
    /// Pixel height, 0 when the bytes could not be probed.
    pub height: u32,
}

/// Save/list/read/delete images by filename.
///
/// Filenames are the durable record of what was done to an image, so
/// implementations must store them verbatim.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Human-readable backend name (e.g. "filesystem", "memory").
    fn backend_name(&self) -> &str;

    /// Persist an image. `image` may be a data URL or bare base64.
    /// Returns a backend message (the saved location) on success.
    async fn save(&self, image: &str, filename: &str) -> Result<String>;

    /// Read a stored image back as a data URL with its dimensions.
    async fn read(&self, filename: &str) -> Result<StoredImage>;

    /// All stored image filenames, newest first.
    async fn list(&self) -> Result<Vec<String>>;

    /// Remove a stored image.
    async fn delete(&self, filename: &str) -> Result<()>;
}

/// Strip an optional `data:...;base64,` prefix, leaving the payload.
pub fn clean_base64(image: &str) -> &str {
    match image.split_once("base64,") {
        Some((_, payload)) => payload,
        None => image,
    }
}

/// Probe the pixel dimensions of encoded image bytes.
pub fn probe_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

/// MIME type sniffed from the encoded bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Gif) => "image/gif",
        Ok(image::ImageFormat::Bmp) => "image/bmp",
        Ok(image::ImageFormat::Tiff) => "image/tiff",
        Ok(image::ImageFormat::WebP) => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_base64_strips_prefix() {
        assert_eq!(clean_base64("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(clean_base64("AAAA"), "AAAA");
    }

    #[test]
    fn sniff_unknown_bytes() {
        assert_eq!(sniff_mime(b"hello"), "application/octet-stream");
        assert_eq!(probe_dimensions(b"hello"), None);
    }
}
