// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filesystem-backed image store for desktop builds.
//
// Mirrors the behaviour of the native image file manager: a flat `Images/`
// directory, JPEG output for `.jpg` names, MIME sniffing on read, and listings
// sorted newest first.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use nopeek_core::error::{NoPeekError, Result};
use nopeek_core::types::DataUrl;
use tracing::{debug, info, warn};

use crate::traits::{ImageStore, StoredImage, clean_base64, probe_dimensions, sniff_mime};

/// Extensions that show up in listings.
const LISTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff"];

/// JPEG quality used when a non-JPEG image is saved under a `.jpg` name.
const JPEG_QUALITY: u8 = 80;

/// Image store rooted at a directory on the local filesystem.
pub struct FileImageStore {
    dir: PathBuf,
}

impl FileImageStore {
    /// Open (and create if needed) the images directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!(path = %dir.display(), "image store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a filename inside the store, refusing path components.
    fn path_for(&self, filename: &str) -> Result<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.starts_with('.') {
            return Err(NoPeekError::Store(format!("refusing unsafe filename '{filename}'")));
        }
        Ok(self.dir.join(filename))
    }
}

/// Re-encode as JPEG when the target name says JPEG but the bytes are not.
fn encode_for(filename: &str, bytes: Vec<u8>) -> Result<Vec<u8>> {
    let wants_jpeg = filename.ends_with(".jpg") || filename.ends_with(".jpeg");
    if !wants_jpeg || sniff_mime(&bytes) == "image/jpeg" {
        return Ok(bytes);
    }
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| NoPeekError::ImageError(format!("failed to decode image for saving: {e}")))?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(decoded.to_rgb8())
        .write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))
        .map_err(|e| NoPeekError::ImageError(format!("failed to encode JPEG: {e}")))?;
    debug!(filename, "transcoded image to JPEG");
    Ok(out)
}

fn is_listed(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| LISTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl ImageStore for FileImageStore {
    fn backend_name(&self) -> &str {
        "filesystem"
    }

    async fn save(&self, image: &str, filename: &str) -> Result<String> {
        let path = self.path_for(filename)?;
        let bytes = STANDARD
            .decode(clean_base64(image).trim())
            .map_err(|_| NoPeekError::Store("failed to parse base64".into()))?;
        let bytes = encode_for(filename, bytes)?;

        debug!(path = %path.display(), "saving image");
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            warn!(path = %path.display(), error = %e, "image failed to save");
            NoPeekError::Store(format!("failed to save image: {e}"))
        })?;
        info!(path = %path.display(), bytes = bytes.len(), "image saved");
        Ok(path.display().to_string())
    }

    async fn read(&self, filename: &str) -> Result<StoredImage> {
        let path = self.path_for(filename)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| NoPeekError::Store(format!("failed to read image {filename}: {e}")))?;
        let (width, height) = probe_dimensions(&bytes).unwrap_or((0, 0));
        debug!(filename, width, height, "image read");
        Ok(StoredImage {
            data_url: DataUrl::encode(sniff_mime(&bytes), &bytes),
            width,
            height,
        })
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| NoPeekError::Store(format!("failed to list images: {e}")))?;

        let mut found: Vec<(String, SystemTime)> = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| NoPeekError::Store(format!("failed to list images: {e}")))?
        {
            let path = entry.path();
            if !is_listed(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let meta = entry
                .metadata()
                .await
                .map_err(|e| NoPeekError::Store(format!("failed to get image info: {e}")))?;
            let stamp = meta
                .created()
                .or_else(|_| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((name.to_string(), stamp));
        }

        found.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        debug!(count = found.len(), "listed images");
        Ok(found.into_iter().map(|(name, _)| name).collect())
    }

    async fn delete(&self, filename: &str) -> Result<()> {
        let path = self.path_for(filename)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| NoPeekError::Store(format!("failed to delete image: {e}")))?;
        info!(path = %path.display(), "image removed");
        Ok(())
    }
}
