// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory image store for tests and dry runs.

use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use nopeek_core::error::{NoPeekError, Result};
use nopeek_core::types::DataUrl;

use crate::traits::{ImageStore, StoredImage, clean_base64, probe_dimensions, sniff_mime};

#[derive(Default)]
struct Inner {
    /// Insertion order; the newest entry is last.
    files: Vec<(String, Vec<u8>)>,
    read_only: bool,
}

/// Keeps decoded image bytes keyed by filename.
#[derive(Default)]
pub struct MemoryImageStore {
    inner: Mutex<Inner>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail.
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.lock().expect("image store lock poisoned").read_only = read_only;
    }

    /// Raw bytes stored under `filename`.
    pub fn bytes(&self, filename: &str) -> Option<Vec<u8>> {
        let inner = self.inner.lock().expect("image store lock poisoned");
        inner
            .files
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, bytes)| bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("image store lock poisoned").files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn save(&self, image: &str, filename: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(clean_base64(image).trim())
            .map_err(|_| NoPeekError::Store("failed to parse base64".into()))?;
        let mut inner = self.inner.lock().expect("image store lock poisoned");
        if inner.read_only {
            return Err(NoPeekError::Store("store is read-only".into()));
        }
        inner.files.retain(|(name, _)| name != filename);
        inner.files.push((filename.to_string(), bytes));
        Ok(format!("memory://{filename}"))
    }

    async fn read(&self, filename: &str) -> Result<StoredImage> {
        let bytes = self
            .bytes(filename)
            .ok_or_else(|| NoPeekError::Store(format!("no such image: {filename}")))?;
        let (width, height) = probe_dimensions(&bytes).unwrap_or((0, 0));
        let mime = match sniff_mime(&bytes) {
            "application/octet-stream" => "image/jpeg",
            sniffed => sniffed,
        };
        Ok(StoredImage {
            data_url: DataUrl::encode(mime, &bytes),
            width,
            height,
        })
    }

    async fn list(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().expect("image store lock poisoned");
        Ok(inner.files.iter().rev().map(|(name, _)| name.clone()).collect())
    }

    async fn delete(&self, filename: &str) -> Result<()> {
        let mut inner = self.inner.lock().expect("image store lock poisoned");
        let before = inner.files.len();
        inner.files.retain(|(name, _)| name != filename);
        if inner.files.len() == before {
            return Err(NoPeekError::Store(format!("no such image: {filename}")));
        }
        Ok(())
    }
}
