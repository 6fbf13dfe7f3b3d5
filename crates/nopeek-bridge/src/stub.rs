// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for mobile builds where image persistence is owned by the host
// application's native module.
//
// Every method returns `PlatformUnavailable`; the host registers its own
// `ImageStore` instead.

use async_trait::async_trait;
use nopeek_core::error::{NoPeekError, Result};

use crate::traits::{ImageStore, StoredImage};

/// No-op store returned when no Rust-side persistence exists.
pub struct StubBridge;

#[async_trait]
impl ImageStore for StubBridge {
    fn backend_name(&self) -> &str {
        "stub"
    }

    async fn save(&self, _image: &str, filename: &str) -> Result<String> {
        tracing::warn!(filename, "ImageStore::save called on stub bridge");
        Err(NoPeekError::PlatformUnavailable)
    }

    async fn read(&self, filename: &str) -> Result<StoredImage> {
        tracing::warn!(filename, "ImageStore::read called on stub bridge");
        Err(NoPeekError::PlatformUnavailable)
    }

    async fn list(&self) -> Result<Vec<String>> {
        tracing::warn!("ImageStore::list called on stub bridge");
        Err(NoPeekError::PlatformUnavailable)
    }

    async fn delete(&self, _filename: &str) -> Result<()> {
        Err(NoPeekError::PlatformUnavailable)
    }
}
