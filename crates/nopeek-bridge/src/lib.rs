// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! NoPeek — Native image persistence abstractions.
//!
//! The sanitization flow only ever talks to [`traits::ImageStore`]. Desktop
//! builds persist to a directory on disk; on iOS and Android the host app owns
//! the native file manager and the Rust side gets the stub.

pub mod fs;
pub mod memory;
pub mod stub;
pub mod traits;

use std::path::PathBuf;
use std::sync::Arc;

use nopeek_core::error::Result;

pub use fs::FileImageStore;
pub use memory::MemoryImageStore;
pub use stub::StubBridge;
pub use traits::{ImageStore, StoredImage};

/// Retrieves the image store for the target operating system.
///
/// `images_dir` is only used where the Rust side persists images itself.
pub fn platform_store(images_dir: PathBuf) -> Result<Arc<dyn ImageStore>> {
    #[cfg(any(target_os = "ios", target_os = "android"))]
    {
        let _ = images_dir;
        Ok(Arc::new(stub::StubBridge))
    }
    #[cfg(not(any(target_os = "ios", target_os = "android")))]
    {
        Ok(Arc::new(fs::FileImageStore::open(images_dir)?))
    }
}
