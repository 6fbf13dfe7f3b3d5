// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gallery: original/sanitized pairs rebuilt from filenames alone.

use nopeek_bridge::{ImageStore, StoredImage};
use nopeek_core::error::Result;
use nopeek_core::identity::{FilenameId, decode_base};
use nopeek_core::types::AlterationRecord;
use tracing::{debug, info, warn};

/// An original and its sanitized counterpart sharing one base token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub base: String,
    pub original: FilenameId,
    pub sanitized: FilenameId,
    /// Decoded from the sanitized filename; empty when it carries no flags.
    pub record: AlterationRecord,
}

/// A pair with both images loaded.
#[derive(Debug, Clone)]
pub struct GalleryEntry {
    pub pair: ImagePair,
    pub original: StoredImage,
    pub sanitized: StoredImage,
}

/// Group a listing into pairs.
///
/// Pairs follow the order their originals appear in `names`; when a base has
/// several sanitized files the first listed wins. Names outside the filename
/// grammar and bases missing either half are left out.
pub fn pair_filenames<S: AsRef<str>>(names: &[S]) -> Vec<ImagePair> {
    let parsed: Vec<FilenameId> = names
        .iter()
        .filter_map(|name| {
            let name: &str = name.as_ref();
            match FilenameId::parse(name) {
                Ok(id) => Some(id),
                Err(_) => {
                    debug!(filename = name, "skipping unparseable filename");
                    None
                }
            }
        })
        .collect();

    let mut pairs: Vec<ImagePair> = Vec::new();
    for original in parsed.iter().filter(|id| id.is_original()) {
        let base = original.base();
        if pairs.iter().any(|p| p.base == base) {
            continue;
        }
        let Some(sanitized) = parsed
            .iter()
            .find(|id| !id.is_original() && id.base() == base)
        else {
            debug!(base, "original has no sanitized counterpart");
            continue;
        };
        pairs.push(ImagePair {
            base: base.to_string(),
            original: original.clone(),
            sanitized: sanitized.clone(),
            record: sanitized.record().unwrap_or_default(),
        });
    }
    pairs
}

/// List the store and load every complete pair.
///
/// Pairs whose images cannot be read are skipped with a warning.
pub async fn load_gallery(store: &dyn ImageStore) -> Result<Vec<GalleryEntry>> {
    let names = store.list().await?;
    let pairs = pair_filenames(&names);
    debug!(files = names.len(), pairs = pairs.len(), "gallery listing");

    let mut entries = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let original = store.read(pair.original.as_str()).await;
        let sanitized = store.read(pair.sanitized.as_str()).await;
        match (original, sanitized) {
            (Ok(original), Ok(sanitized)) => entries.push(GalleryEntry {
                pair,
                original,
                sanitized,
            }),
            (Err(e), _) | (_, Err(e)) => {
                warn!(base = %pair.base, error = %e, "failed to load image pair");
            }
        }
    }
    info!(count = entries.len(), "gallery loaded");
    Ok(entries)
}

/// Find the pair for `base` in the current listing.
pub async fn find_pair(store: &dyn ImageStore, base: &str) -> Result<Option<ImagePair>> {
    let names = store.list().await?;
    Ok(pair_filenames(&names).into_iter().find(|p| p.base == base))
}

/// Delete both halves of a pair. Returns how many files were removed; each
/// failure is logged and does not stop the other deletion.
pub async fn delete_pair(store: &dyn ImageStore, pair: &ImagePair) -> usize {
    let mut removed = 0;
    for filename in [&pair.sanitized, &pair.original] {
        match store.delete(filename.as_str()).await {
            Ok(()) => {
                info!(%filename, "image deleted");
                removed += 1;
            }
            Err(e) => warn!(%filename, error = %e, "failed to delete image"),
        }
    }
    removed
}

/// Base token for a stored filename, if it follows the grammar.
pub fn base_of(filename: &str) -> Option<&str> {
    decode_base(filename)
}
