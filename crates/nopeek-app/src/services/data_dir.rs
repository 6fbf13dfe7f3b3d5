// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Where NoPeek keeps its config and stored images.

use std::path::{Path, PathBuf};

use nopeek_core::error::Result;

/// Directory holding stored images, relative to the data dir.
pub const IMAGES_DIR: &str = "Images";

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "NOPEEK_DATA_DIR";

/// Resolve and create the data directory.
///
/// An explicit `root` wins, then `$NOPEEK_DATA_DIR`, then the XDG location.
pub fn resolve(root: Option<PathBuf>) -> Result<PathBuf> {
    let dir = root.unwrap_or_else(|| default_location(|key| std::env::var(key).ok()));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// The image store directory under `root`, created if missing.
pub fn images_dir(root: &Path) -> Result<PathBuf> {
    let dir = root.join(IMAGES_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

fn default_location(env: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = env(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    let share = env("XDG_DATA_HOME")
        .filter(|d| !d.is_empty())
        .map(PathBuf::from)
        .or_else(|| env("HOME").map(|home| Path::new(&home).join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir);
    share.join("nopeek")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_of<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn override_beats_xdg() {
        let env = env_of(&[(DATA_DIR_ENV, "/srv/np"), ("XDG_DATA_HOME", "/xdg")]);
        assert_eq!(default_location(env), PathBuf::from("/srv/np"));
    }

    #[test]
    fn xdg_then_home() {
        let env = env_of(&[("XDG_DATA_HOME", "/xdg"), ("HOME", "/home/u")]);
        assert_eq!(default_location(env), PathBuf::from("/xdg/nopeek"));

        let env = env_of(&[("XDG_DATA_HOME", ""), ("HOME", "/home/u")]);
        assert_eq!(default_location(env), PathBuf::from("/home/u/.local/share/nopeek"));
    }

    #[test]
    fn explicit_root_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("nested").join("data");
        let dir = resolve(Some(root.clone())).unwrap();
        assert_eq!(dir, root);
        assert!(images_dir(&dir).unwrap().is_dir());
    }
}
