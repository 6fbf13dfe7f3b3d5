// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// NoPeek — Core types, filename identity codec and error definitions shared
// across all crates.

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use config::{AppConfig, SlideTimings};
pub use error::NoPeekError;
pub use identity::{BaseToken, FilenameId, ImageExtension};
pub use types::*;
