// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for NoPeek.

use thiserror::Error;

/// Top-level error type for all NoPeek operations.
#[derive(Debug, Error)]
pub enum NoPeekError {
    // -- Processing service --
    #[error("processing service request failed: {0}")]
    Service(String),

    #[error("invalid image data URL: {0}")]
    InvalidDataUrl(String),

    // -- Identity codec --
    #[error("filename does not follow the <base>_<flags>.<ext> grammar: {0}")]
    InvalidFilename(String),

    #[error("base token must be non-empty ASCII alphanumerics, got {0:?}")]
    InvalidBaseToken(String),

    #[error("unknown option: {0}")]
    UnknownOption(String),

    // -- Pipeline / slides --
    #[error("{action} is not allowed while {stage} is {state}")]
    InvalidAction {
        stage: &'static str,
        state: &'static str,
        action: &'static str,
    },

    #[error("a slide transition is already in progress")]
    TransitionInProgress,

    #[error("operation cancelled: the sanitization session was abandoned")]
    Cancelled,

    // -- Images --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Storage / persistence --
    #[error("image store error: {0}")]
    Store(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NoPeekError>;
