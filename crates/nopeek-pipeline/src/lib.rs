// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// NoPeek — Sanitization flow: gesture classification, slide transitions, the
// staged pipeline over a single picture, the processing service client and
// the gallery built from stored filenames.

pub mod abort;
pub mod exif;
pub mod gallery;
pub mod gesture;
pub mod pipeline;
pub mod preview;
pub mod service;
pub mod slider;

pub use abort::AbortHandle;
pub use gallery::{GalleryEntry, ImagePair};
pub use gesture::{GestureClassifier, GestureEvent, NavigationIntent, TouchEvent, TouchPoint};
pub use pipeline::{Completion, Pipeline, PipelineContext, Stage, StageKind};
pub use service::{FaceRegion, HttpProcessingService, ProcessingService};
pub use slider::{Slide, SlideController, SlideState, SlideTransition};
