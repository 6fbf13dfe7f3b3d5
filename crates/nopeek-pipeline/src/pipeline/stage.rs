// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stage sub-states.
//
// Each stage moves forward through its own sub-states and never regresses.
// `StageSlide` is what the slide controller holds: it only tracks whether the
// stage has been pre-rendered and whether it has gone live.

use nopeek_core::error::NoPeekError;
use tracing::trace;

use crate::slider::Slide;

/// The ordered stages of a sanitization session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    EraseExif,
    Faces,
    Sensitive,
}

impl StageKind {
    pub const ORDER: [StageKind; 3] = [Self::EraseExif, Self::Faces, Self::Sensitive];

    pub fn index(&self) -> usize {
        match self {
            Self::EraseExif => 0,
            Self::Faces => 1,
            Self::Sensitive => 2,
        }
    }

    /// Stage at a slide index; indices past the end map to the last stage.
    pub fn at(index: usize) -> Self {
        Self::ORDER[index.min(Self::ORDER.len() - 1)]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::EraseExif => "erase_exif",
            Self::Faces => "faces",
            Self::Sensitive => "sensitive",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::EraseExif => "Erase EXIF",
            Self::Faces => "Face Masking",
            Self::Sensitive => "Information Masking",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExifStage {
    Idling,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceStage {
    Idling,
    Detecting,
    Detected,
    Masking,
    BeforeDone,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitiveStage {
    Idling,
    Masking,
    BeforeDone,
    Done,
}

impl ExifStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idling => "idling",
            Self::Done => "done",
        }
    }
}

impl FaceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idling => "idling",
            Self::Detecting => "detecting",
            Self::Detected => "detected",
            Self::Masking => "masking",
            Self::BeforeDone => "beforedone",
            Self::Done => "done",
        }
    }
}

impl SensitiveStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idling => "idling",
            Self::Masking => "masking",
            Self::BeforeDone => "beforedone",
            Self::Done => "done",
        }
    }
}

/// A stage together with its current sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EraseExif(ExifStage),
    Faces(FaceStage),
    Sensitive(SensitiveStage),
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Self::EraseExif(_) => StageKind::EraseExif,
            Self::Faces(_) => StageKind::Faces,
            Self::Sensitive(_) => StageKind::Sensitive,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            Self::EraseExif(s) => s.as_str(),
            Self::Faces(s) => s.as_str(),
            Self::Sensitive(s) => s.as_str(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(
            self,
            Self::EraseExif(ExifStage::Done)
                | Self::Faces(FaceStage::Done)
                | Self::Sensitive(SensitiveStage::Done)
        )
    }

    /// Build the error for `action` attempted in this stage's current state.
    pub fn reject(&self, action: &'static str) -> NoPeekError {
        NoPeekError::InvalidAction {
            stage: self.name(),
            state: self.state_name(),
            action,
        }
    }
}

/// A stage as mounted in the slide controller.
#[derive(Debug, Clone)]
pub struct StageSlide {
    kind: StageKind,
    pre_rendered: bool,
    activated: bool,
}

impl StageSlide {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            pre_rendered: false,
            activated: false,
        }
    }

    /// One slide per stage, in order.
    pub fn sequence() -> Vec<StageSlide> {
        StageKind::ORDER.into_iter().map(Self::new).collect()
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn was_pre_rendered(&self) -> bool {
        self.pre_rendered
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Mark the stage live. Returns false if it already was.
    pub(crate) fn activate(&mut self) -> bool {
        !std::mem::replace(&mut self.activated, true)
    }
}

impl Slide for StageSlide {
    fn pre_render(&mut self) {
        trace!(stage = self.kind.name(), "pre-render");
        self.pre_rendered = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_names_stage_and_state() {
        let err = Stage::Faces(FaceStage::Masking).reject("mask_faces");
        assert_eq!(err.to_string(), "mask_faces is not allowed while faces is masking");
    }

    #[test]
    fn activation_happens_once() {
        let mut slide = StageSlide::new(StageKind::EraseExif);
        assert!(slide.activate());
        assert!(!slide.activate());
        assert!(!slide.was_pre_rendered());
    }

    #[test]
    fn sequence_follows_stage_order() {
        let slides = StageSlide::sequence();
        assert_eq!(slides.len(), 3);
        for (i, slide) in slides.iter().enumerate() {
            assert_eq!(slide.kind().index(), i);
            assert_eq!(StageKind::at(i), slide.kind());
        }
        assert_eq!(StageKind::at(7), StageKind::Sensitive);
    }
}
