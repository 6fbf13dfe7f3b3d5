// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sanitization pipeline.
//
// Drives one picture through erase-EXIF, face masking and sensitive-content
// masking. The pipeline owns the picture and the alteration record; the slide
// controller owns the stage index. A stage's side effects run once, when it
// becomes the live slide, never while it is only pre-rendered.
//
// Service failures are fail-open: the stage still completes, the matching
// flags stay unset, and the failure is logged.

pub mod stage;

use std::sync::Arc;

use nopeek_bridge::ImageStore;
use nopeek_core::config::AppConfig;
use nopeek_core::error::{NoPeekError, Result};
use nopeek_core::identity::{self, BaseToken, FilenameId};
use nopeek_core::types::{Alteration, AlterationRecord, FaceMaskStyle, Picture, SensitiveKind};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::abort::AbortHandle;
use crate::exif;
use crate::gesture::{GestureClassifier, GestureEvent, NavigationIntent, TouchEvent};
use crate::service::{FaceRegion, ProcessingService};
use crate::slider::{SlideController, SlideState, SlideTransition};

pub use stage::{ExifStage, FaceStage, SensitiveStage, Stage, StageKind, StageSlide};

/// Collaborators a pipeline needs, passed in explicitly.
#[derive(Clone)]
pub struct PipelineContext {
    pub service: Arc<dyn ProcessingService>,
    pub store: Arc<dyn ImageStore>,
    pub config: AppConfig,
}

/// Result of finishing a session.
#[derive(Debug, Clone)]
pub struct Completion {
    pub filename: FilenameId,
    pub record: AlterationRecord,
    pub picture: Picture,
    /// Whether the store accepted the sanitized image.
    pub saved: bool,
}

pub struct Pipeline {
    picture: Picture,
    original_src: String,
    base: BaseToken,
    record: AlterationRecord,
    exif: ExifStage,
    faces: FaceStage,
    sensitive: SensitiveStage,
    detected: Vec<FaceRegion>,
    selection: Vec<SensitiveKind>,
    slides: SlideController<StageSlide>,
    gestures: GestureClassifier,
    ctx: PipelineContext,
    abort: AbortHandle,
}

impl Pipeline {
    /// Start a session for a freshly picked photo.
    ///
    /// Generates a base token and saves the untouched picture as
    /// `<base>_origin.<ext>`. A failed save is logged and the session goes on.
    pub async fn begin(mut picture: Picture, ctx: PipelineContext) -> Result<Self> {
        let base = BaseToken::generate();
        let origin = identity::encode(&base, None, ctx.config.image_extension);
        match ctx.store.save(&picture.src, origin.as_str()).await {
            Ok(message) => info!(filename = %origin, %message, "original saved"),
            Err(e) => warn!(filename = %origin, error = %e, "failed to save original"),
        }
        picture.id = origin.to_string();
        Self::start(picture, base, ctx).await
    }

    /// Start a session for a picture whose base token is already known.
    ///
    /// The first stage goes live immediately.
    pub async fn start(picture: Picture, base: BaseToken, ctx: PipelineContext) -> Result<Self> {
        let selection = ctx
            .config
            .default_sensitive
            .iter()
            .copied()
            .filter(SensitiveKind::is_supported)
            .collect();
        let slides = SlideController::new(StageSlide::sequence(), ctx.config.slide);
        let gestures = GestureClassifier::new(ctx.config.slide_threshold_px);
        let mut pipeline = Self {
            original_src: picture.src.clone(),
            picture,
            base,
            record: AlterationRecord::default(),
            exif: ExifStage::Idling,
            faces: FaceStage::Idling,
            sensitive: SensitiveStage::Idling,
            detected: Vec::new(),
            selection,
            slides,
            gestures,
            ctx,
            abort: AbortHandle::new(),
        };
        info!(base = %pipeline.base, filename = %pipeline.picture.id, "sanitization started");
        pipeline.activate_current().await?;
        Ok(pipeline)
    }

    // -- accessors ------------------------------------------------------------

    pub fn picture(&self) -> &Picture {
        &self.picture
    }

    pub fn original_src(&self) -> &str {
        &self.original_src
    }

    pub fn base(&self) -> &BaseToken {
        &self.base
    }

    pub fn record(&self) -> &AlterationRecord {
        &self.record
    }

    pub fn detected_faces(&self) -> &[FaceRegion] {
        &self.detected
    }

    pub fn selection(&self) -> &[SensitiveKind] {
        &self.selection
    }

    pub fn stage(&self, kind: StageKind) -> Stage {
        match kind {
            StageKind::EraseExif => Stage::EraseExif(self.exif),
            StageKind::Faces => Stage::Faces(self.faces),
            StageKind::Sensitive => Stage::Sensitive(self.sensitive),
        }
    }

    /// The stage on the current slide.
    pub fn live_stage(&self) -> Stage {
        self.stage(StageKind::at(self.slides.current_index()))
    }

    pub fn slide(&self, kind: StageKind) -> Option<&StageSlide> {
        self.slides.item(kind.index())
    }

    pub fn slide_state(&self) -> SlideState {
        self.slides.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<SlideState> {
        self.slides.subscribe()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.abort.is_processing()
    }

    // -- navigation -----------------------------------------------------------

    /// Advance one stage once the live stage is done.
    pub async fn slide_to_next(&mut self) -> Result<SlideTransition> {
        let live = self.live_stage();
        self.ensure_live(live.kind(), "slide_to_next")?;
        if !live.is_done() {
            return Err(live.reject("slide_to_next"));
        }
        self.advance(1).await
    }

    /// Jump from a finished erase-EXIF stage straight to sensitive masking.
    pub async fn skip_face_detection(&mut self) -> Result<SlideTransition> {
        self.ensure_live(StageKind::EraseExif, "skip_face_detection")?;
        if self.exif != ExifStage::Done {
            return Err(self.stage(StageKind::EraseExif).reject("skip_face_detection"));
        }
        info!("face detection skipped");
        self.advance(2).await
    }

    /// React to a classified gesture. Only a completed left swipe on a
    /// finished stage moves anything.
    pub async fn handle_gesture(&mut self, event: &GestureEvent) -> Result<Option<SlideTransition>> {
        match NavigationIntent::from_gesture(event) {
            Some(NavigationIntent::Next) if self.live_stage().is_done() => {
                self.slide_to_next().await.map(Some)
            }
            Some(NavigationIntent::Next) => {
                debug!(stage = self.live_stage().name(), "swipe ignored until stage is done");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Feed a raw touch event through the gesture classifier and act on
    /// whatever it completes.
    pub async fn handle_touch(&mut self, event: &TouchEvent) -> Result<Option<SlideTransition>> {
        let mut moved = None;
        for gesture in self.gestures.handle(event) {
            if let Some(transition) = self.handle_gesture(&gesture).await? {
                moved = Some(transition);
            }
        }
        Ok(moved)
    }

    /// Finish a transition whose future was dropped, then run the stage it
    /// landed on.
    pub async fn settle(&mut self) -> Result<Option<SlideTransition>> {
        let Some(transition) = self.slides.settle() else {
            return Ok(None);
        };
        self.activate_current().await?;
        Ok(Some(transition))
    }

    async fn advance(&mut self, offset: isize) -> Result<SlideTransition> {
        let transition = self.slides.slide_by(offset).await?;
        if !transition.is_noop() {
            self.activate_current().await?;
        }
        Ok(transition)
    }

    /// Run the live stage's entry side effects, once.
    async fn activate_current(&mut self) -> Result<()> {
        let Some(slide) = self.slides.current_mut() else {
            return Ok(());
        };
        if !slide.activate() {
            return Ok(());
        }
        let kind = slide.kind();
        info!(stage = kind.name(), "stage live");
        match kind {
            StageKind::EraseExif => self.erase_exif(),
            StageKind::Faces => self.detect_faces().await?,
            StageKind::Sensitive => {}
        }
        Ok(())
    }

    fn ensure_live(&self, kind: StageKind, action: &'static str) -> Result<()> {
        if self.abort.is_aborted() {
            return Err(NoPeekError::Cancelled);
        }
        if self.slides.is_transitioning() {
            return Err(NoPeekError::TransitionInProgress);
        }
        let live = self.live_stage();
        let activated = self.slides.current().is_some_and(StageSlide::is_activated);
        if live.kind() != kind || !activated {
            return Err(live.reject(action));
        }
        Ok(())
    }

    fn apply_alteration(&mut self, alteration: Alteration) {
        debug!(?alteration, "alteration recorded");
        self.record.apply(alteration);
    }

    // -- erase EXIF -----------------------------------------------------------

    fn erase_exif(&mut self) {
        if self.exif != ExifStage::Idling {
            return;
        }
        self.picture.src = exif::erase_exif(&self.picture.src);
        // Set even when the image carried nothing to strip.
        self.apply_alteration(Alteration::ExifErased);
        self.exif = ExifStage::Done;
        info!("EXIF erased");
    }

    // -- faces ----------------------------------------------------------------

    #[instrument(skip(self), fields(filename = %self.picture.id))]
    async fn detect_faces(&mut self) -> Result<()> {
        self.faces = FaceStage::Detecting;
        let outcome = self
            .abort
            .run(self.ctx.service.detect_faces(&self.picture))
            .await;
        match outcome {
            Ok(faces) => {
                info!(count = faces.len(), "faces detected");
                self.detected = faces;
            }
            Err(NoPeekError::Cancelled) => return Err(NoPeekError::Cancelled),
            Err(e) => {
                warn!(error = %e, "face detection failed, continuing without faces");
                self.detected.clear();
            }
        }
        self.faces = FaceStage::Detected;
        Ok(())
    }

    /// Mask detected faces in the chosen style.
    ///
    /// Returns whether the image was changed.
    #[instrument(skip(self), fields(filename = %self.picture.id, style = style.as_str()))]
    pub async fn mask_faces(&mut self, style: FaceMaskStyle) -> Result<bool> {
        self.ensure_live(StageKind::Faces, "mask_faces")?;
        if self.faces != FaceStage::Detected {
            return Err(self.stage(StageKind::Faces).reject("mask_faces"));
        }
        if self.detected.is_empty() {
            debug!("no faces detected, asking the service to mask anyway");
        }
        self.faces = FaceStage::Masking;
        let outcome = self
            .abort
            .run(self.ctx.service.mask_faces(&self.picture, style))
            .await;
        let applied = match outcome {
            Ok(src) => {
                self.picture.src = src;
                self.apply_alteration(Alteration::FaceMasked(style));
                true
            }
            Err(NoPeekError::Cancelled) => return Err(NoPeekError::Cancelled),
            Err(e) => {
                warn!(error = %e, "face masking failed, image left unchanged");
                false
            }
        };
        self.faces = FaceStage::BeforeDone;
        tokio::time::sleep(self.ctx.config.stage_settle()).await;
        self.faces = FaceStage::Done;
        Ok(applied)
    }

    /// Leave faces untouched and move on to sensitive masking.
    pub async fn skip_face_masking(&mut self) -> Result<SlideTransition> {
        self.ensure_live(StageKind::Faces, "skip_face_masking")?;
        if self.faces != FaceStage::Detected {
            return Err(self.stage(StageKind::Faces).reject("skip_face_masking"));
        }
        info!("face masking skipped");
        self.faces = FaceStage::Done;
        self.advance(1).await
    }

    // -- sensitive content ----------------------------------------------------

    /// Choose which categories to mask. Reserved categories are dropped.
    pub fn select_sensitive(&mut self, kinds: &[SensitiveKind]) -> Result<()> {
        self.ensure_live(StageKind::Sensitive, "select_sensitive")?;
        if self.sensitive != SensitiveStage::Idling {
            return Err(self.stage(StageKind::Sensitive).reject("select_sensitive"));
        }
        for kind in kinds.iter().filter(|k| !k.is_supported()) {
            debug!(kind = kind.as_str(), "category not available yet, ignoring");
        }
        self.selection = SensitiveKind::ALL
            .into_iter()
            .filter(|k| k.is_supported() && kinds.contains(k))
            .collect();
        Ok(())
    }

    /// Mask the selected categories.
    ///
    /// With nothing selected the stage completes at once without a service
    /// call. Returns whether the image was changed.
    #[instrument(skip(self), fields(filename = %self.picture.id))]
    pub async fn mask_sensitive(&mut self) -> Result<bool> {
        self.ensure_live(StageKind::Sensitive, "mask_sensitive")?;
        if self.sensitive != SensitiveStage::Idling {
            return Err(self.stage(StageKind::Sensitive).reject("mask_sensitive"));
        }
        if self.selection.is_empty() {
            info!("no categories selected, nothing to mask");
            self.sensitive = SensitiveStage::Done;
            return Ok(false);
        }

        self.sensitive = SensitiveStage::Masking;
        let outcome = self
            .abort
            .run(self.ctx.service.mask_sensitive(&self.picture, &self.selection))
            .await;
        let applied = match outcome {
            Ok(src) => {
                self.picture.src = src;
                for kind in self.selection.clone() {
                    self.apply_alteration(Alteration::Sensitive(kind));
                }
                true
            }
            Err(NoPeekError::Cancelled) => return Err(NoPeekError::Cancelled),
            Err(e) => {
                warn!(error = %e, "sensitive masking failed, image left unchanged");
                false
            }
        };
        self.sensitive = SensitiveStage::BeforeDone;
        tokio::time::sleep(self.ctx.config.stage_settle()).await;
        self.sensitive = SensitiveStage::Done;
        Ok(applied)
    }

    // -- completion -----------------------------------------------------------

    /// Persist the sanitized picture and end the session.
    ///
    /// Allowed once faces are done (skipping sensitive masking) or from the
    /// sensitive stage before or after masking.
    #[instrument(skip(self), fields(base = %self.base))]
    pub async fn navigate_to_gallery(self) -> Result<Completion> {
        let live = self.live_stage();
        self.ensure_live(live.kind(), "navigate_to_gallery")?;
        let allowed = matches!(
            live,
            Stage::Faces(FaceStage::Done)
                | Stage::Sensitive(SensitiveStage::Idling | SensitiveStage::Done)
        );
        if !allowed {
            return Err(live.reject("navigate_to_gallery"));
        }

        let filename = identity::encode(&self.base, Some(&self.record), self.ctx.config.image_extension);
        let saved = match self.ctx.store.save(&self.picture.src, filename.as_str()).await {
            Ok(message) => {
                info!(%filename, %message, "sanitized image saved");
                true
            }
            Err(e) => {
                warn!(%filename, error = %e, "failed to save sanitized image");
                false
            }
        };

        let picture = Picture {
            id: filename.to_string(),
            ..self.picture
        };
        Ok(Completion {
            filename,
            record: self.record,
            picture,
            saved,
        })
    }
}
