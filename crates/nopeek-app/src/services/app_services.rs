// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — wires configuration, the image store and the
// processing service together and exposes the flows the CLI runs.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use nopeek_bridge::traits::{probe_dimensions, sniff_mime};
use nopeek_bridge::ImageStore;
use nopeek_core::error::{NoPeekError, Result};
use nopeek_core::identity::FilenameId;
use nopeek_core::types::{DataUrl, FaceMaskStyle, Picture, SensitiveKind};
use nopeek_core::AppConfig;
use nopeek_pipeline::gallery::{self, GalleryEntry};
use nopeek_pipeline::pipeline::{Completion, Pipeline, PipelineContext, StageKind};
use nopeek_pipeline::service::{HttpProcessingService, ProcessingService};
use nopeek_pipeline::{preview, slider};
use tracing::{info, warn};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";

/// What to do at each stage of a non-interactive sanitization run.
#[derive(Debug, Clone, Default)]
pub struct SanitizeOptions {
    /// Jump from erase-EXIF straight to sensitive masking.
    pub skip_faces: bool,
    /// Mask detected faces in this style; `None` leaves faces untouched.
    pub face_style: Option<FaceMaskStyle>,
    /// Categories to mask; `None` keeps the configured defaults.
    pub mask: Option<Vec<SensitiveKind>>,
    /// Write a PNG with the detected faces outlined here.
    pub preview: Option<PathBuf>,
}

/// Shared application services.
///
/// All fields are cheaply cloneable (Arc-wrapped).
#[derive(Clone)]
pub struct AppServices {
    store: Arc<dyn ImageStore>,
    service: Arc<dyn ProcessingService>,
    data_dir: PathBuf,
    /// Settings as persisted in `config.json`.
    config: Arc<Mutex<AppConfig>>,
    /// `--service-url` for this run; never written back to disk.
    service_url: Option<String>,
}

impl AppServices {
    /// Initialise all services. Call once at startup.
    ///
    /// `root` overrides the data directory; `service_url` overrides the
    /// configured processing service for this run only.
    pub fn init(root: Option<PathBuf>, service_url: Option<String>) -> Result<Self> {
        let dir = data_dir::resolve(root)?;
        info!(path = %dir.display(), "initialising app services");

        let config = load_config(&dir).unwrap_or_default();
        let url = service_url.clone().unwrap_or_else(|| config.service_url.clone());

        let store = nopeek_bridge::platform_store(data_dir::images_dir(&dir)?)?;
        let service = HttpProcessingService::new(url, config.request_timeout())?;
        info!(
            store = store.backend_name(),
            service = service.base_url(),
            overridden = service_url.is_some(),
            "app services initialised"
        );

        Ok(Self {
            store,
            service: Arc::new(service),
            data_dir: dir,
            config: Arc::new(Mutex::new(config)),
            service_url,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn store(&self) -> &dyn ImageStore {
        self.store.as_ref()
    }

    // -- Configuration -------------------------------------------------------

    /// Return a clone of the persisted config.
    pub fn config(&self) -> AppConfig {
        self.config.lock().expect("config lock poisoned").clone()
    }

    /// The config this run actually uses: the persisted one plus any
    /// command-line override.
    pub fn effective_config(&self) -> AppConfig {
        let mut config = self.config();
        if let Some(url) = &self.service_url {
            config.service_url = url.clone();
        }
        config
    }

    /// Update and persist the config.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        *self.config.lock().expect("config lock poisoned") = config.clone();
        persist_config(&self.data_dir, config)
    }

    fn context(&self) -> PipelineContext {
        PipelineContext {
            service: Arc::clone(&self.service),
            store: Arc::clone(&self.store),
            config: self.effective_config(),
        }
    }

    // -- Sanitization --------------------------------------------------------

    /// Load a photo from disk as a picture with a data URL source.
    pub async fn load_picture(&self, path: &Path) -> Result<Picture> {
        let bytes = tokio::fs::read(path).await?;
        let mime = sniff_mime(&bytes);
        if !mime.starts_with("image/") {
            return Err(NoPeekError::ImageError(format!(
                "{} is not a recognised image",
                path.display()
            )));
        }
        let (width, height) = probe_dimensions(&bytes).unwrap_or((0, 0));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("photo")
            .to_string();
        info!(%name, width, height, "photo loaded");
        Ok(Picture::new(name, DataUrl::encode(mime, &bytes), width, height))
    }

    /// Run a photo through every stage and store the result.
    ///
    /// Ctrl-C abandons the session; whatever the service returns afterwards
    /// is discarded.
    pub async fn sanitize(&self, path: &Path, options: &SanitizeOptions) -> Result<Completion> {
        let picture = self.load_picture(path).await?;
        let mut pipeline = Pipeline::begin(picture, self.context()).await?;

        let abort = pipeline.abort_handle();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, abandoning sanitization");
                abort.abort();
            }
        });

        let outcome = self.drive(&mut pipeline, options).await;
        watcher.abort();
        outcome?;

        let completion = pipeline.navigate_to_gallery().await?;
        if !completion.saved {
            warn!(filename = %completion.filename, "sanitized image was not stored");
        }
        Ok(completion)
    }

    async fn drive(&self, pipeline: &mut Pipeline, options: &SanitizeOptions) -> Result<()> {
        report_stage(pipeline);

        if options.skip_faces {
            pipeline.skip_face_detection().await?;
        } else {
            pipeline.slide_to_next().await?;
            report_stage(pipeline);
            println!("  {} face(s) detected", pipeline.detected_faces().len());

            if let Some(out) = &options.preview {
                match preview::render_preview(pipeline.picture(), pipeline.detected_faces()) {
                    Ok(png) => {
                        tokio::fs::write(out, png).await?;
                        println!("  preview written to {}", out.display());
                    }
                    Err(e) => warn!(error = %e, "could not render face preview"),
                }
            }

            match options.face_style {
                Some(style) => {
                    let changed = pipeline.mask_faces(style).await?;
                    println!("  faces {}", if changed { style.as_str() } else { "unchanged" });
                    pipeline.slide_to_next().await?;
                }
                None => {
                    pipeline.skip_face_masking().await?;
                }
            }
        }

        report_stage(pipeline);
        if let Some(kinds) = &options.mask {
            pipeline.select_sensitive(kinds)?;
        }
        let selected: Vec<&str> = pipeline.selection().iter().map(|k| k.as_str()).collect();
        let changed = pipeline.mask_sensitive().await?;
        println!(
            "  {} {}",
            if selected.is_empty() { "nothing selected".to_string() } else { selected.join(", ") },
            if changed { "masked" } else { "unchanged" }
        );
        Ok(())
    }

    // -- Gallery -------------------------------------------------------------

    pub async fn gallery(&self) -> Result<Vec<GalleryEntry>> {
        gallery::load_gallery(self.store()).await
    }

    /// Delete the pair sharing `base`. Returns how many files were removed.
    pub async fn delete_pair(&self, base: &str) -> Result<usize> {
        let pair = gallery::find_pair(self.store(), base)
            .await?
            .ok_or_else(|| NoPeekError::Store(format!("no image pair with base '{base}'")))?;
        Ok(gallery::delete_pair(self.store(), &pair).await)
    }
}

fn report_stage(pipeline: &Pipeline) {
    let state = pipeline.slide_state();
    let kind = StageKind::at(state.current_index);
    println!(
        "{}  {}",
        slider::progress_row(&state, StageKind::ORDER.len()),
        kind.title()
    );
}

/// Human-readable description of a stored filename.
pub fn describe_filename(name: &str) -> Result<String> {
    let id = FilenameId::parse(name)?;
    let mut out = format!("base:      {}\nextension: {}\n", id.base(), id.extension().as_str());
    if id.is_original() {
        out.push_str("kind:      original\n");
        return Ok(out);
    }
    out.push_str("kind:      sanitized\n");
    let record = id.record().unwrap_or_default();
    let flags = [
        ("exif erased", record.exif_erased),
        ("face blurred", record.face_blurred),
        ("face cartooned", record.face_cartooned),
        ("face stickered", record.face_stickered),
        ("license plate masked", record.license_plate_masked),
        ("document file masked", record.document_file_masked),
        ("id card masked", record.id_card_masked),
        ("geolocation masked", record.geolocation_masked),
    ];
    for (label, set) in flags {
        out.push_str(&format!("  [{}] {label}\n", if set { "x" } else { " " }));
    }
    Ok(out)
}

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use nopeek_core::SlideTimings;

    /// Services over a temp dir, pointed at a port nobody listens on.
    fn offline_services(dir: &Path) -> AppServices {
        let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", closed.local_addr().unwrap());
        drop(closed);

        let config = AppConfig {
            slide: SlideTimings::instant(),
            stage_settle_ms: 0,
            request_timeout_secs: 2,
            ..AppConfig::default()
        };
        persist_config(dir, &config).unwrap();
        AppServices::init(Some(dir.to_path_buf()), Some(url)).unwrap()
    }

    fn write_photo(dir: &Path) -> PathBuf {
        let path = dir.join("IMG_0001.png");
        RgbImage::from_pixel(6, 4, Rgb([30, 60, 90]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();
        path
    }

    #[test]
    fn config_round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let services = AppServices::init(Some(tmp.path().to_path_buf()), None).unwrap();
        let mut config = services.config();
        config.service_url = "http://10.0.0.9:8000".into();
        services.save_config(&config).unwrap();

        let loaded = load_config(tmp.path()).unwrap();
        assert_eq!(loaded.service_url, "http://10.0.0.9:8000");
        assert!(tmp.path().join(data_dir::IMAGES_DIR).is_dir());
    }

    #[test]
    fn one_run_service_url_is_not_persisted() {
        let tmp = tempfile::tempdir().unwrap();
        let services =
            AppServices::init(Some(tmp.path().to_path_buf()), Some("http://one-run:1".into())).unwrap();
        assert_eq!(services.effective_config().service_url, "http://one-run:1");
        assert_eq!(services.config().service_url, AppConfig::default().service_url);

        let mut config = services.config();
        config.request_timeout_secs = 5;
        services.save_config(&config).unwrap();

        let loaded = load_config(tmp.path()).unwrap();
        assert_eq!(loaded.request_timeout_secs, 5);
        assert_eq!(loaded.service_url, AppConfig::default().service_url);
        assert_eq!(services.context().config.service_url, "http://one-run:1");
    }

    #[test]
    fn broken_config_falls_back_to_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(load_config(tmp.path()).is_none());
    }

    #[tokio::test]
    async fn offline_run_still_erases_exif_and_stores_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let services = offline_services(tmp.path());
        let photo = write_photo(tmp.path());

        let options = SanitizeOptions {
            face_style: Some(FaceMaskStyle::Blur),
            ..SanitizeOptions::default()
        };
        let done = services.sanitize(&photo, &options).await.unwrap();

        // Every service call failed, so only the local EXIF step is recorded.
        assert!(done.saved);
        assert!(done.record.exif_erased);
        assert_eq!(done.record.face_mask(), None);
        assert!(!done.record.license_plate_masked);
        assert_eq!(done.filename.flags(), Some("ee"));

        let entries = services.gallery().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].pair.sanitized, done.filename);
        assert_eq!((entries[0].original.width, entries[0].original.height), (6, 4));

        let base = done.filename.base().to_string();
        assert_eq!(services.delete_pair(&base).await.unwrap(), 2);
        assert!(services.gallery().await.unwrap().is_empty());
        assert!(services.delete_pair(&base).await.is_err());
    }

    #[tokio::test]
    async fn non_images_are_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let services = offline_services(tmp.path());
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        assert!(matches!(
            services.load_picture(&path).await,
            Err(NoPeekError::ImageError(_))
        ));
    }

    #[test]
    fn describes_sanitized_and_original_names() {
        let text = describe_filename("abc123_eelp.jpg").unwrap();
        assert!(text.contains("base:      abc123"));
        assert!(text.contains("[x] exif erased"));
        assert!(text.contains("[x] license plate masked"));
        assert!(text.contains("[ ] face blurred"));

        assert!(describe_filename("abc123_origin.png").unwrap().contains("original"));
        assert!(describe_filename("abc123.txt").is_err());
    }
}
