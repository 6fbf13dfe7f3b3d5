// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Remote detection and masking service.
//
// The service is a black box reached over HTTP+JSON. Every endpoint takes the
// picture as a data URL; masking endpoints answer with a new data URL.

use std::time::Duration;

use async_trait::async_trait;
use nopeek_core::error::{NoPeekError, Result};
use nopeek_core::types::{DataUrl, FaceMaskStyle, Picture, SensitiveKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// A detected face as fractions of the image size, rounded to 3 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl FaceRegion {
    /// Build from an `[x1, y1, x2, y2]` box.
    pub fn from_xyxy([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Self {
            x: round3(x1),
            y: round3(y1),
            width: round3(x2 - x1),
            height: round3(y2 - y1),
        }
    }

    /// Scale to pixel coordinates for an image of `width` x `height`.
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let (w, h) = (width as f64, height as f64);
        PixelRect {
            x: (self.x * w).round() as i32,
            y: (self.y * h).round() as i32,
            width: (self.width * w).round().max(0.0) as u32,
            height: (self.height * h).round().max(0.0) as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// The operations the sanitization pipeline needs from the remote service.
#[async_trait]
pub trait ProcessingService: Send + Sync {
    async fn detect_faces(&self, picture: &Picture) -> Result<Vec<FaceRegion>>;

    /// Returns the masked image as a data URL.
    async fn mask_faces(&self, picture: &Picture, style: FaceMaskStyle) -> Result<String>;

    /// Returns the masked image as a data URL.
    async fn mask_sensitive(&self, picture: &Picture, kinds: &[SensitiveKind]) -> Result<String>;
}

// -- wire types ---------------------------------------------------------------

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    filename: &'a str,
    image_data: &'a str,
}

#[derive(Debug, Deserialize)]
struct Detection {
    #[serde(rename = "type")]
    kind: String,
    bbox_xyxy: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    detections: Option<Vec<Detection>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ProcessImageRequest<'a> {
    filename: &'a str,
    image_data: &'a str,
    #[serde(rename = "type")]
    style: FaceMaskStyle,
}

#[derive(Debug, Serialize)]
struct ProcessDocRequest<'a> {
    filename: &'a str,
    #[serde(rename = "type")]
    kinds: Vec<SensitiveKind>,
    image_data: &'a str,
}

#[derive(Debug, Deserialize)]
struct ProcessedResponse {
    #[serde(default)]
    processed_image: Option<String>,
}

/// Turn an `/upload` body into face regions, ignoring non-face detections.
pub fn parse_detections(body: &str) -> Result<Vec<FaceRegion>> {
    let response: UploadResponse = serde_json::from_str(body)
        .map_err(|e| NoPeekError::Service(format!("malformed detection response: {e}")))?;
    if let Some(error) = response.error.filter(|e| !e.is_empty()) {
        return Err(NoPeekError::Service(error));
    }
    let mut faces = Vec::new();
    for detection in response.detections.unwrap_or_default() {
        if detection.kind != "face" {
            continue;
        }
        match detection.bbox_xyxy[..] {
            [x1, y1, x2, y2] => faces.push(FaceRegion::from_xyxy([x1, y1, x2, y2])),
            _ => {
                return Err(NoPeekError::Service(format!(
                    "face box has {} coordinates, expected 4",
                    detection.bbox_xyxy.len()
                )));
            }
        }
    }
    Ok(faces)
}

/// Extract and validate the data URL from a masking response body.
pub fn parse_processed(body: &str) -> Result<String> {
    let response: ProcessedResponse = serde_json::from_str(body)
        .map_err(|e| NoPeekError::Service(format!("malformed processing response: {e}")))?;
    match response.processed_image {
        Some(image) if DataUrl::is_image_url(&image) => Ok(image),
        Some(_) => Err(NoPeekError::Service("invalid processed image format".into())),
        None => Err(NoPeekError::Service("response has no processed_image".into())),
    }
}

/// `reqwest`-backed client for the processing service.
pub struct HttpProcessingService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProcessingService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NoPeekError::Service(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| NoPeekError::Service(format!("request to {path} failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| NoPeekError::Service(format!("failed to read {path} response: {e}")))?;
        if !status.is_success() {
            warn!(%status, path, "processing service returned an error status");
            return Err(NoPeekError::Service(format!("{path} responded with {status}: {text}")));
        }
        debug!(path, bytes = text.len(), "processing service responded");
        Ok(text)
    }
}

#[async_trait]
impl ProcessingService for HttpProcessingService {
    #[instrument(skip_all, fields(filename = %picture.id))]
    async fn detect_faces(&self, picture: &Picture) -> Result<Vec<FaceRegion>> {
        let body = self
            .post(
                "/upload",
                &UploadRequest {
                    filename: &picture.id,
                    image_data: &picture.src,
                },
            )
            .await?;
        let faces = parse_detections(&body)?;
        debug!(count = faces.len(), "faces detected");
        Ok(faces)
    }

    #[instrument(skip_all, fields(filename = %picture.id, style = style.as_str()))]
    async fn mask_faces(&self, picture: &Picture, style: FaceMaskStyle) -> Result<String> {
        let body = self
            .post(
                "/process_image",
                &ProcessImageRequest {
                    filename: &picture.id,
                    image_data: &picture.src,
                    style,
                },
            )
            .await?;
        parse_processed(&body)
    }

    #[instrument(skip_all, fields(filename = %picture.id, kinds = kinds.len()))]
    async fn mask_sensitive(&self, picture: &Picture, kinds: &[SensitiveKind]) -> Result<String> {
        let kinds: Vec<SensitiveKind> = kinds.iter().copied().filter(|k| k.is_supported()).collect();
        let body = self
            .post(
                "/process_doc",
                &ProcessDocRequest {
                    filename: &picture.id,
                    kinds,
                    image_data: &picture.src,
                },
            )
            .await?;
        parse_processed(&body)
    }
}
