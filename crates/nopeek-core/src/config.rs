// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::ImageExtension;

/// Pacing of a slide transition, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideTimings {
    /// Delay between mounting the pre-rendered slide and starting to move.
    pub pre_render_delay_ms: u64,
    /// Duration of the translation itself.
    pub animation_ms: u64,
    /// Extra wait after the animation before the index is committed.
    pub grace_ms: u64,
    /// Wait after the commit before the pre-render flag is cleared.
    pub settle_ms: u64,
}

impl SlideTimings {
    pub fn pre_render_delay(&self) -> Duration {
        Duration::from_millis(self.pre_render_delay_ms)
    }

    /// Animation plus grace period.
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.animation_ms + self.grace_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// No waiting at all. Used by headless runs.
    pub fn instant() -> Self {
        Self {
            pre_render_delay_ms: 0,
            animation_ms: 0,
            grace_ms: 0,
            settle_ms: 0,
        }
    }
}

impl Default for SlideTimings {
    fn default() -> Self {
        Self {
            pre_render_delay_ms: 100,
            animation_ms: 500,
            grace_ms: 50,
            settle_ms: 100,
        }
    }
}

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the detection/masking service.
    pub service_url: String,
    /// Per-request timeout for the processing service, in seconds.
    pub request_timeout_secs: u64,
    /// Slide transition pacing.
    pub slide: SlideTimings,
    /// Pause between a stage's result arriving and the stage reporting done.
    pub stage_settle_ms: u64,
    /// Minimum single-finger travel, in px, before a move counts as a slide.
    pub slide_threshold_px: f32,
    /// Extension used for stored images.
    pub image_extension: ImageExtension,
    /// Sensitive categories preselected in the last stage.
    pub default_sensitive: Vec<crate::SensitiveKind>,
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stage_settle(&self) -> Duration {
        Duration::from_millis(self.stage_settle_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:8000".into(),
            request_timeout_secs: 30,
            slide: SlideTimings::default(),
            stage_settle_ms: 500,
            slide_threshold_px: 10.0,
            image_extension: ImageExtension::Jpg,
            default_sensitive: vec![
                crate::SensitiveKind::LicensePlate,
                crate::SensitiveKind::DocumentFile,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "service_url": "http://10.0.0.2:9000" }"#).unwrap();
        assert_eq!(config.service_url, "http://10.0.0.2:9000");
        assert_eq!(config.slide, SlideTimings::default());
        assert_eq!(config.stage_settle(), Duration::from_millis(500));
    }

    #[test]
    fn default_transition_includes_grace() {
        assert_eq!(SlideTimings::default().transition(), Duration::from_millis(550));
    }
}
