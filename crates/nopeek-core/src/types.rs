// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the NoPeek sanitization flow.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{NoPeekError, Result};

/// The image being edited.
///
/// `id` is the filename the picture is (or will be) stored under and `src` is
/// a `data:image/...;base64,` URL of the encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
    pub id: String,
    pub src: String,
    pub width: u32,
    pub height: u32,
}

impl Picture {
    pub fn new(id: impl Into<String>, src: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            width,
            height,
        }
    }

    /// Same picture with its encoded bytes replaced.
    pub fn with_src(self, src: String) -> Self {
        Self { src, ..self }
    }

    /// Decode the data URL back into raw encoded bytes.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        DataUrl::parse(&self.src)?.decode()
    }
}

/// A parsed `data:<mime>;base64,<payload>` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl<'a> {
    pub mime: &'a str,
    pub payload: &'a str,
}

impl<'a> DataUrl<'a> {
    /// Split a data URL into its MIME type and base64 payload.
    pub fn parse(url: &'a str) -> Result<Self> {
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| NoPeekError::InvalidDataUrl("missing data: prefix".into()))?;
        let (mime, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| NoPeekError::InvalidDataUrl("missing ;base64, marker".into()))?;
        Ok(Self { mime, payload })
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.payload.trim())
            .map_err(|e| NoPeekError::InvalidDataUrl(format!("bad base64 payload: {e}")))
    }

    /// Encode raw bytes as a data URL.
    pub fn encode(mime: &str, bytes: &[u8]) -> String {
        format!("data:{mime};base64,{}", STANDARD.encode(bytes))
    }

    /// Whether a string looks like a usable processed image from the service.
    pub fn is_image_url(url: &str) -> bool {
        url.starts_with("data:image/") && url.contains("base64,")
    }
}

/// How detected faces are masked. The face stage is an exclusive choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceMaskStyle {
    Blur,
    Sticker,
    Cartoon,
}

impl FaceMaskStyle {
    pub const ALL: [FaceMaskStyle; 3] = [Self::Blur, Self::Sticker, Self::Cartoon];

    /// Wire keyword for `/process_image`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blur => "blur",
            Self::Sticker => "sticker",
            Self::Cartoon => "cartoon",
        }
    }
}

impl std::str::FromStr for FaceMaskStyle {
    type Err = NoPeekError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "blur" => Ok(Self::Blur),
            "sticker" => Ok(Self::Sticker),
            "cartoon" => Ok(Self::Cartoon),
            other => Err(NoPeekError::UnknownOption(format!("face mask style '{other}'"))),
        }
    }
}

/// Sensitive-content categories offered by the last stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveKind {
    LicensePlate,
    DocumentFile,
    /// Reserved: not yet supported by the service.
    IdCard,
    /// Reserved: not yet supported by the service.
    Geolocation,
}

impl SensitiveKind {
    pub const ALL: [SensitiveKind; 4] = [
        Self::LicensePlate,
        Self::DocumentFile,
        Self::IdCard,
        Self::Geolocation,
    ];

    /// Whether the processing service can actually mask this category.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::LicensePlate | Self::DocumentFile)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::LicensePlate => "Mask License Plate",
            Self::DocumentFile => "Mask Document File",
            Self::IdCard => "Mask ID Card",
            Self::Geolocation => "Mask Geolocation",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LicensePlate => "license_plate",
            Self::DocumentFile => "document_file",
            Self::IdCard => "id_card",
            Self::Geolocation => "geolocation",
        }
    }
}

impl std::str::FromStr for SensitiveKind {
    type Err = NoPeekError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| NoPeekError::UnknownOption(format!("sensitive category '{s}'")))
    }
}

/// One applied transformation, as requested by a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alteration {
    ExifErased,
    FaceMasked(FaceMaskStyle),
    Sensitive(SensitiveKind),
}

/// Which transformations have been applied to a picture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlterationRecord {
    pub exif_erased: bool,
    pub face_blurred: bool,
    pub face_cartooned: bool,
    pub face_stickered: bool,
    pub license_plate_masked: bool,
    pub document_file_masked: bool,
    pub id_card_masked: bool,
    pub geolocation_masked: bool,
}

impl AlterationRecord {
    /// Record an alteration. Face masking replaces any earlier face flag so
    /// at most one of them is ever set.
    pub fn apply(&mut self, alteration: Alteration) {
        match alteration {
            Alteration::ExifErased => self.exif_erased = true,
            Alteration::FaceMasked(style) => {
                self.face_blurred = style == FaceMaskStyle::Blur;
                self.face_stickered = style == FaceMaskStyle::Sticker;
                self.face_cartooned = style == FaceMaskStyle::Cartoon;
            }
            Alteration::Sensitive(kind) => match kind {
                SensitiveKind::LicensePlate => self.license_plate_masked = true,
                SensitiveKind::DocumentFile => self.document_file_masked = true,
                SensitiveKind::IdCard => self.id_card_masked = true,
                SensitiveKind::Geolocation => self.geolocation_masked = true,
            },
        }
    }

    /// The face style recorded, if any.
    pub fn face_mask(&self) -> Option<FaceMaskStyle> {
        if self.face_blurred {
            Some(FaceMaskStyle::Blur)
        } else if self.face_stickered {
            Some(FaceMaskStyle::Sticker)
        } else if self.face_cartooned {
            Some(FaceMaskStyle::Cartoon)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of face flags set. Always 0 or 1 for records built via `apply`.
    pub fn face_flag_count(&self) -> usize {
        [self.face_blurred, self.face_cartooned, self.face_stickered]
            .iter()
            .filter(|f| **f)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_masking_is_exclusive() {
        let mut record = AlterationRecord::default();
        record.apply(Alteration::FaceMasked(FaceMaskStyle::Blur));
        record.apply(Alteration::FaceMasked(FaceMaskStyle::Cartoon));
        assert_eq!(record.face_flag_count(), 1);
        assert_eq!(record.face_mask(), Some(FaceMaskStyle::Cartoon));
    }

    #[test]
    fn alterations_are_additive() {
        let mut record = AlterationRecord::default();
        record.apply(Alteration::ExifErased);
        record.apply(Alteration::Sensitive(SensitiveKind::LicensePlate));
        assert!(record.exif_erased);
        assert!(record.license_plate_masked);
        assert!(!record.document_file_masked);
        assert!(!record.is_empty());
    }

    #[test]
    fn data_url_parses_and_round_trips() {
        let url = DataUrl::encode("image/png", &[1, 2, 3]);
        let parsed = DataUrl::parse(&url).unwrap();
        assert_eq!(parsed.mime, "image/png");
        assert_eq!(parsed.decode().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn data_url_rejects_missing_marker() {
        assert!(DataUrl::parse("data:image/png,AAAA").is_err());
        assert!(DataUrl::parse("AAAA").is_err());
    }

    #[test]
    fn processed_image_validation() {
        assert!(DataUrl::is_image_url("data:image/jpeg;base64,AAAA"));
        assert!(!DataUrl::is_image_url("data:text/plain;base64,AAAA"));
        assert!(!DataUrl::is_image_url("data:image/jpeg,AAAA"));
        assert!(!DataUrl::is_image_url(""));
    }

    #[test]
    fn option_names_parse() {
        assert_eq!("Cartoon".parse::<FaceMaskStyle>().unwrap(), FaceMaskStyle::Cartoon);
        assert_eq!("license-plate".parse::<SensitiveKind>().unwrap(), SensitiveKind::LicensePlate);
        assert_eq!("id_card".parse::<SensitiveKind>().unwrap(), SensitiveKind::IdCard);
        assert!(matches!("pixelate".parse::<FaceMaskStyle>(), Err(NoPeekError::UnknownOption(_))));
        assert!("passport".parse::<SensitiveKind>().is_err());
    }

    #[test]
    fn reserved_categories_are_unsupported() {
        assert!(SensitiveKind::LicensePlate.is_supported());
        assert!(!SensitiveKind::IdCard.is_supported());
        assert!(!SensitiveKind::Geolocation.is_supported());
    }
}
