// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filename identity codec.
//
// Stored images carry their whole history in the filename:
//
//   <base>_<flags>.<ext>
//
// `base` is a random alphanumeric token shared by an original and its
// sanitized sibling. `flags` is either the literal `origin` or the
// concatenation of two-letter codes, in canonical order, for every
// transformation that was applied:
//
//   ee  EXIF erased          lp  license plate masked
//   fb  face blurred         df  document file masked
//   fc  face cartooned       ic  ID card masked
//   fs  face stickered       gm  geolocation masked

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{NoPeekError, Result};
use crate::types::AlterationRecord;

/// Flags segment of an unprocessed original.
pub const ORIGIN_MARKER: &str = "origin";

/// Length of generated base tokens.
pub const BASE_TOKEN_LEN: usize = 24;

const BASE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Flag codes in the order they are written.
pub const FLAG_CODES: [&str; 8] = ["ee", "fb", "fc", "fs", "lp", "df", "ic", "gm"];

/// The opaque token shared by both halves of an image pair.
///
/// Restricted to ASCII alphanumerics, so it can never contain the `_`
/// delimiter and the filename grammar stays unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BaseToken(String);

impl BaseToken {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(NoPeekError::InvalidBaseToken(token));
        }
        Ok(Self(token))
    }

    /// A fresh random token of [`BASE_TOKEN_LEN`] characters.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let token = (0..BASE_TOKEN_LEN)
            .map(|_| BASE_ALPHABET[rng.gen_range(0..BASE_ALPHABET.len())] as char)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BaseToken {
    type Error = NoPeekError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BaseToken> for String {
    fn from(token: BaseToken) -> Self {
        token.0
    }
}

impl fmt::Display for BaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extensions the grammar accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageExtension {
    #[default]
    Jpg,
    Jpeg,
    Png,
    Gif,
}

impl ImageExtension {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
        }
    }

    /// Exact (case-sensitive) match, as the grammar requires.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpg | Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
        }
    }
}

/// The segments of a filename that follows the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFilename<'a> {
    pub base: &'a str,
    /// `None` when the name has no `_` at all; `Some("")` for `<base>_.<ext>`.
    pub flags: Option<&'a str>,
    pub ext: ImageExtension,
}

impl<'a> ParsedFilename<'a> {
    /// Split a filename into base, flags and extension.
    ///
    /// The base runs up to the first `_` before the final `.<ext>`; everything
    /// between that `_` and the extension is the flags segment.
    pub fn parse(filename: &'a str) -> Option<Self> {
        let (stem, ext) = filename.rsplit_once('.')?;
        let ext = ImageExtension::from_extension(ext)?;
        if stem.contains('\n') {
            return None;
        }
        let (base, flags) = match stem.split_once('_') {
            Some((base, flags)) => (base, Some(flags)),
            None => (stem, None),
        };
        Some(Self { base, flags, ext })
    }

    pub fn is_original(&self) -> bool {
        self.flags == Some(ORIGIN_MARKER)
    }

    /// The record the flags describe, or `None` for originals and empty flags.
    pub fn record(&self) -> Option<AlterationRecord> {
        let flags = self.flags.filter(|f| !f.is_empty() && *f != ORIGIN_MARKER)?;
        Some(AlterationRecord {
            exif_erased: flags.contains("ee"),
            face_blurred: flags.contains("fb"),
            face_cartooned: flags.contains("fc"),
            face_stickered: flags.contains("fs"),
            license_plate_masked: flags.contains("lp"),
            document_file_masked: flags.contains("df"),
            id_card_masked: flags.contains("ic"),
            geolocation_masked: flags.contains("gm"),
        })
    }
}

/// A filename produced by [`encode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilenameId(String);

impl FilenameId {
    /// Accept an existing filename if it follows the grammar.
    pub fn parse(filename: impl Into<String>) -> Result<Self> {
        let filename = filename.into();
        if ParsedFilename::parse(&filename).is_none() {
            return Err(NoPeekError::InvalidFilename(filename));
        }
        Ok(Self(filename))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> ParsedFilename<'_> {
        // Construction guarantees the grammar holds.
        ParsedFilename::parse(&self.0).unwrap_or(ParsedFilename {
            base: &self.0,
            flags: None,
            ext: ImageExtension::Jpg,
        })
    }

    pub fn base(&self) -> &str {
        self.parts().base
    }

    pub fn flags(&self) -> Option<&str> {
        self.parts().flags
    }

    pub fn extension(&self) -> ImageExtension {
        self.parts().ext
    }

    pub fn is_original(&self) -> bool {
        self.parts().is_original()
    }

    pub fn record(&self) -> Option<AlterationRecord> {
        self.parts().record()
    }
}

impl fmt::Display for FilenameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FilenameId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The flags segment for a record, codes in canonical order.
pub fn flag_string(record: &AlterationRecord) -> String {
    let set = [
        record.exif_erased,
        record.face_blurred,
        record.face_cartooned,
        record.face_stickered,
        record.license_plate_masked,
        record.document_file_masked,
        record.id_card_masked,
        record.geolocation_masked,
    ];
    FLAG_CODES
        .iter()
        .zip(set)
        .filter(|(_, on)| *on)
        .map(|(code, _)| *code)
        .collect()
}

/// Build the filename for a picture.
///
/// `None` marks the unprocessed original (`<base>_origin.<ext>`). A record
/// with nothing set yields `<base>_.<ext>`.
pub fn encode(base: &BaseToken, record: Option<&AlterationRecord>, ext: ImageExtension) -> FilenameId {
    let flags = match record {
        None => ORIGIN_MARKER.to_string(),
        Some(record) => flag_string(record),
    };
    FilenameId(format!("{base}_{flags}.{}", ext.as_str()))
}

/// Base token of a stored filename, `None` if it does not follow the grammar.
pub fn decode_base(filename: &str) -> Option<&str> {
    ParsedFilename::parse(filename).map(|p| p.base)
}

/// Applied transformations encoded in a filename.
pub fn decode_record(filename: &str) -> Option<AlterationRecord> {
    ParsedFilename::parse(filename)?.record()
}

/// Whether the filename is the `origin` half of a pair.
pub fn is_original(filename: &str) -> bool {
    ParsedFilename::parse(filename).is_some_and(|p| p.is_original())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Alteration, FaceMaskStyle, SensitiveKind};

    fn base(s: &str) -> BaseToken {
        BaseToken::new(s).unwrap()
    }

    /// Every record with at most one face flag set.
    fn valid_records() -> Vec<AlterationRecord> {
        let mut out = Vec::new();
        for bits in 0u8..32 {
            for face in [None, Some(FaceMaskStyle::Blur), Some(FaceMaskStyle::Sticker), Some(FaceMaskStyle::Cartoon)] {
                let mut r = AlterationRecord {
                    exif_erased: bits & 1 != 0,
                    license_plate_masked: bits & 2 != 0,
                    document_file_masked: bits & 4 != 0,
                    id_card_masked: bits & 8 != 0,
                    geolocation_masked: bits & 16 != 0,
                    ..Default::default()
                };
                if let Some(style) = face {
                    r.apply(Alteration::FaceMasked(style));
                }
                out.push(r);
            }
        }
        out
    }

    #[test]
    fn original_encoding() {
        let id = encode(&base("abc123"), None, ImageExtension::Jpg);
        assert_eq!(id.as_str(), "abc123_origin.jpg");
        assert!(is_original(id.as_str()));
        assert_eq!(decode_record(id.as_str()), None);
    }

    #[test]
    fn canonical_flag_order() {
        let mut record = AlterationRecord::default();
        record.apply(Alteration::Sensitive(SensitiveKind::LicensePlate));
        record.apply(Alteration::FaceMasked(FaceMaskStyle::Sticker));
        record.apply(Alteration::ExifErased);
        let id = encode(&base("abc123"), Some(&record), ImageExtension::Png);
        assert_eq!(id.as_str(), "abc123_eefslp.png");
    }

    #[test]
    fn empty_record_has_empty_flags() {
        let id = encode(&base("abc123"), Some(&AlterationRecord::default()), ImageExtension::Jpg);
        assert_eq!(id.as_str(), "abc123_.jpg");
        assert_eq!(decode_record(id.as_str()), None);
        assert!(!is_original(id.as_str()));
        assert_eq!(decode_base(id.as_str()), Some("abc123"));
    }

    #[test]
    fn record_round_trip() {
        let token = BaseToken::generate();
        for record in valid_records() {
            let id = encode(&token, Some(&record), ImageExtension::Jpg);
            assert_eq!(decode_base(id.as_str()), Some(token.as_str()));
            if record.is_empty() {
                assert_eq!(decode_record(id.as_str()), None);
            } else {
                assert_eq!(decode_record(id.as_str()), Some(record), "{id}");
                assert!(!is_original(id.as_str()));
            }
        }
    }

    #[test]
    fn codes_are_tested_independently() {
        // Not producible by the encoder, but the decoder does not care.
        let record = decode_record("abc_fbfc.jpg").unwrap();
        assert!(record.face_blurred && record.face_cartooned);
        assert_eq!(record.face_flag_count(), 2);
    }

    #[test]
    fn base_stops_at_first_underscore() {
        let parsed = ParsedFilename::parse("a_b_c.jpeg").unwrap();
        assert_eq!(parsed.base, "a");
        assert_eq!(parsed.flags, Some("b_c"));
        assert_eq!(parsed.ext, ImageExtension::Jpeg);
    }

    #[test]
    fn name_without_flags_segment() {
        let parsed = ParsedFilename::parse("holiday.png").unwrap();
        assert_eq!(parsed.base, "holiday");
        assert_eq!(parsed.flags, None);
        assert!(!parsed.is_original());
    }

    #[test]
    fn malformed_names_do_not_parse() {
        assert_eq!(decode_base("abc_origin.bmp"), None);
        assert_eq!(decode_base("abc_origin.JPG"), None);
        assert_eq!(decode_base("abc_origin"), None);
        assert!(!is_original("abc_origin.tiff"));
        assert!(FilenameId::parse("notes.txt").is_err());
    }

    #[test]
    fn base_token_rejects_delimiters() {
        assert!(BaseToken::new("abc_def").is_err());
        assert!(BaseToken::new("").is_err());
        assert!(BaseToken::new("abc.def").is_err());
        assert!(BaseToken::new("Abc123").is_ok());
    }

    #[test]
    fn generated_tokens_are_valid() {
        let token = BaseToken::generate();
        assert_eq!(token.as_str().len(), BASE_TOKEN_LEN);
        assert!(BaseToken::new(token.as_str()).is_ok());
        assert_ne!(token, BaseToken::generate());
    }

    #[test]
    fn filename_id_accessors() {
        let id = FilenameId::parse("abc123_eelp.jpg").unwrap();
        assert_eq!(id.base(), "abc123");
        assert_eq!(id.flags(), Some("eelp"));
        assert_eq!(id.extension(), ImageExtension::Jpg);
        let record = id.record().unwrap();
        assert!(record.exif_erased && record.license_plate_masked);
        assert!(!record.document_file_masked);
    }
}
