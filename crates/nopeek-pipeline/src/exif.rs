// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lossless EXIF removal for JPEG data URLs.
//
// Walks the marker segments in front of the scan data and drops every APP1
// segment carrying an `Exif\0\0` payload. Everything else, including the
// entropy-coded data, is copied through byte for byte.

use nopeek_core::types::DataUrl;
use tracing::{debug, warn};

const SOI: u8 = 0xD8;
const SOS: u8 = 0xDA;
const EOI: u8 = 0xD9;
const APP1: u8 = 0xE1;
const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Strip EXIF segments from raw JPEG bytes.
///
/// Returns the stripped bytes and the number of segments removed, or `None`
/// when the input is not a well-formed JPEG header.
pub fn strip_exif(bytes: &[u8]) -> Option<(Vec<u8>, usize)> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != SOI {
        return None;
    }

    let mut out = Vec::with_capacity(bytes.len());
    out.extend_from_slice(&bytes[..2]);
    let mut removed = 0;
    let mut pos = 2;

    while pos < bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        // Fill bytes before a marker.
        let mut marker_pos = pos;
        while marker_pos + 1 < bytes.len() && bytes[marker_pos + 1] == 0xFF {
            marker_pos += 1;
        }
        let marker = *bytes.get(marker_pos + 1)?;

        match marker {
            EOI => {
                out.extend_from_slice(&bytes[marker_pos..marker_pos + 2]);
                return Some((out, removed));
            }
            // Standalone markers carry no length.
            0x01 | 0xD0..=0xD7 => {
                out.extend_from_slice(&bytes[marker_pos..marker_pos + 2]);
                pos = marker_pos + 2;
                continue;
            }
            _ => {}
        }

        let len_hi = *bytes.get(marker_pos + 2)? as usize;
        let len_lo = *bytes.get(marker_pos + 3)? as usize;
        let len = (len_hi << 8) | len_lo;
        if len < 2 {
            return None;
        }
        let end = marker_pos + 2 + len;
        if end > bytes.len() {
            return None;
        }

        if marker == SOS {
            out.extend_from_slice(&bytes[marker_pos..]);
            return Some((out, removed));
        }

        let payload = &bytes[marker_pos + 4..end];
        if marker == APP1 && payload.starts_with(EXIF_HEADER) {
            removed += 1;
        } else {
            out.extend_from_slice(&bytes[marker_pos..end]);
        }
        pos = end;
    }

    // Ran out of bytes without reaching the scan.
    None
}

/// Erase EXIF metadata from an image data URL.
///
/// Non-JPEG and malformed inputs come back unchanged.
pub fn erase_exif(src: &str) -> String {
    let parsed = match DataUrl::parse(src) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "cannot erase EXIF from non data URL");
            return src.to_string();
        }
    };
    if parsed.mime != "image/jpeg" && parsed.mime != "image/jpg" {
        debug!(mime = parsed.mime, "no EXIF segments to strip for this format");
        return src.to_string();
    }
    let bytes = match parsed.decode() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "cannot erase EXIF from undecodable payload");
            return src.to_string();
        }
    };
    match strip_exif(&bytes) {
        Some((stripped, removed)) => {
            debug!(removed, "EXIF segments stripped");
            DataUrl::encode(parsed.mime, &stripped)
        }
        None => {
            warn!("JPEG structure not recognised, leaving image untouched");
            src.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(marker: u8, payload: &[u8]) -> Vec<u8> {
        let len = (payload.len() + 2) as u16;
        let mut out = vec![0xFF, marker];
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    fn jpeg_with_exif() -> Vec<u8> {
        let mut jpeg = vec![0xFF, SOI];
        jpeg.extend(segment(0xE0, b"JFIF\0\x01\x01"));
        let mut exif = EXIF_HEADER.to_vec();
        exif.extend_from_slice(b"MM\0*GPSDATA");
        jpeg.extend(segment(APP1, &exif));
        jpeg.extend(segment(APP1, b"http://ns.adobe.com/xap/1.0/\0<x/>"));
        jpeg.extend(segment(SOS, &[1, 2, 3]));
        jpeg.extend_from_slice(&[0x11, 0xFF, 0x00, 0x22, 0xFF, EOI]);
        jpeg
    }

    #[test]
    fn exif_segment_is_removed_and_rest_kept() {
        let input = jpeg_with_exif();
        let (out, removed) = strip_exif(&input).unwrap();
        assert_eq!(removed, 1);
        assert!(!out.windows(EXIF_HEADER.len()).any(|w| w == EXIF_HEADER));
        assert!(out.windows(4).any(|w| w == b"JFIF"));
        assert!(out.windows(3).any(|w| w == b"xap"));
        assert!(out.ends_with(&[0x11, 0xFF, 0x00, 0x22, 0xFF, EOI]));
        assert_eq!(input.len() - out.len(), 4 + EXIF_HEADER.len() + 11);
    }

    #[test]
    fn non_jpeg_is_rejected() {
        assert!(strip_exif(b"\x89PNG\r\n\x1a\n").is_none());
        assert!(strip_exif(&[]).is_none());
    }

    #[test]
    fn truncated_segment_is_rejected() {
        let mut jpeg = vec![0xFF, SOI, 0xFF, 0xE0, 0x00, 0x40, 1, 2];
        assert!(strip_exif(&jpeg).is_none());
        jpeg.truncate(3);
        assert!(strip_exif(&jpeg).is_none());
    }

    #[test]
    fn data_url_round_trip_drops_exif() {
        let url = DataUrl::encode("image/jpeg", &jpeg_with_exif());
        let erased = erase_exif(&url);
        assert_ne!(erased, url);
        let bytes = DataUrl::parse(&erased).unwrap().decode().unwrap();
        assert_eq!(strip_exif(&bytes).unwrap().1, 0);
    }

    #[test]
    fn other_inputs_pass_through() {
        let png = DataUrl::encode("image/png", b"\x89PNG");
        assert_eq!(erase_exif(&png), png);
        let bogus = DataUrl::encode("image/jpeg", b"not a jpeg");
        assert_eq!(erase_exif(&bogus), bogus);
        assert_eq!(erase_exif("plain text"), "plain text");
    }
}
