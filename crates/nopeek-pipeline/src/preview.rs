// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Face preview — outline detected faces on a copy of the picture so the user
// can check detection before choosing a mask style.

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use nopeek_core::error::{NoPeekError, Result};
use nopeek_core::types::Picture;
use tracing::{debug, instrument};

use crate::service::FaceRegion;

const OUTLINE: Rgba<u8> = Rgba([56, 189, 248, 255]);

/// Outline stroke width in pixels.
const STROKE: i32 = 3;

/// Decode the picture and draw one outline per face.
#[instrument(skip_all, fields(filename = %picture.id, faces = faces.len()))]
pub fn annotate_faces(picture: &Picture, faces: &[FaceRegion]) -> Result<RgbaImage> {
    let bytes = picture.bytes()?;
    let mut canvas = image::load_from_memory(&bytes)
        .map_err(|e| NoPeekError::ImageError(format!("failed to decode image: {e}")))?
        .to_rgba8();
    let (width, height) = canvas.dimensions();

    for face in faces {
        let px = face.to_pixels(width, height);
        for inset in 0..STROKE {
            let w = px.width as i32 - 2 * inset;
            let h = px.height as i32 - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(px.x + inset, px.y + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut canvas, rect, OUTLINE);
        }
    }
    debug!(width, height, "face outlines drawn");
    Ok(canvas)
}

/// Annotate and encode as PNG.
pub fn render_preview(picture: &Picture, faces: &[FaceRegion]) -> Result<Vec<u8>> {
    let canvas = annotate_faces(picture, faces)?;
    let mut out = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| NoPeekError::ImageError(format!("failed to encode preview: {e}")))?;
    Ok(out.into_inner())
}
