//! FrameCodec - Transport Encoding
//!
//! JPEG (quality 75) then base64, because the observer channel is a
//! text/JSON-framed protocol. Encoding failure is non-fatal to the unit:
//! the caller logs and skips that camera for the tick.

use crate::camera_source::Frame;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;

/// JPEG quality on a 0-100 scale
const JPEG_QUALITY: u8 = 75;

/// Encode a raw frame into a base64 JPEG payload
pub fn encode_base64(frame: &Frame) -> Result<String> {
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    encoder
        .encode(
            frame.image.as_raw(),
            frame.image.width(),
            frame.image.height(),
            image::ColorType::Rgb8,
        )
        .map_err(|e| Error::Encode(format!("jpeg encode failed: {}", e)))?;

    Ok(STANDARD.encode(&jpeg))
}
