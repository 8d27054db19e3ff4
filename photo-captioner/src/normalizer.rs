//! Thumbnail encoding normalization.
//!
//! The inference server only gets JPEG. Anything else the store hands back
//! (PNG, WebP, ...) is decoded and re-encoded; JPEG passes through untouched.

use crate::types::{CaptionerError, Result};
use base64::{engine::general_purpose, Engine};
use image::error::{ImageFormatHint, UnsupportedError, UnsupportedErrorKind};
use image::{codecs::jpeg::JpegEncoder, DynamicImage, ImageError, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Image bytes together with the format they were detected as.
#[derive(Debug, Clone)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
}

impl ImageBlob {
    /// Detects the format and fully decodes once, so corrupt data is rejected
    /// even when the header looks like JPEG.
    pub fn decode(bytes: Vec<u8>) -> Result<(Self, DynamicImage)> {
        let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| CaptionerError::ImageDecode(ImageError::IoError(e)))?;
        let format = reader.format().ok_or_else(|| {
            CaptionerError::ImageDecode(ImageError::Unsupported(UnsupportedError::from_format_and_kind(
                ImageFormatHint::Unknown,
                UnsupportedErrorKind::Format(ImageFormatHint::Unknown),
            )))
        })?;
        let decoded = reader.decode().map_err(CaptionerError::ImageDecode)?;
        Ok((Self { bytes, format }, decoded))
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }
}

/// Returns JPEG bytes for `data`: the input itself if it already is JPEG,
/// otherwise a re-encode at the encoder's default quality.
pub fn ensure_jpeg(data: Vec<u8>) -> Result<ImageBlob> {
    let (blob, decoded) = ImageBlob::decode(data)?;
    if blob.format == ImageFormat::Jpeg {
        return Ok(blob);
    }

    debug!("Re-encoding {:?} thumbnail as JPEG", blob.format);
    // JPEG has no alpha channel.
    let rgb = decoded.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new(&mut out)
        .encode_image(&rgb)
        .map_err(CaptionerError::ImageEncode)?;

    Ok(ImageBlob {
        bytes: out,
        format: ImageFormat::Jpeg,
    })
}
