//! Emote decoding: base64 payload to RGBA pixels.

use super::transport::FetchedImage;
use crate::error::FetchError;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine as _;

/// A decoded emote, ready for the renderer.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// MIME type reported by the backend.
    pub mime: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 pixels.
    pub rgba: Vec<u8>,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DecodedImage({}, {}x{})", self.mime, self.width, self.height)
    }
}

/// Decode a backend payload.
///
/// Accepts plain base64 (padded or not) and `data:` URLs.
pub fn decode_image(fetched: &FetchedImage) -> Result<DecodedImage, FetchError> {
    let payload = fetched.base64.trim();
    let payload = payload
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,").map(|(_, data)| data))
        .unwrap_or(payload);

    let bytes = STANDARD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))?;

    let rgba = image::load_from_memory(&bytes)?.to_rgba8();
    Ok(DecodedImage {
        mime: fetched.mime.clone(),
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
pub(crate) fn png_base64(width: u32, height: u32) -> String {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([255, 0, 0, 255]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    STANDARD.encode(bytes.into_inner())
}
