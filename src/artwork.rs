//! Cover art validation and normalization.
//!
//! Fetched images must decode. WebP images may carry alpha and are not
//! embeddable everywhere, so they are flattened to RGB and re-encoded as JPEG.
//! Everything else is passed through byte for byte.

use std::io::Cursor;

use image::ImageFormat;
use tracing::{debug, info};

use crate::error::{EmbedError, Result};

/// Cover art ready to embed.
#[derive(Debug, Clone)]
pub struct CoverArt {
    /// Encoded image bytes.
    pub data: Vec<u8>,
    /// Format of `data`.
    pub format: ImageFormat,
    /// Whether `data` was re-encoded from the fetched bytes.
    pub converted: bool,
}

/// Whether a format has to be flattened before embedding.
pub fn needs_flattening(format: ImageFormat) -> bool {
    matches!(format, ImageFormat::WebP)
}

/// Validate fetched image bytes and normalize them for embedding.
///
/// # Errors
///
/// Returns `ImageFetchFailed` if the bytes are not a decodable image.
pub fn normalize(bytes: &[u8]) -> Result<CoverArt> {
    let format = image::guess_format(bytes).map_err(EmbedError::image)?;
    let img = image::load_from_memory_with_format(bytes, format).map_err(EmbedError::image)?;
    debug!(
        "Decoded {:?} cover art ({}x{}, {} bytes)",
        format,
        img.width(),
        img.height(),
        bytes.len()
    );

    if !needs_flattening(format) {
        return Ok(CoverArt {
            data: bytes.to_vec(),
            format,
            converted: false,
        });
    }

    info!("Converting {:?} cover art to JPEG", format);
    let rgb = img.into_rgb8();
    let mut buffer = Vec::with_capacity(rgb.len());
    rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .map_err(EmbedError::image)?;

    Ok(CoverArt {
        data: buffer,
        format: ImageFormat::Jpeg,
        converted: true,
    })
}
