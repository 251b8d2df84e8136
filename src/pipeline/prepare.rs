//! Image preparation: decode, downscale, re-encode as a JPEG data URI.
//!
//! ## Why downscale to a width cap?
//!
//! Vision APIs tile large images and bill per tile, and past ~1 000 px of
//! width a UI screenshot gains nothing the model can use. Capping only the
//! width keeps tall full-page captures readable: a 1440 × 6000 page becomes
//! 1024 × 4267 instead of a squashed thumbnail.
//!
//! ## Why JPEG at 0.7?
//!
//! Screenshots are mostly flat colour and text; at quality 70 the upload is
//! roughly a tenth of the PNG with no loss the model notices. Every image is
//! re-encoded, even when no resize happens, so the provider always receives
//! the same format.
//!
//! ## Why spawn_blocking?
//!
//! Decoding and resampling a 4K screenshot takes tens of milliseconds of pure
//! CPU. [`prepare_async`] moves that onto tokio's blocking pool so the
//! session's caller stays responsive.

use crate::config::GenerationConfig;
use crate::error::Shot2CodeError;
use crate::pipeline::input::SourceImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Media type of every prepared payload.
pub const PREPARED_MEDIA_TYPE: &str = "image/jpeg";

/// The downscaled, re-encoded, transport-ready image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedPayload {
    /// Width after preparation.
    pub width: u32,
    /// Height after preparation.
    pub height: u32,
    /// Width of the decoded source.
    pub original_width: u32,
    /// Height of the decoded source.
    pub original_height: u32,
    /// Base64 of the JPEG bytes (no `data:` prefix).
    pub base64: String,
}

impl PreparedPayload {
    pub fn media_type(&self) -> &'static str {
        PREPARED_MEDIA_TYPE
    }

    /// `data:image/jpeg;base64,…`, ready for an `image_url` content part.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", PREPARED_MEDIA_TYPE, self.base64)
    }

    /// True when preparation changed the pixel dimensions.
    pub fn was_resized(&self) -> bool {
        self.width != self.original_width || self.height != self.original_height
    }
}

/// Decodes, downsamples and re-encodes screenshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePreparer {
    max_width: u32,
    quality: u8,
}

impl ImagePreparer {
    /// `quality` is on the JPEG encoder's 1–100 scale.
    pub fn new(max_width: u32, quality: u8) -> Self {
        Self {
            max_width: max_width.max(1),
            quality: quality.clamp(1, 100),
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.max_width, config.encoder_quality())
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    /// Prepare an image. Blocking; see [`prepare_async`].
    pub fn prepare(&self, source: &SourceImage) -> Result<PreparedPayload, Shot2CodeError> {
        let decoded = image::load_from_memory(source.bytes()).map_err(|e| Shot2CodeError::Decode {
            detail: e.to_string(),
        })?;
        let (original_width, original_height) = (decoded.width(), decoded.height());
        let (width, height) = target_dimensions(original_width, original_height, self.max_width);

        let resized = if (width, height) == (original_width, original_height) {
            decoded
        } else {
            decoded.resize_exact(width, height, FilterType::Triangle)
        };
        let rgb = flatten_on_white(resized);

        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, self.quality);
        encoder
            .encode_image(&DynamicImage::ImageRgb8(rgb))
            .map_err(|e| Shot2CodeError::Encode {
                detail: e.to_string(),
            })?;

        debug!(
            "Prepared image {}x{} → {}x{}, {} bytes JPEG (q={})",
            original_width,
            original_height,
            width,
            height,
            buf.len(),
            self.quality
        );

        Ok(PreparedPayload {
            width,
            height,
            original_width,
            original_height,
            base64: STANDARD.encode(&buf),
        })
    }
}

/// Run [`ImagePreparer::prepare`] on the blocking pool.
pub async fn prepare_async(
    preparer: ImagePreparer,
    source: SourceImage,
) -> Result<PreparedPayload, Shot2CodeError> {
    tokio::task::spawn_blocking(move || preparer.prepare(&source))
        .await
        .map_err(|e| Shot2CodeError::Internal(format!("Prepare task panicked: {}", e)))?
}

/// Output dimensions for a `width × height` source under a width cap.
///
/// Wider sources are scaled by `max_width / width`; the height is rounded to
/// the nearest pixel and never drops below 1.
pub fn target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scale = max_width as f64 / width as f64;
    let scaled_height = (height as f64 * scale).round().max(1.0) as u32;
    (max_width, scaled_height)
}

/// JPEG carries no alpha, so transparent pixels are composited over white.
fn flatten_on_white(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend =
            |channel: u8| -> u8 { ((u16::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8 };
        out.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    out
}
