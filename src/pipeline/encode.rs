//! Image transcoding: photo bytes → bounded JPEG → base64 `ImageData`.
//!
//! Phone photos of fines arrive as 12-megapixel JPEGs or screenshots as huge
//! PNGs. Neither helps a vision model read a reference number, and both blow
//! up the request body. Every image is therefore decoded, shrunk so its
//! longest edge fits `max_dimension` (never enlarged), and re-encoded as JPEG
//! at a fixed quality before it reaches the inference gateway.

use crate::error::AppealError;
use crate::model::{FileKind, ImagePayload};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

/// Decode, downscale and re-encode an uploaded image.
///
/// Aspect ratio is preserved. Images already within the bound keep their
/// dimensions and are only re-encoded.
pub fn transcode_image(
    bytes: &[u8],
    kind: FileKind,
    max_dimension: u32,
    quality: u8,
) -> Result<ImagePayload, AppealError> {
    let format = match kind {
        FileKind::Png => ImageFormat::Png,
        FileKind::Jpeg => ImageFormat::Jpeg,
        FileKind::Pdf => {
            return Err(AppealError::Internal(
                "transcode_image called with a PDF".into(),
            ))
        }
    };

    let img = image::load_from_memory_with_format(bytes, format).map_err(|e| {
        AppealError::ImageDecodeFailed {
            detail: e.to_string(),
        }
    })?;
    let (src_w, src_h) = (img.width(), img.height());

    let img = bound_dimensions(img, max_dimension);

    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| AppealError::ImageEncodeFailed {
            detail: e.to_string(),
        })?;

    debug!(
        "Transcoded image {}x{} → {}x{} JPEG q{} ({} → {} bytes)",
        src_w,
        src_h,
        rgb.width(),
        rgb.height(),
        quality,
        bytes.len(),
        buf.len()
    );

    Ok(ImagePayload {
        data: buf,
        mime_type: "image/jpeg".to_string(),
        width: rgb.width(),
        height: rgb.height(),
    })
}

/// Shrink `img` so both edges fit within `max_dimension`. Never upscales.
fn bound_dimensions(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    if img.width() <= max_dimension && img.height() <= max_dimension {
        return img;
    }
    img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

/// Wrap a transcoded image as base64 for the multimodal API request body.
///
/// `detail: "high"` lets GPT-4-class models tile the image instead of reading
/// a single low-resolution overview, which is what makes small print legible.
pub fn to_image_data(payload: &ImagePayload) -> ImageData {
    let b64 = STANDARD.encode(&payload.data);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, payload.mime_type.clone()).with_detail("high")
}
