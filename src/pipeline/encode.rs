//! Image encoding for vision uploads: `DynamicImage` → base64 JPEG in `ImageData`.
//!
//! Pages are scaled so the long side fits the upload budget and re-encoded
//! as RGB JPEG. Statement scans are photographs of paper; JPEG at quality 85
//! keeps digits legible at a fraction of the PNG size. `detail: "high"` keeps
//! GPT-4-class models on the full tile budget so small print survives.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::debug;

/// MIME type attached to every vision upload.
pub const VISION_MIME: &str = "image/jpeg";

/// Shrink `img` so neither side exceeds `max_long_side`, keeping aspect ratio.
pub fn fit_long_side(img: &DynamicImage, max_long_side: u32) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    if w.max(h) <= max_long_side || max_long_side == 0 {
        return img.clone();
    }
    img.resize(max_long_side, max_long_side, FilterType::Lanczos3)
}

/// Encode a rendered page for a vision request.
pub fn encode_for_vision(
    img: &DynamicImage,
    max_long_side: u32,
    quality: u8,
) -> Result<ImageData, image::ImageError> {
    let rgb = fit_long_side(img, max_long_side).to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} page → {} bytes base64",
        rgb.width(),
        rgb.height(),
        b64.len()
    );

    Ok(ImageData::new(b64, VISION_MIME).with_detail("high"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn encodes_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 255])));
        let data = encode_for_vision(&img, 2000, 85).expect("encode should succeed");
        assert_eq!(data.mime_type, VISION_MIME);
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        // JPEG SOI marker
        assert_eq!(&decoded[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn long_side_is_capped() {
        let img = DynamicImage::new_rgb8(3000, 1500);
        let fitted = fit_long_side(&img, 2000);
        assert_eq!((fitted.width(), fitted.height()), (2000, 1000));
    }

    #[test]
    fn small_images_are_not_enlarged() {
        let img = DynamicImage::new_rgb8(800, 600);
        let fitted = fit_long_side(&img, 2000);
        assert_eq!((fitted.width(), fitted.height()), (800, 600));
    }
}
