//! Image utility functions

use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView};

use crate::engine::FaceLocation;

/// Decode image from bytes (JPEG, PNG, etc.)
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(data).context("Failed to decode image")?;
    Ok(img)
}

/// Encode image to JPEG bytes
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    let mut buffer = std::io::Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, image::ImageFormat::Jpeg)?;
    Ok(buffer.into_inner())
}

/// Crop a face region, clamped to the image bounds
pub fn crop_face(image: &DynamicImage, location: &FaceLocation) -> DynamicImage {
    let (width, height) = image.dimensions();
    let left = location.left.min(width);
    let top = location.top.min(height);
    let right = location.right.min(width);
    let bottom = location.bottom.min(height);

    image.crop_imm(left, top, right.saturating_sub(left), bottom.saturating_sub(top))
}

/// `data:` URL for an inline JPEG
pub fn jpeg_data_url(bytes: &[u8]) -> String {
    use base64::Engine;
    format!(
        "data:image/jpeg;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
