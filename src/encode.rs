//! PNG/base64 conversion for images sent to the Image API.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::Error;
use crate::render::Bitmap;

/// Encode an image as PNG bytes.
pub fn png_bytes(image: &DynamicImage) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| Error::Image(e.to_string()))?;
    Ok(buf)
}

/// Encode a rendered bitmap as a base64 PNG.
pub fn bitmap_to_base64(bitmap: &Bitmap) -> Result<String, Error> {
    image_to_base64(&DynamicImage::ImageRgb8(bitmap.clone()))
}

/// Encode an image as a base64 PNG.
pub fn image_to_base64(image: &DynamicImage) -> Result<String, Error> {
    let png = png_bytes(image)?;
    tracing::debug!("Encoded PNG: {} bytes", png.len());
    Ok(STANDARD.encode(png))
}

/// Decode an uploaded file (PNG, JPEG, GIF or BMP).
pub fn decode_image(data: &[u8]) -> Result<DynamicImage, Error> {
    image::load_from_memory(data).map_err(|_| Error::InvalidInput("Invalid image file".to_string()))
}

/// Stretch an image to exactly `width` x `height` with Lanczos3 filtering.
///
/// The aspect ratio is not preserved.
pub fn resize_to_screen(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_exact(width, height, FilterType::Lanczos3)
}

/// Decode an upload, fit it to the screen and return it as a base64 PNG.
pub fn prepare_upload(data: &[u8], width: u32, height: u32) -> Result<String, Error> {
    let image = decode_image(data)?;
    image_to_base64(&resize_to_screen(&image, width, height))
}
