//! Encoders for each output target, built on the `image` codecs.
//!
//! Every function encodes into memory; the caller decides where the bytes go.

use std::io::Cursor;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::codecs::tiff::TiffEncoder;
use image::codecs::webp::WebPEncoder;
use crate::core::{OutputTarget, PngCompression};
use crate::worker::{JobError, JobOutcome};

/// Encodes `image` as baseline JPEG. Alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> JobOutcome<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| JobError::encode(format!("JPEG save failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Encodes `image` as PNG with adaptive filtering.
pub fn encode_png(image: &DynamicImage, compression: PngCompression) -> JobOutcome<Vec<u8>> {
    let compression = match compression {
        PngCompression::Fast => CompressionType::Fast,
        PngCompression::Default => CompressionType::Default,
        PngCompression::Best => CompressionType::Best,
    };

    let mut buf = Cursor::new(Vec::new());
    let encoder = PngEncoder::new_with_quality(&mut buf, compression, PngFilter::Adaptive);
    normalized(image)
        .write_with_encoder(encoder)
        .map_err(|e| JobError::encode(format!("PNG save failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Encodes `image` as uncompressed TIFF, keeping 16-bit depth when present.
pub fn encode_tiff(image: &DynamicImage) -> JobOutcome<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = TiffEncoder::new(&mut buf);
    normalized(image)
        .write_with_encoder(encoder)
        .map_err(|e| JobError::encode(format!("TIFF save failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Encodes `image` as a binary PPM (P6).
pub fn encode_ppm(image: &DynamicImage) -> JobOutcome<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = PnmEncoder::new(&mut buf).with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary));
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| JobError::encode(format!("PPM save failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Encodes `image` as lossless WebP.
pub fn encode_webp(image: &DynamicImage) -> JobOutcome<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = WebPEncoder::new_lossless(&mut buf);
    DynamicImage::ImageRgba8(image.to_rgba8())
        .write_with_encoder(encoder)
        .map_err(|e| JobError::encode(format!("WebP save failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Dispatches to the encoder for `target`.
///
/// Thumbnails are expected to be scaled already; they are written as JPEG.
pub fn encode_target(image: &DynamicImage, target: &OutputTarget) -> JobOutcome<Vec<u8>> {
    match target {
        OutputTarget::Jpeg { quality } => encode_jpeg(image, *quality),
        OutputTarget::Png { compression } => encode_png(image, *compression),
        OutputTarget::Tiff => encode_tiff(image),
        OutputTarget::Ppm => encode_ppm(image),
        OutputTarget::WebP => encode_webp(image),
        OutputTarget::Thumbnail { quality, .. } => encode_jpeg(image, *quality),
    }
}

/// Reduces exotic pixel layouts to the RGB(A) variants every encoder accepts.
fn normalized(image: &DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_)
        | DynamicImage::ImageRgba8(_)
        | DynamicImage::ImageRgb16(_)
        | DynamicImage::ImageRgba16(_) => image.clone(),
        _ if image.color().has_alpha() => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}
