//! Resize logic mapping resize modes onto `image` operations.

use std::collections::BTreeMap;
use image::DynamicImage;
use image::imageops::FilterType;
use crate::core::{PassthroughValue, ResizeMode, ResizeSettings};
use crate::worker::{JobError, JobOutcome};

/// Passthrough key selecting the resampling filter.
pub const FILTER_KEY: &str = "resize_filter";

/// Picks the resampling filter from the job's passthrough options.
///
/// Defaults to Lanczos3; an unknown name is a transform error.
pub fn filter_from(passthrough: &BTreeMap<String, PassthroughValue>) -> JobOutcome<FilterType> {
    match passthrough.get(FILTER_KEY) {
        None => Ok(FilterType::Lanczos3),
        Some(PassthroughValue::Text(name)) => match name.to_lowercase().as_str() {
            "nearest" => Ok(FilterType::Nearest),
            "triangle" | "bilinear" => Ok(FilterType::Triangle),
            "catmullrom" | "cubic" => Ok(FilterType::CatmullRom),
            "gaussian" => Ok(FilterType::Gaussian),
            "lanczos3" | "lanczos" => Ok(FilterType::Lanczos3),
            other => Err(JobError::transform(format!("Unknown resize filter: {other}"))),
        },
        Some(other) => Err(JobError::transform(format!(
            "{FILTER_KEY} must be a string, got {other:?}"
        ))),
    }
}

/// Applies the resize specified in `settings` to `image`.
///
/// Returns the original image unchanged when the mode is `None`, no target
/// size is provided, or the image is already within the target.
pub fn apply_resize(image: DynamicImage, settings: &ResizeSettings, filter: FilterType) -> JobOutcome<DynamicImage> {
    let size = match (settings.mode, settings.size) {
        (ResizeMode::None, _) => return Ok(image),
        (_, Some(s)) if s > 0 => s,
        _ => return Ok(image),
    };

    let (w, h) = (image.width(), image.height());
    let by_width = match settings.mode {
        ResizeMode::Width => true,
        ResizeMode::Height => false,
        ResizeMode::Longest => w >= h,
        ResizeMode::Shortest => w <= h,
        ResizeMode::None => return Ok(image),
    };

    if by_width {
        resize_by_width(image, size, filter)
    } else {
        resize_by_height(image, size, filter)
    }
}

/// Scales so the longest edge is at most `max_edge`. Never enlarges.
pub fn fit_within(image: &DynamicImage, max_edge: u32, filter: FilterType) -> DynamicImage {
    if image.width().max(image.height()) <= max_edge {
        return image.clone();
    }
    image.resize(max_edge, max_edge, filter)
}

/// Resizes so the width becomes `target_w` (height scales proportionally).
/// Will not enlarge the image if it is already smaller than the target.
fn resize_by_width(image: DynamicImage, target_w: u32, filter: FilterType) -> JobOutcome<DynamicImage> {
    if image.width() <= target_w {
        return Ok(image);
    }
    let target_h = scaled(image.height(), target_w, image.width())?;
    Ok(image.resize_exact(target_w, target_h, filter))
}

/// Resizes so the height becomes `target_h` (width scales proportionally).
/// Will not enlarge the image if it is already smaller than the target.
fn resize_by_height(image: DynamicImage, target_h: u32, filter: FilterType) -> JobOutcome<DynamicImage> {
    if image.height() <= target_h {
        return Ok(image);
    }
    let target_w = scaled(image.width(), target_h, image.height())?;
    Ok(image.resize_exact(target_w, target_h, filter))
}

/// `edge * num / den`, rounded, at least 1.
fn scaled(edge: u32, num: u32, den: u32) -> JobOutcome<u32> {
    if den == 0 {
        return Err(JobError::transform("Cannot resize an image with a zero-length edge"));
    }
    let value = (edge as u64 * num as u64 + den as u64 / 2) / den as u64;
    u32::try_from(value.max(1)).map_err(|_| JobError::transform("Resize (scaled edge) overflowed"))
}
