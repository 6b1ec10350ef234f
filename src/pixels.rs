//! Image decoding and row preparation shared by the writer and the cropper.
//!
//! A row is the image resized to 224x224 with cubic interpolation, in RGB
//! channel order, scaled to `[0, 1]` and flattened row-major as HWC.

use std::path::Path;

use image::imageops::FilterType;
use image::RgbImage;

use crate::error::MaskpackError;

pub const TARGET_WIDTH: u32 = 224;
pub const TARGET_HEIGHT: u32 = 224;
pub const CHANNELS: usize = 3;
/// Elements in one packed row (224 * 224 * 3).
pub const ROW_LEN: usize = TARGET_WIDTH as usize * TARGET_HEIGHT as usize * CHANNELS;

/// Decode `path` into 8-bit RGB.
///
/// Decoders hand back RGB regardless of how the source stores channels, so
/// no separate reordering step is needed afterwards.
pub fn open_rgb(path: &Path) -> Result<RgbImage, MaskpackError> {
    let decoded = image::open(path).map_err(|source| MaskpackError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decoded.to_rgb8())
}

/// Cubic (Catmull-Rom) resize to `width`x`height`.
pub fn resize_cubic(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    image::imageops::resize(img, width, height, FilterType::CatmullRom)
}

/// Scale to `[0, 1]` and flatten as HWC.
pub fn to_unit_row(img: &RgbImage) -> Vec<f32> {
    img.as_raw().iter().map(|&v| v as f32 / 255.0).collect()
}

/// Resize an already decoded image and turn it into a packed row.
pub fn prepare_row(img: &RgbImage) -> Vec<f32> {
    let resized = if img.dimensions() == (TARGET_WIDTH, TARGET_HEIGHT) {
        img.clone()
    } else {
        resize_cubic(img, TARGET_WIDTH, TARGET_HEIGHT)
    };
    to_unit_row(&resized)
}

/// Decode, resize and scale the image at `path`.
pub fn load_row(path: &Path) -> Result<Vec<f32>, MaskpackError> {
    let img = open_rgb(path)?;
    Ok(prepare_row(&img))
}
