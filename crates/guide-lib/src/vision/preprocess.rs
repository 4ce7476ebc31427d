use image::imageops::FilterType;

use crate::config::{IMAGE_CHANNELS, IMAGE_SIZE};
use crate::error::GuideError;

/// Decode arbitrary image bytes into the model's input tensor.
///
/// The image is converted to RGB, resized to `IMAGE_SIZE x IMAGE_SIZE` and
/// flattened in NHWC order (batch of one). Pixel values stay in `[0, 255]`;
/// the model applies its own normalization.
pub fn image_to_tensor(bytes: &[u8]) -> Result<Vec<f32>, GuideError> {
    if bytes.is_empty() {
        return Err(GuideError::InvalidImage("empty payload".into()));
    }

    let decoded =
        image::load_from_memory(bytes).map_err(|e| GuideError::InvalidImage(e.to_string()))?;
    let rgb = decoded
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    Ok(rgb.into_raw().into_iter().map(f32::from).collect())
}

/// Shape of the tensor produced by [`image_to_tensor`].
pub fn input_shape() -> [usize; 4] {
    let side = IMAGE_SIZE as usize;
    [1, side, side, IMAGE_CHANNELS]
}
