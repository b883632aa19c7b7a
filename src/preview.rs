//! Preview output in the host's tensor layout: a batch of one image,
//! `[1, height, width, 3]`, samples scaled to `0.0..=1.0`.

use image::RgbImage;
use ndarray::Array4;

pub const PLACEHOLDER_SIZE: usize = 64;

pub type PreviewTensor = Array4<f32>;

/// All-zero 64x64 image returned whenever nothing was saved.
#[must_use]
pub fn placeholder() -> PreviewTensor {
    Array4::zeros((1, PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, 3))
}

#[must_use]
pub fn to_tensor(image: &RgbImage) -> PreviewTensor {
    let (width, height) = (image.width() as usize, image.height() as usize);
    Array4::from_shape_fn((1, height, width, 3), |(_, y, x, c)| {
        // indices are bounded by the image dimensions
        f32::from(image.get_pixel(x as u32, y as u32)[c]) / 255.0
    })
}

#[must_use]
pub fn is_placeholder(tensor: &PreviewTensor) -> bool {
    tensor.shape() == [1, PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, 3] && tensor.iter().all(|v| *v == 0.0)
}
