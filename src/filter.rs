use crate::bitmap::Bitmap;

/// Minimum pixel dimensions a record must reach to be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeFilter {
    pub min_width: u32,
    pub min_height: u32,
}

impl SizeFilter {
    #[must_use]
    pub fn new(min_width: u32, min_height: u32) -> Self {
        Self {
            min_width,
            min_height,
        }
    }

    /// Pass the bitmap through when both sides reach the minimum.
    /// Rejection is an expected outcome, not an error.
    #[must_use]
    pub fn apply(&self, bitmap: Bitmap) -> Option<Bitmap> {
        if self.accepts(bitmap.width(), bitmap.height()) {
            Some(bitmap)
        } else {
            None
        }
    }

    #[must_use]
    pub fn accepts(&self, width: u32, height: u32) -> bool {
        width >= self.min_width && height >= self.min_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbImage};

    fn rgb(width: u32, height: u32) -> Bitmap {
        DynamicImage::ImageRgb8(RgbImage::new(width, height)).into()
    }

    #[test]
    fn test_exact_minimum_passes() {
        let filter = SizeFilter::new(256, 128);
        assert!(filter.apply(rgb(256, 128)).is_some());
    }

    #[test]
    fn test_one_pixel_short_is_rejected() {
        let filter = SizeFilter::new(256, 128);
        assert!(filter.apply(rgb(255, 128)).is_none());
        assert!(filter.apply(rgb(256, 127)).is_none());
    }

    #[test]
    fn test_larger_passes_unchanged() {
        let filter = SizeFilter::new(10, 10);
        let kept = filter.apply(rgb(30, 20)).unwrap();
        assert_eq!((kept.width(), kept.height()), (30, 20));
    }
}
