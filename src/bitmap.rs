//! In-memory bitmaps as they come out of a document, before normalization.
//!
//! Most sources decode straight into an [`image::DynamicImage`]. PDF streams
//! can also carry palette-indexed or CMYK samples, which the `image` crate
//! has no buffer type for, so those get their own variants here.

use image::DynamicImage;

/// Color layout of a decoded bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Palette,
    PaletteWithTransparency,
    Luma,
    LumaAlpha,
    Rgb,
    Rgba,
    Cmyk,
    Other,
}

/// Palette-indexed samples, one byte per pixel.
#[derive(Debug, Clone)]
pub struct IndexedImage {
    pub width: u32,
    pub height: u32,
    pub palette: Vec<[u8; 3]>,
    pub indices: Vec<u8>,
    /// Per-entry alpha; entries past the end of this table are opaque.
    pub transparency: Option<Vec<u8>>,
}

/// Interleaved CMYK samples, four bytes per pixel.
#[derive(Debug, Clone)]
pub struct CmykImage {
    pub width: u32,
    pub height: u32,
    pub samples: Vec<u8>,
}

/// A decoded image in whatever color mode its source used.
#[derive(Debug, Clone)]
pub enum Bitmap {
    Decoded(DynamicImage),
    Indexed(IndexedImage),
    Cmyk(CmykImage),
}

impl Bitmap {
    #[must_use]
    pub fn width(&self) -> u32 {
        match self {
            Self::Decoded(img) => img.width(),
            Self::Indexed(img) => img.width,
            Self::Cmyk(img) => img.width,
        }
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        match self {
            Self::Decoded(img) => img.height(),
            Self::Indexed(img) => img.height,
            Self::Cmyk(img) => img.height,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ColorMode {
        match self {
            Self::Decoded(img) => match img {
                DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => ColorMode::Luma,
                DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
                    ColorMode::LumaAlpha
                }
                DynamicImage::ImageRgb8(_) => ColorMode::Rgb,
                DynamicImage::ImageRgba8(_) => ColorMode::Rgba,
                _ => ColorMode::Other,
            },
            Self::Indexed(img) if img.transparency.is_some() => ColorMode::PaletteWithTransparency,
            Self::Indexed(_) => ColorMode::Palette,
            Self::Cmyk(_) => ColorMode::Cmyk,
        }
    }

    /// Decode a self-describing encoded image (PNG, JPEG, GIF, ...).
    pub fn from_encoded(bytes: &[u8]) -> Result<Self, image::ImageError> {
        image::load_from_memory(bytes).map(Self::Decoded)
    }
}

impl From<DynamicImage> for Bitmap {
    fn from(img: DynamicImage) -> Self {
        Self::Decoded(img)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, Rgb32FImage, RgbImage, RgbaImage};

    #[test]
    fn test_modes() {
        let rgb: Bitmap = DynamicImage::ImageRgb8(RgbImage::new(2, 3)).into();
        assert_eq!(rgb.mode(), ColorMode::Rgb);
        assert_eq!((rgb.width(), rgb.height()), (2, 3));

        let rgba: Bitmap = DynamicImage::ImageRgba8(RgbaImage::new(1, 1)).into();
        assert_eq!(rgba.mode(), ColorMode::Rgba);

        let la: Bitmap = DynamicImage::ImageLumaA8(GrayAlphaImage::new(1, 1)).into();
        assert_eq!(la.mode(), ColorMode::LumaAlpha);

        let float: Bitmap = DynamicImage::ImageRgb32F(Rgb32FImage::new(1, 1)).into();
        assert_eq!(float.mode(), ColorMode::Other);
    }

    #[test]
    fn test_indexed_and_cmyk_modes() {
        let mut indexed = IndexedImage {
            width: 4,
            height: 5,
            palette: vec![[0, 0, 0]],
            indices: vec![0; 20],
            transparency: None,
        };
        assert_eq!(Bitmap::Indexed(indexed.clone()).mode(), ColorMode::Palette);

        indexed.transparency = Some(vec![0]);
        let bitmap = Bitmap::Indexed(indexed);
        assert_eq!(bitmap.mode(), ColorMode::PaletteWithTransparency);
        assert_eq!((bitmap.width(), bitmap.height()), (4, 5));

        let cmyk = Bitmap::Cmyk(CmykImage {
            width: 1,
            height: 1,
            samples: vec![0; 4],
        });
        assert_eq!(cmyk.mode(), ColorMode::Cmyk);
    }

    #[test]
    fn test_from_encoded_rejects_garbage() {
        assert!(Bitmap::from_encoded(b"definitely not an image").is_err());
    }
}
