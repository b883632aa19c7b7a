//! Color normalization to 3-channel 8-bit RGB.
//!
//! Every step is a separate function returning a fresh buffer, so each
//! intermediate (expanded palette, composited alpha, ...) can be inspected
//! on its own. Transparency is always composited onto opaque white.

use crate::bitmap::{Bitmap, CmykImage, IndexedImage};
use crate::error::NormalizeError;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

/// Normalize a bitmap of any supported color mode into RGB.
pub fn to_rgb(bitmap: Bitmap) -> Result<RgbImage, NormalizeError> {
    let rgb = match bitmap {
        Bitmap::Indexed(indexed) => flatten_alpha(&expand_palette(&indexed)?),
        Bitmap::Cmyk(cmyk) => cmyk_to_rgb(&cmyk)?,
        Bitmap::Decoded(DynamicImage::ImageRgb8(rgb)) => rgb,
        Bitmap::Decoded(DynamicImage::ImageRgba8(rgba)) => flatten_alpha(&rgba),
        Bitmap::Decoded(img) if img.color().has_alpha() => flatten_alpha(&img.to_rgba8()),
        // grayscale, 16-bit and float layouts
        Bitmap::Decoded(img) => img.to_rgb8(),
    };
    ensure_rgb(rgb)
}

/// Look up every index in the palette, producing RGBA. Entries without a
/// transparency value are fully opaque.
pub fn expand_palette(indexed: &IndexedImage) -> Result<RgbaImage, NormalizeError> {
    let expected = pixel_count(indexed.width, indexed.height);
    if indexed.indices.len() != expected {
        return Err(NormalizeError::BufferSize {
            expected,
            actual: indexed.indices.len(),
        });
    }

    let alpha = indexed.transparency.as_deref().unwrap_or(&[]);
    let mut samples = Vec::with_capacity(expected * 4);
    for &index in &indexed.indices {
        let entry = usize::from(index);
        let [r, g, b] = *indexed
            .palette
            .get(entry)
            .ok_or(NormalizeError::PaletteIndex {
                index,
                entries: indexed.palette.len(),
            })?;
        let a = alpha.get(entry).copied().unwrap_or(u8::MAX);
        samples.extend_from_slice(&[r, g, b, a]);
    }

    RgbaImage::from_raw(indexed.width, indexed.height, samples).ok_or(NormalizeError::NotRgb)
}

/// Composite RGBA over an opaque white canvas, using alpha as the mask.
#[must_use]
pub fn flatten_alpha(rgba: &RgbaImage) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(rgba.width(), rgba.height(), Rgb([255, 255, 255]));
    for (dst, src) in canvas.pixels_mut().zip(rgba.pixels()) {
        let Rgba([r, g, b, a]) = *src;
        *dst = Rgb([blend(r, a), blend(g, a), blend(b, a)]);
    }
    canvas
}

fn blend(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (u32::from(channel), u32::from(alpha));
    let mixed = (c * a + 255 * (255 - a) + 127) / 255;
    // mixed <= 255 for any inputs
    u8::try_from(mixed).unwrap_or(u8::MAX)
}

/// Direct CMYK to RGB mapping without a color profile.
pub fn cmyk_to_rgb(cmyk: &CmykImage) -> Result<RgbImage, NormalizeError> {
    let expected = pixel_count(cmyk.width, cmyk.height) * 4;
    if cmyk.samples.len() != expected {
        return Err(NormalizeError::BufferSize {
            expected,
            actual: cmyk.samples.len(),
        });
    }

    let mut rgb = Vec::with_capacity(expected / 4 * 3);
    for chunk in cmyk.samples.chunks_exact(4) {
        let k = 255 - u32::from(chunk[3]);
        for &ink in &chunk[..3] {
            let value = (255 - u32::from(ink)) * k / 255;
            rgb.push(u8::try_from(value).unwrap_or(u8::MAX));
        }
    }

    RgbImage::from_raw(cmyk.width, cmyk.height, rgb).ok_or(NormalizeError::NotRgb)
}

fn ensure_rgb(rgb: RgbImage) -> Result<RgbImage, NormalizeError> {
    if rgb.as_raw().len() == pixel_count(rgb.width(), rgb.height()) * 3 {
        Ok(rgb)
    } else {
        Err(NormalizeError::NotRgb)
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}
