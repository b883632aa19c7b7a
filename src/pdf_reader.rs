//! PDF image extraction.
//!
//! Walks every page with lopdf, takes the image XObjects referenced by the
//! page's resources (inherited from the page tree when the page has none)
//! and decodes each stream into a [`Bitmap`]. Images shared between pages
//! are reported once per page. A broken entry only drops that image.

use crate::bitmap::{Bitmap, CmykImage, IndexedImage};
use crate::error::DecodeError;
use crate::reader::{ExtractedImage, ImageReader};
use anyhow::{Context, Result};
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::borrow::Cow;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

pub struct PdfData {
    doc: Document,
}

impl PdfData {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path)
            .with_context(|| format!("Failed to open PDF: {}", path.display()))?;
        Ok(Self { doc })
    }
}

impl ImageReader for PdfData {
    fn images(&self) -> Result<Vec<ExtractedImage>> {
        let mut images = Vec::new();

        for (page_num, page_id) in self.doc.get_pages() {
            let streams = self.page_image_streams(page_id);
            debug!(page = page_num, count = streams.len(), "Image XObjects on page");

            for (index, (name, stream)) in streams.into_iter().enumerate() {
                match decode_stream(&self.doc, &stream.dict, &stream.content) {
                    Ok(bitmap) => images.push(ExtractedImage::new(bitmap, page_num, index)),
                    Err(e) => {
                        warn!(page = page_num, index, xobject = %name, error = %e, "Skipping undecodable PDF image");
                    }
                }
            }
        }

        debug!("Found {} images in PDF", images.len());
        Ok(images)
    }
}

/// Bound on `/Parent` hops, against cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

impl PdfData {
    /// `/Resources` in effect for a page: its own, or the nearest one
    /// inherited through the `/Parent` chain.
    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut node = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(resources) = node.get(b"Resources") {
                return resolve(&self.doc, resources).ok()?.as_dict().ok();
            }
            let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
            node = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Image XObjects of a page in resource dictionary order. Entries that
    /// cannot be resolved are logged and left out; form XObjects are skipped.
    fn page_image_streams(&self, page_id: ObjectId) -> Vec<(String, &Stream)> {
        let Some(xobjects) = self
            .page_resources(page_id)
            .and_then(|resources| resources.get(b"XObject").ok())
            .and_then(|xobjects| resolve(&self.doc, xobjects).ok())
            .and_then(|xobjects| xobjects.as_dict().ok())
        else {
            return Vec::new();
        };

        xobjects
            .iter()
            .filter_map(|(name, entry)| {
                let name = name_string(name);
                let resolved = resolve(&self.doc, entry)
                    .and_then(|obj| obj.as_stream().map_err(malformed));
                let stream = match resolved {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!(xobject = %name, error = %e, "Unreadable XObject entry");
                        return None;
                    }
                };
                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(Object::as_name)
                    .is_ok_and(|subtype| subtype == b"Image");
                is_image.then_some((name, stream))
            })
            .collect()
    }
}

/// Decode an image XObject from its stream dictionary and raw content.
pub fn decode_stream(doc: &Document, dict: &Dictionary, content: &[u8]) -> Result<Bitmap, DecodeError> {
    if dict
        .get(b"ImageMask")
        .and_then(Object::as_bool)
        .unwrap_or(false)
    {
        return Err(DecodeError::Unsupported("stencil image mask".to_string()));
    }

    let mut data = Cow::Borrowed(content);
    for filter in filter_names(doc, dict)? {
        match filter.as_str() {
            "FlateDecode" | "Fl" => data = Cow::Owned(inflate(&data)?),
            // self-describing formats; the image crate sniffs the container
            "DCTDecode" | "DCT" => return Ok(Bitmap::from_encoded(&data)?),
            other => return Err(DecodeError::Unsupported(format!("filter {other}"))),
        }
    }

    decode_samples(doc, dict, &data)
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Result<Vec<String>, DecodeError> {
    let Ok(filter) = dict.get(b"Filter") else {
        return Ok(Vec::new());
    };
    let names = match resolve(doc, filter)? {
        Object::Name(name) => vec![name_string(name)],
        Object::Array(items) => items
            .iter()
            .map(|item| item.as_name().map(name_string).map_err(malformed))
            .collect::<Result<_, _>>()?,
        other => {
            return Err(DecodeError::Malformed(format!(
                "unexpected /Filter {other:?}"
            )))
        }
    };
    Ok(names)
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Color space family of an image stream, resolved far enough to know how
/// samples are laid out.
enum SampleSpace {
    Gray,
    Rgb,
    Cmyk,
    Indexed {
        base_components: usize,
        hival: usize,
        lookup: Vec<u8>,
    },
}

fn decode_samples(doc: &Document, dict: &Dictionary, data: &[u8]) -> Result<Bitmap, DecodeError> {
    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    let bits = dict
        .get(b"BitsPerComponent")
        .and_then(Object::as_i64)
        .unwrap_or(8);
    let space = match dict.get(b"ColorSpace") {
        Ok(cs) => sample_space(doc, cs)?,
        Err(_) => SampleSpace::Rgb,
    };

    match space {
        SampleSpace::Gray => {
            let mut levels = unpack(data, width, height, 1, bits)?;
            let max = sample_max(bits);
            apply_decode(dict, &mut levels, 1, max, 1.0)?;
            let scaled = levels
                .into_iter()
                .map(|v| u8::try_from(u32::from(v) * 255 / u32::from(max)).unwrap_or(u8::MAX))
                .collect();
            let gray = GrayImage::from_raw(width, height, scaled)
                .ok_or_else(|| DecodeError::Malformed("gray buffer size".to_string()))?;
            Ok(Bitmap::Decoded(DynamicImage::ImageLuma8(gray)))
        }
        SampleSpace::Rgb => {
            let mut samples = unpack(data, width, height, 3, eight_bit(bits)?)?;
            apply_decode(dict, &mut samples, 3, u8::MAX, 1.0)?;
            let rgb = RgbImage::from_raw(width, height, samples)
                .ok_or_else(|| DecodeError::Malformed("rgb buffer size".to_string()))?;
            Ok(Bitmap::Decoded(DynamicImage::ImageRgb8(rgb)))
        }
        SampleSpace::Cmyk => {
            let mut samples = unpack(data, width, height, 4, eight_bit(bits)?)?;
            apply_decode(dict, &mut samples, 4, u8::MAX, 1.0)?;
            Ok(Bitmap::Cmyk(CmykImage {
                width,
                height,
                samples,
            }))
        }
        SampleSpace::Indexed {
            base_components,
            hival,
            lookup,
        } => {
            let palette = build_palette(&lookup, base_components, hival)?;
            let transparency = color_key_alpha(dict, palette.len());
            let mut indices = unpack(data, width, height, 1, bits)?;
            let max = sample_max(bits);
            apply_decode(dict, &mut indices, 1, max, f64::from(max))?;
            Ok(Bitmap::Indexed(IndexedImage {
                width,
                height,
                palette,
                indices,
                transparency,
            }))
        }
    }
}

/// Largest unpacked sample value; 16-bit samples are cut to their high byte.
fn sample_max(bits: i64) -> u8 {
    match bits {
        1 => 1,
        2 => 3,
        4 => 15,
        _ => u8::MAX,
    }
}

/// Apply `/Decode`. Only the default range per component and its exact
/// inversion (`[1 0]`, the usual inverted scan) are understood.
fn apply_decode(
    dict: &Dictionary,
    samples: &mut [u8],
    components: usize,
    max: u8,
    range_max: f64,
) -> Result<(), DecodeError> {
    let Ok(decode) = dict.get(b"Decode").and_then(Object::as_array) else {
        return Ok(());
    };
    if decode.len() != components * 2 {
        return Err(DecodeError::Malformed(format!(
            "/Decode holds {} values for {components} components",
            decode.len()
        )));
    }

    let close = |a: f64, b: f64| (a - b).abs() < 1e-6;
    let mut inverted = Vec::with_capacity(components);
    for pair in decode.chunks_exact(2) {
        let (low, high) = (number(&pair[0])?, number(&pair[1])?);
        if close(low, 0.0) && close(high, range_max) {
            inverted.push(false);
        } else if close(low, range_max) && close(high, 0.0) {
            inverted.push(true);
        } else {
            return Err(DecodeError::Unsupported(format!("/Decode [{low} {high}]")));
        }
    }

    if inverted.contains(&true) {
        for (i, sample) in samples.iter_mut().enumerate() {
            if inverted[i % components] {
                *sample = max.saturating_sub(*sample);
            }
        }
    }
    Ok(())
}

fn number(obj: &Object) -> Result<f64, DecodeError> {
    match obj {
        Object::Integer(v) => Ok(*v as f64),
        Object::Real(v) => Ok(f64::from(*v)),
        other => Err(DecodeError::Malformed(format!("expected number, got {other:?}"))),
    }
}

fn sample_space(doc: &Document, cs: &Object) -> Result<SampleSpace, DecodeError> {
    match resolve(doc, cs)? {
        Object::Name(name) => named_space(name),
        Object::Array(items) => {
            let family = items
                .first()
                .ok_or_else(|| DecodeError::Malformed("empty /ColorSpace".to_string()))?
                .as_name()
                .map_err(malformed)?;
            match family {
                b"ICCBased" => {
                    let profile = items
                        .get(1)
                        .ok_or_else(|| DecodeError::Malformed("ICCBased without profile".to_string()))?;
                    let stream = resolve(doc, profile)?.as_stream().map_err(malformed)?;
                    match stream.dict.get(b"N").and_then(Object::as_i64) {
                        Ok(1) => Ok(SampleSpace::Gray),
                        Ok(3) => Ok(SampleSpace::Rgb),
                        Ok(4) => Ok(SampleSpace::Cmyk),
                        _ => Err(DecodeError::Unsupported("ICC profile components".to_string())),
                    }
                }
                b"Indexed" | b"I" => indexed_space(doc, items),
                b"CalRGB" => Ok(SampleSpace::Rgb),
                b"CalGray" => Ok(SampleSpace::Gray),
                other => Err(DecodeError::Unsupported(format!(
                    "color space {}",
                    name_string(other)
                ))),
            }
        }
        other => Err(DecodeError::Malformed(format!(
            "unexpected /ColorSpace {other:?}"
        ))),
    }
}

fn named_space(name: &[u8]) -> Result<SampleSpace, DecodeError> {
    match name {
        b"DeviceGray" | b"G" | b"CalGray" => Ok(SampleSpace::Gray),
        b"DeviceRGB" | b"RGB" | b"CalRGB" => Ok(SampleSpace::Rgb),
        b"DeviceCMYK" | b"CMYK" => Ok(SampleSpace::Cmyk),
        other => Err(DecodeError::Unsupported(format!(
            "color space {}",
            name_string(other)
        ))),
    }
}

/// `[/Indexed base hival lookup]`
fn indexed_space(doc: &Document, items: &[Object]) -> Result<SampleSpace, DecodeError> {
    let [_, base, hival, lookup] = items else {
        return Err(DecodeError::Malformed(format!(
            "/Indexed expects 4 entries, got {}",
            items.len()
        )));
    };

    let base_components = match sample_space(doc, base)? {
        SampleSpace::Gray => 1,
        SampleSpace::Rgb => 3,
        SampleSpace::Cmyk => 4,
        SampleSpace::Indexed { .. } => {
            return Err(DecodeError::Malformed("nested /Indexed".to_string()))
        }
    };
    let hival = resolve(doc, hival)?.as_i64().map_err(malformed)?;
    let hival = usize::try_from(hival)
        .map_err(|_| DecodeError::Malformed(format!("negative hival {hival}")))?;

    let lookup = match resolve(doc, lookup)? {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(stream) => stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()),
        other => {
            return Err(DecodeError::Malformed(format!(
                "unexpected lookup {other:?}"
            )))
        }
    };

    Ok(SampleSpace::Indexed {
        base_components,
        hival,
        lookup,
    })
}

fn build_palette(lookup: &[u8], components: usize, hival: usize) -> Result<Vec<[u8; 3]>, DecodeError> {
    let needed = (hival + 1) * components;
    if lookup.len() < needed {
        return Err(DecodeError::Malformed(format!(
            "lookup table holds {} bytes, expected {needed}",
            lookup.len()
        )));
    }

    let palette = lookup[..needed]
        .chunks_exact(components)
        .map(|entry| match *entry {
            [g] => [g, g, g],
            [r, g, b] => [r, g, b],
            [c, m, y, k] => {
                let k = 255 - u32::from(k);
                let channel = |ink: u8| u8::try_from((255 - u32::from(ink)) * k / 255).unwrap_or(0);
                [channel(c), channel(m), channel(y)]
            }
            _ => [0, 0, 0],
        })
        .collect();
    Ok(palette)
}

/// `/Mask [min max]` on an indexed image hides the palette entries in range.
fn color_key_alpha(dict: &Dictionary, entries: usize) -> Option<Vec<u8>> {
    let range = dict.get(b"Mask").ok()?.as_array().ok()?;
    let [min, max] = range.as_slice() else {
        return None;
    };
    let (min, max) = (min.as_i64().ok()?, max.as_i64().ok()?);

    let alpha = (0..entries)
        .map(|entry| {
            let entry = i64::try_from(entry).unwrap_or(i64::MAX);
            if (min..=max).contains(&entry) {
                0
            } else {
                u8::MAX
            }
        })
        .collect();
    Some(alpha)
}

/// Split packed rows into one byte per sample. Rows start on a byte
/// boundary; 16-bit samples keep their high byte.
pub fn unpack(
    data: &[u8],
    width: u32,
    height: u32,
    components: usize,
    bits: i64,
) -> Result<Vec<u8>, DecodeError> {
    let per_row = width as usize * components;
    let row_bytes = match bits {
        1 | 2 | 4 => (per_row * bits as usize).div_ceil(8),
        8 => per_row,
        16 => per_row * 2,
        other => {
            return Err(DecodeError::Unsupported(format!(
                "{other} bits per component"
            )))
        }
    };
    let needed = row_bytes * height as usize;
    if data.len() < needed {
        return Err(DecodeError::Malformed(format!(
            "stream holds {} bytes, expected {needed}",
            data.len()
        )));
    }

    let mut samples = Vec::with_capacity(per_row * height as usize);
    for row in data[..needed].chunks_exact(row_bytes) {
        match bits {
            8 => samples.extend_from_slice(row),
            16 => samples.extend(row.chunks_exact(2).map(|pair| pair[0])),
            _ => {
                let bits = bits as usize;
                let mask = (1u8 << bits) - 1;
                samples.extend((0..per_row).map(|i| {
                    let bit = i * bits;
                    (row[bit / 8] >> (8 - bits - bit % 8)) & mask
                }));
            }
        }
    }
    Ok(samples)
}

fn eight_bit(bits: i64) -> Result<i64, DecodeError> {
    match bits {
        8 | 16 => Ok(bits),
        other => Err(DecodeError::Unsupported(format!(
            "{other} bits per component for color images"
        ))),
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32, DecodeError> {
    let value = dict.get(key).and_then(Object::as_i64).map_err(malformed)?;
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| DecodeError::Malformed(format!("invalid {} {value}", name_string(key))))
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object, DecodeError> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).map_err(malformed),
        other => Ok(other),
    }
}

fn name_string(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

fn malformed(e: lopdf::Error) -> DecodeError {
    DecodeError::Malformed(e.to_string())
}
