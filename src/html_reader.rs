//! HTML image extraction.
//!
//! Every `<img>` tag is visited in document order and consumes one index,
//! whether or not an image comes out of it. Sources are resolved as:
//!
//! - `data:image/...;base64,...` decoded in place
//! - `http://` / `https://` never fetched, skipped
//! - anything else read from disk, relative paths against the base directory

use crate::bitmap::Bitmap;
use crate::error::DecodeError;
use crate::reader::{ExtractedImage, ImageReader};
use anyhow::{anyhow, Context, Result};
use base64::Engine;
use scraper::{Html, Selector};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct HtmlData {
    markup: String,
    base_dir: Option<PathBuf>,
}

impl HtmlData {
    /// Read an HTML file; relative image paths resolve against its directory.
    pub fn open(path: &Path) -> Result<Self> {
        let markup = fs::read_to_string(path)
            .with_context(|| format!("Failed to read HTML: {}", path.display()))?;
        Ok(Self {
            markup,
            base_dir: path.parent().map(Path::to_path_buf),
        })
    }

    /// Wrap already rendered markup with an explicit base directory.
    #[must_use]
    pub fn from_markup(markup: String, base_dir: &Path) -> Self {
        Self {
            markup,
            base_dir: Some(base_dir.to_path_buf()),
        }
    }

    fn load(&self, src: &str) -> Result<Option<Bitmap>, DecodeError> {
        match ImageSource::classify(src, self.base_dir.as_deref()) {
            ImageSource::DataUri(payload) => decode_data_uri(payload).map(Some),
            ImageSource::Remote => {
                debug!(src, "Not fetching remote image");
                Ok(None)
            }
            ImageSource::Local(path) => {
                let Some(path) = existing(&path) else {
                    debug!(path = %path.display(), "Local image not found");
                    return Ok(None);
                };
                let bytes = fs::read(&path)?;
                Ok(Some(Bitmap::from_encoded(&bytes)?))
            }
        }
    }
}

impl ImageReader for HtmlData {
    fn images(&self) -> Result<Vec<ExtractedImage>> {
        let document = Html::parse_document(&self.markup);
        let selector = Selector::parse("img").map_err(|e| anyhow!("Invalid selector: {e:?}"))?;

        let mut images = Vec::new();
        for (index, element) in document.select(&selector).enumerate() {
            let Some(src) = element.value().attr("src").filter(|s| !s.is_empty()) else {
                continue;
            };

            match self.load(src) {
                Ok(Some(bitmap)) => images.push(ExtractedImage::new(bitmap, 0, index)),
                Ok(None) => {}
                Err(e) => {
                    warn!(index, src = %truncate(src, 60), error = %e, "Skipping undecodable HTML image");
                }
            }
        }

        debug!("Found {} images in HTML", images.len());
        Ok(images)
    }
}

/// Where an `<img src>` points.
#[derive(Debug, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// Everything after the `data:` scheme
    DataUri(&'a str),
    Remote,
    Local(PathBuf),
}

impl<'a> ImageSource<'a> {
    #[must_use]
    pub fn classify(src: &'a str, base_dir: Option<&Path>) -> Self {
        let src = src.trim();
        if let Some(payload) = src.strip_prefix("data:") {
            return Self::DataUri(payload);
        }
        if src.starts_with("http://") || src.starts_with("https://") {
            return Self::Remote;
        }

        let local = Path::new(src.strip_prefix("file://").unwrap_or(src));
        match base_dir {
            Some(base) if local.is_relative() => Self::Local(base.join(local)),
            _ => Self::Local(local.to_path_buf()),
        }
    }
}

/// Decode the part of a data URI after `data:`.
pub fn decode_data_uri(payload: &str) -> Result<Bitmap, DecodeError> {
    let (header, encoded) = payload
        .split_once(',')
        .ok_or_else(|| DecodeError::Malformed("data URI without payload".to_string()))?;
    if !header.starts_with("image/") {
        return Err(DecodeError::Unsupported(format!("data URI of type {header}")));
    }
    if !header.ends_with(";base64") {
        return Err(DecodeError::Unsupported(
            "data URI without base64 encoding".to_string(),
        ));
    }

    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| DecodeError::Malformed(format!("base64: {e}")))?;
    Ok(Bitmap::from_encoded(&bytes)?)
}

/// The path as written, or its percent-decoded form (markdown renderers
/// escape spaces and non-ASCII in `src`).
fn existing(path: &Path) -> Option<PathBuf> {
    if path.exists() {
        return Some(path.to_path_buf());
    }
    let decoded = PathBuf::from(percent_decode(path.to_str()?)?);
    decoded.exists().then_some(decoded)
}

fn percent_decode(s: &str) -> Option<String> {
    if !s.contains('%') {
        return None;
    }
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}
