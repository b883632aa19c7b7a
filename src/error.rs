//! Error kinds for document image extraction.
//!
//! Only [`ExtractError`] ever reaches a caller, and even then only as the
//! status string of an [`ExtractionOutput`](crate::ExtractionOutput).
//! [`DecodeError`] and [`NormalizeError`] are per-record failures: they are
//! logged where they happen and the record is dropped.

use std::path::PathBuf;
use thiserror::Error;

/// Whole-pipeline failures, surfaced to the caller.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("file not found")]
    FileNotFound(PathBuf),

    #[error("unsupported format {0}")]
    UnsupportedFormat(String),

    #[error("missing dependency {0}")]
    MissingDependency(&'static str),

    #[error("extraction failed {0}")]
    Failed(#[from] anyhow::Error),
}

impl ExtractError {
    /// Status string handed back across the entry point boundary.
    #[must_use]
    pub fn status(&self) -> String {
        format!("error: {self}")
    }
}

/// Failure to turn one embedded image reference into a bitmap.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed image data: {0}")]
    Malformed(String),

    #[error("unsupported image encoding: {0}")]
    Unsupported(String),
}

/// Failure to bring a bitmap into 3-channel 8-bit RGB.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("palette index {index} out of range for {entries} entries")]
    PaletteIndex { index: u8, entries: usize },

    #[error("sample buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("result is not 3-channel 8-bit RGB")]
    NotRgb,
}
