use crate::bitmap::Bitmap;
use anyhow::Result;

/// One embedded image as found in a document, before filtering.
#[derive(Debug)]
pub struct ExtractedImage {
    pub bitmap: Bitmap,
    /// 1-based page number, 0 for formats without pages
    pub page: u32,
    /// Position within the page (or the whole container)
    pub index_on_page: usize,
}

impl ExtractedImage {
    #[must_use]
    pub fn new(bitmap: Bitmap, page: u32, index_on_page: usize) -> Self {
        Self {
            bitmap,
            page,
            index_on_page,
        }
    }
}

/// Trait for locating and decoding the images of one document format.
///
/// Readers isolate per-image failures themselves: a reference that cannot
/// be decoded is logged and skipped. An `Err` means the document as a whole
/// could not be read.
pub trait ImageReader {
    /// Decode every embedded image, in document order
    fn images(&self) -> Result<Vec<ExtractedImage>>;
}
