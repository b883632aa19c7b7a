use std::path::PathBuf;

pub const DEFAULT_MIN_SIZE: u32 = 256;
pub const MAX_MIN_SIZE: u32 = 8192;
pub const DEFAULT_PREFIX: &str = "extracted_doc_img";

/// What to extract and how to name it. Read-only for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub document_path: PathBuf,
    pub min_width: u32,
    pub min_height: u32,
    pub filename_prefix: String,
}

impl ExtractionRequest {
    /// Request with the default size threshold and prefix.
    #[must_use]
    pub fn new(document_path: impl Into<PathBuf>) -> Self {
        Self {
            document_path: document_path.into(),
            min_width: DEFAULT_MIN_SIZE,
            min_height: DEFAULT_MIN_SIZE,
            filename_prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    #[must_use]
    pub fn with_min_size(mut self, min_width: u32, min_height: u32) -> Self {
        self.min_width = min_width;
        self.min_height = min_height;
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.filename_prefix = prefix.into();
        self
    }
}

/// Supplies the directory under which per-run output folders are created.
pub trait OutputRoot {
    fn output_root(&self) -> PathBuf;
}

/// Fixed output root, as configured on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub root: PathBuf,
}

impl OutputRoot for OutputConfig {
    fn output_root(&self) -> PathBuf {
        self.root.clone()
    }
}

impl<F> OutputRoot for F
where
    F: Fn() -> PathBuf,
{
    fn output_root(&self) -> PathBuf {
        self()
    }
}
