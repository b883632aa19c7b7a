//! Format dispatch and parser backend availability.
//!
//! Each format is backed by an optional cargo feature. Which ones were
//! compiled in is recorded once per process; dispatching to a missing
//! backend yields [`ExtractError::MissingDependency`] instead of a failure
//! deep inside extraction.

use crate::error::ExtractError;
use crate::reader::ExtractedImage;
use anyhow::Result;
use std::path::Path;
use std::sync::OnceLock;

/// Supported document formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Html,
    Markdown,
}

impl DocumentFormat {
    /// Match a file extension, case-insensitively.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "html" | "htm" => Some(Self::Html),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ExtractError> {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self::from_extension(&ext).ok_or_else(|| {
            let shown = if ext.is_empty() {
                String::new()
            } else {
                format!(".{ext}")
            };
            ExtractError::UnsupportedFormat(shown)
        })
    }

    /// Library a format's reader is built on.
    #[must_use]
    pub fn dependency(self) -> &'static str {
        match self {
            Self::Pdf => "lopdf",
            Self::Docx => "zip",
            Self::Html => "scraper",
            Self::Markdown => "pulldown-cmark",
        }
    }

    /// Open the document with this format's reader and decode its images.
    pub fn read_images(self, path: &Path) -> Result<Vec<ExtractedImage>> {
        #[allow(unused_imports)]
        use crate::reader::ImageReader;

        match self {
            #[cfg(feature = "pdf")]
            Self::Pdf => crate::pdf_reader::PdfData::open(path)?.images(),
            #[cfg(feature = "docx")]
            Self::Docx => crate::docx_reader::DocxData::open(path)?.images(),
            #[cfg(feature = "html")]
            Self::Html => crate::html_reader::HtmlData::open(path)?.images(),
            #[cfg(feature = "markdown")]
            Self::Markdown => crate::markdown_reader::MarkdownData::open(path)?.images(),
            #[allow(unreachable_patterns)]
            other => Err(anyhow::anyhow!(
                "{} support not compiled in",
                other.dependency()
            )),
        }
    }
}

/// Which format backends this build can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backends {
    pub pdf: bool,
    pub docx: bool,
    pub html: bool,
    pub markdown: bool,
}

impl Backends {
    /// Backends compiled into this binary.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            pdf: cfg!(feature = "pdf"),
            docx: cfg!(feature = "docx"),
            html: cfg!(feature = "html"),
            markdown: cfg!(feature = "markdown"),
        }
    }

    #[must_use]
    pub fn supports(&self, format: DocumentFormat) -> bool {
        match format {
            DocumentFormat::Pdf => self.pdf,
            DocumentFormat::Docx => self.docx,
            DocumentFormat::Html => self.html,
            // rendered markdown goes through the HTML reader
            DocumentFormat::Markdown => self.markdown && self.html,
        }
    }

    /// Fail with `MissingDependency` when the format cannot be served.
    pub fn require(&self, format: DocumentFormat) -> Result<(), ExtractError> {
        if self.supports(format) {
            Ok(())
        } else {
            Err(ExtractError::MissingDependency(format.dependency()))
        }
    }
}

static AVAILABLE: OnceLock<Backends> = OnceLock::new();

/// Process-wide backend availability, detected on first use.
pub fn available() -> Backends {
    *AVAILABLE.get_or_init(|| {
        let backends = Backends::detect();
        tracing::debug!(?backends, "Detected format backends");
        backends
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_dispatch_is_case_insensitive() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_extension("Docx"), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_extension("htm"), Some(DocumentFormat::Html));
        assert_eq!(DocumentFormat::from_extension("HTML"), Some(DocumentFormat::Html));
        assert_eq!(DocumentFormat::from_extension("md"), Some(DocumentFormat::Markdown));
        assert_eq!(
            DocumentFormat::from_extension("markdown"),
            Some(DocumentFormat::Markdown)
        );
        assert_eq!(DocumentFormat::from_extension("doc"), None);
    }

    #[test]
    fn test_from_path_reports_extension() {
        let err = DocumentFormat::from_path(Path::new("/tmp/notes.TXT")).unwrap_err();
        assert_eq!(err.to_string(), "unsupported format .txt");

        let err = DocumentFormat::from_path(Path::new("/tmp/README")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedFormat(ref ext) if ext.is_empty()));
    }

    #[test]
    fn test_markdown_needs_html() {
        let backends = Backends {
            pdf: true,
            docx: true,
            html: false,
            markdown: true,
        };
        assert!(!backends.supports(DocumentFormat::Markdown));
        assert!(matches!(
            backends.require(DocumentFormat::Html),
            Err(ExtractError::MissingDependency("scraper"))
        ));
    }

    #[test]
    fn test_available_matches_detect() {
        assert_eq!(available(), Backends::detect());
        assert!(available().require(DocumentFormat::Pdf).is_ok() || !cfg!(feature = "pdf"));
    }
}
