use crate::backends::{self, Backends, DocumentFormat};
use crate::config::{ExtractionRequest, OutputRoot};
use crate::error::ExtractError;
use crate::filter::SizeFilter;
use crate::normalize;
use crate::output::{self, OutputManifest, Survivor};
use crate::preview::{self, PreviewTensor};
use anyhow::anyhow;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

pub const NO_IMAGES_STATUS: &str = "no images found or matching criteria";

/// What the caller gets back, whatever happened.
#[derive(Debug)]
pub struct ExtractionOutput {
    /// First saved image, or the all-zero placeholder
    pub preview: PreviewTensor,
    /// Output directory on success, otherwise a status or `error: ...` line
    pub status: String,
    pub manifest: Option<OutputManifest>,
}

impl ExtractionOutput {
    fn failed(err: &ExtractError) -> Self {
        Self {
            preview: preview::placeholder(),
            status: err.status(),
            manifest: None,
        }
    }

    fn no_images() -> Self {
        Self {
            preview: preview::placeholder(),
            status: NO_IMAGES_STATUS.to_string(),
            manifest: None,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status.starts_with("error:")
    }
}

/// Extract, filter, normalize and save the images of one document.
///
/// Each call owns its records and output directory. Running calls in
/// parallel is only as safe as the filesystem and the parsing libraries
/// underneath; nothing here serializes them.
pub struct Pipeline<R> {
    root: R,
    backends: Backends,
}

impl<R: OutputRoot> Pipeline<R> {
    pub fn new(root: R) -> Self {
        Self {
            root,
            backends: backends::available(),
        }
    }

    #[must_use]
    pub fn with_backends(mut self, backends: Backends) -> Self {
        self.backends = backends;
        self
    }

    /// Run the whole pipeline. Never panics and never returns an error;
    /// failures are reported through the status string.
    pub fn run(&self, request: &ExtractionRequest) -> ExtractionOutput {
        let path = &request.document_path;
        info!(
            path = %path.display(),
            min_width = request.min_width,
            min_height = request.min_height,
            "Extracting images"
        );

        let survivors = match self.collect_survivors(request) {
            Ok(survivors) => survivors,
            Err(e) => {
                error!(path = %path.display(), error = ?e, "Extraction aborted");
                return ExtractionOutput::failed(&e);
            }
        };

        if survivors.is_empty() {
            info!(path = %path.display(), "No images matched the size criteria");
            return ExtractionOutput::no_images();
        }

        let root = self.root.output_root();
        let manifest = match output::save_images(&survivors, &root, &request.filename_prefix, path)
        {
            Ok(manifest) => manifest,
            Err(e) => {
                let e = ExtractError::Failed(e);
                error!(path = %path.display(), error = ?e, "Could not create output directory");
                return ExtractionOutput::failed(&e);
            }
        };

        info!(
            dir = %manifest.output_dir.display(),
            saved = manifest.saved_count,
            found = survivors.len(),
            "Images saved"
        );

        let preview = manifest
            .first_saved
            .map_or_else(preview::placeholder, |i| preview::to_tensor(&survivors[i].image));

        ExtractionOutput {
            preview,
            status: manifest.output_dir.display().to_string(),
            manifest: Some(manifest),
        }
    }

    /// Validate the request, dispatch to the format reader and keep the
    /// records that pass the size filter and normalize cleanly.
    pub fn collect_survivors(
        &self,
        request: &ExtractionRequest,
    ) -> Result<Vec<Survivor>, ExtractError> {
        let path = &request.document_path;
        if path.as_os_str().is_empty() || !path.is_file() {
            return Err(ExtractError::FileNotFound(path.clone()));
        }

        let format = DocumentFormat::from_path(path)?;
        self.backends.require(format)?;

        let records = panic::catch_unwind(AssertUnwindSafe(|| format.read_images(path)))
            .map_err(|payload| anyhow!("{format:?} reader panicked: {}", panic_message(&*payload)))
            .and_then(|result| result)?;

        let filter = SizeFilter::new(request.min_width, request.min_height);
        let mut survivors = Vec::new();

        for record in records {
            let (page, index_on_page) = (record.page, record.index_on_page);
            let (width, height) = (record.bitmap.width(), record.bitmap.height());

            let Some(bitmap) = filter.apply(record.bitmap) else {
                debug!(page, index = index_on_page, width, height, "Image below minimum size");
                continue;
            };

            let mode = bitmap.mode();
            match normalize::to_rgb(bitmap) {
                Ok(image) => {
                    debug!(page, index = index_on_page, ?mode, "Normalized to RGB");
                    survivors.push(Survivor {
                        image,
                        page,
                        index_on_page,
                    });
                }
                Err(e) => {
                    warn!(page, index = index_on_page, ?mode, error = %e, "Could not convert image to RGB");
                }
            }
        }

        Ok(survivors)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Single entry point: run [`Pipeline`] with the process-wide backends.
pub fn extract_and_save_images(
    request: &ExtractionRequest,
    root: impl OutputRoot,
) -> ExtractionOutput {
    Pipeline::new(root).run(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputConfig;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn pipeline(root: &std::path::Path) -> Pipeline<OutputConfig> {
        Pipeline::new(OutputConfig {
            root: root.to_path_buf(),
        })
    }

    #[test]
    fn test_missing_document() {
        let out = tempdir().unwrap();
        let request = ExtractionRequest::new("/no/such/document.pdf");
        let result = pipeline(out.path()).run(&request);

        assert_eq!(result.status, "error: file not found");
        assert!(result.is_error());
        assert!(preview::is_placeholder(&result.preview));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_empty_path_is_not_found() {
        let out = tempdir().unwrap();
        let request = ExtractionRequest::new(PathBuf::new());
        assert_eq!(pipeline(out.path()).run(&request).status, "error: file not found");
    }

    #[test]
    fn test_directory_is_not_a_document() {
        let out = tempdir().unwrap();
        let request = ExtractionRequest::new(out.path());
        assert_eq!(pipeline(out.path()).run(&request).status, "error: file not found");
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let out = tempdir().unwrap();
        let doc = dir.path().join("notes.TXT");
        std::fs::write(&doc, "hello").unwrap();

        let result = pipeline(out.path()).run(&ExtractionRequest::new(&doc));
        assert_eq!(result.status, "error: unsupported format .txt");
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_backend() {
        let dir = tempdir().unwrap();
        let out = tempdir().unwrap();
        let doc = dir.path().join("paper.pdf");
        std::fs::write(&doc, b"%PDF-1.4").unwrap();

        let backends = Backends {
            pdf: false,
            ..Backends::detect()
        };
        let result = pipeline(out.path())
            .with_backends(backends)
            .run(&ExtractionRequest::new(&doc));
        assert_eq!(result.status, "error: missing dependency lopdf");
        assert!(preview::is_placeholder(&result.preview));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_corrupt_document_is_extraction_failure() {
        let dir = tempdir().unwrap();
        let out = tempdir().unwrap();
        let doc = dir.path().join("broken.pdf");
        std::fs::write(&doc, b"this is not a pdf").unwrap();

        let result = pipeline(out.path()).run(&ExtractionRequest::new(&doc));
        assert!(result.status.starts_with("error: extraction failed"));
        assert!(result.manifest.is_none());
    }

    #[cfg(feature = "html")]
    #[test]
    fn test_html_without_images() {
        let dir = tempdir().unwrap();
        let out = tempdir().unwrap();
        let doc = dir.path().join("page.html");
        std::fs::write(&doc, "<html><body><p>text only</p></body></html>").unwrap();

        let result = pipeline(out.path()).run(&ExtractionRequest::new(&doc));
        assert_eq!(result.status, NO_IMAGES_STATUS);
        assert!(!result.is_error());
        assert!(preview::is_placeholder(&result.preview));
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*payload), "bang");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }
}
