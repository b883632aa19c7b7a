//! Extract embedded raster images from PDF, DOCX, HTML and Markdown
//! documents, drop the small ones, normalize the rest to RGB and save them
//! as PNG files in a fresh timestamped directory.
//!
//! ```no_run
//! use docimg::{extract_and_save_images, ExtractionRequest, OutputConfig};
//!
//! let request = ExtractionRequest::new("report.pdf").with_min_size(256, 256);
//! let output = extract_and_save_images(&request, OutputConfig { root: "output".into() });
//! println!("{}", output.status);
//! ```

pub mod backends;
pub mod bitmap;
pub mod cli;
pub mod config;
pub mod error;
pub mod filter;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod reader;

#[cfg(feature = "docx")]
pub mod docx_reader;
#[cfg(feature = "html")]
pub mod html_reader;
#[cfg(feature = "markdown")]
pub mod markdown_reader;
#[cfg(feature = "pdf")]
pub mod pdf_reader;

pub use backends::{Backends, DocumentFormat};
pub use config::{ExtractionRequest, OutputConfig, OutputRoot};
pub use error::ExtractError;
pub use pipeline::{extract_and_save_images, ExtractionOutput, Pipeline, NO_IMAGES_STATUS};
pub use preview::PreviewTensor;
