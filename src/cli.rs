use crate::config::{self, ExtractionRequest, OutputConfig};
use crate::logging::LogFormat;
use clap::Parser;
use std::path::PathBuf;

/// Extract embedded images from PDF, DOCX, HTML and Markdown documents
#[derive(Parser, Debug)]
#[command(name = "docimg", version, about)]
pub struct Cli {
    /// Path to the input document (.pdf, .docx, .html, .htm, .md, .markdown)
    pub document: PathBuf,

    /// Minimum width in pixels an image must have to be kept
    #[arg(long, default_value_t = config::DEFAULT_MIN_SIZE,
          value_parser = clap::value_parser!(u32).range(1..=i64::from(config::MAX_MIN_SIZE)))]
    pub min_width: u32,

    /// Minimum height in pixels an image must have to be kept
    #[arg(long, default_value_t = config::DEFAULT_MIN_SIZE,
          value_parser = clap::value_parser!(u32).range(1..=i64::from(config::MAX_MIN_SIZE)))]
    pub min_height: u32,

    /// Prefix for the output directory and image file names
    #[arg(short, long, default_value = config::DEFAULT_PREFIX)]
    pub prefix: String,

    /// Directory under which the timestamped output folder is created
    #[arg(short, long, env = "DOCIMG_OUTPUT_DIR", default_value = "./output")]
    pub output_root: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    #[must_use]
    pub fn request(&self) -> ExtractionRequest {
        ExtractionRequest::new(&self.document)
            .with_min_size(self.min_width, self.min_height)
            .with_prefix(&self.prefix)
    }

    #[must_use]
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig {
            root: self.output_root.clone(),
        }
    }
}
