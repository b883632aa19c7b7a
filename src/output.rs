use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// A normalized image waiting to be written, with its location metadata.
pub struct Survivor {
    pub image: RgbImage,
    pub page: u32,
    pub index_on_page: usize,
}

/// Result of writing one invocation's survivors to disk.
#[derive(Debug)]
pub struct OutputManifest {
    pub output_dir: PathBuf,
    pub saved_count: usize,
    pub saved_files: Vec<PathBuf>,
    /// Position in the survivor list of the first image actually written
    pub first_saved: Option<usize>,
}

/// `{prefix}_{document stem}_{YYYYMMDD-HHMMSS}`. Two runs on the same
/// document within one second share a directory.
#[must_use]
pub fn output_dir_name(prefix: &str, document: &Path, created: DateTime<Local>) -> String {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    format!("{prefix}_{stem}_{}", created.format("%Y%m%d-%H%M%S"))
}

/// `{prefix}_p{page:03}_idx{index:03}_num{seq:03}.png`
#[must_use]
pub fn image_filename(prefix: &str, page: u32, index_on_page: usize, seq: usize) -> String {
    format!("{prefix}_p{page:03}_idx{index_on_page:03}_num{seq:03}.png")
}

/// Create the output directory under `root` and write every survivor as PNG.
///
/// Only creating the directory can fail the call; a failed write is logged
/// and leaves `saved_count` short.
pub fn save_images(
    survivors: &[Survivor],
    root: &Path,
    prefix: &str,
    document: &Path,
) -> Result<OutputManifest> {
    let output_dir = root.join(output_dir_name(prefix, document, Local::now()));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;
    let output_dir = output_dir.canonicalize().unwrap_or(output_dir);
    Ok(write_images(survivors, output_dir, prefix))
}

/// Write survivors into an existing directory, numbering them in order.
pub fn write_images(survivors: &[Survivor], output_dir: PathBuf, prefix: &str) -> OutputManifest {
    debug!(dir = %output_dir.display(), count = survivors.len(), "Saving images");

    let mut saved_files = Vec::new();
    let mut first_saved = None;

    for (seq, survivor) in survivors.iter().enumerate() {
        let filename = image_filename(prefix, survivor.page, survivor.index_on_page, seq);
        let dest = output_dir.join(&filename);

        match survivor.image.save_with_format(&dest, image::ImageFormat::Png) {
            Ok(()) => {
                first_saved.get_or_insert(seq);
                saved_files.push(dest);
            }
            Err(e) => {
                error!(file = %dest.display(), seq, error = %e, "Failed to save image");
            }
        }
    }

    OutputManifest {
        output_dir,
        saved_count: saved_files.len(),
        saved_files,
        first_saved,
    }
}
