use crate::bitmap::Bitmap;
use crate::error::DecodeError;
use crate::reader::{ExtractedImage, ImageReader};
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

const DOCUMENT_RELS: &str = "word/_rels/document.xml.rels";

/// One entry of the main document part's relationship table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the target points at an image part stored inside the package.
    #[must_use]
    pub fn is_embedded_image(&self) -> bool {
        !self.external && self.target.contains("image")
    }

    /// Archive entry name of the target, resolved against `word/`.
    #[must_use]
    pub fn part_name(&self) -> String {
        let target = self.target.as_str();
        if let Some(absolute) = target.strip_prefix('/') {
            return absolute.to_string();
        }

        let mut parts: Vec<&str> = vec!["word"];
        for segment in target.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    parts.pop();
                }
                other => parts.push(other),
            }
        }
        parts.join("/")
    }
}

pub struct DocxData {
    /// The archive is read lazily; zip entries need `&mut` access.
    archive: RefCell<ZipArchive<File>>,
}

impl DocxData {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open DOCX: {}", path.display()))?;
        let archive = ZipArchive::new(file)
            .with_context(|| format!("Failed to read DOCX as ZIP: {}", path.display()))?;
        Ok(Self {
            archive: RefCell::new(archive),
        })
    }

    /// Relationships of `word/document.xml`, in table order.
    pub fn relationships(&self) -> Result<Vec<Relationship>> {
        let xml = {
            let mut archive = self.archive.borrow_mut();
            let mut rels_file = archive
                .by_name(DOCUMENT_RELS)
                .with_context(|| format!("Not a DOCX package: {DOCUMENT_RELS} is missing"))?;
            let mut content = String::new();
            rels_file
                .read_to_string(&mut content)
                .context("Failed to read document relationships")?;
            content
        };
        parse_relationships(&xml)
    }

    fn read_part(&self, name: &str) -> Result<Vec<u8>, DecodeError> {
        let mut archive = self.archive.borrow_mut();
        let mut entry = archive
            .by_name(name)
            .map_err(|e| DecodeError::Malformed(format!("part {name}: {e}")))?;
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl ImageReader for DocxData {
    fn images(&self) -> Result<Vec<ExtractedImage>> {
        let mut images = Vec::new();

        for (index, rel) in self.relationships()?.iter().enumerate() {
            if !rel.is_embedded_image() {
                continue;
            }

            let decoded = self
                .read_part(&rel.part_name())
                .and_then(|bytes| Bitmap::from_encoded(&bytes).map_err(DecodeError::from));
            match decoded {
                Ok(bitmap) => images.push(ExtractedImage::new(bitmap, 0, index)),
                Err(e) => {
                    warn!(rel = %rel.id, index, target = %rel.target, error = %e, "Skipping undecodable DOCX image");
                }
            }
        }

        debug!("Found {} images in DOCX", images.len());
        Ok(images)
    }
}

/// Parse a `.rels` part into its relationship entries.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let doc = roxmltree::Document::parse(xml).context("Failed to parse document relationships")?;

    let rels = doc
        .descendants()
        .filter(|node| node.has_tag_name("Relationship"))
        .filter_map(|node| {
            Some(Relationship {
                id: node.attribute("Id")?.to_string(),
                target: node.attribute("Target")?.to_string(),
                external: node
                    .attribute("TargetMode")
                    .is_some_and(|mode| mode.eq_ignore_ascii_case("External")),
            })
        })
        .collect();
    Ok(rels)
}
