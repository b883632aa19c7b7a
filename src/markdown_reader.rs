use crate::html_reader::HtmlData;
use crate::reader::{ExtractedImage, ImageReader};
use anyhow::{Context, Result};
use pulldown_cmark::{html, Options, Parser};
use std::fs;
use std::path::Path;

/// Markdown documents are rendered to HTML and handed to the HTML reader,
/// with the markdown file's directory as base for relative image paths.
pub struct MarkdownData {
    html: HtmlData,
}

impl MarkdownData {
    pub fn open(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read Markdown: {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self {
            html: HtmlData::from_markup(markdown_to_html(&text), base_dir),
        })
    }
}

impl ImageReader for MarkdownData {
    fn images(&self) -> Result<Vec<ExtractedImage>> {
        self.html.images()
    }
}

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}
