#![allow(dead_code)]

use base64::Engine;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{ImageFormat, Rgb, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Solid-color test image.
pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(rgb))
}

/// Image with distinct pixel values, for exact round-trip checks.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

pub fn data_uri(image: &RgbImage) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png_bytes(image))
    )
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Image XObject stream holding `image` as FlateDecode DeviceRGB samples.
pub fn rgb_xobject(image: &RgbImage) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width()),
            "Height" => i64::from(image.height()),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(image.as_raw()),
    )
}

/// Small PDF writer over one `Pages` node. Image objects are added once
/// and may be referenced from any number of pages, or from the tree node
/// itself so that pages inherit them.
pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    tree_resources: Option<Dictionary>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            tree_resources: None,
        }
    }

    pub fn add_image(&mut self, image: &RgbImage) -> ObjectId {
        self.doc.add_object(rgb_xobject(image))
    }

    pub fn add_stream(&mut self, stream: Stream) -> ObjectId {
        self.doc.add_object(stream)
    }

    /// Page whose own `/Resources` names `images` as `Im0`, `Im1`, ...
    pub fn page(&mut self, images: &[ObjectId]) -> &mut Self {
        let resources = dictionary! { "XObject" => xobjects(images) };
        self.push_page(Some(resources))
    }

    /// Page without `/Resources`; it inherits the tree's.
    pub fn bare_page(&mut self) -> &mut Self {
        self.push_page(None)
    }

    pub fn tree_images(&mut self, images: &[ObjectId]) -> &mut Self {
        self.tree_resources = Some(dictionary! { "XObject" => xobjects(images) });
        self
    }

    fn push_page(&mut self, resources: Option<Dictionary>) -> &mut Self {
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, Vec::new()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
        };
        if let Some(resources) = resources {
            page.set("Resources", resources);
        }
        let page_id = self.doc.add_object(page);
        self.kids.push(page_id.into());
        self
    }

    pub fn save(&mut self, path: &Path) {
        let count = self.kids.len() as i64;
        let mut tree = dictionary! {
            "Type" => "Pages",
            "Kids" => self.kids.clone(),
            "Count" => count,
        };
        if let Some(resources) = self.tree_resources.clone() {
            tree.set("Resources", resources);
        }
        self.doc.objects.insert(self.pages_id, Object::Dictionary(tree));
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.save(path).unwrap();
    }
}

fn xobjects(images: &[ObjectId]) -> Dictionary {
    let mut dict = Dictionary::new();
    for (i, id) in images.iter().enumerate() {
        dict.set(format!("Im{i}"), *id);
    }
    dict
}

/// Write a PDF whose pages each reference their own image objects.
pub fn write_pdf(path: &Path, pages: &[Vec<RgbImage>]) {
    let mut pdf = PdfBuilder::new();
    for images in pages {
        let ids: Vec<_> = images.iter().map(|image| pdf.add_image(image)).collect();
        pdf.page(&ids);
    }
    pdf.save(path);
}

/// Write a minimal DOCX package. `media` entries are (relationship target,
/// image); a styles relationship always comes first.
pub fn write_docx(path: &Path, media: &[(&str, &RgbImage)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();

    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
"#,
    );
    for (i, (target, _)) in media.iter().enumerate() {
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{target}"/>
"#,
            i + 2
        ));
    }
    rels.push_str("</Relationships>");

    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(b"<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body/></w:document>")
        .unwrap();
    zip.start_file("word/styles.xml", options).unwrap();
    zip.write_all(b"<w:styles/>").unwrap();
    zip.start_file("word/_rels/document.xml.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();

    for (target, image) in media {
        zip.start_file(format!("word/{target}"), options).unwrap();
        zip.write_all(&png_bytes(image)).unwrap();
    }
    zip.finish().unwrap();
}

/// Entries directly under `dir`.
pub fn entries(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    entries.sort();
    entries
}
