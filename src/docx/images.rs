//! Figure and scheme extraction from DOCX packages.
//!
//! Images are found in body order, captioned from nearby paragraphs,
//! classified as figures or schemes, and written out as GIFs.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use md5::{Digest, Md5};
use regex::Regex;
use serde::Serialize;

use super::package::DocxPackage;
use super::xml::{body_paragraphs, Element, Paragraph};
use crate::error::Result;
use crate::gif::{convert_bytes_to_gif, DEFAULT_WIDTH};
use crate::titles::document_basename;

/// How far from an empty paragraph to look for a caption.
pub const CAPTION_SEARCH_RADIUS: usize = 3;

const OUTPUT_SUBDIR: &str = "extracted_gifs";

/// An image reference found in the package, in extraction order.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedImage {
    pub rel_id: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub caption: String,
    pub content_type: Option<String>,
    /// Body paragraph index, `None` for unreferenced relationships
    pub position: Option<usize>,
}

impl ExtractedImage {
    /// Hex MD5 of the image bytes.
    pub fn digest(&self) -> String {
        digest_hex(&self.bytes)
    }
}

pub(crate) fn digest_hex(bytes: &[u8]) -> String {
    Md5::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Figure or scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ImageKind {
    Figure,
    Scheme,
}

impl ImageKind {
    /// Letter used in output file names.
    pub fn prefix(&self) -> char {
        match self {
            ImageKind::Figure => 'g',
            ImageKind::Scheme => 's',
        }
    }
}

/// Result of classifying a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub kind: ImageKind,
    pub number: Option<u32>,
}

fn scheme_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"scheme\s*(\d+)").expect("valid regex"))
}

fn figure_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"fig(?:ure)?\.?\s*(\d+)").expect("valid regex"))
}

/// Classify a caption as figure or scheme and pull out its number.
pub fn classify_caption(caption: &str) -> Classification {
    let lower = caption.to_lowercase();
    let (kind, re) = if lower.contains("scheme") {
        (ImageKind::Scheme, scheme_number_re())
    } else {
        (ImageKind::Figure, figure_number_re())
    };

    let number = re
        .captures(&lower)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok());

    Classification { kind, number }
}

fn is_caption_like(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("figure") || lower.contains("scheme")
}

/// Caption for the image(s) in paragraph `index`.
///
/// The paragraph's own text wins. Otherwise, the nearest paragraph within
/// [`CAPTION_SEARCH_RADIUS`] that mentions a figure or scheme, checking the
/// following paragraph before the preceding one at each distance.
pub fn find_caption(texts: &[String], index: usize) -> String {
    let own = texts.get(index).map(|t| t.trim()).unwrap_or_default();
    if !own.is_empty() {
        return own.to_string();
    }

    for offset in 1..=CAPTION_SEARCH_RADIUS {
        let candidates = [index.checked_add(offset), index.checked_sub(offset)];
        for idx in candidates.into_iter().flatten() {
            if let Some(text) = texts.get(idx).map(|t| t.trim()) {
                if !text.is_empty() && is_caption_like(text) {
                    return text.to_string();
                }
            }
        }
    }
    String::new()
}

/// `a:blip@r:embed` ids inside `pic:pic` elements.
pub fn blip_refs(el: &Element) -> Vec<String> {
    el.find_all("pic:pic")
        .into_iter()
        .flat_map(|pic| pic.find_all("a:blip"))
        .filter_map(|blip| blip.attr("r:embed").map(str::to_string))
        .collect()
}

/// Attribute values starting with `rId` anywhere under `container` elements.
pub fn rid_attrs_under(el: &Element, container: &str) -> Vec<String> {
    el.find_all(container)
        .into_iter()
        .flat_map(|c| c.descendants())
        .flat_map(|d| d.attrs.iter())
        .filter(|(_, v)| v.starts_with("rId"))
        .map(|(_, v)| v.clone())
        .collect()
}

/// All image relationship ids a paragraph references, first occurrence only.
pub fn paragraph_image_refs(paragraph: &Element) -> Vec<String> {
    let mut seen = HashSet::new();
    blip_refs(paragraph)
        .into_iter()
        .chain(rid_attrs_under(paragraph, "w:pict"))
        .chain(rid_attrs_under(paragraph, "w:object"))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Paragraph texts, index-aligned with `paragraphs`.
pub fn paragraph_texts(paragraphs: &[Paragraph<'_>]) -> Vec<String> {
    paragraphs.iter().map(|p| p.text().trim().to_string()).collect()
}

/// Collect every image in the package in body order, deduplicated by content.
pub fn collect_images(pkg: &DocxPackage) -> Vec<ExtractedImage> {
    let paragraphs = body_paragraphs(pkg.document());
    let texts = paragraph_texts(&paragraphs);
    let mut images = Vec::new();
    let mut referenced = HashSet::new();

    for paragraph in &paragraphs {
        let refs = paragraph_image_refs(paragraph.element);
        if refs.is_empty() {
            continue;
        }
        let caption = find_caption(&texts, paragraph.index);
        for rel_id in refs {
            referenced.insert(rel_id.clone());
            let Some(rel) = pkg.relationship(&rel_id) else {
                log::debug!("{} in paragraph {} has no relationship", rel_id, paragraph.index);
                continue;
            };
            match pkg.part_bytes(rel) {
                Ok(bytes) => images.push(ExtractedImage {
                    rel_id: rel_id.clone(),
                    bytes: bytes.to_vec(),
                    caption: caption.clone(),
                    content_type: pkg.content_type(rel),
                    position: Some(paragraph.index),
                }),
                Err(e) => log::warn!("Could not extract image {}: {}", rel_id, e),
            }
        }
    }

    for rel in pkg.image_relationships() {
        if referenced.contains(&rel.id) {
            continue;
        }
        if let Ok(bytes) = pkg.part_bytes(rel) {
            images.push(ExtractedImage {
                rel_id: rel.id.clone(),
                bytes: bytes.to_vec(),
                caption: String::new(),
                content_type: pkg.content_type(rel),
                position: None,
            });
        }
    }

    dedupe_by_content(images)
}

fn dedupe_by_content(images: Vec<ExtractedImage>) -> Vec<ExtractedImage> {
    let mut seen = HashSet::new();
    let total = images.len();
    let unique: Vec<_> = images
        .into_iter()
        .filter(|img| seen.insert(img.digest()))
        .collect();
    if unique.len() < total {
        log::debug!("Dropped {} duplicate image(s)", total - unique.len());
    }
    unique
}

/// Assigns output numbers per kind.
#[derive(Debug, Default)]
pub struct NumberAllocator {
    figures: BTreeSet<u32>,
    schemes: BTreeSet<u32>,
}

impl NumberAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the caption number when it is free, else the lowest unused one.
    pub fn assign(&mut self, class: Classification) -> u32 {
        let used = match class.kind {
            ImageKind::Figure => &mut self.figures,
            ImageKind::Scheme => &mut self.schemes,
        };
        let number = match class.number {
            Some(n) if n > 0 && !used.contains(&n) => n,
            _ => (1..).find(|n| !used.contains(n)).unwrap_or(1),
        };
        used.insert(number);
        number
    }
}

/// `<basename>-g001.gif` / `<basename>-s002.gif`
pub fn output_file_name(basename: &str, kind: ImageKind, number: u32) -> String {
    format!("{}-{}{:03}.gif", basename, kind.prefix(), number)
}

/// Options for the extractor.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Parent folder for output; `<input dir>/extracted_gifs` by default
    pub output_dir: Option<PathBuf>,
    /// Target GIF width in pixels
    pub width: u32,
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Folder GIFs for `input` are written to.
    pub fn resolve_output_dir(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        match &self.output_dir {
            Some(dir) => dir.join(stem),
            None => input
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(OUTPUT_SUBDIR)
                .join(stem),
        }
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            width: DEFAULT_WIDTH,
        }
    }
}

/// One GIF written by the extractor.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedFile {
    pub file_name: String,
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

/// Result of an extraction run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractSummary {
    pub found: usize,
    pub figures: usize,
    pub schemes: usize,
    pub failed: usize,
    pub output_dir: PathBuf,
    pub files: Vec<ExtractedFile>,
}

/// Extract every figure and scheme from a DOCX as GIFs.
pub fn extract_images(input: &Path, options: &ExtractOptions) -> Result<ExtractSummary> {
    let pkg = DocxPackage::open(input)?;
    let images = collect_images(&pkg);

    let output_dir = options.resolve_output_dir(input);
    let mut summary = ExtractSummary {
        found: images.len(),
        output_dir: output_dir.clone(),
        ..Default::default()
    };
    if images.is_empty() {
        log::info!("No images found in {}", input.display());
        return Ok(summary);
    }
    fs::create_dir_all(&output_dir)?;

    let basename = document_basename(input);
    let mut numbers = NumberAllocator::new();

    for image in &images {
        let gif = match convert_bytes_to_gif(&image.bytes, options.width) {
            Ok(gif) => gif,
            Err(e) => {
                log::warn!("Error processing image {}: {}", image.rel_id, e);
                summary.failed += 1;
                continue;
            }
        };

        let class = classify_caption(&image.caption);
        let number = numbers.assign(class);
        let file_name = output_file_name(&basename, class.kind, number);
        let (data, (width, height)) = gif;
        if let Err(e) = fs::write(output_dir.join(&file_name), data) {
            log::warn!("Could not write {}: {}", file_name, e);
            summary.failed += 1;
            continue;
        }

        log::info!("Created: {} ({}x{})", file_name, width, height);
        match class.kind {
            ImageKind::Figure => summary.figures += 1,
            ImageKind::Scheme => summary.schemes += 1,
        }
        summary.files.push(ExtractedFile {
            file_name,
            kind: class.kind,
            width,
            height,
        });
    }

    Ok(summary)
}
