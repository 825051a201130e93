//! Diagnostics for DOCX image relationships.
//!
//! Each report answers one question about where a package keeps its
//! images and which of them the document body actually uses.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use super::images::{blip_refs, digest_hex, find_caption, paragraph_texts, rid_attrs_under};
use super::package::{DocxPackage, SubPartKind};
use super::xml::{body_paragraphs, CellLocation, Element};
use crate::detect::detect_format_from_bytes;
use crate::error::Result;

/// Characters of context shown around a raw XML match.
pub const RAW_CONTEXT_CHARS: usize = 150;
/// Characters of raw `w:pict` XML shown per element.
pub const PICT_XML_CHARS: usize = 1000;
/// Ancestors shown in an element path.
pub const PATH_DEPTH: usize = 5;
const CAPTION_PREVIEW_CHARS: usize = 80;

const RULE: &str = "======================================================================";

const REL_ATTRIBUTES: &[&str] = &["r:embed", "r:link", "r:id", "o:relid"];

fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipEntry {
    pub id: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParagraphPictures {
    pub paragraph: usize,
    pub pictures: usize,
    pub blip_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParagraphDrawings {
    pub paragraph: usize,
    pub drawings: usize,
    pub anchors: usize,
    pub inlines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CellImages {
    pub location: CellLocation,
    pub drawings: usize,
    pub pictures: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderFooterImages {
    pub kind: SubPartKind,
    pub part: String,
    pub drawings: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryTotals {
    pub image_relationships: usize,
    pub inline_pictures: usize,
    pub drawings: usize,
    pub table_images: usize,
    pub header_footer_images: usize,
}

/// Where images live in a package.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub image_relationships: Vec<RelationshipEntry>,
    pub inline_pictures: Vec<ParagraphPictures>,
    pub drawings: Vec<ParagraphDrawings>,
    pub table_images: Vec<CellImages>,
    pub header_footer_images: Vec<HeaderFooterImages>,
    pub totals: SummaryTotals,
}

/// Count image relationships, pictures and drawings across the package.
pub fn summary(pkg: &DocxPackage) -> Result<Summary> {
    let image_relationships: Vec<RelationshipEntry> = pkg
        .image_relationships()
        .into_iter()
        .map(|r| RelationshipEntry {
            id: r.id.clone(),
            target: r.target.clone(),
        })
        .collect();

    let mut inline_pictures = Vec::new();
    let mut drawings = Vec::new();
    let mut cells: Vec<CellImages> = Vec::new();

    for p in body_paragraphs(pkg.document()) {
        let pics = p.element.find_all("pic:pic").len();
        let drawing_count = p.element.find_all("w:drawing").len();

        if let Some(location) = p.cell {
            if pics + drawing_count > 0 {
                cells.push(CellImages {
                    location,
                    drawings: drawing_count,
                    pictures: pics,
                });
            }
            continue;
        }

        if pics > 0 {
            inline_pictures.push(ParagraphPictures {
                paragraph: p.index,
                pictures: pics,
                blip_ids: blip_refs(p.element),
            });
        }
        if drawing_count > 0 {
            drawings.push(ParagraphDrawings {
                paragraph: p.index,
                drawings: drawing_count,
                anchors: p.element.find_all("wp:anchor").len(),
                inlines: p.element.find_all("wp:inline").len(),
            });
        }
    }

    let header_footer_images: Vec<HeaderFooterImages> = pkg
        .header_footer_parts()?
        .into_iter()
        .map(|part| HeaderFooterImages {
            kind: part.kind,
            drawings: part.root.find_all("w:drawing").len(),
            part: part.name,
        })
        .filter(|h| h.drawings > 0)
        .collect();

    let totals = SummaryTotals {
        image_relationships: image_relationships.len(),
        inline_pictures: inline_pictures.iter().map(|p| p.pictures).sum(),
        drawings: drawings.iter().map(|d| d.drawings).sum(),
        table_images: cells.iter().map(|c| c.drawings + c.pictures).sum(),
        header_footer_images: header_footer_images.iter().map(|h| h.drawings).sum(),
    };

    Ok(Summary {
        image_relationships,
        inline_pictures,
        drawings,
        table_images: cells,
        header_footer_images,
        totals,
    })
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Image relationships:")?;
        if self.image_relationships.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for rel in &self.image_relationships {
            writeln!(f, "  {} -> {}", rel.id, rel.target)?;
        }

        writeln!(f, "\nInline pictures in paragraphs:")?;
        for p in &self.inline_pictures {
            writeln!(f, "  Paragraph {}: {} inline pic(s)", p.paragraph, p.pictures)?;
            for id in &p.blip_ids {
                writeln!(f, "    Blip embed ID: {}", id)?;
            }
        }

        writeln!(f, "\nDrawing objects:")?;
        for d in &self.drawings {
            writeln!(
                f,
                "  Paragraph {}: {} drawing(s), {} anchored, {} inline",
                d.paragraph, d.drawings, d.anchors, d.inlines
            )?;
        }

        writeln!(f, "\nImages in tables:")?;
        for c in &self.table_images {
            writeln!(
                f,
                "  Table {}, Row {}, Cell {}: {} drawings, {} pics",
                c.location.table, c.location.row, c.location.cell, c.drawings, c.pictures
            )?;
        }

        writeln!(f, "\nHeaders and footers:")?;
        for h in &self.header_footer_images {
            writeln!(f, "  {:?} {}: {} image(s)", h.kind, h.part, h.drawings)?;
        }

        writeln!(f, "\n{}", RULE)?;
        writeln!(f, "SUMMARY:")?;
        writeln!(f, "  Image relationships in document: {}", self.totals.image_relationships)?;
        writeln!(f, "  Inline pictures in paragraphs: {}", self.totals.inline_pictures)?;
        writeln!(f, "  Drawing objects: {}", self.totals.drawings)?;
        writeln!(f, "  Images in tables: {}", self.totals.table_images)?;
        writeln!(f, "  Images in headers/footers: {}", self.totals.header_footer_images)
    }
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ImageCheck {
    pub id: String,
    pub target: String,
    pub content_type: Option<String>,
    pub format: Option<String>,
    pub dimensions: Option<(u32, u32)>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParagraphRefs {
    pub paragraph: usize,
    pub modern: Vec<String>,
    pub vml: Vec<String>,
}

/// Which image relationships decode and which the body uses.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceReport {
    pub images: Vec<ImageCheck>,
    pub paragraphs: Vec<ParagraphRefs>,
    pub unreferenced: Vec<String>,
}

fn check_image(pkg: &DocxPackage, rel: &super::package::Relationship) -> ImageCheck {
    let mut check = ImageCheck {
        id: rel.id.clone(),
        target: rel.target.clone(),
        content_type: pkg.content_type(rel),
        format: None,
        dimensions: None,
        error: None,
    };

    let bytes = match pkg.part_bytes(rel) {
        Ok(bytes) => bytes,
        Err(e) => {
            check.error = Some(e.to_string());
            return check;
        }
    };

    match detect_format_from_bytes(bytes) {
        Ok(format) if format.is_vector() => {
            check.format = Some(format.name().to_string());
            check.error = Some("vector format; not decodable as raster".into());
        }
        Ok(format) => {
            check.format = Some(format.name().to_string());
            match image::load_from_memory(bytes) {
                Ok(img) => check.dimensions = Some((img.width(), img.height())),
                Err(e) => check.error = Some(e.to_string()),
            }
        }
        Err(e) => check.error = Some(e.to_string()),
    }
    check
}

/// Decode every image relationship and map body references to them.
pub fn references(pkg: &DocxPackage) -> ReferenceReport {
    let image_rels = pkg.image_relationships();
    let images: Vec<ImageCheck> = image_rels.iter().map(|r| check_image(pkg, r)).collect();

    let mut used = HashSet::new();
    let mut paragraphs = Vec::new();
    for p in body_paragraphs(pkg.document()) {
        let modern = blip_refs(p.element);
        let vml = rid_attrs_under(p.element, "w:pict");
        if modern.is_empty() && vml.is_empty() {
            continue;
        }
        used.extend(modern.iter().cloned());
        used.extend(vml.iter().cloned());
        paragraphs.push(ParagraphRefs {
            paragraph: p.index,
            modern,
            vml,
        });
    }

    let unreferenced = image_rels
        .iter()
        .filter(|r| !used.contains(&r.id))
        .map(|r| r.id.clone())
        .collect();

    ReferenceReport {
        images,
        paragraphs,
        unreferenced,
    }
}

impl fmt::Display for ReferenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Image relationships ({}):", self.images.len())?;
        for img in &self.images {
            let status = match (&img.dimensions, &img.error) {
                (Some((w, h)), _) => format!("OK {}x{}", w, h),
                (None, Some(e)) => format!("FAILED: {}", e),
                (None, None) => "unknown".to_string(),
            };
            writeln!(
                f,
                "  {} -> {} [{}] {}",
                img.id,
                img.target,
                img.format.as_deref().unwrap_or("?"),
                status
            )?;
        }

        writeln!(f, "\nReferences in body paragraphs:")?;
        for p in &self.paragraphs {
            writeln!(
                f,
                "  Paragraph {}: modern {:?}, vml {:?}",
                p.paragraph, p.modern, p.vml
            )?;
        }

        writeln!(f, "\nUnreferenced image relationships:")?;
        if self.unreferenced.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for id in &self.unreferenced {
            writeln!(f, "  {}", id)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Locate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocationStatus {
    Found,
    RawXmlOnly,
    Orphaned,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttributeHit {
    pub element: String,
    pub attribute: String,
    pub path: String,
}

/// Where one relationship id is used.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub rel_id: String,
    pub target: Option<String>,
    pub status: LocationStatus,
    pub found_in: Vec<String>,
    pub contexts: Vec<String>,
    pub attributes: Vec<AttributeHit>,
}

fn references_id(el: &Element, rel_id: &str) -> bool {
    blip_refs(el).iter().any(|id| id == rel_id)
        || rid_attrs_under(el, "w:pict").iter().any(|id| id == rel_id)
}

/// Search body, tables and header/footer parts for each id, falling back
/// to the raw document XML.
pub fn locate(pkg: &DocxPackage, rel_ids: &[String]) -> Result<Vec<Location>> {
    let paragraphs = body_paragraphs(pkg.document());
    let sub_parts = pkg.header_footer_parts()?;
    let raw = pkg.document_xml();

    let mut out = Vec::new();
    for rel_id in rel_ids {
        let mut found_in = Vec::new();
        for p in &paragraphs {
            if !references_id(p.element, rel_id) {
                continue;
            }
            found_in.push(match p.cell {
                Some(c) => format!("Table {}, Row {}, Cell {}", c.table, c.row, c.cell),
                None => format!("Paragraph {}", p.index),
            });
        }
        for part in &sub_parts {
            for (idx, p) in part.root.find_all("w:p").into_iter().enumerate() {
                if references_id(p, rel_id) {
                    found_in.push(format!("{:?} {}, Para {}", part.kind, part.name, idx));
                }
            }
        }

        let mut location = Location {
            rel_id: rel_id.clone(),
            target: pkg.relationship(rel_id).map(|r| r.target.clone()),
            status: LocationStatus::Found,
            found_in,
            contexts: Vec::new(),
            attributes: Vec::new(),
        };

        if location.found_in.is_empty() {
            location.contexts = raw_contexts(&raw, rel_id);
            location.attributes = attribute_hits(pkg.document(), rel_id);
            location.status = if location.contexts.is_empty() {
                LocationStatus::Orphaned
            } else {
                LocationStatus::RawXmlOnly
            };
        }
        out.push(location);
    }
    Ok(out)
}

/// ±[`RAW_CONTEXT_CHARS`] characters around each whole-token occurrence
/// of `needle`. `rId1` does not match inside `rId10`.
pub fn raw_contexts(haystack: &str, needle: &str) -> Vec<String> {
    if needle.is_empty() {
        return Vec::new();
    }
    haystack
        .match_indices(needle)
        .filter(|(start, m)| {
            let before = haystack[..*start].chars().next_back();
            let after = haystack[start + m.len()..].chars().next();
            !before.is_some_and(is_id_char) && !after.is_some_and(is_id_char)
        })
        .map(|(start, m)| {
            let end = start + m.len();
            let before: String = {
                let chars: Vec<char> = haystack[..start].chars().rev().take(RAW_CONTEXT_CHARS).collect();
                chars.into_iter().rev().collect()
            };
            let after: String = haystack[end..].chars().take(RAW_CONTEXT_CHARS).collect();
            format!("{}{}{}", before, m, after)
        })
        .collect()
}

fn is_id_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Elements carrying a relationship attribute equal to `rel_id`, with their paths.
pub fn attribute_hits(root: &Element, rel_id: &str) -> Vec<AttributeHit> {
    let mut hits = Vec::new();
    root.walk_with_path(|el, ancestors| {
        for attr in REL_ATTRIBUTES {
            if el.attr(attr) == Some(rel_id) {
                let start = ancestors.len().saturating_sub(PATH_DEPTH);
                hits.push(AttributeHit {
                    element: el.name.clone(),
                    attribute: attr.to_string(),
                    path: ancestors[start..].join(" -> "),
                });
            }
        }
    });
    hits
}

/// Render a list of locations.
pub fn render_locations(locations: &[Location]) -> String {
    let mut out = String::new();
    for loc in locations {
        out.push_str(&format!(
            "\n{} -> {}\n",
            loc.rel_id,
            loc.target.as_deref().unwrap_or("(no relationship)")
        ));
        match loc.status {
            LocationStatus::Found => {
                for place in &loc.found_in {
                    out.push_str(&format!("  Found in: {}\n", place));
                }
            }
            LocationStatus::RawXmlOnly => {
                out.push_str("  NOT FOUND in paragraphs, tables, headers, or footers\n");
                out.push_str(&format!("  {} IS in document.xml\n", loc.rel_id));
                for ctx in &loc.contexts {
                    out.push_str(&format!("    Context: ...{}...\n", ctx));
                }
                for hit in &loc.attributes {
                    out.push_str(&format!(
                        "    {}@{} Path: {}\n",
                        hit.element, hit.attribute, hit.path
                    ));
                }
            }
            LocationStatus::Orphaned => {
                out.push_str(&format!(
                    "  {} NOT in document.xml - orphaned image in media folder\n",
                    loc.rel_id
                ));
            }
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PictInfo {
    pub paragraph: usize,
    pub shapes: usize,
    pub imagedata: Vec<Vec<(String, String)>>,
    pub raw_xml: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlternateContentInfo {
    pub paragraph: usize,
    pub choices: usize,
    pub fallbacks: usize,
    pub drawings_per_choice: Vec<usize>,
    pub picts_per_fallback: Vec<usize>,
}

/// Legacy and compatibility image containers in the body.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerReport {
    pub picts: Vec<PictInfo>,
    pub alternate_content: Vec<AlternateContentInfo>,
    pub vml_image_ids: Vec<Option<String>>,
    pub objects: usize,
}

/// Inspect `w:pict`, `mc:AlternateContent` and `w:object` elements.
pub fn containers(pkg: &DocxPackage) -> ContainerReport {
    let mut picts = Vec::new();
    let mut alternate_content = Vec::new();

    for p in body_paragraphs(pkg.document()) {
        for pict in p.element.find_all("w:pict") {
            picts.push(PictInfo {
                paragraph: p.index,
                shapes: pict.find_all("v:shape").len(),
                imagedata: pict
                    .find_all("v:imagedata")
                    .into_iter()
                    .map(|d| d.attrs.clone())
                    .collect(),
                raw_xml: truncate_chars(&pict.to_xml_string(), PICT_XML_CHARS),
            });
        }
        for alt in p.element.find_all("mc:AlternateContent") {
            let choices = alt.find_all("mc:Choice");
            let fallbacks = alt.find_all("mc:Fallback");
            alternate_content.push(AlternateContentInfo {
                paragraph: p.index,
                choices: choices.len(),
                fallbacks: fallbacks.len(),
                drawings_per_choice: choices.iter().map(|c| c.find_all("w:drawing").len()).collect(),
                picts_per_fallback: fallbacks.iter().map(|f| f.find_all("w:pict").len()).collect(),
            });
        }
    }

    let document = pkg.document();
    let vml_image_ids = document
        .find_all("v:imagedata")
        .into_iter()
        .map(|d| {
            d.attr("r:id")
                .or_else(|| d.attr("r:embed"))
                .or_else(|| d.attr("o:relid"))
                .map(str::to_string)
        })
        .collect();

    ContainerReport {
        picts,
        alternate_content,
        vml_image_ids,
        objects: document.find_all("w:object").len(),
    }
}

impl fmt::Display for ContainerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pict) in self.picts.iter().enumerate() {
            writeln!(f, "Paragraph {}: w:pict #{}", pict.paragraph, i + 1)?;
            writeln!(f, "  Contains {} v:shape element(s)", pict.shapes)?;
            writeln!(f, "  Contains {} v:imagedata element(s)", pict.imagedata.len())?;
            for attrs in &pict.imagedata {
                writeln!(f, "    Attributes: {:?}", attrs)?;
            }
            writeln!(f, "{}\n", pict.raw_xml)?;
        }
        writeln!(f, "Total w:pict elements: {}", self.picts.len())?;

        for alt in &self.alternate_content {
            writeln!(
                f,
                "\nParagraph {}: mc:AlternateContent with {} Choice(s) and {} Fallback(s)",
                alt.paragraph, alt.choices, alt.fallbacks
            )?;
            for n in &alt.drawings_per_choice {
                writeln!(f, "    Choice has {} drawing(s)", n)?;
            }
            for n in &alt.picts_per_fallback {
                writeln!(f, "    Fallback has {} w:pict(s)", n)?;
            }
        }
        writeln!(
            f,
            "Total mc:AlternateContent elements: {}",
            self.alternate_content.len()
        )?;

        writeln!(f, "\nVML imagedata elements: {}", self.vml_image_ids.len())?;
        for id in &self.vml_image_ids {
            writeln!(f, "  VML image with rel_id: {}", id.as_deref().unwrap_or("None"))?;
        }
        writeln!(f, "w:object (embedded object) elements: {}", self.objects)
    }
}

// ---------------------------------------------------------------------------
// OLE objects
// ---------------------------------------------------------------------------

/// An embedded OLE object (typically an Excel chart) in body order.
#[derive(Debug, Clone, Serialize)]
pub struct OleObject {
    pub number: usize,
    pub paragraph: usize,
    pub rel_ids: Vec<String>,
    pub caption: String,
    pub parts: Vec<(String, String)>,
}

/// Find `w:object` elements with their captions and target parts.
pub fn ole_objects(pkg: &DocxPackage) -> Vec<OleObject> {
    let paragraphs = body_paragraphs(pkg.document());
    let texts = paragraph_texts(&paragraphs);
    let mut out = Vec::new();

    for p in &paragraphs {
        for object in p.element.find_all("w:object") {
            let mut seen = HashSet::new();
            let rel_ids: Vec<String> = object
                .descendants()
                .into_iter()
                .flat_map(|d| d.attrs.iter())
                .filter(|(_, v)| v.starts_with("rId"))
                .map(|(_, v)| v.clone())
                .filter(|v| seen.insert(v.clone()))
                .collect();

            let parts = rel_ids
                .iter()
                .filter_map(|id| {
                    let rel = pkg.relationship(id)?;
                    Some((id.clone(), format!("/{}", pkg.part_name(rel))))
                })
                .collect();

            out.push(OleObject {
                number: out.len() + 1,
                paragraph: p.index,
                caption: find_caption(&texts, p.index),
                rel_ids,
                parts,
            });
        }
    }
    out
}

/// Render OLE objects as text.
pub fn render_ole_objects(objects: &[OleObject]) -> String {
    let mut out = String::new();
    for obj in objects {
        out.push_str(&format!(
            "\nOLE Object #{} at paragraph {}:\n",
            obj.number, obj.paragraph
        ));
        out.push_str(&format!("  Relationship IDs: {}\n", obj.rel_ids.join(", ")));
        let caption = if obj.caption.is_empty() {
            "(no caption found)".to_string()
        } else {
            truncate_chars(&obj.caption, 100)
        };
        out.push_str(&format!("  Caption: {}\n", caption));
        for (id, part) in &obj.parts {
            out.push_str(&format!("    {} -> {}\n", id, part));
        }
    }
    out.push_str(&format!("\n{}\nTotal OLE objects found: {}\n", RULE, objects.len()));
    out
}

// ---------------------------------------------------------------------------
// Duplicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ImageEntry {
    pub rel_id: String,
    pub paragraph: usize,
    pub content_type: Option<String>,
    pub caption: String,
    pub byte_len: usize,
    pub digest: String,
}

/// 1-based positions in [`DuplicateReport::images`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DuplicatePair {
    pub original: usize,
    pub duplicate: usize,
}

/// Every referenced image in order, and which ones share content.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateReport {
    pub images: Vec<ImageEntry>,
    pub duplicates: Vec<DuplicatePair>,
}

/// List referenced images and pair up identical contents.
pub fn duplicates(pkg: &DocxPackage) -> DuplicateReport {
    let paragraphs = body_paragraphs(pkg.document());
    let texts = paragraph_texts(&paragraphs);
    let mut images = Vec::new();

    for p in &paragraphs {
        let refs: Vec<String> = blip_refs(p.element)
            .into_iter()
            .chain(rid_attrs_under(p.element, "w:pict"))
            .chain(rid_attrs_under(p.element, "w:object"))
            .collect();
        if refs.is_empty() {
            continue;
        }
        let caption = find_caption(&texts, p.index);

        for rel_id in refs {
            let bytes = pkg
                .relationship(&rel_id)
                .ok_or_else(|| format!("{} has no relationship", rel_id))
                .and_then(|rel| pkg.part_bytes(rel).map_err(|e| e.to_string()));
            let bytes = match bytes {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("Error extracting {}: {}", rel_id, e);
                    continue;
                }
            };
            images.push(ImageEntry {
                content_type: pkg.relationship(&rel_id).and_then(|r| pkg.content_type(r)),
                rel_id,
                paragraph: p.index,
                caption: if caption.is_empty() {
                    "(no caption)".to_string()
                } else {
                    truncate_chars(&caption, CAPTION_PREVIEW_CHARS)
                },
                byte_len: bytes.len(),
                digest: digest_hex(bytes),
            });
        }
    }

    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    let mut pairs = Vec::new();
    for (idx, img) in images.iter().enumerate() {
        match first_seen.get(img.digest.as_str()) {
            Some(&orig) => pairs.push(DuplicatePair {
                original: orig + 1,
                duplicate: idx + 1,
            }),
            None => {
                first_seen.insert(&img.digest, idx);
            }
        }
    }

    DuplicateReport {
        images,
        duplicates: pairs,
    }
}

impl fmt::Display for DuplicateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total images found: {}\n", self.images.len())?;
        writeln!(f, "All images in order:")?;
        for (idx, img) in self.images.iter().enumerate() {
            writeln!(
                f,
                "{}. {} (para {}) - {}",
                idx + 1,
                img.rel_id,
                img.paragraph,
                img.content_type.as_deref().unwrap_or("unknown")
            )?;
            writeln!(f, "   Caption: {}", img.caption)?;
            writeln!(f, "   Bytes: {}, MD5: {}", img.byte_len, img.digest)?;
        }

        writeln!(f, "\nDuplicate contents:")?;
        if self.duplicates.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for pair in &self.duplicates {
            let original = &self.images[pair.original - 1];
            let duplicate = &self.images[pair.duplicate - 1];
            writeln!(f, "DUPLICATE FOUND:")?;
            writeln!(f, "  Original: #{} - {}", pair.original, original.caption)?;
            writeln!(f, "  Duplicate: #{} - {}", pair.duplicate, duplicate.caption)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_contexts_window() {
        let xml = format!("{}\"rId7\"{}", "a".repeat(200), "b".repeat(200));
        let contexts = raw_contexts(&xml, "rId7");
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].len(), 150 + 4 + 150);
        assert!(contexts[0].starts_with('a') && contexts[0].ends_with('b'));

        assert_eq!(raw_contexts("short rId7 x", "rId7")[0], "short rId7 x");
        assert!(raw_contexts("nothing", "rId7").is_empty());
    }

    #[test]
    fn test_raw_contexts_whole_id_only() {
        let xml = r#"<a:blip r:embed="rId10"/><a:blip r:embed="rId1"/><x id="rId1_b"/>"#;
        let contexts = raw_contexts(xml, "rId1");
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].contains(r#"r:embed="rId1"/>"#));
        assert!(raw_contexts(r#"r:embed="rId10" r:embed="rId12""#, "rId1").is_empty());
    }

    #[test]
    fn test_attribute_hits_path() {
        let root = crate::docx::xml::parse(
            br#"<w:document><w:body><w:p><w:r><w:pict><v:shape><v:imagedata r:id="rId20"/></v:shape></w:pict></w:r></w:p></w:body></w:document>"#,
        )
        .unwrap();
        let hits = attribute_hits(&root, "rId20");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].element, "v:imagedata");
        assert_eq!(hits[0].attribute, "r:id");
        assert_eq!(hits[0].path, "w:body -> w:p -> w:r -> w:pict -> v:shape");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }
}
