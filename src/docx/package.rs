//! DOCX package access: parts, relationships and content types.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use serde::Serialize;
use zip::ZipArchive;

use super::xml::{self, Element};
use crate::detect::{detect_format_from_bytes, FileFormat};
use crate::error::{Error, Result};

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

/// One entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship points at an image part.
    pub fn is_image(&self) -> bool {
        self.target.contains("image") || self.rel_type.ends_with("/image")
    }

    fn type_suffix(&self) -> &str {
        self.rel_type.rsplit('/').next().unwrap_or("")
    }
}

/// Header or footer part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubPartKind {
    Header,
    Footer,
}

/// A header/footer part with its own relationships.
#[derive(Debug, Clone)]
pub struct SubPart {
    pub kind: SubPartKind,
    pub name: String,
    pub root: Element,
    pub rels: Vec<Relationship>,
}

#[derive(Debug, Clone, Default)]
struct ContentTypes {
    defaults: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    fn parse(root: &Element) -> Self {
        let mut types = Self::default();
        for el in root.child_elements() {
            match (el.local_name(), el.attr("ContentType")) {
                ("Default", Some(ct)) => {
                    if let Some(ext) = el.attr("Extension") {
                        types.defaults.insert(ext.to_ascii_lowercase(), ct.to_string());
                    }
                }
                ("Override", Some(ct)) => {
                    if let Some(part) = el.attr("PartName") {
                        types
                            .overrides
                            .insert(part.trim_start_matches('/').to_string(), ct.to_string());
                    }
                }
                _ => {}
            }
        }
        types
    }

    fn lookup(&self, part_name: &str) -> Option<&str> {
        if let Some(ct) = self.overrides.get(part_name) {
            return Some(ct);
        }
        let ext = part_name.rsplit('.').next()?.to_ascii_lowercase();
        self.defaults.get(&ext).map(String::as_str)
    }
}

/// An opened `.docx` file held in memory.
pub struct DocxPackage {
    parts: BTreeMap<String, Vec<u8>>,
    document: Element,
    rels: Vec<Relationship>,
    content_types: ContentTypes,
}

impl DocxPackage {
    /// Open a `.docx` from disk. Legacy `.doc` files are rejected.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let is_doc_extension = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("doc"))
            .unwrap_or(false);
        if is_doc_extension {
            return Err(Error::LegacyDoc);
        }

        let data = fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Open a package from its raw bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        match detect_format_from_bytes(&data) {
            Ok(FileFormat::Zip) => {}
            Ok(FileFormat::Ole2) => return Err(Error::LegacyDoc),
            Ok(other) => {
                return Err(Error::UnknownFormat(format!(
                    "expected a DOCX package, found {}",
                    other
                )))
            }
            Err(e) => return Err(e),
        }

        let mut archive = ZipArchive::new(Cursor::new(data))?;
        let mut parts = BTreeMap::new();
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            parts.insert(file.name().trim_start_matches('/').to_string(), buf);
        }

        let document = match parts.get(DOCUMENT_PART) {
            Some(bytes) => xml::parse(bytes)?,
            None => return Err(Error::MissingPart(DOCUMENT_PART.into())),
        };
        let rels = match parts.get(DOCUMENT_RELS_PART) {
            Some(bytes) => parse_relationships(bytes)?,
            None => Vec::new(),
        };
        let content_types = match parts.get(CONTENT_TYPES_PART) {
            Some(bytes) => ContentTypes::parse(&xml::parse(bytes)?),
            None => ContentTypes::default(),
        };

        log::debug!(
            "Opened DOCX package: {} parts, {} relationships",
            parts.len(),
            rels.len()
        );

        Ok(Self {
            parts,
            document,
            rels,
            content_types,
        })
    }

    /// Root element of `word/document.xml`.
    pub fn document(&self) -> &Element {
        &self.document
    }

    /// Raw text of `word/document.xml`.
    pub fn document_xml(&self) -> String {
        self.parts
            .get(DOCUMENT_PART)
            .map(|b| String::from_utf8_lossy(b).to_string())
            .unwrap_or_default()
    }

    /// Relationships of the main document part, in file order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.rels
    }

    pub fn relationship(&self, id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.id == id)
    }

    /// Image relationships of the main document part.
    pub fn image_relationships(&self) -> Vec<&Relationship> {
        self.rels.iter().filter(|r| r.is_image()).collect()
    }

    /// Package part name a document relationship points to.
    pub fn part_name(&self, rel: &Relationship) -> String {
        resolve_target("word", &rel.target)
    }

    /// Bytes of the part a relationship points to.
    pub fn part_bytes(&self, rel: &Relationship) -> Result<&[u8]> {
        if rel.external {
            return Err(Error::MissingPart(format!(
                "{} is an external link to {}",
                rel.id, rel.target
            )));
        }
        let name = self.part_name(rel);
        self.parts
            .get(&name)
            .map(Vec::as_slice)
            .ok_or(Error::MissingPart(name))
    }

    /// Content type declared for the part a relationship points to.
    pub fn content_type(&self, rel: &Relationship) -> Option<String> {
        self.content_types
            .lookup(&self.part_name(rel))
            .map(str::to_string)
    }

    /// Header and footer parts referenced from the document.
    pub fn header_footer_parts(&self) -> Result<Vec<SubPart>> {
        let mut out = Vec::new();
        for rel in &self.rels {
            let kind = match rel.type_suffix() {
                "header" => SubPartKind::Header,
                "footer" => SubPartKind::Footer,
                _ => continue,
            };
            let name = self.part_name(rel);
            let Some(bytes) = self.parts.get(&name) else {
                log::warn!("{} part {} is missing", rel.id, name);
                continue;
            };
            let root = xml::parse(bytes)?;
            let rels = match self.parts.get(&rels_part_for(&name)) {
                Some(bytes) => parse_relationships(bytes)?,
                None => Vec::new(),
            };
            out.push(SubPart {
                kind,
                name,
                root,
                rels,
            });
        }
        Ok(out)
    }
}

/// Parse a `.rels` part.
pub fn parse_relationships(data: &[u8]) -> Result<Vec<Relationship>> {
    let root = xml::parse(data)?;
    Ok(root
        .child_elements()
        .filter(|el| el.local_name() == "Relationship")
        .filter_map(|el| {
            Some(Relationship {
                id: el.attr("Id")?.to_string(),
                rel_type: el.attr("Type").unwrap_or_default().to_string(),
                target: el.attr("Target").unwrap_or_default().to_string(),
                external: el
                    .attr("TargetMode")
                    .map(|m| m.eq_ignore_ascii_case("External"))
                    .unwrap_or(false),
            })
        })
        .collect())
}

/// Resolve a relationship target against the source part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

/// `word/header1.xml` → `word/_rels/header1.xml.rels`
fn rels_part_for(part_name: &str) -> String {
    match part_name.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part_name),
    }
}
