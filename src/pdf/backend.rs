//! Thin document layer over `lopdf`.
//!
//! Keeps page-tree walking, resource inheritance and stream rewriting in
//! one place so the footer and volume tools only deal with content
//! operations.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId, Stream};

use crate::detect::{detect_format_from_path, FileFormat};
use crate::error::{Error, Result};

/// Default page size when no MediaBox can be found (US Letter).
pub const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// Maximum depth followed when walking `/Parent` links.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// An editable PDF document.
pub struct PdfDocument {
    doc: LopdfDocument,
}

impl PdfDocument {
    /// Load a PDF from a file path, verifying the header first.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match detect_format_from_path(path)? {
            FileFormat::Pdf { .. } => {}
            other => return Err(Error::UnknownFormat(format!("expected PDF, found {}", other))),
        }

        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        Ok(Self { doc })
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self { doc })
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Pages as (page number → object id), 1-based.
    pub fn pages(&self) -> BTreeMap<u32, ObjectId> {
        self.doc.get_pages()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Object id of the first page.
    pub fn first_page(&self) -> Result<ObjectId> {
        self.pages()
            .values()
            .next()
            .copied()
            .ok_or(Error::EmptyDocument)
    }

    /// Look up a page attribute, following `/Parent` inheritance.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = current.get(key) {
                return Some(value);
            }
            let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
            current = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn resolve<'a>(&'a self, obj: &'a Object) -> &'a Object {
        match obj {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(obj),
            _ => obj,
        }
    }

    /// The page's MediaBox as `[llx, lly, urx, ury]`.
    pub fn media_box(&self, page_id: ObjectId) -> [f32; 4] {
        let Some(obj) = self.inherited(page_id, b"MediaBox") else {
            log::warn!("Page {:?} has no MediaBox; assuming Letter", page_id);
            return LETTER;
        };
        let Ok(values) = self.resolve(obj).as_array() else {
            return LETTER;
        };

        let nums: Vec<f32> = values
            .iter()
            .filter_map(|v| number(self.resolve(v)))
            .collect();
        if nums.len() == 4 {
            [nums[0], nums[1], nums[2], nums[3]]
        } else {
            LETTER
        }
    }

    /// Page width and height in points.
    pub fn page_size(&self, page_id: ObjectId) -> (f32, f32) {
        let [llx, lly, urx, ury] = self.media_box(page_id);
        ((urx - llx).abs(), (ury - lly).abs())
    }

    /// Effective resource dictionary of a page, inlined and owned.
    ///
    /// Referenced sub-dictionaries (`/Font`, `/XObject`, ...) are resolved
    /// so the caller can modify and write back a self-contained copy.
    pub fn resources(&self, page_id: ObjectId) -> Dictionary {
        let Some(obj) = self.inherited(page_id, b"Resources") else {
            return Dictionary::new();
        };
        let Ok(dict) = self.resolve(obj).as_dict() else {
            return Dictionary::new();
        };

        let mut owned = Dictionary::new();
        for (key, value) in dict.iter() {
            let value = match self.resolve(value) {
                Object::Dictionary(d) => Object::Dictionary(d.clone()),
                _ => value.clone(),
            };
            owned.set(key.clone(), value);
        }
        owned
    }

    /// Replace the page's `/Resources` with an inline dictionary.
    pub fn set_resources(&mut self, page_id: ObjectId, resources: Dictionary) -> Result<()> {
        let page = self.doc.get_dictionary_mut(page_id)?;
        page.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    /// Decompressed, concatenated content stream bytes of a page.
    pub fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>> {
        let contents = match self.doc.get_dictionary(page_id)?.get(b"Contents") {
            Ok(contents) => contents,
            Err(_) => return Ok(Vec::new()),
        };

        match self.resolve(contents) {
            Object::Stream(s) => Ok(stream_bytes(s)?),
            Object::Array(arr) => {
                let mut content = Vec::new();
                for obj in arr {
                    if let Object::Stream(s) = self.resolve(obj) {
                        content.extend_from_slice(&stream_bytes(s)?);
                        content.push(b'\n');
                    }
                }
                Ok(content)
            }
            _ => Err(Error::Pdf(format!(
                "Invalid content stream on page {:?}",
                page_id
            ))),
        }
    }

    /// Parse content stream bytes into operations.
    pub fn decode_content(data: &[u8]) -> Result<Content> {
        Content::decode(data).map_err(|e| Error::Pdf(e.to_string()))
    }

    /// Replace a page's content with a single new stream.
    pub fn set_page_content(&mut self, page_id: ObjectId, content: &Content) -> Result<()> {
        let data = content.encode()?;
        let stream_id = self.add_stream(&data)?;
        let page = self.doc.get_dictionary_mut(page_id)?;
        page.set("Contents", Object::Reference(stream_id));
        Ok(())
    }

    /// Wrap a page's existing content between `before` and `after` streams.
    pub fn wrap_page_content(
        &mut self,
        page_id: ObjectId,
        before: &[u8],
        after: &[u8],
    ) -> Result<()> {
        let existing: Vec<Object> = match self.doc.get_dictionary(page_id)?.get(b"Contents") {
            Ok(Object::Array(arr)) => arr.clone(),
            Ok(other) => vec![other.clone()],
            Err(_) => Vec::new(),
        };

        let before_id = self.add_stream(before)?;
        let after_id = self.add_stream(after)?;

        let mut contents = Vec::with_capacity(existing.len() + 2);
        contents.push(Object::Reference(before_id));
        contents.extend(existing);
        contents.push(Object::Reference(after_id));

        let page = self.doc.get_dictionary_mut(page_id)?;
        page.set("Contents", Object::Array(contents));
        Ok(())
    }

    /// Add a Flate-compressed stream object.
    pub fn add_stream(&mut self, data: &[u8]) -> Result<ObjectId> {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        let stream = Stream::new(dict, deflate(data)?);
        Ok(self.doc.add_object(stream))
    }

    /// Form XObjects referenced from a page's resources.
    pub fn form_xobjects(&self, page_id: ObjectId) -> Vec<ObjectId> {
        let resources = self.resources(page_id);
        let Ok(xobjects) = resources.get(b"XObject").and_then(Object::as_dict) else {
            return Vec::new();
        };

        xobjects
            .iter()
            .filter_map(|(_, obj)| obj.as_reference().ok())
            .filter(|id| {
                matches!(
                    self.doc.get_object(*id),
                    Ok(Object::Stream(s)) if s.dict.get(b"Subtype")
                        .and_then(Object::as_name)
                        .map(|n| n == b"Form")
                        .unwrap_or(false)
                )
            })
            .collect()
    }

    /// Decompressed bytes of a stream object.
    pub fn stream_content(&self, id: ObjectId) -> Result<Vec<u8>> {
        match self.doc.get_object(id)? {
            Object::Stream(s) => stream_bytes(s),
            _ => Err(Error::Pdf(format!("Object {:?} is not a stream", id))),
        }
    }

    /// Replace a stream object's content, recompressing it.
    pub fn set_stream_content(&mut self, id: ObjectId, content: &Content) -> Result<()> {
        let data = deflate(&content.encode()?)?;
        let stream = self.doc.get_object_mut(id)?.as_stream_mut()?;
        stream.dict.remove(b"DecodeParms");
        stream.dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        stream.set_content(data);
        Ok(())
    }

    /// Save to `path`.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.doc.save(path.as_ref())?;
        Ok(())
    }

    /// Save through a temporary sibling file, then rename over `path`.
    pub fn save_atomic<P: AsRef<Path>>(&mut self, path: P, tmp_path: P) -> Result<()> {
        let (path, tmp_path) = (path.as_ref(), tmp_path.as_ref());
        if let Err(e) = self.doc.save(tmp_path) {
            let _ = fs::remove_file(tmp_path);
            return Err(e.into());
        }
        fs::rename(tmp_path, path)?;
        Ok(())
    }
}

fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|e| Error::Pdf(e.to_string()))
    } else {
        Ok(stream.content.clone())
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Extract a number from an Integer or Real object.
pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
