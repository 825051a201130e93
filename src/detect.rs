//! File format detection from magic bytes.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// File formats the tools know how to route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFormat {
    /// PDF with its header version (e.g., "1.7")
    Pdf { version: String },
    /// ZIP container (DOCX, XLSX and other OOXML packages)
    Zip,
    /// OLE2 compound file (legacy .doc/.xls)
    Ole2,
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    /// Enhanced Metafile
    Emf,
    /// Windows Metafile (placeable or standard)
    Wmf,
}

impl FileFormat {
    /// Whether the format is a Windows vector metafile.
    pub fn is_vector(&self) -> bool {
        matches!(self, FileFormat::Emf | FileFormat::Wmf)
    }

    /// Whether the format is a raster image the `image` crate can decode.
    pub fn is_raster(&self) -> bool {
        matches!(
            self,
            FileFormat::Png | FileFormat::Jpeg | FileFormat::Gif | FileFormat::Bmp | FileFormat::Tiff
        )
    }

    /// Short uppercase name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Pdf { .. } => "PDF",
            FileFormat::Zip => "ZIP",
            FileFormat::Ole2 => "OLE2",
            FileFormat::Png => "PNG",
            FileFormat::Jpeg => "JPEG",
            FileFormat::Gif => "GIF",
            FileFormat::Bmp => "BMP",
            FileFormat::Tiff => "TIFF",
            FileFormat::Emf => "EMF",
            FileFormat::Wmf => "WMF",
        }
    }

    /// Conventional file extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Pdf { .. } => "pdf",
            FileFormat::Zip => "zip",
            FileFormat::Ole2 => "doc",
            FileFormat::Png => "png",
            FileFormat::Jpeg => "jpg",
            FileFormat::Gif => "gif",
            FileFormat::Bmp => "bmp",
            FileFormat::Tiff => "tiff",
            FileFormat::Emf => "emf",
            FileFormat::Wmf => "wmf",
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Pdf { version } => write!(f, "PDF {}", version),
            other => f.write_str(other.name()),
        }
    }
}

const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const WMF_PLACEABLE_MAGIC: &[u8] = &[0xD7, 0xCD, 0xC6, 0x9A];
// " EMF" signature at byte offset 40 of the EMR_HEADER record
const EMF_SIGNATURE: &[u8] = b" EMF";
const EMF_SIGNATURE_OFFSET: usize = 40;

/// Number of header bytes needed for detection.
pub const HEADER_LEN: usize = 64;

/// Detect a file format from a path by reading its header.
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<FileFormat> {
    let mut file = File::open(path)?;
    let mut header = Vec::with_capacity(HEADER_LEN);
    file.by_ref()
        .take(HEADER_LEN as u64)
        .read_to_end(&mut header)?;
    detect_format_from_bytes(&header)
}

/// Detect a file format from the leading bytes of its content.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<FileFormat> {
    if data.starts_with(PDF_MAGIC) {
        return detect_pdf_version(data);
    }
    if data.starts_with(b"PK\x03\x04") || data.starts_with(b"PK\x05\x06") {
        return Ok(FileFormat::Zip);
    }
    if data.starts_with(OLE2_MAGIC) {
        return Ok(FileFormat::Ole2);
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Ok(FileFormat::Png);
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Ok(FileFormat::Jpeg);
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Ok(FileFormat::Gif);
    }
    if data.starts_with(b"BM") && data.len() >= 14 {
        return Ok(FileFormat::Bmp);
    }
    if data.starts_with(b"II*\x00") || data.starts_with(b"MM\x00*") {
        return Ok(FileFormat::Tiff);
    }
    if is_emf(data) {
        return Ok(FileFormat::Emf);
    }
    if is_wmf(data) {
        return Ok(FileFormat::Wmf);
    }

    Err(Error::UnknownFormat(describe_header(data)))
}

fn detect_pdf_version(data: &[u8]) -> Result<FileFormat> {
    let start = PDF_MAGIC.len();
    if data.len() < start + VERSION_LEN {
        return Err(Error::UnknownFormat("truncated PDF header".into()));
    }

    let version = String::from_utf8_lossy(&data[start..start + VERSION_LEN]).to_string();
    if !is_valid_version(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    Ok(FileFormat::Pdf { version })
}

fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

fn is_emf(data: &[u8]) -> bool {
    data.len() >= EMF_SIGNATURE_OFFSET + EMF_SIGNATURE.len()
        && data.starts_with(&[0x01, 0x00, 0x00, 0x00])
        && &data[EMF_SIGNATURE_OFFSET..EMF_SIGNATURE_OFFSET + EMF_SIGNATURE.len()] == EMF_SIGNATURE
}

fn is_wmf(data: &[u8]) -> bool {
    if data.starts_with(WMF_PLACEABLE_MAGIC) {
        return true;
    }
    // Standard META_HEADER: type 1 (memory) or 2 (disk), header size 9 words
    data.len() >= 4
        && (data[0] == 0x01 || data[0] == 0x02)
        && data[1] == 0x00
        && data[2] == 0x09
        && data[3] == 0x00
}

fn describe_header(data: &[u8]) -> String {
    let shown: Vec<String> = data.iter().take(8).map(|b| format!("{:02X}", b)).collect();
    if shown.is_empty() {
        "empty input".to_string()
    } else {
        format!("header bytes {}", shown.join(" "))
    }
}

/// Check if a file is a PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    matches!(detect_format_from_path(path), Ok(FileFormat::Pdf { .. }))
}
