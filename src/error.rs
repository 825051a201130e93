//! Error types for journal-tools.

use std::io;
use thiserror::Error;

/// Result type alias for journal-tools operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while processing journal files.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file format is not recognized.
    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error reading or writing PDF structure.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The PDF has no pages to stamp or rewrite.
    #[error("PDF has no pages")]
    EmptyDocument,

    /// Error opening a DOCX package.
    #[error("DOCX package error: {0}")]
    Package(String),

    /// A required part is missing from the DOCX package.
    #[error("Missing package part: {0}")]
    MissingPart(String),

    /// Legacy binary Word documents cannot be read.
    #[error("Legacy .doc files are not supported; save the document as .docx first")]
    LegacyDoc,

    /// Malformed XML inside a package part.
    #[error("XML error: {0}")]
    Xml(String),

    /// Error decoding or encoding a raster image.
    #[error("Image error: {0}")]
    Image(String),

    /// EMF/WMF vector images need an external rasterizer.
    #[error("{0} is a vector format; rasterize it externally (e.g. `magick in.{1} out.gif`)")]
    VectorImage(&'static str, &'static str),

    /// Error reading a spreadsheet.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// A required spreadsheet column is missing.
    #[error("Column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::Pdf(err.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            zip::result::ZipError::FileNotFound => Error::MissingPart("file not found".into()),
            _ => Error::Package(err.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => Error::Io(e),
            _ => Error::Image(err.to_string()),
        }
    }
}

impl From<calamine::Error> for Error {
    fn from(err: calamine::Error) -> Self {
        Error::Spreadsheet(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Error::Spreadsheet(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}
