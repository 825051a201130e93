//! DOCX figure extraction and image-relationship diagnostics.

pub mod diagnose;
pub mod images;
pub mod package;
pub mod xml;

pub use images::{
    classify_caption, collect_images, extract_images, find_caption, Classification,
    ExtractOptions, ExtractSummary, ExtractedImage, ImageKind,
};
pub use package::{DocxPackage, Relationship};
