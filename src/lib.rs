//! # journal-tools
//!
//! Production utilities for an academic journal's publishing workflow.
//!
//! ## Quick Start
//!
//! ```no_run
//! use journal_tools::docx::{extract_images, ExtractOptions};
//! use std::path::Path;
//!
//! fn main() -> journal_tools::Result<()> {
//!     let options = ExtractOptions::new().with_width(1200);
//!     let summary = extract_images(Path::new("IJES-18-42-Figures.docx"), &options)?;
//!     println!("{} figures, {} schemes", summary.figures, summary.schemes);
//!     Ok(())
//! }
//! ```
//!
//! ## Tools
//!
//! - **Author footers**: stamp `Corresponding Author: ...` onto PDFs matched
//!   to spreadsheet rows by title ([`pdf::footer`])
//! - **Volume fixes**: rewrite `Vol. 45` to `Vol. 47` inside page content
//!   ([`pdf::volume`])
//! - **Figure extraction**: captioned DOCX images to numbered GIFs
//!   ([`docx::images`], [`gif`])
//! - **DOCX diagnostics**: where image relationships are used, orphaned or
//!   duplicated ([`docx::diagnose`])
//! - **Issue scraping**: download article PDFs and collect titles from the
//!   journal website ([`scrape`])
//! - **Title workbooks**: export web or local title listings ([`export`],
//!   [`collect`])
//! - **Email audit**: rows without a usable email address ([`emails`])

pub mod collect;
pub mod detect;
pub mod docx;
pub mod emails;
pub mod error;
pub mod export;
pub mod gif;
pub mod pdf;
pub mod scrape;
pub mod sheet;
pub mod titles;

// Re-export commonly used types
pub use collect::collect_titles;
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, FileFormat};
pub use docx::{extract_images, DocxPackage, ExtractOptions, ExtractSummary};
pub use emails::{audit_file, AuditOptions, AuditReport};
pub use error::{Error, Result};
pub use export::{export_titles, ColumnOrder, ExportSummary, TitleRecord};
pub use pdf::{add_footer, change_volume, FooterOptions, FooterPlacement, VolumeChange, VolumeOptions};
pub use scrape::{IssueScraper, ScrapeOptions, Site, TitleCollector};
pub use sheet::{read_table, Cell, Table};
pub use titles::{normalize_title, sanitize_filename, titles_match, TitleMatch};
