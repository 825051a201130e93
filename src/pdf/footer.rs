//! Author-attribution footers.
//!
//! Each PDF in a folder is matched to a spreadsheet row by title, and the
//! row's corresponding-author text is stamped onto the page as a footer.

use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Object, StringFormat};
use serde::Serialize;

use super::backend::PdfDocument;
use super::fonts::{encode_win_ansi, StandardFont};
use super::{pdf_files_in, tmp_sibling};
use crate::error::Result;
use crate::sheet::{read_table, Table};
use crate::titles::{compare_normalized, normalize_title, TitleMatch};

/// Default title column in the author spreadsheet.
pub const TITLE_COLUMN: &str = "title";

/// Default author column in the author spreadsheet.
pub const AUTHOR_COLUMN: &str = "Corresponding_Author";

const FIRST_PAGE_X: f32 = 72.0;
const FIRST_PAGE_Y: f32 = 55.0;
const FIRST_PAGE_SIZE: f32 = 9.0;
const BACKGROUND_PAD: f32 = 5.0;
const BACKGROUND_HEIGHT: f32 = 20.0;
const BACKGROUND_MIN_WIDTH: f32 = 500.0;

const CENTERED_Y: f32 = 40.0;
const CENTERED_SIZE: f32 = 8.0;

/// One spreadsheet row used for footer matching.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorRecord {
    pub title: String,
    pub author: String,
    #[serde(skip)]
    normalized: String,
}

impl AuthorRecord {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        let title = title.into();
        let normalized = normalize_title(&title);
        Self {
            title,
            author: author.into(),
            normalized,
        }
    }
}

/// Where the footer goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FooterPlacement {
    /// First page only, Times-Roman 9pt at the left margin over a white band
    #[default]
    FirstPage,
    /// Every page, Helvetica 8pt centered near the bottom edge
    AllPagesCentered,
}

/// Options for the footer tool.
#[derive(Debug, Clone)]
pub struct FooterOptions {
    pub placement: FooterPlacement,
    pub title_column: String,
    pub author_column: String,
    /// Worksheet to read; the first sheet when `None`
    pub sheet: Option<String>,
}

impl FooterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placement(mut self, placement: FooterPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_title_column(mut self, column: impl Into<String>) -> Self {
        self.title_column = column.into();
        self
    }

    pub fn with_author_column(mut self, column: impl Into<String>) -> Self {
        self.author_column = column.into();
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

impl Default for FooterOptions {
    fn default() -> Self {
        Self {
            placement: FooterPlacement::FirstPage,
            title_column: TITLE_COLUMN.to_string(),
            author_column: AUTHOR_COLUMN.to_string(),
            sheet: None,
        }
    }
}

/// Pull `(title, author)` records from a table, dropping rows without an author.
pub fn load_author_records(
    table: &Table,
    title_column: &str,
    author_column: &str,
) -> Result<Vec<AuthorRecord>> {
    let title_col = table.require_column(title_column)?;
    let author_col = table.require_column(author_column)?;

    let records: Vec<AuthorRecord> = (0..table.len())
        .filter(|&row| !table.cell(row, author_col).is_blank())
        .map(|row| {
            AuthorRecord::new(
                table.cell(row, title_col).as_text().trim(),
                table.cell(row, author_col).as_text().trim(),
            )
        })
        .collect();

    log::info!(
        "Loaded {} records, {} with author data",
        table.len(),
        records.len()
    );
    Ok(records)
}

/// Find the record for a PDF file stem.
///
/// An exact normalized match anywhere in the list beats an earlier fuzzy one.
pub fn match_author<'a>(pdf_stem: &str, records: &'a [AuthorRecord]) -> Option<&'a AuthorRecord> {
    let stem = normalize_title(pdf_stem);
    let mut fuzzy = None;

    for record in records {
        match compare_normalized(&stem, &record.normalized) {
            Some(TitleMatch::Exact) => return Some(record),
            Some(TitleMatch::Fuzzy) if fuzzy.is_none() => fuzzy = Some(record),
            _ => {}
        }
    }
    fuzzy
}

/// Stamp `text` onto a PDF and write it to `output` (the input by default).
pub fn add_footer(
    path: &Path,
    text: &str,
    placement: FooterPlacement,
    output: Option<&Path>,
) -> Result<()> {
    let mut pdf = PdfDocument::load(path)?;

    let pages: Vec<_> = match placement {
        FooterPlacement::FirstPage => vec![pdf.first_page()?],
        FooterPlacement::AllPagesCentered => pdf.pages().into_values().collect(),
    };
    if pages.is_empty() {
        return Err(crate::error::Error::EmptyDocument);
    }

    let font = match placement {
        FooterPlacement::FirstPage => StandardFont::TimesRoman,
        FooterPlacement::AllPagesCentered => StandardFont::Helvetica,
    };

    for page_id in pages {
        let mut resources = pdf.resources(page_id);
        let font_name = register_font(&mut resources, font);
        pdf.set_resources(page_id, resources)?;

        let (width, _) = pdf.page_size(page_id);
        let [llx, lly, _, _] = pdf.media_box(page_id);
        let overlay = footer_operations(text, &font_name, font, placement, llx, lly, width);
        pdf.wrap_page_content(page_id, b"q\n", &overlay.encode()?)?;
    }

    let target = output.unwrap_or(path);
    pdf.save_atomic(target.to_path_buf(), tmp_sibling(target, ".tmp.pdf"))?;
    Ok(())
}

/// Add `font` under an unused `/Font` resource name and return that name.
fn register_font(resources: &mut Dictionary, font: StandardFont) -> String {
    let mut fonts = resources
        .get(b"Font")
        .and_then(Object::as_dict)
        .cloned()
        .unwrap_or_else(|_| Dictionary::new());

    let name = (1..)
        .map(|n| format!("FJT{}", n))
        .find(|n| !fonts.has(n.as_bytes()))
        .unwrap_or_else(|| "FJT".to_string());

    fonts.set(name.clone(), Object::Dictionary(font.dictionary()));
    resources.set("Font", Object::Dictionary(fonts));
    name
}

fn footer_operations(
    text: &str,
    font_name: &str,
    font: StandardFont,
    placement: FooterPlacement,
    llx: f32,
    lly: f32,
    page_width: f32,
) -> Content {
    let encoded = encode_win_ansi(text);
    let mut ops = vec![Operation::new("Q", vec![]), Operation::new("q", vec![])];

    let (x, y, size) = match placement {
        FooterPlacement::FirstPage => {
            let (x, y) = (llx + FIRST_PAGE_X, lly + FIRST_PAGE_Y);
            let band = BACKGROUND_MIN_WIDTH.max(font.text_width(text, FIRST_PAGE_SIZE) + 10.0);
            ops.extend([
                Operation::new("rg", vec![1.into(), 1.into(), 1.into()]),
                Operation::new(
                    "re",
                    vec![
                        Object::Real(x - BACKGROUND_PAD),
                        Object::Real(y - BACKGROUND_PAD),
                        Object::Real(band),
                        Object::Real(BACKGROUND_HEIGHT),
                    ],
                ),
                Operation::new("f", vec![]),
            ]);
            (x, y, FIRST_PAGE_SIZE)
        }
        FooterPlacement::AllPagesCentered => {
            let text_width = font.text_width(text, CENTERED_SIZE);
            let x = llx + (page_width - text_width) / 2.0;
            (x, lly + CENTERED_Y, CENTERED_SIZE)
        }
    };

    ops.extend([
        Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font_name.as_bytes().to_vec()), Object::Real(size)],
        ),
        Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
        Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ]);

    Content { operations: ops }
}

/// Counts from a folder run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FooterSummary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
}

/// What happened to one PDF in a folder run.
#[derive(Debug, Clone, PartialEq)]
pub enum FooterOutcome {
    Stamped { author: String },
    NoMatch,
    Failed(String),
}

/// Stamp every matching PDF in `folder` using the author spreadsheet.
pub fn process_folder(
    folder: &Path,
    spreadsheet: &Path,
    options: &FooterOptions,
    mut on_file: impl FnMut(&Path, &FooterOutcome),
) -> Result<FooterSummary> {
    let pdfs: Vec<PathBuf> = pdf_files_in(folder)?;
    log::info!("Found {} PDF files in {}", pdfs.len(), folder.display());

    let table = read_table(spreadsheet, options.sheet.as_deref())?;
    let records = load_author_records(&table, &options.title_column, &options.author_column)?;

    let mut summary = FooterSummary {
        total: pdfs.len(),
        ..Default::default()
    };

    for pdf in &pdfs {
        let stem = pdf
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let outcome = match match_author(&stem, &records) {
            Some(record) => match add_footer(pdf, &record.author, options.placement, None) {
                Ok(()) => {
                    summary.processed += 1;
                    FooterOutcome::Stamped {
                        author: record.author.clone(),
                    }
                }
                Err(e) => {
                    log::error!("Failed to add footer to {}: {}", pdf.display(), e);
                    summary.skipped += 1;
                    FooterOutcome::Failed(e.to_string())
                }
            },
            None => {
                log::warn!("No matching author data for {}", pdf.display());
                summary.skipped += 1;
                FooterOutcome::NoMatch
            }
        };
        on_file(pdf, &outcome);
    }

    Ok(summary)
}
