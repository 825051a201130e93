//! Audit a contributor spreadsheet for rows without a usable email.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::sheet::{read_table, write_workbook, Cell, SheetData, Table};

const EMAIL_KEYWORDS: &[&str] = &[
    "email",
    "e-mail",
    "mail",
    "email_id",
    "emailid",
    "email_address",
    "emailaddress",
    "contact_email",
    "author_email",
    "corresponding_email",
];

const NAME_KEYWORDS: &[&str] = &[
    "fname",
    "first_name",
    "firstname",
    "lname",
    "last_name",
    "lastname",
];

const PLACEHOLDERS: &[&str] = &["nan", "none", "null", "-", "n/a", "na"];

/// Non-blank cells sampled when guessing the email column by content.
const SAMPLE_SIZE: usize = 10;
/// Valid emails needed in the sample.
const SAMPLE_MIN_VALID: usize = 3;

const TITLE_PREVIEW_CHARS: usize = 50;
const RULE_WIDTH: usize = 70;

/// Default number of rows listed in the text report.
pub const DEFAULT_MAX_ROWS: usize = 50;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid regex")
    })
}

/// Whether a cell holds something that looks like an email address.
pub fn is_valid_email(cell: &Cell) -> bool {
    if matches!(cell, Cell::Empty) {
        return false;
    }
    let text = cell.as_text();
    let text = text.trim();
    if text.is_empty() || PLACEHOLDERS.contains(&text.to_lowercase().as_str()) {
        return false;
    }
    email_re().is_match(text)
}

/// Guess the email column, by header first and then by content.
pub fn find_email_column(table: &Table) -> Option<usize> {
    let by_header = table.find_column(|h| {
        let h = h.to_lowercase();
        let h = h.trim();
        EMAIL_KEYWORDS.iter().any(|k| h.contains(k))
    });
    if by_header.is_some() {
        return by_header;
    }

    (0..table.headers.len()).find(|&col| {
        table
            .column_values(col)
            .filter(|c| !matches!(c, Cell::Empty))
            .take(SAMPLE_SIZE)
            .filter(|c| is_valid_email(c))
            .count()
            >= SAMPLE_MIN_VALID
    })
}

/// Columns holding author first/last names.
pub fn find_name_columns(table: &Table) -> Vec<usize> {
    let direct = header_positions(table, |h| NAME_KEYWORDS.iter().any(|k| h.contains(k)));
    if !direct.is_empty() {
        return direct;
    }
    header_positions(table, |h| {
        h.contains("author") && (h.contains("name") || h.contains("fname") || h.contains("lname"))
    })
}

fn header_positions(table: &Table, pred: impl Fn(&str) -> bool) -> Vec<usize> {
    table
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| pred(&h.to_lowercase()))
        .map(|(i, _)| i)
        .collect()
}

fn first_header_containing(headers: &[String], needle: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.to_lowercase().contains(needle))
}

/// Options for [`audit_file`] and [`audit_table`].
#[derive(Debug, Clone, Default)]
pub struct AuditOptions {
    /// Email column header; detected when `None`
    pub email_column: Option<String>,
    /// Sheet to read; the first sheet when `None`
    pub sheet: Option<String>,
    pub volume: Option<i64>,
    pub issue: Option<i64>,
}

impl AuditOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_email_column(mut self, column: impl Into<String>) -> Self {
        self.email_column = Some(column.into());
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn with_volume(mut self, volume: i64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_issue(mut self, issue: i64) -> Self {
        self.issue = Some(issue);
        self
    }
}

/// A row without a valid email.
#[derive(Debug, Clone, Serialize)]
pub struct MissingRow {
    /// 1-based worksheet row
    pub excel_row: usize,
    pub cells: Vec<Cell>,
}

/// How urgent the missing emails are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    AllValid,
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage == 0.0 {
            Severity::AllValid
        } else if percentage < 5.0 {
            Severity::Low
        } else if percentage < 20.0 {
            Severity::Moderate
        } else {
            Severity::High
        }
    }

    /// Status line for `unique` missing authors.
    pub fn message(self, unique: usize) -> String {
        match self {
            Severity::AllValid => "All records have valid email addresses!".to_string(),
            Severity::Low => format!("LOW - Only {} unique authors missing emails", unique),
            Severity::Moderate => format!("MODERATE - {} unique authors need attention", unique),
            Severity::High => format!("HIGH - {} unique authors require email collection", unique),
        }
    }
}

/// Counts reported by an audit.
#[derive(Debug, Clone, Serialize)]
pub struct AuditStats {
    pub file_path: String,
    pub email_column: String,
    pub total_records: usize,
    pub original_records: usize,
    pub filtered_records: usize,
    pub missing_emails: usize,
    pub valid_emails: usize,
    pub missing_percentage: f64,
    pub volume_filter: Option<i64>,
    pub issue_filter: Option<i64>,
    pub duplicates_removed: usize,
    pub unique_missing: usize,
}

impl AuditStats {
    pub fn severity(&self) -> Severity {
        Severity::from_percentage(self.missing_percentage)
    }

    fn summary_sheet(&self) -> SheetData {
        let headers = [
            "file_path",
            "email_column",
            "total_records",
            "original_records",
            "filtered_records",
            "missing_emails",
            "valid_emails",
            "missing_percentage",
            "volume_filter",
            "issue_filter",
            "duplicates_removed",
            "unique_missing",
        ];
        let count = |n: usize| Cell::Number(n as f64);
        let filter = |f: Option<i64>| f.map(|v| Cell::Number(v as f64)).unwrap_or(Cell::Empty);

        let mut sheet = SheetData::new("Summary", headers.iter().map(|h| h.to_string()).collect());
        sheet.push_row(vec![
            Cell::Text(self.file_path.clone()),
            Cell::Text(self.email_column.clone()),
            count(self.total_records),
            count(self.original_records),
            count(self.filtered_records),
            count(self.missing_emails),
            count(self.valid_emails),
            Cell::Number(self.missing_percentage),
            filter(self.volume_filter),
            filter(self.issue_filter),
            count(self.duplicates_removed),
            count(self.unique_missing),
        ]);
        sheet
    }
}

/// Result of an audit: unique missing rows plus statistics.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub headers: Vec<String>,
    pub name_columns: Vec<usize>,
    /// Missing rows after author deduplication
    pub missing: Vec<MissingRow>,
    pub stats: AuditStats,
}

impl AuditReport {
    pub fn has_missing(&self) -> bool {
        self.stats.missing_emails > 0
    }
}

/// Read a spreadsheet and audit it.
pub fn audit_file<P: AsRef<Path>>(path: P, options: &AuditOptions) -> Result<AuditReport> {
    let path = path.as_ref();
    let table = read_table(path, options.sheet.as_deref())?;
    audit_table(&table, &path.display().to_string(), options)
}

/// Audit an in-memory table. `label` is reported as the file path.
pub fn audit_table(table: &Table, label: &str, options: &AuditOptions) -> Result<AuditReport> {
    let email_col = match &options.email_column {
        Some(name) => table.require_column(name)?,
        None => find_email_column(table).ok_or_else(|| {
            Error::Other(format!(
                "Could not auto-detect email column. Please specify with --email-column. \
                 Available columns: {:?}",
                table.headers
            ))
        })?,
    };

    let mut selected: Vec<usize> = (0..table.len()).collect();
    if let Some(volume) = options.volume {
        if let Some(col) = first_header_containing(&table.headers, "vol") {
            selected.retain(|&row| table.cell(row, col).as_i64() == Some(volume));
        }
    }
    if let Some(issue) = options.issue {
        if let Some(col) = first_header_containing(&table.headers, "iss") {
            selected.retain(|&row| table.cell(row, col).as_i64() == Some(issue));
        }
    }

    let missing: Vec<MissingRow> = selected
        .iter()
        .filter(|&&row| !is_valid_email(table.cell(row, email_col)))
        .map(|&row| MissingRow {
            excel_row: table.sheet_row(row),
            cells: table.rows[row].clone(),
        })
        .collect();

    let name_columns = find_name_columns(table);
    let unique = dedupe_by_author(&missing, &name_columns);

    let total = selected.len();
    let missing_count = missing.len();
    let percentage = if total > 0 {
        round2(missing_count as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    let stats = AuditStats {
        file_path: label.to_string(),
        email_column: table.headers[email_col].clone(),
        total_records: total,
        original_records: table.len(),
        filtered_records: total,
        missing_emails: missing_count,
        valid_emails: total - missing_count,
        missing_percentage: percentage,
        volume_filter: options.volume,
        issue_filter: options.issue,
        duplicates_removed: missing_count - unique.len(),
        unique_missing: unique.len(),
    };

    log::info!(
        "{} of {} records missing emails ({}%)",
        missing_count,
        total,
        percentage
    );

    Ok(AuditReport {
        headers: table.headers.clone(),
        name_columns,
        missing: unique,
        stats,
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Lowercased, trimmed, sorted name parts joined by spaces.
fn name_key(row: &MissingRow, name_columns: &[usize]) -> String {
    let mut parts: Vec<String> = name_columns
        .iter()
        .filter_map(|&c| row.cells.get(c))
        .filter(|c| !c.is_blank())
        .map(|c| c.as_text().trim().to_lowercase())
        .collect();
    parts.sort();
    parts.join(" ")
}

/// Keep the first row per author name. Without name columns nothing is removed.
fn dedupe_by_author(rows: &[MissingRow], name_columns: &[usize]) -> Vec<MissingRow> {
    if name_columns.is_empty() {
        return rows.to_vec();
    }
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|row| seen.insert(name_key(row, name_columns)))
        .cloned()
        .collect()
}

fn cell_in<'a>(row: &'a MissingRow, col: Option<usize>) -> Option<&'a Cell> {
    col.and_then(|c| row.cells.get(c)).filter(|c| !c.is_blank())
}

/// Render the text report.
pub fn render_report(report: &AuditReport, show_details: bool, max_rows: usize) -> String {
    let stats = &report.stats;
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", heavy));
    out.push_str("           MISSING EMAIL ANALYSIS REPORT\n");
    out.push_str(&format!("{}\n", heavy));
    out.push_str(&format!("\nFile: {}\n", stats.file_path));
    out.push_str(&format!("Email Column: {}\n", stats.email_column));

    if stats.volume_filter.is_some() || stats.issue_filter.is_some() {
        out.push_str("\nFilters Applied:\n");
        if let Some(v) = stats.volume_filter {
            out.push_str(&format!("  - Volume: {}\n", v));
        }
        if let Some(i) = stats.issue_filter {
            out.push_str(&format!("  - Issue: {}\n", i));
        }
        out.push_str(&format!(
            "  - Records after filtering: {} (from {})\n",
            stats.filtered_records, stats.original_records
        ));
    }

    out.push_str(&format!("\n{}\n", light));
    out.push_str("                      SUMMARY\n");
    out.push_str(&format!("{}\n", light));
    out.push_str(&format!("  Total Records:          {}\n", stats.total_records));
    out.push_str(&format!("  Valid Emails:           {}\n", stats.valid_emails));
    out.push_str(&format!("  Missing Emails (raw):   {}\n", stats.missing_emails));
    out.push_str(&format!("  Duplicate Authors:      {}\n", stats.duplicates_removed));
    out.push_str(&format!("  Unique Missing:         {}\n", stats.unique_missing));
    out.push_str(&format!("  Missing Percentage:     {}%\n", stats.missing_percentage));
    out.push_str(&format!("{}\n", light));
    out.push_str(&format!(
        "\nStatus: {}\n",
        stats.severity().message(stats.unique_missing)
    ));

    if show_details && !report.missing.is_empty() {
        out.push_str(&format!("\n{}\n", light));
        out.push_str("            UNIQUE AUTHORS WITH MISSING EMAILS\n");
        out.push_str(&format!("{}\n\n", light));

        let title_col = first_header_containing(&report.headers, "title");
        let vol_col = first_header_containing(&report.headers, "vol");
        let iss_col = first_header_containing(&report.headers, "iss");

        for (n, row) in report.missing.iter().take(max_rows).enumerate() {
            let names: Vec<String> = report
                .name_columns
                .iter()
                .filter_map(|&c| row.cells.get(c))
                .filter(|c| !c.is_blank())
                .map(|c| c.as_text().trim().to_string())
                .collect();
            let author = if names.is_empty() {
                "(Unknown)".to_string()
            } else {
                names.join(" ")
            };
            out.push_str(&format!("  {:>3}. {}\n", n + 1, author));

            let mut vol_iss = Vec::new();
            if let Some(v) = cell_in(row, vol_col) {
                vol_iss.push(format!("Vol: {}", v));
            }
            if let Some(i) = cell_in(row, iss_col) {
                vol_iss.push(format!("Issue: {}", i));
            }
            if !vol_iss.is_empty() {
                out.push_str(&format!("       {}\n", vol_iss.join(", ")));
            }
            if let Some(title) = cell_in(row, title_col) {
                let preview: String = title.as_text().chars().take(TITLE_PREVIEW_CHARS).collect();
                out.push_str(&format!("       Article: {}...\n", preview));
            }
            out.push_str(&format!("       Excel Row: {}\n\n", row.excel_row));
        }

        if report.missing.len() > max_rows {
            out.push_str(&format!(
                "  ... and {} more authors\n\n",
                report.missing.len() - max_rows
            ));
        }
    }

    out.push_str(&format!("{}\n", heavy));
    out
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_report(self, true, DEFAULT_MAX_ROWS))
    }
}

/// Write `Missing_Emails` (all columns plus `Excel_Row`) and `Summary` sheets.
pub fn export_report<P: AsRef<Path>>(report: &AuditReport, path: P) -> Result<()> {
    let mut headers = report.headers.clone();
    headers.push("Excel_Row".to_string());

    let mut missing = SheetData::new("Missing_Emails", headers);
    for row in &report.missing {
        let mut cells = row.cells.clone();
        cells.resize(report.headers.len(), Cell::Empty);
        cells.push(Cell::Number(row.excel_row as f64));
        missing.push_row(cells);
    }

    write_workbook(path, &[missing, report.stats.summary_sheet()])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let headers = ["Author_FName", "Author_LName", "Title", "Volume", "Issue", "Email"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let row = |f: &str, l: &str, t: &str, v: f64, i: f64, e: &str| {
            vec![
                Cell::from(f),
                Cell::from(l),
                Cell::from(t),
                Cell::Number(v),
                Cell::Number(i),
                Cell::from(e),
            ]
        };
        Table::new(
            headers,
            vec![
                row("Ann", "Lee", "Grip Strength", 18.0, 1.0, "ann@uni.edu"),
                row("Bo", "Kim", "Sprint Speed", 18.0, 1.0, ""),
                row("bo", "KIM ", "Another Paper", 18.0, 2.0, "n/a"),
                row("Cy", "Ray", "Old Study", 17.0, 1.0, "not-an-email"),
            ],
        )
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email(&Cell::from("first.last+tag@mail.example.org")));
        assert!(is_valid_email(&Cell::from("  a@b.co  ")));
        for bad in ["", "nan", "None", "NULL", "-", "N/A", "na", "a@b", "@b.org"] {
            assert!(!is_valid_email(&Cell::from(bad)), "{bad}");
        }
        assert!(!is_valid_email(&Cell::Empty));
        assert!(!is_valid_email(&Cell::Number(3.0)));
    }

    #[test]
    fn test_find_email_column_by_header() {
        assert_eq!(find_email_column(&table()), Some(5));
    }

    #[test]
    fn test_find_email_column_by_content() {
        let t = Table::new(
            vec!["Name".into(), "Contact".into()],
            vec![
                vec![Cell::from("a"), Cell::from("a@x.org")],
                vec![Cell::from("b"), Cell::Empty],
                vec![Cell::from("c"), Cell::from("c@x.org")],
                vec![Cell::from("d"), Cell::from("d@x.org")],
            ],
        );
        assert_eq!(find_email_column(&t), Some(1));

        let none = Table::new(vec!["Name".into()], vec![vec![Cell::from("a")]]);
        assert_eq!(find_email_column(&none), None);
    }

    #[test]
    fn test_find_name_columns() {
        assert_eq!(find_name_columns(&table()), vec![0, 1]);

        let fallback = Table::new(vec!["Author Name".into(), "Email".into()], vec![]);
        assert_eq!(find_name_columns(&fallback), vec![0]);
    }

    #[test]
    fn test_audit_dedupes_authors() {
        let report = audit_table(&table(), "authors.xlsx", &AuditOptions::new()).unwrap();
        let stats = &report.stats;
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.missing_emails, 3);
        assert_eq!(stats.valid_emails, 1);
        assert_eq!(stats.missing_percentage, 75.0);
        assert_eq!(stats.duplicates_removed, 1);
        assert_eq!(stats.unique_missing, 2);
        assert_eq!(stats.severity(), Severity::High);

        let rows: Vec<usize> = report.missing.iter().map(|r| r.excel_row).collect();
        assert_eq!(rows, vec![3, 5]);
    }

    #[test]
    fn test_audit_filters() {
        let options = AuditOptions::new().with_volume(18).with_issue(1);
        let report = audit_table(&table(), "authors.xlsx", &options).unwrap();
        assert_eq!(report.stats.original_records, 4);
        assert_eq!(report.stats.filtered_records, 2);
        assert_eq!(report.stats.missing_emails, 1);
        assert_eq!(report.missing[0].excel_row, 3);
        assert_eq!(report.stats.missing_percentage, 50.0);
    }

    #[test]
    fn test_audit_missing_column() {
        let options = AuditOptions::new().with_email_column("Contact");
        let err = audit_table(&table(), "x", &options).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(Severity::from_percentage(0.0), Severity::AllValid);
        assert_eq!(Severity::from_percentage(4.99), Severity::Low);
        assert_eq!(Severity::from_percentage(5.0), Severity::Moderate);
        assert_eq!(Severity::from_percentage(19.99), Severity::Moderate);
        assert_eq!(Severity::from_percentage(20.0), Severity::High);
    }

    #[test]
    fn test_render_report() {
        let report = audit_table(&table(), "authors.xlsx", &AuditOptions::new()).unwrap();
        let text = render_report(&report, true, 1);
        assert!(text.contains("Email Column: Email"));
        assert!(text.contains("    1. Bo Kim"));
        assert!(text.contains("Vol: 18, Issue: 1"));
        assert!(text.contains("Article: Sprint Speed..."));
        assert!(text.contains("Excel Row: 3"));
        assert!(text.contains("... and 1 more authors"));
        assert!(text.contains("Status: HIGH - 2 unique authors"));

        let brief = render_report(&report, false, 50);
        assert!(!brief.contains("Excel Row"));
    }

    #[test]
    fn test_export_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.xlsx");
        let report = audit_table(&table(), "authors.xlsx", &AuditOptions::new()).unwrap();
        export_report(&report, &path).unwrap();

        let missing = read_table(&path, Some("Missing_Emails")).unwrap();
        assert_eq!(missing.headers.last().map(String::as_str), Some("Excel_Row"));
        assert_eq!(missing.len(), 2);
        let excel_row = missing.require_column("Excel_Row").unwrap();
        assert_eq!(missing.cell(0, excel_row).as_i64(), Some(3));

        let summary = read_table(&path, Some("Summary")).unwrap();
        let col = summary.require_column("unique_missing").unwrap();
        assert_eq!(summary.cell(0, col).as_i64(), Some(2));
    }
}
