//! Spreadsheet I/O: reading a sheet into a [`Table`] and writing
//! multi-sheet reports.

use std::fmt;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook};
use serde::Serialize;

use crate::error::{Error, Result};

/// Excel's sheet name limit.
const MAX_SHEET_NAME: usize = 31;

static EMPTY_CELL: Cell = Cell::Empty;

/// A single spreadsheet value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Whether the cell is empty or whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
            Cell::Bool(_) => false,
        }
    }

    /// Render the value as text. Integral numbers print without `.0`.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }

    /// Interpret the value as an integer, accepting numeric text.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Number(*i as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

/// A sheet read into memory: a header row plus data rows.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// 1-based worksheet row holding the headers
    pub header_row: usize,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            rows: Vec::new(),
            header_row: 1,
        }
    }
}

impl Table {
    /// Build a table from headers and rows, padding short rows with empties.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, Cell::Empty);
                }
                row
            })
            .collect();
        Self {
            headers,
            rows,
            header_row: 1,
        }
    }

    /// 1-based worksheet row number of data row `index`.
    pub fn sheet_row(&self, index: usize) -> usize {
        self.header_row + 1 + index
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column whose header equals `name` exactly.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the column, or a [`Error::MissingColumn`] listing the headers.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
            available: self.headers.clone(),
        })
    }

    /// Index of the first column whose header satisfies `pred`.
    pub fn find_column(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.headers.iter().position(|h| pred(h))
    }

    /// Cell at `(row, col)`, or `Empty` when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Iterate over one column's cells.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows
            .iter()
            .map(move |r| r.get(col).unwrap_or(&EMPTY_CELL))
    }
}

/// Read a worksheet into a [`Table`].
///
/// The first row of the used range becomes the header. With `sheet = None` the first
/// sheet is used.
pub fn read_table<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Table> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| Error::Spreadsheet(format!("{} has no sheets", path.display())))?,
    };

    if !workbook.sheet_names().iter().any(|n| n == &sheet_name) {
        return Err(Error::Spreadsheet(format!(
            "Sheet '{}' not found. Available sheets: {:?}",
            sheet_name,
            workbook.sheet_names()
        )));
    }

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let name = Cell::from(d).as_text().trim().to_string();
                if name.is_empty() {
                    format!("Unnamed: {}", i)
                } else {
                    name
                }
            })
            .collect(),
        None => return Ok(Table::default()),
    };

    let data: Vec<Vec<Cell>> = rows
        .map(|r| r.iter().map(Cell::from).collect::<Vec<_>>())
        .collect();
    let header_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

    log::debug!(
        "Read {} rows x {} columns from sheet '{}'",
        data.len(),
        headers.len(),
        sheet_name
    );

    let mut table = Table::new(headers, data);
    table.header_row = header_row;
    Ok(table)
}

/// A sheet to be written: headers, rows and optional column widths.
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub widths: Vec<f64>,
}

impl SheetData {
    /// Create an empty sheet with the given name and headers.
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
            widths: Vec::new(),
        }
    }

    /// Set column widths in character units.
    pub fn with_widths(mut self, widths: &[f64]) -> Self {
        self.widths = widths.to_vec();
        self
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

/// Write sheets to an `.xlsx` file in order.
pub fn write_workbook<P: AsRef<Path>>(path: P, sheets: &[SheetData]) -> Result<()> {
    let mut workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet_name(&sheet.name))?;

        for (col, header) in sheet.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (r, row) in sheet.rows.iter().enumerate() {
            let row_idx = (r + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        worksheet.write_string(row_idx, col, s)?;
                    }
                    Cell::Number(n) if n.is_finite() => {
                        worksheet.write_number(row_idx, col, *n)?;
                    }
                    Cell::Number(_) => {}
                    Cell::Bool(b) => {
                        worksheet.write_boolean(row_idx, col, *b)?;
                    }
                }
            }
        }

        for (col, width) in sheet.widths.iter().enumerate() {
            worksheet.set_column_width(col as u16, *width)?;
        }
    }

    workbook.save(path.as_ref())?;
    Ok(())
}

fn sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["title".into(), "Volume".into(), "Email".into()],
            vec![
                vec![Cell::from("First"), Cell::Number(18.0), Cell::from("a@b.org")],
                vec![Cell::from("Second"), Cell::Number(17.0)],
            ],
        )
    }

    #[test]
    fn test_cell_text_rendering() {
        assert_eq!(Cell::Number(18.0).as_text(), "18");
        assert_eq!(Cell::Number(2.5).as_text(), "2.5");
        assert_eq!(Cell::Empty.as_text(), "");
        assert!(Cell::from("   ").is_blank());
        assert!(!Cell::Bool(false).is_blank());
    }

    #[test]
    fn test_cell_as_i64() {
        assert_eq!(Cell::Number(7.0).as_i64(), Some(7));
        assert_eq!(Cell::from(" 12 ").as_i64(), Some(12));
        assert_eq!(Cell::Number(7.5).as_i64(), None);
    }

    #[test]
    fn test_table_pads_short_rows() {
        let table = sample();
        assert_eq!(table.rows[1].len(), 3);
        assert_eq!(table.cell(1, 2), &Cell::Empty);
        assert_eq!(table.cell(9, 9), &Cell::Empty);
    }

    #[test]
    fn test_table_columns() {
        let table = sample();
        assert_eq!(table.column("Volume"), Some(1));
        assert_eq!(table.find_column(|h| h.to_lowercase().contains("mail")), Some(2));
        let err = table.require_column("Corresponding_Author").unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }

    #[test]
    fn test_sheet_name_sanitized() {
        assert_eq!(sheet_name("Volume 18"), "Volume 18");
        assert_eq!(sheet_name("a/b:c"), "a_b_c");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn test_workbook_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");

        let mut sheet = SheetData::new("Data", vec!["Name".into(), "Count".into()])
            .with_widths(&[30.0, 10.0]);
        sheet.push_row(vec![Cell::from("alpha"), Cell::Number(3.0)]);
        write_workbook(&path, &[sheet]).unwrap();

        let table = read_table(&path, Some("Data")).unwrap();
        assert_eq!(table.headers, vec!["Name", "Count"]);
        assert_eq!(table.cell(0, 0).as_text(), "alpha");
        assert_eq!(table.cell(0, 1).as_i64(), Some(3));

        assert!(read_table(&path, Some("Missing")).is_err());
    }
}
