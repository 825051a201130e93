//! Title collection workbooks.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::sheet::{write_workbook, Cell, SheetData};

const ALL_TITLES_SHEET: &str = "All Titles";
const TITLE_WIDTH: f64 = 100.0;
const NUMBER_WIDTH: f64 = 15.0;

/// One article title with its volume and issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleRecord {
    pub title: String,
    pub volume: u32,
    pub issue: u32,
}

impl TitleRecord {
    pub fn new(title: impl Into<String>, volume: u32, issue: u32) -> Self {
        Self {
            title: title.into(),
            volume,
            issue,
        }
    }

    fn cells(&self, order: ColumnOrder) -> Vec<Cell> {
        let title = Cell::Text(self.title.clone());
        let volume = Cell::Text(format!("Volume {}", self.volume));
        let issue = Cell::Text(format!("Issue {}", self.issue));
        match order {
            ColumnOrder::TitleFirst => vec![title, volume, issue],
            ColumnOrder::VolumeFirst => vec![volume, issue, title],
        }
    }
}

/// Column layout of the exported sheets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnOrder {
    /// `Title, Volume, Issue` (titles scraped from the web)
    #[default]
    TitleFirst,
    /// `Volume, Issue, Title` (titles collected from local folders)
    VolumeFirst,
}

impl ColumnOrder {
    fn headers(self) -> Vec<String> {
        let names: [&str; 3] = match self {
            ColumnOrder::TitleFirst => ["Title", "Volume", "Issue"],
            ColumnOrder::VolumeFirst => ["Volume", "Issue", "Title"],
        };
        names.iter().map(|s| s.to_string()).collect()
    }

    fn widths(self) -> [f64; 3] {
        match self {
            ColumnOrder::TitleFirst => [TITLE_WIDTH, NUMBER_WIDTH, NUMBER_WIDTH],
            ColumnOrder::VolumeFirst => [NUMBER_WIDTH, NUMBER_WIDTH, TITLE_WIDTH],
        }
    }

    fn sheet(self, name: &str, records: &[&TitleRecord]) -> SheetData {
        let mut sheet = SheetData::new(name, self.headers()).with_widths(&self.widths());
        for record in records {
            sheet.push_row(record.cells(self));
        }
        sheet
    }
}

/// Sort by volume descending, then issue and title ascending.
pub fn sort_records(records: &mut [TitleRecord]) {
    records.sort_by(|a, b| {
        b.volume
            .cmp(&a.volume)
            .then(a.issue.cmp(&b.issue))
            .then_with(|| a.title.cmp(&b.title))
    });
}

/// Per-volume counts of an export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportSummary {
    pub total: usize,
    pub volumes: Vec<VolumeSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeSummary {
    pub volume: u32,
    pub titles: usize,
    pub issues: Vec<u32>,
}

impl ExportSummary {
    /// Volumes in descending order with their sorted issue numbers.
    pub fn from_records(records: &[TitleRecord]) -> Self {
        let mut by_volume: BTreeMap<u32, (usize, Vec<u32>)> = BTreeMap::new();
        for record in records {
            let entry = by_volume.entry(record.volume).or_default();
            entry.0 += 1;
            if !entry.1.contains(&record.issue) {
                entry.1.push(record.issue);
            }
        }

        let volumes = by_volume
            .into_iter()
            .rev()
            .map(|(volume, (titles, mut issues))| {
                issues.sort_unstable();
                VolumeSummary {
                    volume,
                    titles,
                    issues,
                }
            })
            .collect();

        Self {
            total: records.len(),
            volumes,
        }
    }
}

impl fmt::Display for ExportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total titles: {}", self.total)?;
        for v in &self.volumes {
            writeln!(
                f,
                "  Volume {}: {} titles across issues {:?}",
                v.volume, v.titles, v.issues
            )?;
        }
        Ok(())
    }
}

/// Write titles to an `.xlsx` file: an "All Titles" sheet followed by one
/// "Volume N" sheet per volume, newest first.
pub fn export_titles<P: AsRef<Path>>(
    records: &[TitleRecord],
    path: P,
    order: ColumnOrder,
) -> Result<ExportSummary> {
    if records.is_empty() {
        return Err(Error::Other("No titles to export".into()));
    }

    let mut sorted = records.to_vec();
    sort_records(&mut sorted);
    let summary = ExportSummary::from_records(&sorted);

    let all: Vec<&TitleRecord> = sorted.iter().collect();
    let mut sheets = vec![order.sheet(ALL_TITLES_SHEET, &all)];

    for volume in &summary.volumes {
        let mut in_volume: Vec<&TitleRecord> =
            sorted.iter().filter(|r| r.volume == volume.volume).collect();
        in_volume.sort_by(|a, b| a.title.cmp(&b.title));
        sheets.push(order.sheet(&format!("Volume {}", volume.volume), &in_volume));
    }

    write_workbook(path.as_ref(), &sheets)?;
    log::info!(
        "Wrote {} titles to {}",
        summary.total,
        path.as_ref().display()
    );
    Ok(summary)
}
