//! Titles of PDFs already on disk.

use std::path::Path;

use walkdir::WalkDir;

use crate::export::TitleRecord;
use crate::titles::volume_issue_from_path;

/// Find `*.pdf` files under `roots` whose path names a volume and issue.
///
/// Missing roots are skipped. Volume and issue must both be present and
/// non-zero.
pub fn collect_titles<P: AsRef<Path>>(roots: &[P]) -> Vec<TitleRecord> {
    let mut records = Vec::new();

    for root in roots {
        let root = root.as_ref();
        if !root.exists() {
            log::warn!("Skipping missing folder {}", root.display());
            continue;
        }

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            let is_pdf = entry.file_type().is_file()
                && path.extension().map(|e| e == "pdf").unwrap_or(false);
            if !is_pdf {
                continue;
            }

            let (volume, issue) = volume_issue_from_path(&path.to_string_lossy());
            let (Some(volume), Some(issue)) = (volume, issue) else {
                log::debug!("No volume/issue in {}", path.display());
                continue;
            };
            if volume == 0 || issue == 0 {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            records.push(TitleRecord::new(name.replace(".pdf", ""), volume, issue));
        }
    }

    log::info!("Found {} titles", records.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_collect_titles() {
        let dir = tempfile::tempdir().unwrap();
        let issue = dir.path().join("vol18").join("iss2");
        fs::create_dir_all(&issue).unwrap();
        fs::write(issue.join("Grip Strength.pdf"), b"%PDF-1.4").unwrap();
        fs::write(issue.join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("loose.pdf"), b"%PDF-1.4").unwrap();

        let missing = dir.path().join("nope");
        let records = collect_titles(&[dir.path().to_path_buf(), missing]);
        assert_eq!(records, vec![TitleRecord::new("Grip Strength", 18, 2)]);
    }
}
