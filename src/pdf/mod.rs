//! PDF editing tools: author footers and volume-number rewriting.

pub mod backend;
pub mod fonts;
pub mod footer;
pub mod volume;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub use backend::PdfDocument;
pub use footer::{
    add_footer, load_author_records, match_author, AuthorRecord, FooterOptions, FooterOutcome,
    FooterPlacement, FooterSummary,
};
pub use volume::{change_volume, VolumeChange, VolumeOptions, VolumeSummary};

/// `*.pdf` files directly inside `folder`, sorted by path.
pub fn pdf_files_in(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(Error::Other(format!(
            "'{}' is not a valid directory",
            folder.display()
        )));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(folder)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .map(|e| e.eq_ignore_ascii_case("pdf"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// `dir/<stem><suffix>` next to `path`, e.g. `paper.tmp.pdf` or `paper_backup.pdf`.
pub(crate) fn tmp_sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{}{}", stem, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmp_sibling() {
        assert_eq!(
            tmp_sibling(Path::new("/a/b/paper.pdf"), "_backup.pdf"),
            PathBuf::from("/a/b/paper_backup.pdf")
        );
        assert_eq!(
            tmp_sibling(Path::new("paper.pdf"), ".tmp.pdf"),
            PathBuf::from("paper.tmp.pdf")
        );
    }

    #[test]
    fn test_pdf_files_in_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PDF", "notes.txt"] {
            fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
        }
        let files = pdf_files_in(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);

        assert!(pdf_files_in(&dir.path().join("missing")).is_err());
    }
}
