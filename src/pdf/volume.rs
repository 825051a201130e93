//! Volume-number rewriting inside PDF text.
//!
//! Text-showing operands are edited in place, so the replacement keeps the
//! original font, size and position.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use regex::bytes::Regex;
use serde::Serialize;

use super::backend::PdfDocument;
use super::{pdf_files_in, tmp_sibling};
use crate::error::{Error, Result};

/// Volume defaults used when the command line gives none.
pub const DEFAULT_OLD_VOLUME: u32 = 45;
pub const DEFAULT_NEW_VOLUME: u32 = 47;

/// A `Vol. old` → `Vol. new` rewrite.
#[derive(Debug, Clone)]
pub struct VolumeChange {
    pub old: u32,
    pub new: u32,
    pattern: Regex,
    replacement: Vec<u8>,
}

impl VolumeChange {
    pub fn new(old: u32, new: u32) -> Result<Self> {
        let pattern = Regex::new(&format!(r"(Vol\. ?|vol\. ?|Volume )({})(\D|$)", old))
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self {
            old,
            new,
            pattern,
            replacement: format!("${{1}}{}${{3}}", new).into_bytes(),
        })
    }

    /// Rewrite `text`, returning the new bytes and the number of matches.
    pub fn apply(&self, text: &[u8]) -> (Vec<u8>, usize) {
        let count = self.pattern.find_iter(text).count();
        if count == 0 {
            return (text.to_vec(), 0);
        }
        let replaced = self
            .pattern
            .replace_all(text, self.replacement.as_slice())
            .into_owned();
        (replaced, count)
    }
}

/// Where rewritten files go.
#[derive(Debug, Clone, Default)]
pub struct VolumeOptions {
    /// Write into this folder instead of overwriting the input
    pub output_dir: Option<PathBuf>,
    /// Copy the input to `<stem>_backup.pdf` before overwriting it
    pub backup: bool,
}

impl VolumeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_backup(mut self, backup: bool) -> Self {
        self.backup = backup;
        self
    }
}

/// Rewrite volume labels in one PDF and return the number of replacements.
///
/// Nothing is written when no label matches.
pub fn change_volume(path: &Path, change: &VolumeChange, options: &VolumeOptions) -> Result<usize> {
    let mut pdf = PdfDocument::load(path)?;
    let mut replacements = 0;
    let mut seen_forms = HashSet::new();

    for page_id in pdf.pages().into_values().collect::<Vec<_>>() {
        let mut content = PdfDocument::decode_content(&pdf.page_content(page_id)?)?;
        let count = rewrite_operations(&mut content.operations, change);
        if count > 0 {
            pdf.set_page_content(page_id, &content)?;
            replacements += count;
        }

        for form_id in pdf.form_xobjects(page_id) {
            if !seen_forms.insert(form_id) {
                continue;
            }
            let mut form: Content = PdfDocument::decode_content(&pdf.stream_content(form_id)?)?;
            let count = rewrite_operations(&mut form.operations, change);
            if count > 0 {
                pdf.set_stream_content(form_id, &form)?;
                replacements += count;
            }
        }
    }

    if replacements == 0 {
        log::info!("No instances of 'Vol. {}' in {}", change.old, path.display());
        return Ok(0);
    }

    match &options.output_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let name = path
                .file_name()
                .ok_or_else(|| Error::Other(format!("No file name in {}", path.display())))?;
            pdf.save(dir.join(name))?;
        }
        None => {
            if options.backup {
                let backup = tmp_sibling(path, "_backup.pdf");
                fs::copy(path, &backup)?;
                log::info!("Backup created: {}", backup.display());
            }
            pdf.save_atomic(path.to_path_buf(), tmp_sibling(path, "_temp.pdf"))?;
        }
    }

    log::info!(
        "Changed {} instance(s) of 'Vol. {}' to 'Vol. {}' in {}",
        replacements,
        change.old,
        change.new,
        path.display()
    );
    Ok(replacements)
}

/// Rewrite the string operands of text-showing operators.
fn rewrite_operations(operations: &mut [Operation], change: &VolumeChange) -> usize {
    let mut count = 0;
    for op in operations.iter_mut() {
        let index = match op.operator.as_str() {
            "Tj" | "'" => 0,
            "\"" => 2,
            "TJ" => {
                if let Some(Object::Array(items)) = op.operands.get_mut(0) {
                    count += rewrite_tj_array(items, change);
                }
                continue;
            }
            _ => continue,
        };
        if let Some(Object::String(bytes, _)) = op.operands.get_mut(index) {
            let (replaced, n) = change.apply(bytes);
            if n > 0 {
                *bytes = replaced;
                count += n;
            }
        }
    }
    count
}

/// Rewrite a `TJ` array, collapsing it when only the joined text matches.
fn rewrite_tj_array(items: &mut Vec<Object>, change: &VolumeChange) -> usize {
    let mut count = 0;
    for item in items.iter_mut() {
        if let Object::String(bytes, _) = item {
            let (replaced, n) = change.apply(bytes);
            if n > 0 {
                *bytes = replaced;
                count += n;
            }
        }
    }
    if count > 0 {
        return count;
    }

    let joined: Vec<u8> = items
        .iter()
        .filter_map(|item| match item {
            Object::String(bytes, _) => Some(bytes.as_slice()),
            _ => None,
        })
        .flatten()
        .copied()
        .collect();
    let (replaced, n) = change.apply(&joined);
    if n > 0 {
        *items = vec![Object::String(replaced, StringFormat::Literal)];
    }
    n
}

/// Counts from a folder run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VolumeSummary {
    pub successful: usize,
    pub total: usize,
}

/// Rewrite every PDF in `folder`. A file counts as successful when it had
/// at least one replacement.
pub fn process_folder(
    folder: &Path,
    change: &VolumeChange,
    options: &VolumeOptions,
    mut on_file: impl FnMut(&Path, &Result<usize>),
) -> Result<VolumeSummary> {
    let pdfs = pdf_files_in(folder)?;
    log::info!("Found {} PDF file(s) in {}", pdfs.len(), folder.display());

    let mut summary = VolumeSummary {
        total: pdfs.len(),
        ..Default::default()
    };

    for pdf in &pdfs {
        let result = change_volume(pdf, change, options);
        match &result {
            Ok(n) if *n > 0 => summary.successful += 1,
            Ok(_) => {}
            Err(e) => log::error!("Error processing {}: {}", pdf.display(), e),
        }
        on_file(pdf, &result);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::backend::tests::sample_pdf;

    fn change() -> VolumeChange {
        VolumeChange::new(45, 47).unwrap()
    }

    #[test]
    fn test_apply_label_variants() {
        let change = change();
        assert_eq!(change.apply(b"Vol. 45, Issue 2").0, b"Vol. 47, Issue 2".to_vec());
        assert_eq!(change.apply(b"Vol.45").0, b"Vol.47".to_vec());
        assert_eq!(change.apply(b"vol. 45").0, b"vol. 47".to_vec());
        assert_eq!(change.apply(b"Volume 45 (2024)").0, b"Volume 47 (2024)".to_vec());
    }

    #[test]
    fn test_apply_requires_number_boundary() {
        let change = change();
        let (out, n) = change.apply(b"Vol. 450");
        assert_eq!(n, 0);
        assert_eq!(out, b"Vol. 450".to_vec());
        assert_eq!(change.apply(b"Page 45").1, 0);
    }

    #[test]
    fn test_apply_counts_each_match() {
        let (out, n) = change().apply(b"Vol. 45 and Volume 45");
        assert_eq!(n, 2);
        assert_eq!(out, b"Vol. 47 and Volume 47".to_vec());
    }

    #[test]
    fn test_rewrite_tj_array_in_place() {
        let mut items = vec![
            Object::string_literal("Int J Exerc Sci, Vol. 45"),
            Object::Integer(-250),
            Object::string_literal("Issue 3"),
        ];
        assert_eq!(rewrite_tj_array(&mut items, &change()), 1);
        assert_eq!(items.len(), 3);
        assert!(matches!(&items[0], Object::String(b, _) if b == b"Int J Exerc Sci, Vol. 47"));
    }

    #[test]
    fn test_rewrite_tj_array_collapses_split_label() {
        let mut items = vec![
            Object::string_literal("Vol. 4"),
            Object::Integer(-20),
            Object::string_literal("5, Issue 1"),
        ];
        assert_eq!(rewrite_tj_array(&mut items, &change()), 1);
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Object::String(b, _) if b == b"Vol. 47, Issue 1"));
    }

    #[test]
    fn test_change_volume_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, sample_pdf(&["Int J Exerc Sci 18(2): Vol. 45", "Body text"])).unwrap();

        let options = VolumeOptions::new().with_backup(true);
        let count = change_volume(&path, &change(), &options).unwrap();
        assert_eq!(count, 1);
        assert!(dir.path().join("paper_backup.pdf").exists());
        assert!(!dir.path().join("paper_temp.pdf").exists());

        let pdf = PdfDocument::load(&path).unwrap();
        let first = pdf.first_page().unwrap();
        let text = String::from_utf8_lossy(&pdf.page_content(first).unwrap()).to_string();
        assert!(text.contains("Vol. 47"));
        assert!(!text.contains("Vol. 45"));
    }

    #[test]
    fn test_change_volume_no_match_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        let original = sample_pdf(&["Vol. 46"]);
        std::fs::write(&path, &original).unwrap();

        let out = dir.path().join("out");
        let options = VolumeOptions::new().with_output_dir(&out);
        assert_eq!(change_volume(&path, &change(), &options).unwrap(), 0);
        assert!(!out.exists());
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }
}
