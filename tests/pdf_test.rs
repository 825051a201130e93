//! Integration tests for the PDF footer and volume tools.

use std::fs;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use rust_xlsxwriter::Workbook;

use journal_tools::pdf::{
    self, add_footer, FooterOptions, FooterPlacement, PdfDocument, VolumeChange, VolumeOptions,
};

/// A minimal PDF with one `Tj` per page.
fn build_pdf(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 760.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn page_text(path: &Path, page: usize) -> String {
    let pdf = PdfDocument::load(path).unwrap();
    let id = pdf.pages()[&(page as u32)];
    String::from_utf8_lossy(&pdf.page_content(id).unwrap()).to_string()
}

fn write_authors(path: &Path, rows: &[(&str, &str)]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "title").unwrap();
    sheet.write_string(0, 1, "Corresponding_Author").unwrap();
    for (i, (title, author)) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, *title).unwrap();
        if !author.is_empty() {
            sheet.write_string(row, 1, *author).unwrap();
        }
    }
    workbook.save(path).unwrap();
}

#[test]
fn test_footer_folder_run() {
    let dir = tempfile::tempdir().unwrap();
    let matched = dir
        .path()
        .join("Resistance Training Improves Grip Strength in Older Adults.pdf");
    let unmatched = dir.path().join("Unrelated Manuscript.pdf");
    fs::write(&matched, build_pdf(&["Page one", "Page two"])).unwrap();
    fs::write(&unmatched, build_pdf(&["Other"])).unwrap();

    let sheet = dir.path().join("authors.xlsx");
    write_authors(
        &sheet,
        &[
            ("Heart Rate Variability", ""),
            (
                "Resistance training improves grip strength in older adults: a randomized trial",
                "Corresponding Author: Dr. Lee, lee@uni.edu",
            ),
        ],
    );

    let mut seen = Vec::new();
    let summary =
        pdf::footer::process_folder(dir.path(), &sheet, &FooterOptions::new(), |path, outcome| {
            seen.push((path.to_path_buf(), outcome.clone()));
        })
        .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(seen.len(), 2);

    let first = page_text(&matched, 1);
    assert!(first.contains("Corresponding Author: Dr. Lee"));
    assert!(first.contains("Page one"));
    assert!(!page_text(&matched, 2).contains("Corresponding Author"));
    assert!(!dir.path().join("Resistance Training Improves Grip Strength in Older Adults.tmp.pdf").exists());
}

#[test]
fn test_stamp_all_pages_to_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.pdf");
    let output = dir.path().join("out.pdf");
    fs::write(&input, build_pdf(&["A", "B", "C"])).unwrap();
    let original = fs::read(&input).unwrap();

    add_footer(&input, "Corresponding Author: X", FooterPlacement::AllPagesCentered, Some(&output))
        .unwrap();

    assert_eq!(fs::read(&input).unwrap(), original);
    for page in 1..=3 {
        assert!(page_text(&output, page).contains("Corresponding Author: X"));
    }
}

#[test]
fn test_footer_rejects_non_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fake.pdf");
    fs::write(&input, b"not a pdf at all").unwrap();
    assert!(add_footer(&input, "x", FooterPlacement::FirstPage, None).is_err());
}

#[test]
fn test_volume_folder_run_with_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("fixed");
    fs::write(
        dir.path().join("a.pdf"),
        build_pdf(&["Int J Exerc Sci Vol. 45, Issue 1", "Volume 45, 2024"]),
    )
    .unwrap();
    fs::write(dir.path().join("b.pdf"), build_pdf(&["Vol. 450"])).unwrap();

    let change = VolumeChange::new(45, 47).unwrap();
    let options = VolumeOptions::new().with_output_dir(&out);
    let mut counts = Vec::new();
    let summary = pdf::volume::process_folder(dir.path(), &change, &options, |_, result| {
        counts.push(*result.as_ref().unwrap());
    })
    .unwrap();

    assert_eq!(summary.total, 2);
    assert_eq!(summary.successful, 1);
    assert_eq!(counts, vec![2, 0]);

    let fixed = out.join("a.pdf");
    assert!(page_text(&fixed, 1).contains("Vol. 47, Issue 1"));
    assert!(page_text(&fixed, 2).contains("Volume 47, 2024"));
    assert!(page_text(&dir.path().join("a.pdf"), 1).contains("Vol. 45"));
    assert!(!out.join("b.pdf").exists());
}

#[test]
fn test_volume_in_place_with_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paper.pdf");
    fs::write(&path, build_pdf(&["vol. 45"])).unwrap();

    let change = VolumeChange::new(45, 47).unwrap();
    let n = pdf::change_volume(&path, &change, &VolumeOptions::new().with_backup(true)).unwrap();

    assert_eq!(n, 1);
    assert!(page_text(&path, 1).contains("vol. 47"));
    assert!(page_text(&dir.path().join("paper_backup.pdf"), 1).contains("vol. 45"));
    assert!(!dir.path().join("paper_temp.pdf").exists());
}
