//! Integration tests for DOCX image extraction and diagnostics on a
//! synthetic package.

use std::fs;
use std::io::{Cursor, Write};

use image::{ImageFormat, Rgba, RgbaImage};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use journal_tools::docx::diagnose::{self, LocationStatus};
use journal_tools::docx::{collect_images, extract_images, DocxPackage, ExtractOptions};
use journal_tools::Error;

const IMAGE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn emf() -> Vec<u8> {
    let mut data = vec![0u8; 64];
    data[0] = 0x01;
    data[40..44].copy_from_slice(b" EMF");
    data
}

fn text_para(text: &str) -> String {
    format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
}

fn drawing(rel_id: &str) -> String {
    format!(
        "<w:r><w:drawing><wp:inline><a:graphic><a:graphicData><pic:pic><pic:blipFill>\
         <a:blip r:embed=\"{}\"/></pic:blipFill></pic:pic></a:graphicData></a:graphic>\
         </wp:inline></w:drawing></w:r>",
        rel_id
    )
}

fn drawing_para(rel_id: &str, text: &str) -> String {
    let run = if text.is_empty() {
        String::new()
    } else {
        format!("<w:r><w:t>{}</w:t></w:r>", text)
    };
    format!("<w:p>{}{}</w:p>", drawing(rel_id), run)
}

fn pict_para(rel_id: &str) -> String {
    format!(
        "<w:p><w:r><w:pict><v:shape id=\"s1\"><v:imagedata r:id=\"{}\" o:title=\"\"/></v:shape></w:pict></w:r></w:p>",
        rel_id
    )
}

/// Body paragraphs:
/// 0 intro, 1 drawing rId10, 2 "Figure 2" caption, 3 other text,
/// 4 drawing rId11 with its own scheme caption, 5 drawing rId12 (same bytes
/// as rId10), 6 VML picture rId14 (EMF). rId13 is never referenced.
fn build_docx() -> Vec<u8> {
    let body = [
        text_para("Introduction"),
        drawing_para("rId10", ""),
        text_para("Figure 2. Muscle activation during the squat"),
        text_para("Results are discussed below."),
        drawing_para("rId11", "Scheme 1: Training protocol"),
        drawing_para("rId12", ""),
        pict_para("rId14"),
    ]
    .concat();

    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\" \
         xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" \
         xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
         xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\" \
         xmlns:v=\"urn:schemas-microsoft-com:vml\" xmlns:o=\"urn:schemas-microsoft-com:office:office\">\
         <w:body>{}</w:body></w:document>",
        body
    );

    let rel = |id: &str, target: &str| {
        format!("<Relationship Id=\"{}\" Type=\"{}\" Target=\"{}\"/>", id, IMAGE_REL, target)
    };
    let rels = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{}{}{}{}{}</Relationships>",
        rel("rId10", "media/image1.png"),
        rel("rId11", "media/image2.png"),
        rel("rId12", "media/image3.png"),
        rel("rId13", "media/image4.png"),
        rel("rId14", "media/image5.emf"),
    );

    let content_types = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"png\" ContentType=\"image/png\"/>\
         <Default Extension=\"emf\" ContentType=\"image/x-emf\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         </Types>";

    let red = png(40, 20, [255, 0, 0, 255]);
    let parts: Vec<(&str, Vec<u8>)> = vec![
        ("[Content_Types].xml", content_types.as_bytes().to_vec()),
        ("word/document.xml", document.into_bytes()),
        ("word/_rels/document.xml.rels", rels.into_bytes()),
        ("word/media/image1.png", red.clone()),
        ("word/media/image2.png", png(30, 30, [0, 0, 255, 128])),
        ("word/media/image3.png", red),
        ("word/media/image4.png", png(10, 50, [0, 255, 0, 255])),
        ("word/media/image5.emf", emf()),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in parts {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(&data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn package() -> DocxPackage {
    DocxPackage::from_bytes(build_docx()).unwrap()
}

#[test]
fn test_collect_images_order_captions_and_dedupe() {
    let images = collect_images(&package());
    let ids: Vec<&str> = images.iter().map(|i| i.rel_id.as_str()).collect();
    assert_eq!(ids, vec!["rId10", "rId11", "rId14", "rId13"]);

    assert_eq!(images[0].caption, "Figure 2. Muscle activation during the squat");
    assert_eq!(images[0].position, Some(1));
    assert_eq!(images[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(images[1].caption, "Scheme 1: Training protocol");
    assert_eq!(images[3].caption, "");
    assert_eq!(images[3].position, None);
}

#[test]
fn test_extract_images_to_gif() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("IJES-18-42-Figures.docx");
    fs::write(&input, build_docx()).unwrap();

    let options = ExtractOptions::new()
        .with_output_dir(dir.path().join("out"))
        .with_width(200);
    let summary = extract_images(&input, &options).unwrap();

    assert_eq!(summary.found, 4);
    assert_eq!(summary.figures, 2);
    assert_eq!(summary.schemes, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.output_dir, dir.path().join("out").join("IJES-18-42-Figures"));

    let names: Vec<&str> = summary.files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["IJES-18-42-g002.gif", "IJES-18-42-s001.gif", "IJES-18-42-g001.gif"]
    );

    let first = &summary.files[0];
    assert_eq!((first.width, first.height), (200, 100));

    let gif = fs::read(summary.output_dir.join("IJES-18-42-g002.gif")).unwrap();
    assert!(gif.starts_with(b"GIF89a"));
    let decoded = image::load_from_memory(&gif).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (200, 100));
}

#[test]
fn test_extract_default_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("paper.docx");
    fs::write(&input, build_docx()).unwrap();

    let summary = extract_images(&input, &ExtractOptions::new().with_width(50)).unwrap();
    assert_eq!(
        summary.output_dir,
        dir.path().join("extracted_gifs").join("paper")
    );
    assert!(summary.output_dir.join("paper-s001.gif").exists());
}

#[test]
fn test_legacy_and_invalid_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let doc = dir.path().join("old.doc");
    fs::write(&doc, b"whatever").unwrap();
    assert!(matches!(DocxPackage::open(&doc), Err(Error::LegacyDoc)));

    assert!(matches!(
        DocxPackage::from_bytes(b"plain text".to_vec()),
        Err(Error::UnknownFormat(_))
    ));
}

#[test]
fn test_summary_counts() {
    let summary = diagnose::summary(&package()).unwrap();
    assert_eq!(summary.totals.image_relationships, 5);
    assert_eq!(summary.totals.inline_pictures, 3);
    assert_eq!(summary.totals.drawings, 3);
    assert_eq!(summary.totals.table_images, 0);
    assert_eq!(summary.totals.header_footer_images, 0);
    assert_eq!(summary.inline_pictures[0].blip_ids, vec!["rId10"]);
}

#[test]
fn test_references_report() {
    let report = diagnose::references(&package());
    assert_eq!(report.unreferenced, vec!["rId13"]);

    let emf = report.images.iter().find(|i| i.id == "rId14").unwrap();
    assert_eq!(emf.format.as_deref(), Some("EMF"));
    assert!(emf.error.is_some());

    let png = report.images.iter().find(|i| i.id == "rId10").unwrap();
    assert_eq!(png.dimensions, Some((40, 20)));

    let vml = report.paragraphs.iter().find(|p| p.paragraph == 6).unwrap();
    assert_eq!(vml.vml, vec!["rId14"]);
    assert!(report.to_string().contains("Unreferenced image relationships:\n  rId13"));
}

#[test]
fn test_locate_ids() {
    let ids = vec!["rId11".to_string(), "rId13".to_string()];
    let locations = diagnose::locate(&package(), &ids).unwrap();

    assert_eq!(locations[0].status, LocationStatus::Found);
    assert_eq!(locations[0].found_in, vec!["Paragraph 4"]);
    assert_eq!(locations[0].target.as_deref(), Some("media/image2.png"));

    assert_eq!(locations[1].status, LocationStatus::Orphaned);
    assert!(locations[1].contexts.is_empty());
}

#[test]
fn test_locate_id_prefix_of_other_ids() {
    let locations = diagnose::locate(&package(), &["rId1".to_string()]).unwrap();
    assert_eq!(locations[0].status, LocationStatus::Orphaned);
    assert!(locations[0].found_in.is_empty());
    assert!(locations[0].contexts.is_empty());
    assert!(locations[0].attributes.is_empty());
}

#[test]
fn test_containers_and_ole() {
    let pkg = package();
    let report = diagnose::containers(&pkg);
    assert_eq!(report.picts.len(), 1);
    assert_eq!(report.picts[0].paragraph, 6);
    assert_eq!(report.picts[0].shapes, 1);
    assert_eq!(report.objects, 0);

    assert!(diagnose::ole_objects(&pkg).is_empty());
}

#[test]
fn test_duplicates_report() {
    let report = diagnose::duplicates(&package());
    let ids: Vec<&str> = report.images.iter().map(|i| i.rel_id.as_str()).collect();
    assert_eq!(ids, vec!["rId10", "rId11", "rId12", "rId14"]);
    assert_eq!(report.duplicates.len(), 1);
    assert_eq!(report.duplicates[0].original, 1);
    assert_eq!(report.duplicates[0].duplicate, 3);
    assert_eq!(report.images[2].caption, "Scheme 1: Training protocol");
}
