//! Email audit against a real workbook.

use rust_xlsxwriter::Workbook;

use journal_tools::emails::{audit_file, export_report, render_report, AuditOptions, Severity};
use journal_tools::read_table;

/// Contributor sheet with a title row above the headers.
fn write_contributors(path: &std::path::Path) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Contributors").unwrap();

    let headers = ["Author_FName", "Author_LName", "Article Title", "Vol", "Issue", "Contact"];
    for (col, h) in headers.iter().enumerate() {
        sheet.write_string(1, col as u16, *h).unwrap();
    }

    let rows: [(&str, &str, &str, f64, f64, &str); 6] = [
        ("Ana", "Silva", "Sprint Mechanics", 18.0, 1.0, "ana@uni.edu"),
        ("Ben", "Ode", "Load Monitoring", 18.0, 1.0, "ben@uni.edu"),
        ("Cara", "Moss", "Hydration Status", 18.0, 1.0, "cara@clinic.org"),
        ("Dev", "Rao", "Grip Strength", 18.0, 2.0, ""),
        ("dev", "rao", "Grip Strength II", 18.0, 2.0, "none"),
        ("Eli", "Fox", "Balance Training", 17.0, 1.0, "eli@"),
    ];
    for (i, (first, last, title, vol, iss, email)) in rows.iter().enumerate() {
        let r = i as u32 + 2;
        sheet.write_string(r, 0, *first).unwrap();
        sheet.write_string(r, 1, *last).unwrap();
        sheet.write_string(r, 2, *title).unwrap();
        sheet.write_number(r, 3, *vol).unwrap();
        sheet.write_number(r, 4, *iss).unwrap();
        if !email.is_empty() {
            sheet.write_string(r, 5, *email).unwrap();
        }
    }
    workbook.save(path).unwrap();
}

#[test]
fn test_audit_detects_column_by_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contributors.xlsx");
    write_contributors(&path);

    let report = audit_file(&path, &AuditOptions::new()).unwrap();
    let stats = &report.stats;
    assert_eq!(stats.email_column, "Contact");
    assert_eq!(stats.total_records, 6);
    assert_eq!(stats.missing_emails, 3);
    assert_eq!(stats.missing_percentage, 50.0);
    assert_eq!(stats.duplicates_removed, 1);
    assert_eq!(stats.unique_missing, 2);
    assert_eq!(stats.severity(), Severity::High);

    // Headers sit on worksheet row 2, so the first data row is row 3.
    let rows: Vec<usize> = report.missing.iter().map(|r| r.excel_row).collect();
    assert_eq!(rows, vec![6, 8]);
    assert!(report.has_missing());
}

#[test]
fn test_audit_filters_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contributors.xlsx");
    write_contributors(&path);

    let options = AuditOptions::new()
        .with_sheet("Contributors")
        .with_email_column("Contact")
        .with_volume(18)
        .with_issue(1);
    let report = audit_file(&path, &options).unwrap();
    assert_eq!(report.stats.original_records, 6);
    assert_eq!(report.stats.filtered_records, 3);
    assert_eq!(report.stats.missing_emails, 0);
    assert!(!report.has_missing());

    let text = render_report(&report, true, 50);
    assert!(text.contains("  - Volume: 18"));
    assert!(text.contains("Records after filtering: 3 (from 6)"));
    assert!(text.contains("Status: All records have valid email addresses!"));

    let out = dir.path().join("missing.xlsx");
    export_report(&report, &out).unwrap();
    let missing = read_table(&out, Some("Missing_Emails")).unwrap();
    assert!(missing.is_empty());
    assert_eq!(missing.headers.len(), 7);
}

#[test]
fn test_audit_unknown_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contributors.xlsx");
    write_contributors(&path);

    let options = AuditOptions::new().with_sheet("Nope");
    assert!(audit_file(&path, &options).is_err());
}
