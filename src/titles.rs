//! Title and filename heuristics shared by the footer, scraper and
//! extraction tools.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Normalized titles must be longer than this for a fuzzy match.
pub const FUZZY_MIN_LEN: usize = 20;

/// Prefix length compared during a fuzzy match.
pub const FUZZY_PREFIX_LEN: usize = 50;

const MAX_FILENAME_LEN: usize = 200;

const BASENAME_SUFFIXES: &[&str] = &[
    "-Figures", "-figures", "-Images", "-images", "-Schemes", "-schemes", "-Tables", "-tables",
];

const SCRAPED_PREFIXES: &[&str] = &["Download", "View", "PDF:", "Article:", "Full Text:"];

const NAVIGATION_WORDS: &[&str] = &[
    "volume",
    "issue",
    "table of contents",
    "editorial",
    "copyright",
    "issn",
    "published by",
    "all rights",
    "browse",
    "search",
    "login",
    "register",
    "home",
];

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<.*?>").expect("valid regex"))
}

fn forbidden_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid regex"))
}

/// Normalize a title for comparison.
///
/// Applies NFKC, lowercases, drops punctuation, and collapses whitespace.
pub fn normalize_title(title: &str) -> String {
    let folded: String = title.nfkc().collect::<String>().to_lowercase();
    let stripped = non_word_re().replace_all(&folded, "");
    whitespace_re()
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

/// How two titles matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    Exact,
    Fuzzy,
}

/// Compare two already-normalized titles.
pub fn compare_normalized(a: &str, b: &str) -> Option<TitleMatch> {
    if a.is_empty() || b.is_empty() {
        return None;
    }
    if a == b {
        return Some(TitleMatch::Exact);
    }
    if a.chars().count() > FUZZY_MIN_LEN && b.chars().count() > FUZZY_MIN_LEN {
        let a_prefix = char_prefix(a, FUZZY_PREFIX_LEN);
        let b_prefix = char_prefix(b, FUZZY_PREFIX_LEN);
        if b.contains(a_prefix) || a.contains(b_prefix) {
            return Some(TitleMatch::Fuzzy);
        }
    }
    None
}

/// Compare two raw titles after normalization.
pub fn titles_match(a: &str, b: &str) -> Option<TitleMatch> {
    compare_normalized(&normalize_title(a), &normalize_title(b))
}

fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Turn an article title into a safe file stem.
pub fn sanitize_filename(title: &str) -> String {
    let no_tags = tag_re().replace_all(title, "");
    let no_forbidden = forbidden_re().replace_all(&no_tags, "");
    let collapsed = whitespace_re().replace_all(&no_forbidden, " ");
    let truncated = char_prefix(&collapsed, MAX_FILENAME_LEN).trim();
    let cleaned = truncated.trim_end_matches('.');
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Clean a title scraped from link text.
pub fn clean_scraped_title(title: &str) -> String {
    let no_tags = tag_re().replace_all(title, "");
    let mut title = whitespace_re()
        .replace_all(&no_tags, " ")
        .trim()
        .to_string();

    if let Some(stripped) = title.strip_suffix(".pdf") {
        title = stripped.to_string();
    }

    for prefix in SCRAPED_PREFIXES {
        if let Some(rest) = title.strip_prefix(prefix) {
            title = rest.trim().to_string();
        }
    }

    title
}

/// Whether a block of page text looks like an article title.
pub fn is_likely_article_title(text: &str) -> bool {
    let len = text.chars().count();
    if !(20..=300).contains(&len) {
        return false;
    }

    let lower = text.to_lowercase();
    if NAVIGATION_WORDS.iter().any(|w| lower.contains(w)) {
        return false;
    }

    let words = text.split_whitespace().count();
    (3..=50).contains(&words)
}

/// File stem with a trailing `-Figures`/`-Schemes`/... suffix removed.
///
/// `IJRIT-11-139-Figures.docx` becomes `IJRIT-11-139`.
pub fn document_basename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    for suffix in BASENAME_SUFFIXES {
        if let Some(base) = stem.strip_suffix(suffix) {
            return base.to_string();
        }
    }
    stem
}

/// Extract `(volume, issue)` from a path containing `vol<N>` and `iss<N>`.
pub fn volume_issue_from_path(path: &str) -> (Option<u32>, Option<u32>) {
    static VOL: OnceLock<Regex> = OnceLock::new();
    static ISS: OnceLock<Regex> = OnceLock::new();
    let vol = VOL.get_or_init(|| Regex::new(r"vol(\d+)").expect("valid regex"));
    let iss = ISS.get_or_init(|| Regex::new(r"iss(\d+)").expect("valid regex"));

    let capture = |re: &Regex| {
        re.captures(path)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    };
    (capture(vol), capture(iss))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("  Effects of  Exercise: A Review! "),
            "effects of exercise a review"
        );
        assert_eq!(normalize_title("Résumé—draft"), "résumédraft");
        assert_eq!(normalize_title(""), "");
    }

    #[test]
    fn test_titles_match_exact() {
        assert_eq!(
            titles_match("Effects of Exercise", "effects of exercise!"),
            Some(TitleMatch::Exact)
        );
    }

    #[test]
    fn test_titles_match_fuzzy_prefix() {
        let file_stem = "Resistance training improves grip strength in older adults";
        let row = "Resistance Training Improves Grip Strength in Older Adults: A Randomized Trial";
        assert_eq!(titles_match(file_stem, row), Some(TitleMatch::Fuzzy));
    }

    #[test]
    fn test_titles_match_short_titles_need_exact() {
        assert_eq!(titles_match("Short title", "Short title extended"), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(
            sanitize_filename("A <i>Study</i>: What/Why?  "),
            "A Study WhatWhy"
        );
        assert_eq!(sanitize_filename("Ends with dots..."), "Ends with dots");
        assert_eq!(sanitize_filename("???"), "untitled");
        assert_eq!(sanitize_filename(&"x".repeat(300)).len(), 200);
    }

    #[test]
    fn test_clean_scraped_title() {
        assert_eq!(clean_scraped_title("Download  My Paper.pdf"), "My Paper");
        assert_eq!(clean_scraped_title("PDF: <b>Title</b>"), "Title");
        assert_eq!(clean_scraped_title("Plain"), "Plain");
    }

    #[test]
    fn test_is_likely_article_title() {
        assert!(is_likely_article_title(
            "Heart Rate Variability in Collegiate Swimmers"
        ));
        assert!(!is_likely_article_title("Too short"));
        assert!(!is_likely_article_title("Browse all articles in this journal"));
        assert!(!is_likely_article_title(&"word ".repeat(60)));
    }

    #[test]
    fn test_document_basename() {
        assert_eq!(
            document_basename(Path::new("/tmp/IJRIT-11-139-Figures.docx")),
            "IJRIT-11-139"
        );
        assert_eq!(
            document_basename(Path::new("paper-schemes.docx")),
            "paper"
        );
        assert_eq!(document_basename(Path::new("plain.docx")), "plain");
    }

    #[test]
    fn test_volume_issue_from_path() {
        assert_eq!(
            volume_issue_from_path("downloads/vol18/iss2/paper.pdf"),
            (Some(18), Some(2))
        );
        assert_eq!(volume_issue_from_path("downloads/misc.pdf"), (None, None));
    }
}
