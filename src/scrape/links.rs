//! HTML heuristics for issue and article pages.
//!
//! Each finder tries several methods in order, because the journal's
//! markup has changed over the years.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::titles::{clean_scraped_title, is_likely_article_title};

const ARTICLE_TEXT_INDICATORS: &[&str] = &["full text", "pdf", "article", "download", "view", "read"];

const PDF_TEXT_INDICATORS: &[&str] = &[
    "pdf",
    "full text",
    "download",
    "view pdf",
    "article pdf",
    "full article",
];

const PDF_META_NAMES: &[&str] = &[
    "citation_pdf_url",
    "dc.identifier.uri",
    "dc.relation.uri",
    "citation_fulltext_html_url",
];

const SKIPPED_PDF_MARKER: &str = "Guide-for-Peer-Review";

/// Minimum link text length considered for titles.
const MIN_LINK_TITLE_LEN: usize = 10;

/// An article found on an issue page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ArticleLink {
    pub url: String,
    pub title: String,
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

fn regex_ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("valid regex")
}

/// Element text with each text node trimmed and empty nodes dropped.
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `(href, text)` for every anchor with an `href`.
fn anchors(doc: &Html) -> Vec<(String, String)> {
    let sel = selector("a[href]");
    doc.select(&sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?.to_string();
            Some((href, element_text(&a)))
        })
        .collect()
}

fn absolute(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Find article links on an issue table-of-contents page.
///
/// Candidates from every method are merged, deduplicated on
/// `(url, title)` in first-seen order, and empty titles are dropped.
pub fn parse_article_links(
    html: &str,
    page_url: &Url,
    volume: u32,
    issue: u32,
    slug: &str,
) -> Vec<ArticleLink> {
    let doc = Html::parse_document(html);
    let links = anchors(&doc);
    let vol = format!("vol{}", volume);
    let iss = format!("iss{}", issue);

    let mut candidates: Vec<(String, String)> = Vec::new();

    let canonical = regex(&format!(r"/{}/vol{}/iss{}/\d+/", regex::escape(slug), volume, issue));
    let method1: Vec<_> = links
        .iter()
        .filter(|(href, _)| canonical.is_match(href))
        .map(|(href, text)| (absolute(page_url, href), text.clone()))
        .collect();
    log::debug!("Canonical pattern: {} match(es)", method1.len());
    candidates.extend(method1);

    let flexible = [
        format!(r"/{}/vol{}/iss{}/\d+/?", regex::escape(slug), volume, issue),
        format!(r"vol{}/iss{}/\d+/?", volume, issue),
        format!(r"iss{}/\d+/?", issue),
        r"/\d+/?$".to_string(),
    ];
    for pattern in &flexible {
        let re = regex(pattern);
        let before = candidates.len();
        for (href, text) in links.iter().filter(|(href, _)| re.is_match(href)) {
            let full = absolute(page_url, href);
            if full.contains(&vol) && full.contains(&iss) {
                candidates.push((full, text.clone()));
            }
        }
        log::debug!("Pattern '{}': {} match(es)", pattern, candidates.len() - before);
    }

    let volume_query = format!("volume={}", volume);
    let issue_query = format!("issue={}", issue);
    for (href, text) in &links {
        if (href.contains(&vol) && href.contains(&iss))
            || (href.contains(&volume_query) && href.contains(&issue_query))
        {
            candidates.push((absolute(page_url, href), text.clone()));
        }
    }

    for (href, text) in &links {
        let lower = text.to_lowercase();
        if href.is_empty() || !ARTICLE_TEXT_INDICATORS.iter().any(|i| lower.contains(i)) {
            continue;
        }
        let full = absolute(page_url, href);
        if full.contains(&vol) || full.contains(&iss) {
            candidates.push((full, text.clone()));
        }
    }

    let mut seen = HashSet::new();
    let articles: Vec<ArticleLink> = candidates
        .into_iter()
        .map(|(url, title)| (url, title.trim().to_string()))
        .filter(|(_, title)| !title.is_empty())
        .filter(|pair| seen.insert(pair.clone()))
        .map(|(url, title)| ArticleLink { url, title })
        .collect();

    log::info!(
        "Found {} unique article(s) for volume {}, issue {}",
        articles.len(),
        volume,
        issue
    );
    articles
}

/// Find the PDF link on an article page.
pub fn parse_pdf_link(html: &str, article_url: &Url, slug: &str) -> Option<Url> {
    let doc = Html::parse_document(html);
    let links = anchors(&doc);
    let join = |href: &str| article_url.join(href).ok();

    let canonical = regex_ci(&format!(r"/files/{}/vol\d+/iss\d+/\d+\.pdf", regex::escape(slug)));
    if let Some((href, _)) = links.iter().find(|(href, _)| canonical.is_match(href)) {
        log::debug!("PDF via canonical pattern: {}", href);
        return join(href);
    }

    let patterns = [r"/files/.*\.pdf", r"vol\d+/iss\d+/.*\.pdf", r"/\d+\.pdf", r"\.pdf$"];
    for pattern in patterns {
        let re = regex_ci(pattern);
        let found = links
            .iter()
            .find(|(href, _)| re.is_match(href) && !href.contains(SKIPPED_PDF_MARKER));
        if let Some((href, _)) = found {
            log::debug!("PDF via pattern '{}': {}", pattern, href);
            return join(href);
        }
    }

    for (href, text) in &links {
        let text = text.to_lowercase();
        if href.is_empty()
            || href.contains(SKIPPED_PDF_MARKER)
            || !PDF_TEXT_INDICATORS.iter().any(|i| text.contains(i))
        {
            continue;
        }
        if href.to_lowercase().contains(".pdf") || text.contains("pdf") || text.contains("full text") {
            log::debug!("PDF via link text '{}': {}", text, href);
            return join(href);
        }
    }

    for name in PDF_META_NAMES {
        let sel = selector(&format!("meta[name=\"{}\"]", name));
        let content = doc
            .select(&sel)
            .next()
            .and_then(|m| m.value().attr("content"));
        if let Some(content) = content {
            if content.to_lowercase().contains(".pdf") {
                log::debug!("PDF via meta {}: {}", name, content);
                return join(content);
            }
        }
    }

    let embeds = selector("iframe, embed, object");
    for el in doc.select(&embeds) {
        let src = el
            .value()
            .attr("src")
            .filter(|s| !s.is_empty())
            .or_else(|| el.value().attr("data"));
        if let Some(src) = src.filter(|s| s.to_lowercase().contains(".pdf")) {
            log::debug!("PDF via embedded element: {}", src);
            return join(src);
        }
    }

    None
}

/// Fallback PDF URLs built from an article URL ending in `/vol<v>/iss<i>/<n>/`.
pub fn constructed_pdf_candidates(article_url: &str, base_url: &str, slug: &str) -> Vec<String> {
    let number = regex(r"/(\d+)/?$");
    let vol = regex(r"/vol(\d+)/");
    let iss = regex(r"/iss(\d+)/");

    let capture = |re: &Regex| {
        re.captures(article_url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    };
    let (Some(n), Some(v), Some(i)) = (capture(&number), capture(&vol), capture(&iss)) else {
        return Vec::new();
    };

    let base = base_url.trim_end_matches('/');
    vec![
        format!("{}/files/{}/vol{}/iss{}/{}.pdf", base, slug, v, i, n),
        format!("{}/files/vol{}/iss{}/{}.pdf", base, v, i, n),
        format!("{}/pdf/vol{}/iss{}/{}.pdf", base, v, i, n),
    ]
}

/// Article titles on an issue page, deduplicated in page order.
///
/// Link text is used when links follow the article URL pattern; otherwise
/// block elements whose text looks like a title.
pub fn parse_issue_titles(html: &str, volume: u32, issue: u32, slug: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let pattern = regex(&format!(r"/{}/vol{}/iss{}/\d+/?", regex::escape(slug), volume, issue));

    let mut titles: Vec<String> = anchors(&doc)
        .into_iter()
        .filter(|(href, text)| text.chars().count() >= MIN_LINK_TITLE_LEN && pattern.is_match(href))
        .map(|(_, text)| clean_scraped_title(&text))
        .filter(|t| t.chars().count() > MIN_LINK_TITLE_LEN)
        .collect();

    if titles.is_empty() {
        let blocks = selector("div, p, h3, h4");
        titles = doc
            .select(&blocks)
            .map(|el| element_text(&el))
            .filter(|text| is_likely_article_title(text))
            .map(|text| clean_scraped_title(&text))
            .filter(|t| t.chars().count() > MIN_LINK_TITLE_LEN)
            .collect();
    }

    let mut seen = HashSet::new();
    titles.retain(|t| seen.insert(t.clone()));
    titles
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUE_PAGE: &str = r#"<html><head><title>Vol 18 Iss 2</title></head><body>
<div class="article">
  <a href="/ijes/vol18/iss2/1/">Effects of Resistance Training on Grip Strength</a>
  <a href="https://intjexersci.com/ijes/vol18/iss2/2">Heart Rate Variability in Swimmers</a>
  <a href="/ijes/vol18/iss2/1/">Effects of Resistance Training on Grip Strength</a>
  <a href="/ijes/vol18/iss2/3/"></a>
  <a href="/cgi/viewcontent.cgi?volume=18&amp;issue=2&amp;article=4">Download Full Text</a>
  <a href="/ijes/vol17/iss4/9/">Older Volume Paper Title</a>
  <a href="/about/">About the journal</a>
</div></body></html>"#;

    fn page_url() -> Url {
        Url::parse("https://intjexersci.com/ijes/vol18/iss2/").unwrap()
    }

    #[test]
    fn test_parse_article_links() {
        let links = parse_article_links(ISSUE_PAGE, &page_url(), 18, 2, "ijes");
        let urls: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://intjexersci.com/ijes/vol18/iss2/1/",
                "https://intjexersci.com/ijes/vol18/iss2/2",
                "https://intjexersci.com/cgi/viewcontent.cgi?volume=18&issue=2&article=4",
            ]
        );
        assert_eq!(links[0].title, "Effects of Resistance Training on Grip Strength");
    }

    #[test]
    fn test_parse_pdf_link_canonical() {
        let html = r#"<a href="/files/ijes/Guide-for-Peer-Review.pdf">Guide</a>
<a href="/files/ijes/vol18/iss2/1.pdf">Download</a>"#;
        let url = Url::parse("https://intjexersci.com/ijes/vol18/iss2/1/").unwrap();
        assert_eq!(
            parse_pdf_link(html, &url, "ijes").unwrap().as_str(),
            "https://intjexersci.com/files/ijes/vol18/iss2/1.pdf"
        );
    }

    #[test]
    fn test_parse_pdf_link_skips_peer_review_guide() {
        let html = r#"<a href="/files/Guide-for-Peer-Review.pdf">Guide</a>
<a href="/docs/article.PDF">Paper</a>"#;
        let url = Url::parse("https://example.org/a/").unwrap();
        assert_eq!(
            parse_pdf_link(html, &url, "ijes").unwrap().as_str(),
            "https://example.org/docs/article.PDF"
        );
    }

    #[test]
    fn test_parse_pdf_link_meta_and_embed() {
        let url = Url::parse("https://example.org/a/").unwrap();
        let meta = r#"<head><meta name="citation_pdf_url" content="https://cdn.example.org/x.pdf"></head>"#;
        assert_eq!(
            parse_pdf_link(meta, &url, "ijes").unwrap().as_str(),
            "https://cdn.example.org/x.pdf"
        );

        let embed = r#"<body><iframe src="/viewer/file.pdf#page=1"></iframe></body>"#;
        assert_eq!(
            parse_pdf_link(embed, &url, "ijes").unwrap().as_str(),
            "https://example.org/viewer/file.pdf#page=1"
        );

        assert!(parse_pdf_link("<p>nothing</p>", &url, "ijes").is_none());
    }

    #[test]
    fn test_constructed_pdf_candidates() {
        let candidates = constructed_pdf_candidates(
            "https://intjexersci.com/ijes/vol18/iss2/7/",
            "https://intjexersci.com",
            "ijes",
        );
        assert_eq!(
            candidates,
            vec![
                "https://intjexersci.com/files/ijes/vol18/iss2/7.pdf",
                "https://intjexersci.com/files/vol18/iss2/7.pdf",
                "https://intjexersci.com/pdf/vol18/iss2/7.pdf",
            ]
        );
        assert!(constructed_pdf_candidates("https://x.org/about/", "https://x.org", "ijes").is_empty());
    }

    #[test]
    fn test_parse_issue_titles_from_links() {
        let titles = parse_issue_titles(ISSUE_PAGE, 18, 2, "ijes");
        assert_eq!(
            titles,
            vec![
                "Effects of Resistance Training on Grip Strength",
                "Heart Rate Variability in Swimmers",
            ]
        );
    }

    #[test]
    fn test_parse_issue_titles_block_fallback() {
        let html = r#"<body>
<h3>Table of Contents</h3>
<h4>Sprint Performance Among Collegiate Soccer Athletes</h4>
<p>Short</p>
</body>"#;
        let titles = parse_issue_titles(html, 18, 2, "ijes");
        assert_eq!(titles, vec!["Sprint Performance Among Collegiate Soccer Athletes"]);
    }
}
