//! Turns a raw filing body into clean, sectioned plain text.
//!
//! Extraction is best-effort and never fails: malformed markup degrades to a
//! single salvaged section rather than an error.

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use unicode_normalization::UnicodeNormalization;

use crate::edgar::fetcher::{ContentType, RawDocument};
use crate::edgar::locator::FilingReference;

#[derive(Debug, Clone)]
pub struct Section {
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub reference: FilingReference,
    pub sections: Vec<Section>,
}

impl ExtractedText {
    /// The full extracted narrative: section texts in order, separated by
    /// paragraph breaks. This is the stream the chunker operates on.
    pub fn full_text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub fn extract(document: &RawDocument) -> ExtractedText {
    let sections = extract_sections(&document.body, document.content_type);
    ExtractedText {
        reference: document.reference.clone(),
        sections,
    }
}

pub(crate) fn extract_sections(body: &str, content_type: ContentType) -> Vec<Section> {
    let text = match content_type {
        ContentType::Html | ContentType::Xbrl => {
            let flattened = flatten_markup(body);
            if flattened.trim().is_empty() {
                // Salvage path for markup the DOM pass could not render.
                normalize(&strip_tags(body))
            } else {
                flattened
            }
        }
        ContentType::PlainText => normalize(body),
    };
    split_sections(&text, content_type)
}

/// Parses the DOM (tolerant of unclosed and unbalanced tags) and collects the
/// rendered text of block elements, skipping script/style/navigation and the
/// non-rendered XBRL metadata containers.
fn flatten_markup(body: &str) -> String {
    let document = Html::parse_document(body);
    let mut out = String::new();
    collect_text(document.root_element(), &mut out);
    normalize(&out)
}

fn collect_text(element: ElementRef, out: &mut String) {
    let value = element.value();
    let name = value.name();

    if matches!(name, "script" | "style" | "head" | "title" | "nav" | "noscript") {
        return;
    }
    // Inline XBRL wrappers render their text; these containers do not.
    if matches!(name, "ix:header" | "ix:hidden" | "ix:references" | "ix:resources") {
        return;
    }
    if let Some(style) = value.attr("style") {
        if style.replace(' ', "").to_ascii_lowercase().contains("display:none") {
            return;
        }
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }

    if matches!(name, "td" | "th") {
        out.push(' ');
    }
    if is_block(name) {
        out.push('\n');
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "br"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "li"
            | "tr"
            | "table"
            | "section"
            | "article"
            | "blockquote"
    )
}

static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script.*?</script>").unwrap());
static STYLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style.*?</style>").unwrap());
static IX_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<ix:header.*?</ix:header>").unwrap());
static BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</tr>").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Regex fallback for bodies the DOM pass renders as empty, e.g. raw XBRL
/// instance documents.
fn strip_tags(raw: &str) -> String {
    let mut text = SCRIPT_RE.replace_all(raw, "").into_owned();
    text = STYLE_RE.replace_all(&text, "").into_owned();
    text = IX_HEADER_RE.replace_all(&text, "").into_owned();
    text = BREAK_RE.replace_all(&text, "\n").into_owned();
    text = TAG_RE.replace_all(&text, " ").into_owned();
    decode_html_entities(&text).into_owned()
}

static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// Collapses runs of spaces and blank lines, then NFKC-normalizes.
fn normalize(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_pending = false;
    for line in text.lines() {
        let cleaned = SPACE_RE.replace_all(line.trim(), " ").into_owned();
        if cleaned.is_empty() {
            blank_pending = !lines.is_empty();
        } else {
            if blank_pending {
                lines.push(String::new());
                blank_pending = false;
            }
            lines.push(cleaned);
        }
    }
    lines.join("\n").nfkc().collect()
}

/// Standard 10-K/10-Q item headings, matched case-insensitively against the
/// flattened text. The `.` alternation absorbs curly apostrophes.
static ITEM_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)item\s+1\s*\.?\s*business\b",
        r"(?i)item\s+1a\s*\.?\s*risk\s+factors",
        r"(?i)item\s+3\s*\.?\s*legal\s+proceedings",
        r"(?i)item\s+7\s*\.?\s*management.s\s+discussion\s+and\s+analysis",
        r"(?i)item\s+7a\s*\.?\s*quantitative\s+and\s+qualitative",
        r"(?i)item\s+8\s*\.?\s*financial\s+statements",
        r"(?i)item\s+2\s*\.?\s*management.s\s+discussion\s+and\s+analysis",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Segments the text at item headings. When a pattern matches more than once
/// the last occurrence wins, since earlier hits are usually the table of
/// contents. Exact boundaries are best-effort; coverage is not.
fn split_sections(text: &str, content_type: ContentType) -> Vec<Section> {
    if text.trim().is_empty() {
        return vec![];
    }

    let mut marks: Vec<(usize, String)> = ITEM_PATTERNS
        .iter()
        .filter_map(|re| re.find_iter(text).last())
        .map(|m| (m.start(), clean_label(m.as_str())))
        .collect();
    marks.sort_by_key(|&(start, _)| start);
    marks.dedup_by_key(|&mut (start, _)| start);

    if marks.is_empty() {
        return if content_type == ContentType::PlainText {
            paragraph_sections(text)
        } else {
            vec![Section {
                label: "Section 1".to_string(),
                text: text.trim().to_string(),
            }]
        };
    }

    let mut sections = Vec::new();
    let preamble = text[..marks[0].0].trim();
    if !preamble.is_empty() {
        sections.push(Section {
            label: "Section 1".to_string(),
            text: preamble.to_string(),
        });
    }
    for (i, (start, label)) in marks.iter().enumerate() {
        let end = marks.get(i + 1).map_or(text.len(), |&(next, _)| next);
        let body = text[*start..end].trim();
        if !body.is_empty() {
            sections.push(Section {
                label: label.clone(),
                text: body.to_string(),
            });
        }
    }
    sections
}

static BLANK_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

fn paragraph_sections(text: &str) -> Vec<Section> {
    BLANK_LINE_RE
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .enumerate()
        .map(|(i, p)| Section {
            label: format!("Section {}", i + 1),
            text: p.to_string(),
        })
        .collect()
}

fn clean_label(heading: &str) -> String {
    SPACE_RE.replace_all(heading.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_style_and_xbrl_metadata() {
        let html = r#"<html><head><title>Filing</title><style>p { color: red }</style></head>
            <body><ix:header><ix:hidden>context data</ix:hidden></ix:header>
            <script>alert("hi")</script>
            <p>Revenue grew 12% in fiscal 2024.</p></body></html>"#;
        let sections = extract_sections(html, ContentType::Html);
        assert_eq!(sections.len(), 1);
        assert!(sections[0].text.contains("Revenue grew 12%"));
        assert!(!sections[0].text.contains("alert"));
        assert!(!sections[0].text.contains("color: red"));
        assert!(!sections[0].text.contains("context data"));
        assert!(!sections[0].text.contains("Filing"));
    }

    #[test]
    fn hidden_elements_are_dropped() {
        let html = r#"<div style="display: none">internal only</div><p>visible text</p>"#;
        let sections = extract_sections(html, ContentType::Html);
        let text = sections.iter().map(|s| s.text.clone()).collect::<String>();
        assert!(text.contains("visible text"));
        assert!(!text.contains("internal only"));
    }

    #[test]
    fn item_headings_become_labeled_sections() {
        let html = "<html><body>\
            <p>Annual report preamble.</p>\
            <h2>Item 1. Business</h2><p>We sell software licenses worldwide.</p>\
            <h2>Item 1A. Risk Factors</h2><p>Competition may reduce margins.</p>\
            </body></html>";
        let sections = extract_sections(html, ContentType::Html);
        assert!(sections.len() >= 3);
        assert_eq!(sections[0].label, "Section 1");
        assert!(sections
            .iter()
            .any(|s| s.label.to_lowercase().contains("risk factors")));
        assert!(sections.iter().all(|s| !s.text.trim().is_empty()));
    }

    #[test]
    fn repeated_headings_prefer_the_last_occurrence() {
        // Table of contents mentions the heading first; the section body
        // should anchor at the later occurrence.
        let html = "<body><p>Contents: Item 1A. Risk Factors page 12</p>\
            <p>filler filler filler</p>\
            <h2>Item 1A. Risk Factors</h2><p>Actual risk discussion here.</p></body>";
        let sections = extract_sections(html, ContentType::Html);
        let risk = sections
            .iter()
            .find(|s| s.label.to_lowercase().contains("risk"))
            .unwrap();
        assert!(risk.text.contains("Actual risk discussion"));
    }

    #[test]
    fn malformed_markup_never_panics_and_salvages_text() {
        let cases = [
            "<html><body><p>unclosed paragraph",
            "<div><div><div>deep <b>nesting",
            "</p></div>stray closers, but this text survives",
            "<p>truncated attr <a href=\"http://exa",
            "plain text masquerading < as markup >",
        ];
        for case in cases {
            let sections = extract_sections(case, ContentType::Html);
            assert!(
                sections.iter().any(|s| !s.text.trim().is_empty()),
                "no text salvaged from {:?}",
                case
            );
        }
    }

    #[test]
    fn xml_bodies_fall_back_to_tag_stripping() {
        let xml = r#"<?xml version="1.0"?><xbrl><us-gaap:Revenue>245122000000</us-gaap:Revenue></xbrl>"#;
        let sections = extract_sections(xml, ContentType::Xbrl);
        assert!(sections.iter().any(|s| s.text.contains("245122000000")));
    }

    #[test]
    fn plain_text_splits_on_blank_lines() {
        let text = "First paragraph about revenue.\n\nSecond paragraph about risks.\n\n\nThird.";
        let sections = extract_sections(text, ContentType::PlainText);
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[0].label, "Section 1");
        assert_eq!(sections[2].label, "Section 3");
    }

    #[test]
    fn whitespace_is_collapsed() {
        let html = "<p>spread   \t out&nbsp;&nbsp;words</p>";
        let sections = extract_sections(html, ContentType::Html);
        assert_eq!(sections[0].text, "spread out words");
    }

    #[test]
    fn empty_input_yields_no_sections() {
        assert!(extract_sections("", ContentType::Html).is_empty());
        assert!(extract_sections("<div></div>", ContentType::Html).is_empty());
    }
}
