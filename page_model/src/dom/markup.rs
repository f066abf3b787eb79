//! Markup scanning for the headless document.
//!
//! This is not an HTML parser. It recognizes start/end tags, quoted and bare
//! attributes, void elements and comments, which is enough to discover the
//! elements inside trusted site fragments.

use regex_lite::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// An element found while scanning markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupElement {
    /// Lowercased tag name.
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Index of the enclosing element in the scan output, if any.
    pub parent: Option<usize>,
    /// Source text between the start and end tag.
    pub inner_html: String,
}

impl MarkupElement {
    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace())
            .into_iter()
            .flatten()
    }
}

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| {
        Regex::new(
            r#"<(/?)([a-zA-Z][a-zA-Z0-9-]*)((?:\s+[^\s=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*(/?)>"#,
        )
        .expect("valid tag regex")
    })
}

fn attribute_regex() -> &'static Regex {
    static ATTR_RE: OnceLock<Regex> = OnceLock::new();
    ATTR_RE.get_or_init(|| {
        Regex::new(r#"([^\s=/>]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("valid attribute regex")
    })
}

fn comment_ranges(html: &str) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut cursor = 0;
    while let Some(start) = html[cursor..].find("<!--") {
        let start = cursor + start;
        let end = html[start + 4..]
            .find("-->")
            .map(|e| start + 4 + e + 3)
            .unwrap_or(html.len());
        ranges.push((start, end));
        cursor = end;
    }
    ranges
}

fn parse_attributes(raw: &str) -> BTreeMap<String, String> {
    attribute_regex()
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            Some((name, value))
        })
        .collect()
}

/// Scan `html` and return its elements in document order.
pub fn scan_markup(html: &str) -> Vec<MarkupElement> {
    let comments = comment_ranges(html);
    let in_comment = |pos: usize| comments.iter().any(|(s, e)| pos >= *s && pos < *e);

    let mut elements: Vec<MarkupElement> = Vec::new();
    // (element index, content start offset)
    let mut open: Vec<(usize, usize)> = Vec::new();

    for caps in tag_regex().captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        if in_comment(whole.start()) {
            continue;
        }
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let tag = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_default();

        if closing {
            // Close up to the nearest matching start tag; unmatched end tags are ignored.
            match open.iter().rposition(|(idx, _)| elements[*idx].tag == tag) {
                Some(depth) => {
                    for (idx, content_start) in open.drain(depth..).rev() {
                        elements[idx].inner_html = html[content_start..whole.start()].to_string();
                    }
                }
                None => debug!(%tag, offset = whole.start(), "ignoring unmatched end tag"),
            }
            continue;
        }

        let self_closing = caps.get(4).is_some_and(|m| !m.as_str().is_empty());
        let attributes = caps
            .get(3)
            .map(|m| parse_attributes(m.as_str()))
            .unwrap_or_default();
        let index = elements.len();
        elements.push(MarkupElement {
            parent: open.last().map(|(idx, _)| *idx),
            tag: tag.clone(),
            attributes,
            inner_html: String::new(),
        });

        if !self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
            open.push((index, whole.end()));
        }
    }

    if !open.is_empty() {
        debug!(unclosed = open.len(), "markup ended with open elements");
    }
    for (idx, content_start) in open {
        elements[idx].inner_html = html[content_start..].to_string();
    }

    elements
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_scan_nested_elements() {
        let html = r#"<nav class="main-nav"><ul class="nav-menu"><li><a href="/" data-page="index">Home</a></li></ul></nav>"#;
        let elements = scan_markup(html);

        let tags: Vec<_> = elements.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["nav", "ul", "li", "a"]);
        assert_eq!(elements[1].parent, Some(0));
        assert_eq!(elements[3].parent, Some(2));
        assert_eq!(elements[3].inner_html, "Home");
        assert_eq!(
            elements[3].attributes.get("data-page").map(String::as_str),
            Some("index")
        );
    }

    #[test]
    fn test_bare_and_single_quoted_attributes() {
        let html = r#"<input type='checkbox' id=analytics-cookies checked>"#;
        let elements = scan_markup(html);

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].id(), Some("analytics-cookies"));
        assert_eq!(elements[0].attributes.get("type").map(String::as_str), Some("checkbox"));
        assert!(elements[0].attributes.contains_key("checked"));
    }

    #[test]
    fn test_void_elements_do_not_nest() {
        let html = r#"<div id="a"><img src="x.png"><span id="b"></span></div>"#;
        let elements = scan_markup(html);

        assert_eq!(elements[2].tag, "span");
        assert_eq!(elements[2].parent, Some(0));
    }

    #[test]
    fn test_comments_are_skipped() {
        let html = r#"<!-- <div id="ghost"></div> --><p id="real">x</p>"#;
        let elements = scan_markup(html);

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].id(), Some("real"));
    }

    #[test]
    fn test_unclosed_elements_take_remaining_text() {
        let elements = scan_markup(r#"<div class="a b">tail"#);

        assert_eq!(elements[0].inner_html, "tail");
        assert_eq!(elements[0].classes().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_unmatched_end_tags_are_ignored() {
        let elements = scan_markup(r#"</div><p id="x">text</span></p></section>"#);

        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].id(), Some("x"));
        assert_eq!(elements[0].inner_html, "text</span>");
    }
}
