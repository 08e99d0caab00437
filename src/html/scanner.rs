//! Embedded `data:` URL discovery.
//!
//! Grounded on `HTMLDataURLParser`/`gather_embedded_files`/
//! `_find_tag_attribute_spans` in the reference HTML scanner. The
//! original walks an incremental tokenizer and dispatches on two
//! distinct sources per start tag: attribute values themselves
//! (`handle_starttag`), and free text/CSS content between tags
//! (`handle_data`). This scanner keeps that two-source split but makes a
//! single forward pass over the byte-decoded document instead of driving
//! a stateful parser, since `Match::start()`/`end()` already land on
//! byte offsets into the UTF-8 buffer being scanned.

use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedFileCandidate {
    /// Byte offsets of the literal `data:` URL text within the document.
    pub span: (u64, u64),
    /// A sibling URL the data URL was inlined from — either a
    /// `data-savepage-<attribute>` attribute (tag-sourced candidates) or
    /// a `/*savepage-url=...*/` comment preceding `url(...)` (CSS-sourced
    /// candidates) — used to name the virtual file after the original
    /// resource instead of a content hash.
    pub original_url: Option<String>,
}

/// `[A-Za-z][A-Za-z0-9.-]*`, the legacy SGML name-token grammar HTML tag
/// and attribute names follow.
fn start_tag_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^<[A-Za-z][A-Za-z0-9.-]*").unwrap())
}

/// One attribute: a name token, optionally followed by `=` and a value
/// that is single-quoted, double-quoted, or a bare name-token with no
/// delimiters at all (e.g. `<img src=data.png>`).
fn attribute_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r#"^\s+([A-Za-z][A-Za-z0-9.-]*)(?:\s*=\s*('[^']*'|"[^"]*"|[A-Za-z0-9.-]*))?"#)
            .unwrap()
    })
}

fn double_quoted_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r#""(data:[^"]+)""#).unwrap())
}

fn single_quoted_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"'(data:[^']+)'").unwrap())
}

/// Mirrors `DATA_URL_IN_CSS`: an optional `/*savepage-url=...*/` comment
/// immediately before `url(data:...)`, with no tolerance for whitespace
/// or quotes between `url(` and the `data:` prefix (a quoted data URL
/// inside `url(...)` is left for the quote regexes above to find).
fn css_url_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"(?:/\*savepage-url=([^*]*)\*/)?url\((data:[^)]+)\)").unwrap()
    })
}

/// Scan `text` for embedded `data:` URLs in start-tag attribute values
/// and in CSS/script text content.
pub fn gather_embedded_files(text: &str) -> Vec<EmbeddedFileCandidate> {
    let mut candidates = Vec::new();
    let mut pos = 0usize;
    let mut text_run_start = 0usize;

    while pos < text.len() {
        let Some(rel) = text[pos..].find('<') else {
            break;
        };
        let lt = pos + rel;
        scan_text_region(text, text_run_start, lt, &mut candidates);

        if text[lt..].starts_with("<!--") {
            let close = text[lt + 4..].find("-->").map(|p| lt + 4 + p + 3);
            pos = close.unwrap_or(text.len());
        } else if text[lt..].starts_with("<!") || text[lt..].starts_with("</") {
            let close = text[lt..].find('>').map(|p| lt + p + 1);
            pos = close.unwrap_or(text.len());
        } else if let Some(m) = start_tag_regex().find(&text[lt..]) {
            let name_end = lt + m.end();
            let (attrs, attrs_end) = parse_tag_attributes(text, name_end);
            emit_attribute_candidates(text, &attrs, &mut candidates);
            let tag_end = text[attrs_end..].find('>').map(|p| attrs_end + p + 1);
            pos = tag_end.unwrap_or(text.len());
        } else {
            // Not a recognized tag start (stray '<') — treat as a single
            // text character and keep scanning.
            pos = lt + 1;
        }
        text_run_start = pos;
    }
    scan_text_region(text, text_run_start, text.len(), &mut candidates);
    candidates
}

/// Walk attribute matches forward from `start` (just past the tag name),
/// returning `(name, value_start, value_end)` triples with surrounding
/// quotes already stripped, plus the position scanning stopped at.
fn parse_tag_attributes(text: &str, start: usize) -> (Vec<(String, usize, usize)>, usize) {
    let mut attrs = Vec::new();
    let mut pos = start;
    while let Some(caps) = attribute_regex().captures(&text[pos..]) {
        let whole = caps.get(0).unwrap();
        let name = caps.get(1).unwrap().as_str().to_string();
        let value_span = caps.get(2).map(|m| (pos + m.start(), pos + m.end()));
        pos += whole.end();

        match value_span {
            Some((vs, ve)) if ve > vs && is_quote(text.as_bytes()[vs]) => {
                attrs.push((name, vs + 1, ve - 1));
            }
            Some((vs, ve)) => attrs.push((name, vs, ve)),
            None => attrs.push((name, pos, pos)),
        }
    }
    (attrs, pos)
}

fn is_quote(b: u8) -> bool {
    b == b'\'' || b == b'"'
}

/// Mirrors `handle_starttag`: any attribute whose value starts with
/// `data:` is a candidate, unless skipping it per the "nothing after the
/// comma" rule. `original_url` comes from a sibling
/// `data-savepage-<attribute>` attribute on the same tag, if present.
fn emit_attribute_candidates(
    text: &str,
    attrs: &[(String, usize, usize)],
    candidates: &mut Vec<EmbeddedFileCandidate>,
) {
    for (name, start, end) in attrs {
        let value = &text[*start..*end];
        if !value.starts_with("data:") {
            continue;
        }
        let Some(comma) = value.find(',') else {
            continue;
        };
        if comma + 1 >= value.len() {
            continue;
        }
        let savepage_attr = format!("data-savepage-{name}");
        let original_url = attrs
            .iter()
            .find(|(n, _, _)| *n == savepage_attr)
            .map(|(_, s, e)| text[*s..*e].to_string());
        candidates.push(EmbeddedFileCandidate {
            span: (*start as u64, *end as u64),
            original_url,
        });
    }
}

/// Mirrors `handle_data`: scan a run of non-tag text/CSS content for
/// `data:` URLs in `url(...)`, single-quoted, or double-quoted form.
fn scan_text_region(text: &str, start: usize, end: usize, candidates: &mut Vec<EmbeddedFileCandidate>) {
    if start >= end {
        return;
    }
    let region = &text[start..end];

    for caps in css_url_regex().captures_iter(region) {
        let data = caps.get(2).unwrap();
        let original_url = caps.get(1).map(|m| m.as_str().to_string());
        candidates.push(EmbeddedFileCandidate {
            span: ((start + data.start()) as u64, (start + data.end()) as u64),
            original_url,
        });
    }
    for re in [single_quoted_regex(), double_quoted_regex()] {
        for caps in re.captures_iter(region) {
            let m = caps.get(1).unwrap();
            candidates.push(EmbeddedFileCandidate {
                span: ((start + m.start()) as u64, (start + m.end()) as u64),
                original_url: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_single_attribute_data_url() {
        let html = r#"<html><body><img src="data:image/webp;base64,AAAA"></body></html>"#;
        let found = gather_embedded_files(html);
        assert_eq!(found.len(), 1);
        let (s, e) = found[0].span;
        assert_eq!(&html[s as usize..e as usize], "data:image/webp;base64,AAAA");
        assert!(found[0].original_url.is_none());
    }

    #[test]
    fn unquoted_attribute_values_do_not_break_tag_scanning() {
        // "checked" is a bare boolean attribute (no value at all), and
        // data-savepage-src is given as an unquoted bare name-token —
        // both must parse without disrupting the later quoted `src`.
        let html =
            r#"<input type=checkbox checked data-savepage-src=local.png src="data:text/plain,x">"#;
        let found = gather_embedded_files(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].original_url.as_deref(), Some("local.png"));
    }

    #[test]
    fn skips_attribute_value_with_nothing_after_comma() {
        let html = r#"<img src="data:text/plain,">"#;
        assert!(gather_embedded_files(html).is_empty());
    }

    #[test]
    fn finds_css_url_data() {
        let html = "<style>body { background: url(data:image/png;base64,AAAA); }</style>";
        let found = gather_embedded_files(html);
        assert_eq!(found.len(), 1);
        let (s, e) = found[0].span;
        assert_eq!(&html[s as usize..e as usize], "data:image/png;base64,AAAA");
    }

    #[test]
    fn css_savepage_annotation_recovers_original_url() {
        let html = "<style>body { background: /*savepage-url=https://example.com/bg.png*/url(data:image/png;base64,AAAA); }</style>";
        let found = gather_embedded_files(html);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].original_url.as_deref(),
            Some("https://example.com/bg.png")
        );
    }

    #[test]
    fn recovers_original_url_from_data_savepage_attribute() {
        let html = r#"<img data-savepage-src="https://example.com/a.png" src="data:image/png;base64,AAAA">"#;
        let found = gather_embedded_files(html);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].original_url.as_deref(), Some("https://example.com/a.png"));
    }

    #[test]
    fn data_savepage_lookup_is_attribute_specific() {
        // data-savepage-href exists, but the data: URL was found in
        // `src`, so the (differently-named) sibling must not be used.
        let html = r#"<img data-savepage-href="https://example.com/wrong.png" src="data:image/png;base64,AAAA">"#;
        let found = gather_embedded_files(html);
        assert_eq!(found.len(), 1);
        assert!(found[0].original_url.is_none());
    }

    #[test]
    fn tolerates_comments_and_doctype() {
        let html = "<!DOCTYPE html><!-- comment --><html><body><img src=\"data:image/png;base64,AA\"></body></html>";
        let found = gather_embedded_files(html);
        assert_eq!(found.len(), 1);
    }
}
