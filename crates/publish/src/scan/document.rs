use super::patterns::{FRONTMATTER_IMAGE, HTML_SRC, MARKDOWN_IMAGE, RELATIVE_IMAGE};
use quire_storage::{to_slash_string, validate_path};
use regex::Regex;

const FENCE: &str = "---";

/// A document split into its frontmatter block and body.
///
/// Frontmatter only exists when the very first line is `---` and a later
/// line is `---` too; otherwise the whole text is body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Document<'a> {
    /// Text between the fences, without them.
    pub frontmatter: Option<&'a str>,
    pub body: &'a str,
}

impl<'a> Document<'a> {
    pub fn parse(text: &'a str) -> Self {
        let no_frontmatter = Self { frontmatter: None, body: text };
        let mut lines = text.split_inclusive('\n');
        let Some(first) = lines.next() else { return no_frontmatter };
        if trim_eol(first) != FENCE {
            return no_frontmatter;
        }
        let start = first.len();
        let mut offset = start;
        for line in lines {
            if trim_eol(line) == FENCE {
                return Self {
                    frontmatter: Some(&text[start..offset]),
                    body: &text[offset + line.len()..],
                };
            }
            offset += line.len();
        }
        no_frontmatter
    }
}

fn trim_eol(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Media paths referenced by one document, in pattern order then text order.
///
/// Duplicates are kept; deduplication happens across the whole corpus.
///
/// ```
/// use quire_publish::scan::extract_references;
///
/// let text = "---\nimage: /media/cover.jpg\n---\n![x](../media/trip/beach.jpg)\n";
/// assert_eq!(extract_references(text, "media"), ["trip/beach.jpg", "cover.jpg"]);
/// ```
pub fn extract_references(text: &str, marker: &str) -> Vec<String> {
    let marker = marker.trim_matches('/');
    let document = Document::parse(text);
    let mut found = Vec::new();
    collect(&MARKDOWN_IMAGE, text, marker, &mut found);
    collect(&RELATIVE_IMAGE, text, marker, &mut found);
    if let Some(frontmatter) = document.frontmatter {
        collect(&FRONTMATTER_IMAGE, frontmatter, marker, &mut found);
    }
    collect(&HTML_SRC, text, marker, &mut found);
    found
}

fn collect(regex: &Regex, text: &str, marker: &str, found: &mut Vec<String>) {
    for captures in regex.captures_iter(text) {
        if &captures[1] != marker {
            continue;
        }
        if let Some(path) = clean(&captures[2]) {
            found.push(path);
        }
    }
}

/// Strip the query and fragment from a captured path.
///
/// `None` unless what is left is already in canonical form: the rewriter
/// matches references exactly as the cache keys spell them.
fn clean(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = raw.split(['?', '#']).next().unwrap_or_default();
    if raw.is_empty() {
        return None;
    }
    let path = match validate_path(raw) {
        Ok(path) => to_slash_string(&path),
        Err(e) => {
            let reason: &quire_storage::error::ErrorKind = &e;
            tracing::debug!(path = raw, %reason, "Ignoring media reference outside the media library");
            return None;
        },
    };
    if path != raw {
        tracing::debug!(path = raw, canonical = %path, "Ignoring media reference not in canonical form");
        return None;
    }
    Some(path)
}
