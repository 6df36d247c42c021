//! Lightweight HTML helpers for the handful of pages the pipeline scrapes
//! (NVD detail, OSV, Debian tracker, Sourceware gitweb). They only need
//! anchors, text and a few class-addressed containers, so matching is
//! regex driven with tag-depth counting for nested containers.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<!--.*?-->").unwrap()
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)\b[^>]*>").unwrap());
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").unwrap());

static HREF_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap());
static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap());

const LINE_BREAK_TAGS: &[&str] = &["br", "div", "p", "tr", "li", "pre", "h1", "h2", "h3", "h4", "table"];

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Decode named and numeric character references.
pub fn unescape_entities(s: &str) -> String {
    ENTITY
        .replace_all(s, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded.map(String::from).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Visible text of an HTML fragment. Block-level boundaries become a single
/// newline so line-oriented content (diffs) keeps its shape.
pub fn text_content(html: &str) -> String {
    let cleaned = SCRIPT_STYLE.replace_all(html, "");
    let mut out = String::with_capacity(cleaned.len());
    let mut last = 0;

    for caps in TAG.captures_iter(&cleaned) {
        let Some(m) = caps.get(0) else { continue };
        out.push_str(&cleaned[last..m.start()]);
        last = m.end();

        let name = caps[2].to_ascii_lowercase();
        let closing = !caps[1].is_empty();
        let breaks = name == "br" || (closing && LINE_BREAK_TAGS.contains(&name.as_str()));
        if breaks && !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(&cleaned[last..]);

    unescape_entities(&out)
}

fn attribute(pattern: &Regex, attrs: &str) -> Option<String> {
    let caps = pattern.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| unescape_entities(m.as_str()))
}

/// Every `<a href>` in document order. Anchors without an href are skipped.
pub fn anchors(html: &str) -> Vec<Anchor> {
    ANCHOR
        .captures_iter(html)
        .filter_map(|caps| {
            let href = attribute(&HREF_ATTR, &caps[1])?;
            Some(Anchor {
                href,
                text: text_content(&caps[2]).trim().to_string(),
            })
        })
        .collect()
}

/// Inner HTML of every top-level `<tag>` element, optionally restricted to
/// elements whose class list contains `class`. Nested elements of the same
/// tag are balanced, not matched separately.
pub fn elements<'a>(html: &'a str, tag: &str, class: Option<&str>) -> Vec<&'a str> {
    let Ok(tag_re) = Regex::new(&format!(r"(?is)<(/?){}\b([^>]*)>", regex::escape(tag))) else {
        return Vec::new();
    };

    let mut found = Vec::new();
    let mut depth = 0usize;
    let mut inner_start = None;

    for caps in tag_re.captures_iter(html) {
        let Some(m) = caps.get(0) else { continue };
        let closing = !caps[1].is_empty();

        if !closing {
            if depth == 0 {
                let matches_class = match class {
                    Some(wanted) => attribute(&CLASS_ATTR, &caps[2])
                        .map(|c| c.split_whitespace().any(|token| token == wanted))
                        .unwrap_or(false),
                    None => true,
                };
                if !matches_class {
                    continue;
                }
                inner_start = Some(m.end());
            }
            depth += 1;
        } else if depth > 0 {
            depth -= 1;
            if depth == 0 {
                if let Some(start) = inner_start.take() {
                    found.push(&html[start..m.start()]);
                }
            }
        }
    }

    found
}

/// First element matching `tag` and `class`.
pub fn find_element<'a>(html: &'a str, tag: &str, class: &str) -> Option<&'a str> {
    elements(html, tag, Some(class)).into_iter().next()
}
