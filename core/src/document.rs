//! The two capabilities the resolver needs from whatever hosts the page:
//! lookup by id and a full textual snapshot.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// A live element handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: String,
    /// Lower-cased tag name, e.g. `select`.
    pub tag: String,
    /// The element's opening tag exactly as it appears in the source.
    pub opening_tag: String,
}

pub trait Document {
    fn element_by_id(&self, id: &str) -> Option<Element>;

    /// Full serialization of the current document. Called fresh for every
    /// oracle query because the page may have changed since the last one.
    fn serialize(&self) -> String;
}

fn compile_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid regex literal {pattern}: {err}"))
}

// Attributes before the id are consumed whole, quoted values included, so an
// `id=` inside another attribute's value is never taken for the id.
static ID_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    compile_regex(concat!(
        r#"<([A-Za-z][A-Za-z0-9-]*)"#,
        r#"(?:\s+[^\s"'=/>]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*?"#,
        r#"\s+(?i:id)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#,
        r#"(?:"[^"]*"|'[^']*'|[^"'>])*>"#,
    ))
});

/// Read-only document backed by an HTML string.
///
/// Only opening tags carrying an `id` attribute are indexed; nothing is
/// rendered. Attribute names match case-insensitively. Like
/// `getElementById`, the first element with a given id wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocument {
    html: String,
}

impl HtmlDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// All ids in document order, duplicates included.
    pub fn ids(&self) -> Vec<String> {
        self.elements().map(|element| element.id).collect()
    }

    fn elements(&self) -> impl Iterator<Item = Element> + '_ {
        ID_TAG_REGEX.captures_iter(&self.html).filter_map(|caps| {
            let id = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))?
                .as_str();
            Some(Element {
                id: id.to_string(),
                tag: caps.get(1)?.as_str().to_ascii_lowercase(),
                opening_tag: caps.get(0)?.as_str().to_string(),
            })
        })
    }
}

impl Document for HtmlDocument {
    fn element_by_id(&self, id: &str) -> Option<Element> {
        if id.is_empty() {
            return None;
        }
        self.elements().find(|element| element.id == id)
    }

    fn serialize(&self) -> String {
        self.html.clone()
    }
}
