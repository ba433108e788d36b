//! CAP/Atom document parsing with one sanitized retry.

mod recover;
mod tree;

pub use recover::sanitize;
pub use tree::{XmlNode, parse_tree};

use crate::error::ParseError;
use tracing::{debug, warn};

/// Content of one Atom `entry`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryBody {
    /// The entry embeds a CAP `alert` element.
    Inline(XmlNode),
    /// The entry only links to a CAP document; the caller must fetch it.
    Link(String),
    /// Neither an embedded alert nor a usable link.
    Empty,
}

/// One Atom `entry` with the context normalization can fall back on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedEntry {
    /// Atom `id`.
    pub id: Option<String>,
    /// Atom `title`.
    pub title: Option<String>,
    /// Atom `updated`, else `published`.
    pub updated: Option<String>,
    /// Embedded alert, link marker or nothing.
    pub body: EntryBody,
}

/// Shape of a parsed document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedDocument {
    /// A single CAP alert.
    Alert(XmlNode),
    /// An Atom feed; entries in document order.
    Feed(Vec<FeedEntry>),
    /// A well-formed document that carries no alert; holds the root element name.
    Other(String),
}

/// A parsed document and whether the sanitized retry was needed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parsed {
    /// Classified document.
    pub document: ParsedDocument,
    /// `true` when the raw text failed and the sanitized text parsed.
    pub sanitized: bool,
}

impl XmlNode {
    /// Consuming variant of [`XmlNode::find`].
    fn into_find(self, name: &str) -> Option<Self> {
        if self.is(name) {
            return Some(self);
        }
        self.children.into_iter().find_map(|c| c.into_find(name))
    }
}

/// What: Pick the link of an entry that most likely points at a CAP document.
///
/// Details:
/// - Prefers links whose `type` mentions `cap` or `xml`, or whose `href` ends in
///   `.xml`/`.cap`; otherwise the first `alternate` or rel-less link.
fn pick_link(entry: &XmlNode) -> Option<String> {
    let links: Vec<&XmlNode> = entry.children_named("link").collect();
    let href = |l: &&XmlNode| {
        l.attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(ToString::to_string)
            .or_else(|| (!l.text.is_empty()).then(|| l.text.clone()))
    };
    let cap_like = links.iter().find(|l| {
        let ty = l.attr("type").unwrap_or_default().to_ascii_lowercase();
        let target = href(l).unwrap_or_default().to_ascii_lowercase();
        ty.contains("cap") || ty.contains("xml") || target.ends_with(".xml") || target.ends_with(".cap")
    });
    cap_like
        .or_else(|| {
            links
                .iter()
                .find(|l| l.attr("rel").is_none_or(|r| r.eq_ignore_ascii_case("alternate")))
        })
        .and_then(href)
}

/// What: Turn an Atom `entry` element into a [`FeedEntry`].
fn read_entry(entry: XmlNode) -> FeedEntry {
    let id = entry.field("id").map(ToString::to_string);
    let title = entry.field("title").map(ToString::to_string);
    let updated = entry
        .field("updated")
        .or_else(|| entry.field("published"))
        .map(ToString::to_string);
    let link = pick_link(&entry);
    let body = match entry.into_find("alert") {
        Some(alert) => EntryBody::Inline(alert),
        None => link.map_or(EntryBody::Empty, EntryBody::Link),
    };
    FeedEntry {
        id,
        title,
        updated,
        body,
    }
}

/// What: Classify a root element into a [`ParsedDocument`].
fn classify(root: XmlNode) -> ParsedDocument {
    if root.is("feed") {
        let entries = root
            .children
            .into_iter()
            .filter(|c| c.is("entry"))
            .map(read_entry)
            .collect();
        return ParsedDocument::Feed(entries);
    }
    let name = root.name.clone();
    root.into_find("alert")
        .map_or(ParsedDocument::Other(name), ParsedDocument::Alert)
}

/// What: Parse a CAP or Atom document, retrying once on sanitized text.
///
/// Inputs:
/// - `xml`: Document text.
///
/// Output:
/// - `Ok(Parsed)` with the classified document; `Err(ParseError)` when both attempts fail.
///
/// # Errors
/// - Returns `ParseError` carrying both failure messages when the raw and the
///   sanitized text are not well-formed.
///
/// Details:
/// - Exactly two attempts; no link following happens here, link-only entries
///   surface as [`EntryBody::Link`].
pub fn parse(xml: &str) -> Result<Parsed, ParseError> {
    match parse_tree(xml) {
        Ok(root) => Ok(Parsed {
            document: classify(root),
            sanitized: false,
        }),
        Err(message) => {
            debug!(error = %message, "raw parse failed, sanitizing");
            let cleaned = sanitize(xml);
            match parse_tree(&cleaned) {
                Ok(root) => {
                    warn!(error = %message, "document parsed only after sanitizing");
                    Ok(Parsed {
                        document: classify(root),
                        sanitized: true,
                    })
                }
                Err(sanitized_message) => Err(ParseError {
                    message,
                    sanitized_message,
                }),
            }
        }
    }
}
