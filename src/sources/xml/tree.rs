//! Strongly-typed XML element tree and prioritized field lookup.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// One XML element: qualified name, attributes, child elements and direct text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct XmlNode {
    /// Qualified name as written (`cap:event`, `entry`).
    pub name: String,
    /// Attributes in document order, qualified keys.
    pub attrs: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<Self>,
    /// Direct text and CDATA content, trimmed.
    pub text: String,
}

/// Strip any namespace prefix from a qualified name.
fn local(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, l)| l)
}

impl XmlNode {
    /// Element name without prefix.
    #[must_use]
    pub fn local_name(&self) -> &str {
        local(&self.name)
    }

    /// `true` when the local name equals `name` (ASCII case-insensitive).
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.local_name().eq_ignore_ascii_case(name)
    }

    /// Child elements whose local name is `name`; always a sequence, even for singletons.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |c| c.is(name))
    }

    /// First child element with local name `name`.
    #[must_use]
    pub fn child<'a>(&'a self, name: &'a str) -> Option<&'a Self> {
        self.children_named(name).next()
    }

    /// Attribute value by exact key, then by local key.
    #[must_use]
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| self.attrs.iter().find(|(k, _)| local(k) == key))
            .map(|(_, v)| v.as_str())
    }

    /// What: Return the first present, non-empty child text among ordered candidate names.
    ///
    /// Inputs:
    /// - `candidates`: Qualified names in priority order (e.g. `["event", "cap:event"]`).
    ///
    /// Output:
    /// - Text of the first candidate child that exists and is non-empty.
    ///
    /// Details:
    /// - Candidates are matched against the name exactly as written, so the
    ///   caller controls whether prefixed or unprefixed spellings win.
    #[must_use]
    pub fn lookup(&self, candidates: &[&str]) -> Option<&str> {
        candidates.iter().find_map(|cand| {
            self.children
                .iter()
                .find(|c| c.name == *cand && !c.text.is_empty())
                .map(|c| c.text.as_str())
        })
    }

    /// What: Read a CAP field tolerating namespace-prefixed spellings.
    ///
    /// Inputs:
    /// - `name`: Unprefixed field name (`event`, `valueName`).
    ///
    /// Output:
    /// - Unprefixed child text if present, else `cap:` prefixed, else any other
    ///   prefix, else an attribute of that name; `None` when all are absent or empty.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        let prefixed = format!("cap:{name}");
        self.lookup(&[name, prefixed.as_str()])
            .or_else(|| {
                self.children
                    .iter()
                    .find(|c| c.local_name() == name && !c.text.is_empty())
                    .map(|c| c.text.as_str())
            })
            .or_else(|| self.attr(name).filter(|v| !v.is_empty()))
    }

    /// [`field`](Self::field) with an empty-string default.
    #[must_use]
    pub fn field_or_empty(&self, name: &str) -> String {
        self.field(name).unwrap_or_default().to_string()
    }

    /// Depth-first search for the first element (self included) with local name `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Self> {
        if self.is(name) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }
}

/// Build a node from a start or empty tag.
fn open_node(e: &BytesStart<'_>) -> XmlNode {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let attrs = e
        .attributes()
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).into_owned();
            let value = a.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&a.value).into_owned(),
                std::borrow::Cow::into_owned,
            );
            (key, value)
        })
        .collect();
    XmlNode {
        name,
        attrs,
        children: Vec::new(),
        text: String::new(),
    }
}

/// Append a text fragment to the innermost open element.
fn push_text(stack: &mut [XmlNode], fragment: &str) {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return;
    }
    if let Some(top) = stack.last_mut() {
        if !top.text.is_empty() {
            top.text.push(' ');
        }
        top.text.push_str(fragment);
    }
}

/// Close the innermost element and attach it to its parent (or return it as root).
fn close_node(stack: &mut Vec<XmlNode>) -> Option<XmlNode> {
    let node = stack.pop()?;
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        None
    } else {
        Some(node)
    }
}

/// What: Parse a complete XML document into its root element.
///
/// Inputs:
/// - `xml`: Document text.
///
/// Output:
/// - `Ok(XmlNode)` root element, or `Err(message)` describing the first problem.
///
/// Details:
/// - Mismatched end tags, elements left open at end of input and documents
///   without a root element are errors.
/// - Unknown entities do not fail the parse; the raw text is kept instead.
/// - Content after the root element is ignored.
pub fn parse_tree(xml: &str) -> Result<XmlNode, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    loop {
        let pos = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(open_node(&e)),
            Ok(Event::Empty(e)) => {
                stack.push(open_node(&e));
                if let Some(root) = close_node(&mut stack) {
                    return Ok(root);
                }
            }
            Ok(Event::End(_)) => {
                if stack.is_empty() {
                    return Err(format!("unexpected closing tag at byte {pos}"));
                }
                if let Some(root) = close_node(&mut stack) {
                    return Ok(root);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_or_else(
                    |_| String::from_utf8_lossy(&e).into_owned(),
                    std::borrow::Cow::into_owned,
                );
                push_text(&mut stack, &text);
            }
            Ok(Event::CData(e)) => push_text(&mut stack, &String::from_utf8_lossy(&e)),
            Ok(Event::Eof) => {
                return Err(stack.last().map_or_else(
                    || "document has no root element".to_string(),
                    |open| format!("unexpected end of document inside <{}>", open.name),
                ));
            }
            Ok(_) => {}
            Err(e) => return Err(format!("{e} at byte {pos}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Build a tree with prefixed, unprefixed and attribute-carried fields.
    ///
    /// Inputs:
    /// - Small CAP fragment mixing `cap:` and plain element names.
    ///
    /// Output:
    /// - Structure and text preserved; `field` prefers the unprefixed spelling.
    fn parse_tree_keeps_structure_and_prefers_unprefixed() {
        let xml = r#"<?xml version="1.0"?>
            <cap:alert xmlns:cap="urn:oasis:names:tc:emergency:cap:1.2">
              <cap:identifier>id-1</cap:identifier>
              <cap:info>
                <cap:event>FROST</cap:event>
                <event>STURMBOEN</event>
                <cap:area><cap:areaDesc>Kreis &amp; Stadt</cap:areaDesc></cap:area>
                <cap:area/>
              </cap:info>
              <link href="http://x/a.xml" rel="alternate"/>
            </cap:alert>"#;
        let root = parse_tree(xml).expect("well-formed fragment parses");
        assert!(root.is("alert"));
        assert_eq!(root.field("identifier"), Some("id-1"));
        let info = root.child("info").expect("info child present");
        assert_eq!(info.field("event"), Some("STURMBOEN"));
        assert_eq!(info.children_named("area").count(), 2);
        let area = info.child("area").expect("area present");
        assert_eq!(area.field("areaDesc"), Some("Kreis & Stadt"));
        let link = root.child("link").expect("link present");
        assert_eq!(link.attr("href"), Some("http://x/a.xml"));
    }

    #[test]
    fn lookup_skips_empty_candidates() {
        let root = parse_tree("<a><event></event><cap:event>X</cap:event></a>")
            .expect("parses");
        assert_eq!(root.lookup(&["event", "cap:event"]), Some("X"));
        assert_eq!(root.lookup(&["headline"]), None);
    }

    #[test]
    fn truncated_and_mismatched_documents_fail() {
        assert!(parse_tree("<feed><entry>").is_err());
        assert!(parse_tree("<a><b></a>").is_err());
        assert!(parse_tree("   ").is_err());
    }

    #[test]
    fn find_searches_descendants() {
        let root = parse_tree("<entry><content><alert><sender>s</sender></alert></content></entry>")
            .expect("parses");
        let alert = root.find("alert").expect("alert found");
        assert_eq!(alert.field("sender"), Some("s"));
        assert!(root.find("info").is_none());
    }
}
