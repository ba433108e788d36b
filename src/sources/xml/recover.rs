//! Bounded sanitization for malformed feed documents.

/// What: Remove non-printable control characters.
///
/// Inputs:
/// - `text`: Raw document text.
///
/// Output:
/// - Text without C0/C1 control characters; newline, carriage return and tab are kept.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// What: Drop a trailing tag fragment that was cut off mid-way (`...</entry><ent`).
fn strip_unterminated_tail(text: &mut String) {
    let trimmed_len = text.trim_end().len();
    text.truncate(trimmed_len);
    if let Some(lt) = text.rfind('<') {
        let closed = text[lt..].contains('>');
        if !closed {
            text.truncate(lt);
        }
    }
}

/// What: Locate the opening tag of the root `feed` element.
///
/// Output:
/// - `(qualified_name, index_after_open_tag)` when a `feed` open tag exists.
fn find_feed_open(text: &str) -> Option<(String, usize)> {
    let mut search = 0;
    while let Some(rel) = text[search..].find('<') {
        let start = search + rel + 1;
        let name_end = text[start..]
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .map(|n| start + n)?;
        let name = &text[start..name_end];
        let local = name.rsplit_once(':').map_or(name, |(_, l)| l);
        if local == "feed" {
            let close = text[name_end..].find('>').map(|n| name_end + n + 1)?;
            return Some((name.to_string(), close));
        }
        search = start;
    }
    None
}

/// What: Close a root `feed` element that lost its closing tag.
///
/// Inputs:
/// - `text`: Document with trailing fragments already stripped.
///
/// Details:
/// - Truncates after the last complete `</entry>` (any prefix) or, when no
///   entry completed, right after the `feed` open tag, then appends the
///   missing `</feed>` using the prefix of the open tag.
fn close_truncated_feed(text: &mut String) {
    let Some((feed_name, after_open)) = find_feed_open(text) else {
        return;
    };
    let closing = format!("</{feed_name}>");
    if text.contains(&closing) {
        return;
    }
    let entry_close = text[after_open..]
        .match_indices("</")
        .filter_map(|(i, _)| {
            let start = after_open + i + 2;
            let end = text[start..].find('>').map(|n| start + n)?;
            let name = text[start..end].trim_end();
            let local = name.rsplit_once(':').map_or(name, |(_, l)| l);
            (local == "entry").then_some(end + 1)
        })
        .last();
    text.truncate(entry_close.unwrap_or(after_open));
    text.push_str(&closing);
}

/// What: Apply the full sanitization pass used for the second parse attempt.
///
/// Inputs:
/// - `xml`: Document that failed to parse.
///
/// Output:
/// - Sanitized document text.
///
/// Details:
/// - Strips control characters, drops a trailing unterminated tag fragment
///   and closes a truncated root `feed`.
#[must_use]
pub fn sanitize(xml: &str) -> String {
    let mut text = strip_control_chars(xml);
    strip_unterminated_tail(&mut text);
    close_truncated_feed(&mut text);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_controls_but_keeps_whitespace() {
        let out = sanitize("<a>\u{1}x\ty\r\n\u{7}</a>");
        assert_eq!(out, "<a>x\ty\r\n</a>");
    }

    #[test]
    /// What: A feed truncated mid-entry is cut back to the last complete entry and closed.
    ///
    /// Inputs:
    /// - Feed with one complete entry followed by a half-written entry.
    ///
    /// Output:
    /// - Second entry removed, `</feed>` appended.
    fn closes_truncated_feed_after_last_entry() {
        let xml = "<feed xmlns=\"http://www.w3.org/2005/Atom\"><title>t</title><entry><id>1</id></entry><entry><id>2</i";
        let out = sanitize(xml);
        assert_eq!(
            out,
            "<feed xmlns=\"http://www.w3.org/2005/Atom\"><title>t</title><entry><id>1</id></entry></feed>"
        );
    }

    #[test]
    fn closes_prefixed_feed_without_entries() {
        let out = sanitize("<atom:feed><atom:title>x");
        assert_eq!(out, "<atom:feed></atom:feed>");
    }

    #[test]
    fn leaves_complete_documents_alone() {
        let xml = "<feed><entry><id>1</id></entry></feed>";
        assert_eq!(sanitize(xml), xml);
    }
}
