//! ZIP archive extraction of CAP payloads.

use std::io::{Cursor, Read};

use tracing::{debug, warn};

use crate::error::ArchiveError;

/// Local file header magic of a ZIP archive.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// One XML/CAP member of an archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchivePayload {
    /// Member path inside the archive.
    pub name: String,
    /// Member content decoded as UTF-8.
    pub xml: String,
}

/// A member that was skipped and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedMember {
    /// Member path (or `#<index>` when the name itself was unreadable).
    pub name: String,
    /// Reason for skipping.
    pub reason: String,
}

/// Result of extracting an archive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveContents {
    /// Decoded XML/CAP members in archive order.
    pub payloads: Vec<ArchivePayload>,
    /// Members that matched the extension filter but could not be decoded.
    pub skipped: Vec<SkippedMember>,
}

/// `true` when `bytes` starts with the ZIP local file header magic.
#[must_use]
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// `.xml` or `.cap`, case-insensitive.
fn is_cap_member(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xml") || lower.ends_with(".cap")
}

/// What: Extract every `.xml`/`.cap` member of a ZIP archive as text.
///
/// Inputs:
/// - `bytes`: Raw archive bytes.
///
/// Output:
/// - `Ok(ArchiveContents)` with decoded members and skipped members.
///
/// # Errors
/// - Returns `ArchiveError` when the archive directory cannot be read.
///
/// Details:
/// - Members with other extensions and directories are ignored silently.
/// - Members that fail to read or are not valid UTF-8 are skipped and reported
///   in `skipped`, never failing the whole extraction.
pub fn extract(bytes: &[u8]) -> Result<ArchiveContents, ArchiveError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| ArchiveError(e.to_string()))?;
    let mut out = ArchiveContents::default();
    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(f) => f,
            Err(e) => {
                warn!(index, error = %e, "unreadable archive member");
                out.skipped.push(SkippedMember {
                    name: format!("#{index}"),
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let name = file.name().to_string();
        if file.is_dir() || !is_cap_member(&name) {
            debug!(name = %name, "ignoring archive member");
            continue;
        }
        let mut raw = Vec::new();
        if let Err(e) = file.read_to_end(&mut raw) {
            warn!(name = %name, error = %e, "failed to read archive member");
            out.skipped.push(SkippedMember {
                name,
                reason: e.to_string(),
            });
            continue;
        }
        match String::from_utf8(raw) {
            Ok(xml) => out.payloads.push(ArchivePayload { name, xml }),
            Err(e) => {
                warn!(name = %name, error = %e, "archive member is not UTF-8");
                out.skipped.push(SkippedMember {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }
    debug!(
        payloads = out.payloads.len(),
        skipped = out.skipped.len(),
        "extracted archive"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// What: Build an in-memory ZIP from `(name, bytes)` pairs.
    fn build_zip(members: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start member");
            writer.write_all(data).expect("write member");
        }
        writer.finish().expect("finish archive").into_inner()
    }

    #[test]
    /// What: Only `.xml`/`.cap` members are yielded; undecodable members are skipped.
    ///
    /// Inputs:
    /// - Archive with an XML, an upper-case CAP, a text file and an invalid UTF-8 XML.
    ///
    /// Output:
    /// - Two payloads in order, one skipped member, the text file ignored.
    fn extracts_cap_members_and_skips_bad_ones() {
        let bytes = build_zip(&[
            ("a.xml", b"<alert/>"),
            ("B.CAP", b"<alert/>"),
            ("readme.txt", b"hi"),
            ("broken.xml", &[0xff, 0xfe, 0x00]),
        ]);
        assert!(is_zip(&bytes));
        let contents = extract(&bytes).expect("archive opens");
        let names: Vec<&str> = contents.payloads.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a.xml", "B.CAP"]);
        assert_eq!(contents.skipped.len(), 1);
        assert_eq!(contents.skipped[0].name, "broken.xml");
    }

    #[test]
    fn corrupt_archive_fails() {
        let err = extract(b"PK\x03\x04garbage").expect_err("not a real archive");
        assert!(err.to_string().starts_with("corrupt archive"));
        assert!(!is_zip(b"<feed/>"));
    }
}
