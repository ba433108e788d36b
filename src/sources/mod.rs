//! Network retrieval and decoding of warning feeds.
//!
//! Leaf-first: [`fetch`] retrieves bytes, [`archive`] unpacks ZIP payloads,
//! [`xml`] parses with a single sanitizing retry and [`cap`] maps alert trees
//! into [`crate::state::Warning`] records.

pub mod archive;
pub mod cap;
pub mod fetch;
pub mod xml;

pub use archive::{ArchiveContents, ArchivePayload, SkippedMember, extract, is_zip};
pub use cap::{EntryContext, normalize, normalize_entry, parse_cap_time, to_cap_xml};
pub use fetch::{
    Fetched, Fetcher, HttpFetcher, IndexPattern, IndexSource, MemoryFetcher,
    fetch_newest_indexed, fetch_with_fallback,
};
pub use xml::{EntryBody, FeedEntry, Parsed, ParsedDocument, XmlNode, parse};
