//! CAP alert normalization and serialization.

mod normalize;
mod time;
mod write;

pub use normalize::{EntryContext, normalize, normalize_entry};
pub use time::parse_cap_time;
pub use write::to_cap_xml;

#[cfg(test)]
mod tests;
