//! Pure filtering rules applied to normalized warnings.

pub mod dedup;
pub mod region;
pub mod temporal;

pub use dedup::dedupe;
pub use region::{RegionFilter, classify, derive_parent, matches};
pub use temporal::{is_active_or_future, warning_is_current};

#[cfg(test)]
mod tests;
