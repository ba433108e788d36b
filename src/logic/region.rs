//! Region matching by cell id, derived parent id and area-name tokens.

use crate::config::Settings;
use crate::error::ConfigurationError;
use crate::state::{FilterSummary, MatchTier, Warning};

/// Length of a warn cell id.
const CELL_ID_LEN: usize = 9;

/// Validated region filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionFilter {
    /// Exact cell id.
    pub region_id: Option<String>,
    /// Derived district id; `None` when parent matching is off or no parent exists.
    pub parent_id: Option<String>,
    /// Area-name fallback enabled.
    pub name_fallback: bool,
    /// Lowercase area-name tokens.
    pub area_names: Vec<String>,
}

/// What: Derive the district cell id of a municipality cell id.
///
/// Inputs:
/// - `id`: 9-digit cell id.
///
/// Output:
/// - `Some("1AAAAA000")` for `"8AAAAABBB"`; `None` for ids not starting with `8`.
///
/// Details:
/// - Leading `8` becomes `1`, the trailing three digits become `000`.
#[must_use]
pub fn derive_parent(id: &str) -> Option<String> {
    if id.len() != CELL_ID_LEN || !id.starts_with('8') || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("1{}000", &id[1..6]))
}

impl RegionFilter {
    /// What: Build and validate a filter.
    ///
    /// Inputs:
    /// - `region_id`: Cell id; blank means "none".
    /// - `match_parent`: Derive and match the district id.
    /// - `name_fallback`: Enable area-name matching.
    /// - `area_names`: Name tokens; trimmed, lowercased, blanks dropped.
    ///
    /// Output:
    /// - Validated filter.
    ///
    /// # Errors
    /// - `InvalidRegionId` when a non-blank id is not exactly 9 ASCII digits.
    /// - `EmptyFilter` when there is neither an id nor any usable name token.
    pub fn new(
        region_id: Option<&str>,
        match_parent: bool,
        name_fallback: bool,
        area_names: &[String],
    ) -> Result<Self, ConfigurationError> {
        let region_id = region_id.map(str::trim).filter(|s| !s.is_empty());
        if let Some(id) = region_id
            && (id.len() != CELL_ID_LEN || !id.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(ConfigurationError::InvalidRegionId(id.to_string()));
        }
        let mut names: Vec<String> = Vec::new();
        for n in area_names {
            let n = n.trim().to_lowercase();
            if !n.is_empty() && !names.contains(&n) {
                names.push(n);
            }
        }
        if region_id.is_none() && (!name_fallback || names.is_empty()) {
            return Err(ConfigurationError::EmptyFilter);
        }
        Ok(Self {
            region_id: region_id.map(ToString::to_string),
            parent_id: if match_parent {
                region_id.and_then(derive_parent)
            } else {
                None
            },
            name_fallback,
            area_names: names,
        })
    }

    /// What: Build the filter from instance settings.
    ///
    /// # Errors
    /// - Same as [`RegionFilter::new`].
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigurationError> {
        Self::new(
            settings.region_id.as_deref(),
            settings.match_parent,
            settings.name_fallback,
            &settings.area_names,
        )
    }

    /// What: Echo the filter into result metadata.
    #[must_use]
    pub fn summary(&self, only_active_future: bool, allow_stale: bool) -> FilterSummary {
        FilterSummary {
            region_id: self.region_id.clone(),
            parent_id: self.parent_id.clone(),
            name_fallback: self.name_fallback,
            area_names: self.area_names.clone(),
            only_active_future,
            allow_stale,
        }
    }
}

/// What: Classify a warning against the filter.
///
/// Inputs:
/// - `warning`: Normalized warning.
/// - `filter`: Region filter.
///
/// Output:
/// - Most specific tier hit by any area of any info block, or `None`.
///
/// Details:
/// - Exact beats parent beats name. Name tokens match as case-insensitive
///   substrings of `areaDesc`, only with name fallback enabled.
#[must_use]
pub fn classify(warning: &Warning, filter: &RegionFilter) -> Option<MatchTier> {
    let mut best: Option<MatchTier> = None;
    for area in warning.areas() {
        if let Some(id) = &filter.region_id
            && area.cell_ids.iter().any(|c| c == id)
        {
            return Some(MatchTier::Exact);
        }
        if let Some(parent) = &filter.parent_id
            && area.cell_ids.iter().any(|c| c == parent)
        {
            best = Some(MatchTier::Parent);
            continue;
        }
        if filter.name_fallback && best.is_none() {
            let desc = area.area_desc.to_lowercase();
            if filter.area_names.iter().any(|t| desc.contains(t.as_str())) {
                best = Some(MatchTier::Name);
            }
        }
    }
    best
}

/// `true` when any tier matches.
#[must_use]
pub fn matches(warning: &Warning, filter: &RegionFilter) -> bool {
    classify(warning, filter).is_some()
}
