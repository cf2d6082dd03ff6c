use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Special filter key carrying the category facet (crime types).
pub const CATEGORY_FACET: &str = "crime_types";

/// Filterable dimensions of one source. Replaced wholesale on every
/// source switch, never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub available_states: IndexSet<String>,
    #[serde(default)]
    pub available_years: IndexSet<i32>,
    #[serde(default)]
    pub special_filters: IndexMap<String, IndexSet<String>>,
}

impl Metadata {
    /// Category values, when this source defines the facet.
    pub fn categories(&self) -> Option<&IndexSet<String>> {
        self.special_filters.get(CATEGORY_FACET)
    }

    pub fn has_categories(&self) -> bool {
        self.categories().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.available_states.is_empty()
            && self.available_years.is_empty()
            && self.special_filters.values().all(IndexSet::is_empty)
    }
}
