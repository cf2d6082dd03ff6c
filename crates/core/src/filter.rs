//! Filter selections over a source's facets.
//!
//! All transitions are pure and take the current [`Metadata`] so that
//! every selection stays a subset of what the source actually offers.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::metadata::Metadata;

/// A filterable dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    States,
    Years,
    Categories,
}

/// A single facet value addressed to its dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "dimension", content = "value", rename_all = "lowercase")]
pub enum Facet {
    State(String),
    Year(i32),
    Category(String),
}

impl Facet {
    pub fn dimension(&self) -> Dimension {
        match self {
            Facet::State(_) => Dimension::States,
            Facet::Year(_) => Dimension::Years,
            Facet::Category(_) => Dimension::Categories,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Narrow shows the default page; full asks for the larger row limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breadth {
    #[default]
    Narrow,
    Full,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub selected_states: IndexSet<String>,
    pub selected_years: IndexSet<i32>,
    pub selected_categories: IndexSet<String>,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub breadth: Breadth,
    pub year_separated: bool,
}

impl FilterState {
    /// Add the value if absent, remove it if present.
    ///
    /// Values the metadata does not offer are ignored, as are category
    /// values when the source has no category facet. Returns whether the
    /// selection changed.
    pub fn toggle(&mut self, metadata: &Metadata, facet: &Facet) -> bool {
        match facet {
            Facet::State(state) => {
                if !metadata.available_states.contains(state) {
                    return false;
                }
                toggle_in(&mut self.selected_states, state.clone())
            }
            Facet::Year(year) => {
                if !metadata.available_years.contains(year) {
                    return false;
                }
                toggle_in(&mut self.selected_years, *year)
            }
            Facet::Category(category) => match metadata.categories() {
                Some(available) if available.contains(category) => {
                    toggle_in(&mut self.selected_categories, category.clone())
                }
                _ => false,
            },
        }
    }

    /// Replace the dimension's selection with everything the metadata offers.
    pub fn select_all(&mut self, metadata: &Metadata, dimension: Dimension) {
        match dimension {
            Dimension::States => self.selected_states = metadata.available_states.clone(),
            Dimension::Years => self.selected_years = metadata.available_years.clone(),
            Dimension::Categories => {
                if let Some(available) = metadata.categories() {
                    self.selected_categories = available.clone();
                }
            }
        }
    }

    pub fn clear(&mut self, dimension: Dimension) {
        match dimension {
            Dimension::States => self.selected_states.clear(),
            Dimension::Years => self.selected_years.clear(),
            Dimension::Categories => self.selected_categories.clear(),
        }
    }

    /// Empty every selection and reset sorting. Breadth and the per-year
    /// toggle are display preferences and survive.
    pub fn clear_all(&mut self) {
        self.clear_selections();
        self.sort_by = None;
        self.sort_order = SortOrder::Asc;
    }

    pub fn clear_selections(&mut self) {
        self.selected_states.clear();
        self.selected_years.clear();
        self.selected_categories.clear();
    }

    pub fn has_selections(&self) -> bool {
        !self.selected_states.is_empty()
            || !self.selected_years.is_empty()
            || !self.selected_categories.is_empty()
    }

    pub fn is_selected(&self, facet: &Facet) -> bool {
        match facet {
            Facet::State(s) => self.selected_states.contains(s),
            Facet::Year(y) => self.selected_years.contains(y),
            Facet::Category(c) => self.selected_categories.contains(c),
        }
    }

    /// Sort key as sent on the wire; blank keys mean unsorted.
    pub fn sort_key(&self) -> Option<&str> {
        self.sort_by.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn toggle_in<T: std::hash::Hash + Eq>(set: &mut IndexSet<T>, value: T) -> bool {
    if !set.shift_remove(&value) {
        set.insert(value);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn crimes_metadata() -> Metadata {
        Metadata {
            available_states: ["Kerala", "Punjab", "Goa"].iter().map(|s| s.to_string()).collect(),
            available_years: [2019, 2020, 2021].into_iter().collect(),
            special_filters: IndexMap::from([(
                "crime_types".to_string(),
                ["Theft", "Fraud"].iter().map(|s| s.to_string()).collect(),
            )]),
        }
    }

    #[test]
    fn toggle_parity() {
        let meta = crimes_metadata();
        let facet = Facet::State("Kerala".into());
        for n in 1..=6 {
            let mut filters = FilterState::default();
            for _ in 0..n {
                filters.toggle(&meta, &facet);
            }
            assert_eq!(filters.is_selected(&facet), n % 2 == 1, "after {n} toggles");
        }
    }

    #[test]
    fn toggle_preserves_selection_order() {
        let meta = crimes_metadata();
        let mut filters = FilterState::default();
        filters.toggle(&meta, &Facet::State("Punjab".into()));
        filters.toggle(&meta, &Facet::State("Kerala".into()));
        filters.toggle(&meta, &Facet::State("Goa".into()));
        filters.toggle(&meta, &Facet::State("Kerala".into()));
        let states: Vec<_> = filters.selected_states.iter().cloned().collect();
        assert_eq!(states, vec!["Punjab", "Goa"]);
    }

    #[test]
    fn toggle_ignores_values_outside_metadata() {
        let meta = crimes_metadata();
        let mut filters = FilterState::default();
        assert!(!filters.toggle(&meta, &Facet::State("Atlantis".into())));
        assert!(!filters.toggle(&meta, &Facet::Year(1850)));
        assert!(!filters.has_selections());
    }

    #[test]
    fn select_all_then_clear_is_empty() {
        let meta = crimes_metadata();
        for dim in [Dimension::States, Dimension::Years, Dimension::Categories] {
            let mut filters = FilterState::default();
            filters.toggle(&meta, &Facet::Year(2020));
            filters.select_all(&meta, dim);
            filters.clear(dim);
            match dim {
                Dimension::States => assert!(filters.selected_states.is_empty()),
                Dimension::Years => assert!(filters.selected_years.is_empty()),
                Dimension::Categories => assert!(filters.selected_categories.is_empty()),
            }
        }
    }

    #[test]
    fn select_all_copies_metadata() {
        let meta = crimes_metadata();
        let mut filters = FilterState::default();
        filters.select_all(&meta, Dimension::Years);
        assert_eq!(filters.selected_years, meta.available_years);
    }

    #[test]
    fn category_ops_are_noop_without_facet() {
        let meta = Metadata {
            available_states: ["Kerala".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let mut filters = FilterState::default();
        assert!(!filters.toggle(&meta, &Facet::Category("Theft".into())));
        filters.select_all(&meta, Dimension::Categories);
        assert!(filters.selected_categories.is_empty());
    }

    #[test]
    fn clear_all_resets_sort_but_keeps_breadth() {
        let meta = crimes_metadata();
        let mut filters = FilterState {
            sort_by: Some("cases_reported".into()),
            sort_order: SortOrder::Desc,
            breadth: Breadth::Full,
            ..Default::default()
        };
        filters.select_all(&meta, Dimension::States);
        filters.clear_all();
        assert!(!filters.has_selections());
        assert_eq!(filters.sort_by, None);
        assert_eq!(filters.sort_order, SortOrder::Asc);
        assert_eq!(filters.breadth, Breadth::Full);
    }

    #[test]
    fn blank_sort_key_is_none() {
        let filters = FilterState {
            sort_by: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(filters.sort_key(), None);
    }
}
