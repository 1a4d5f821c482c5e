// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Shown in place of a missing or unusable listing photo URL.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/600x400?text=No+Photo";

pub const UNKNOWN_CITY: &str = "Unknown";
pub const NO_ADDRESS: &str = "No Address";

/// One property listing after normalization. Remote records arrive with
/// missing or wrongly-typed fields; everything here is already defaulted,
/// so the view never has to guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub price: f64,
    pub city: String,
    pub address: String,
    pub bedrooms: i64,
    pub bathrooms: f64,
    pub sqft: i64,
    pub image_url: String,
    pub featured: bool,
}

/// Filter form contents, exactly as typed. Empty string means
/// unconstrained; bounds that fail to parse behave the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub city: String,
    pub min_price: String,
    pub max_price: String,
    pub bedrooms: String,
    pub bathrooms: String,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        [
            &self.city,
            &self.min_price,
            &self.max_price,
            &self.bedrooms,
            &self.bathrooms,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }

    /// A remote search needs a city or a complete price range; anything
    /// less is an under-constrained query the listings API rejects.
    pub fn has_search_terms(&self) -> bool {
        if !self.city.trim().is_empty() {
            return true;
        }
        !self.min_price.trim().is_empty() && !self.max_price.trim().is_empty()
    }

    pub fn min_price_bound(&self) -> Option<f64> {
        parse_bound(&self.min_price)
    }

    pub fn max_price_bound(&self) -> Option<f64> {
        parse_bound(&self.max_price)
    }

    pub fn bedrooms_bound(&self) -> Option<f64> {
        parse_bound(&self.bedrooms)
    }

    pub fn bathrooms_bound(&self) -> Option<f64> {
        parse_bound(&self.bathrooms)
    }
}

fn parse_bound(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Listing ids the current user has favorited. The remote API is the
/// source of truth; this is the local copy the view reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    ids: BTreeSet<String>,
}

impl FavoriteSet {
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Flips membership and returns the new state.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.to_owned());
            true
        }
    }

    /// Forces membership to match an authoritative answer.
    pub fn set_membership(&mut self, id: &str, favorite: bool) {
        if favorite {
            self.ids.insert(id.to_owned());
        } else {
            self.ids.remove(id);
        }
    }

    pub fn replace(&mut self, other: Self) {
        self.ids = other.ids;
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Established once at startup from the token store; immutable until
/// logout tears it down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FavoriteSet, FilterCriteria};

    fn criteria(
        city: &str,
        min_price: &str,
        max_price: &str,
        bedrooms: &str,
        bathrooms: &str,
    ) -> FilterCriteria {
        FilterCriteria {
            city: city.to_owned(),
            min_price: min_price.to_owned(),
            max_price: max_price.to_owned(),
            bedrooms: bedrooms.to_owned(),
            bathrooms: bathrooms.to_owned(),
        }
    }

    #[test]
    fn empty_criteria_has_no_search_terms() {
        assert!(!FilterCriteria::default().has_search_terms());
        assert!(FilterCriteria::default().is_empty());
    }

    #[test]
    fn city_alone_is_searchable() {
        assert!(criteria("seattle", "", "", "", "").has_search_terms());
    }

    #[test]
    fn partial_price_range_is_not_searchable() {
        assert!(!criteria("", "500000", "", "", "").has_search_terms());
        assert!(!criteria("", "", "900000", "", "").has_search_terms());
        assert!(criteria("", "500000", "900000", "", "").has_search_terms());
    }

    #[test]
    fn bedroom_and_bathroom_constraints_alone_are_not_searchable() {
        assert!(!criteria("", "", "", "3", "2").has_search_terms());
    }

    #[test]
    fn bounds_parse_numbers_and_ignore_garbage() {
        let filled = criteria("  ", " 500000 ", "nope", "3", "2.5");
        assert_eq!(filled.min_price_bound(), Some(500_000.0));
        assert_eq!(filled.max_price_bound(), None);
        assert_eq!(filled.bedrooms_bound(), Some(3.0));
        assert_eq!(filled.bathrooms_bound(), Some(2.5));
        assert!(!filled.is_empty());
    }

    #[test]
    fn favorite_toggle_flips_membership() {
        let mut favorites = FavoriteSet::default();
        assert!(favorites.toggle("7"));
        assert!(favorites.contains("7"));
        assert!(!favorites.toggle("7"));
        assert!(!favorites.contains("7"));
        assert!(favorites.is_empty());
    }

    #[test]
    fn set_membership_is_idempotent() {
        let mut favorites = FavoriteSet::from_ids(["1", "2"]);
        favorites.set_membership("2", true);
        favorites.set_membership("3", false);
        assert_eq!(favorites.len(), 2);
        favorites.set_membership("1", false);
        assert_eq!(favorites.iter().collect::<Vec<_>>(), vec!["2"]);
    }

    #[test]
    fn replace_swaps_entire_set() {
        let mut favorites = FavoriteSet::from_ids(["1"]);
        favorites.replace(FavoriteSet::from_ids(["4", "9"]));
        assert!(!favorites.contains("1"));
        assert!(favorites.contains("4"));
        assert!(favorites.contains("9"));
    }
}
