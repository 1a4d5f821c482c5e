// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Client-side filter evaluation over an already-fetched listing
//! collection. The remote search path encodes the same predicates into
//! the query string instead; the two must agree on semantics.

use crate::model::{FilterCriteria, Listing};

/// All constraints must hold; an empty or unparseable constraint always
/// holds.
pub fn matches(listing: &Listing, criteria: &FilterCriteria) -> bool {
    let city = criteria.city.trim();
    if !city.is_empty()
        && !listing
            .city
            .to_lowercase()
            .contains(&city.to_lowercase())
    {
        return false;
    }
    if let Some(min_price) = criteria.min_price_bound()
        && listing.price < min_price
    {
        return false;
    }
    if let Some(max_price) = criteria.max_price_bound()
        && listing.price > max_price
    {
        return false;
    }
    if let Some(bedrooms) = criteria.bedrooms_bound()
        && (listing.bedrooms as f64) < bedrooms
    {
        return false;
    }
    if let Some(bathrooms) = criteria.bathrooms_bound()
        && listing.bathrooms < bathrooms
    {
        return false;
    }
    true
}

/// Stable filter: survivors keep their input order.
pub fn apply(listings: &[Listing], criteria: &FilterCriteria) -> Vec<Listing> {
    listings
        .iter()
        .filter(|listing| matches(listing, criteria))
        .cloned()
        .collect()
}
