// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Bundled sample listings for offline demo sessions.

use crate::model::Listing;

struct DemoRow {
    id: &'static str,
    price: f64,
    city: &'static str,
    address: &'static str,
    bedrooms: i64,
    bathrooms: f64,
    sqft: i64,
    photo: &'static str,
    featured: bool,
}

const DEMO_ROWS: [DemoRow; 8] = [
    DemoRow {
        id: "1",
        price: 825_000.0,
        city: "San Francisco",
        address: "123 Market Street",
        bedrooms: 3,
        bathrooms: 2.5,
        sqft: 2_100,
        photo: "photo-1600596542815-ffad4c1539a9",
        featured: true,
    },
    DemoRow {
        id: "2",
        price: 1_250_000.0,
        city: "Los Angeles",
        address: "456 Sunset Boulevard",
        bedrooms: 4,
        bathrooms: 3.0,
        sqft: 2_800,
        photo: "photo-1628744448840-55bdb2497bd4",
        featured: true,
    },
    DemoRow {
        id: "3",
        price: 675_000.0,
        city: "Austin",
        address: "789 Tech Drive",
        bedrooms: 3,
        bathrooms: 2.0,
        sqft: 1_850,
        photo: "photo-1613490493576-7fde63acd811",
        featured: false,
    },
    DemoRow {
        id: "4",
        price: 545_000.0,
        city: "Seattle",
        address: "321 Pine Avenue",
        bedrooms: 2,
        bathrooms: 2.0,
        sqft: 1_400,
        photo: "photo-1689574666875-6c591bca0b32",
        featured: false,
    },
    DemoRow {
        id: "5",
        price: 495_000.0,
        city: "Denver",
        address: "654 Mountain View Road",
        bedrooms: 3,
        bathrooms: 2.0,
        sqft: 1_750,
        photo: "photo-1628624747186-a941c476b7ef",
        featured: false,
    },
    DemoRow {
        id: "6",
        price: 925_000.0,
        city: "San Francisco",
        address: "987 Castro Street",
        bedrooms: 4,
        bathrooms: 3.5,
        sqft: 2_400,
        photo: "photo-1606788075819-9574a6edfab3",
        featured: false,
    },
    DemoRow {
        id: "7",
        price: 785_000.0,
        city: "Austin",
        address: "147 Congress Avenue",
        bedrooms: 4,
        bathrooms: 2.5,
        sqft: 2_200,
        photo: "photo-1600596542815-ffad4c1539a9",
        featured: false,
    },
    DemoRow {
        id: "8",
        price: 1_450_000.0,
        city: "Los Angeles",
        address: "258 Hollywood Hills Drive",
        bedrooms: 5,
        bathrooms: 4.0,
        sqft: 3_500,
        photo: "photo-1628744448840-55bdb2497bd4",
        featured: true,
    },
];

pub fn demo_listings() -> Vec<Listing> {
    DEMO_ROWS
        .iter()
        .map(|row| Listing {
            id: row.id.to_owned(),
            price: row.price,
            city: row.city.to_owned(),
            address: row.address.to_owned(),
            bedrooms: row.bedrooms,
            bathrooms: row.bathrooms,
            sqft: row.sqft,
            image_url: format!("https://images.unsplash.com/{}?w=1080&q=80", row.photo),
            featured: row.featured,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::demo_listings;
    use crate::filter;
    use crate::model::FilterCriteria;
    use std::collections::BTreeSet;

    #[test]
    fn demo_ids_are_unique_and_nonempty() {
        let listings = demo_listings();
        let ids: BTreeSet<&str> = listings.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids.len(), listings.len());
        assert!(ids.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn demo_listings_cover_multiple_cities() {
        let listings = demo_listings();
        let cities: BTreeSet<&str> = listings.iter().map(|l| l.city.as_str()).collect();
        assert!(cities.len() >= 4);
    }

    #[test]
    fn demo_data_filters_like_the_sample_properties() {
        let listings = demo_listings();
        let criteria = FilterCriteria {
            city: "seattle".to_owned(),
            ..FilterCriteria::default()
        };
        let survivors = filter::apply(&listings, &criteria);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].id, "4");
    }
}
