// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Test doubles for the listings API: a loopback HTTP server with a
//! mutable favorites backend, plus canned response fixtures.

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tiny_http::{Header, Method, Response, Server};
use vistacasa_app::Listing;

/// The §8-style gateway envelope: payload JSON string-encoded under
/// `body`.
pub const GATEWAY_ENVELOPE_FIXTURE: &str =
    r#"{"body":"{\"data\":[{\"HouseID\":\"9\",\"price\":300000}]}"}"#;

/// Direct `{data: […]}` search body for a set of listings.
pub fn search_body(listings: &[Listing]) -> String {
    let data: Vec<Value> = listings
        .iter()
        .map(|listing| {
            json!({
                "id": listing.id,
                "price": listing.price,
                "city": listing.city,
                "address": listing.address,
                "bedrooms": listing.bedrooms,
                "bathrooms": listing.bathrooms,
                "sqft": listing.sqft,
                "imageUrl": listing.image_url,
                "featured": listing.featured,
            })
        })
        .collect();
    json!({ "data": data }).to_string()
}

/// An in-process listings API. Serves the configured search body on the
/// base path and a live favorites collection under `/favorites`, with
/// switches to simulate outages per endpoint.
pub struct StubApi {
    base_url: String,
    server: Arc<Server>,
    favorites: Arc<Mutex<BTreeSet<String>>>,
    fail_search: Arc<AtomicBool>,
    fail_favorites: Arc<AtomicBool>,
    search_hits: Arc<AtomicUsize>,
    handle: Option<JoinHandle<()>>,
}

impl StubApi {
    pub fn spawn(search_response: String) -> Result<Self> {
        let server = Arc::new(
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start stub api: {error}"))?,
        );
        let base_url = format!("http://{}/search", server.server_addr());

        let favorites = Arc::new(Mutex::new(BTreeSet::new()));
        let fail_search = Arc::new(AtomicBool::new(false));
        let fail_favorites = Arc::new(AtomicBool::new(false));
        let search_hits = Arc::new(AtomicUsize::new(0));

        let worker = StubWorker {
            server: Arc::clone(&server),
            search_response,
            favorites: Arc::clone(&favorites),
            fail_search: Arc::clone(&fail_search),
            fail_favorites: Arc::clone(&fail_favorites),
            search_hits: Arc::clone(&search_hits),
        };
        let handle = std::thread::spawn(move || worker.serve());

        Ok(Self {
            base_url,
            server,
            favorites,
            fail_search,
            fail_favorites,
            search_hits,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn seed_favorites<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut favorites = lock(&self.favorites);
        favorites.clear();
        favorites.extend(ids.into_iter().map(Into::into));
    }

    pub fn favorite_ids(&self) -> Vec<String> {
        lock(&self.favorites).iter().cloned().collect()
    }

    pub fn set_fail_search(&self, fail: bool) {
        self.fail_search.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_favorites(&self, fail: bool) {
        self.fail_favorites.store(fail, Ordering::SeqCst);
    }

    pub fn search_hits(&self) -> usize {
        self.search_hits.load(Ordering::SeqCst)
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

struct StubWorker {
    server: Arc<Server>,
    search_response: String,
    favorites: Arc<Mutex<BTreeSet<String>>>,
    fail_search: Arc<AtomicBool>,
    fail_favorites: Arc<AtomicBool>,
    search_hits: Arc<AtomicUsize>,
}

impl StubWorker {
    fn serve(self) {
        while let Ok(mut request) = self.server.recv() {
            let url = request.url().to_owned();
            let is_favorites = url.starts_with("/search/favorites");

            let (status, body) = if is_favorites && self.fail_favorites.load(Ordering::SeqCst) {
                (500, r#"{"message":"favorites unavailable"}"#.to_owned())
            } else if is_favorites && request.method() == &Method::Post {
                let mut raw = String::new();
                let _ = request.as_reader().read_to_string(&mut raw);
                self.handle_toggle(&raw)
            } else if is_favorites {
                let ids: Vec<String> = lock(&self.favorites).iter().cloned().collect();
                (200, json!({ "favoriteIds": ids }).to_string())
            } else if self.fail_search.load(Ordering::SeqCst) {
                self.search_hits.fetch_add(1, Ordering::SeqCst);
                (500, r#"{"message":"search unavailable"}"#.to_owned())
            } else {
                self.search_hits.fetch_add(1, Ordering::SeqCst);
                (200, self.search_response.clone())
            };

            let response = Response::from_string(body).with_status_code(status).with_header(
                Header::from_bytes("Content-Type", "application/json")
                    .expect("valid content type header"),
            );
            let _ = request.respond(response);
        }
    }

    fn handle_toggle(&self, raw: &str) -> (u16, String) {
        let Ok(parsed) = serde_json::from_str::<Value>(raw) else {
            return (400, r#"{"message":"malformed toggle request"}"#.to_owned());
        };
        let Some(house_id) = parsed.get("houseId").and_then(Value::as_str) else {
            return (400, r#"{"message":"houseId is required"}"#.to_owned());
        };

        let mut favorites = lock(&self.favorites);
        let is_favorite = if favorites.remove(house_id) {
            false
        } else {
            favorites.insert(house_id.to_owned());
            true
        };
        (
            200,
            json!({ "success": true, "isFavorite": is_favorite }).to_string(),
        )
    }
}

fn lock(favorites: &Mutex<BTreeSet<String>>) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
    match favorites.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::{GATEWAY_ENVELOPE_FIXTURE, search_body};
    use vistacasa_app::demo::demo_listings;

    #[test]
    fn search_body_encodes_every_listing() {
        let listings = demo_listings();
        let body = search_body(&listings);
        let parsed: serde_json::Value = serde_json::from_str(&body).expect("body is JSON");
        assert_eq!(
            parsed["data"].as_array().map(Vec::len),
            Some(listings.len())
        );
        assert_eq!(parsed["data"][0]["id"], "1");
    }

    #[test]
    fn gateway_fixture_is_valid_json_with_string_body() {
        let parsed: serde_json::Value =
            serde_json::from_str(GATEWAY_ENVELOPE_FIXTURE).expect("fixture is JSON");
        assert!(parsed["body"].is_string());
    }
}
