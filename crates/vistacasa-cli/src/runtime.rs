// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use vistacasa_api::{Client, SearchOutcome};
use vistacasa_app::{FavoriteSet, FilterCriteria, Listing, Session, demo, filter};
use vistacasa_auth::{DEMO_USER_ID, TokenStore};
use vistacasa_tui::{FavoritesStatus, SearchStatus, ToggleStatus};

/// Application state behind the view: the session, the listing
/// collection, and the favorites cache, with every mutation funneled
/// through the `AppRuntime` operations.
pub struct ApiRuntime {
    backend: Backend,
    session: Session,
    listings: Vec<Listing>,
    favorites: FavoriteSet,
}

enum Backend {
    Remote { client: Client, store: TokenStore },
    Demo,
}

impl ApiRuntime {
    pub fn remote(client: Client, store: TokenStore, session: Session) -> Self {
        Self {
            backend: Backend::Remote { client, store },
            session,
            listings: Vec::new(),
            favorites: FavoriteSet::default(),
        }
    }

    /// Offline session over the bundled sample listings. Filtering runs
    /// the client-side evaluator; favorites never leave the process.
    pub fn demo() -> Self {
        Self {
            backend: Backend::Demo,
            session: Session::new(DEMO_USER_ID),
            listings: demo::demo_listings(),
            favorites: FavoriteSet::default(),
        }
    }
}

impl vistacasa_tui::AppRuntime for ApiRuntime {
    fn user_id(&self) -> &str {
        &self.session.user_id
    }

    fn listings(&self) -> &[Listing] {
        &self.listings
    }

    fn favorites(&self) -> &FavoriteSet {
        &self.favorites
    }

    fn refresh_listings(&mut self, criteria: &FilterCriteria) -> SearchStatus {
        match &self.backend {
            Backend::Remote { client, .. } => match client.search(criteria) {
                Ok(SearchOutcome::Skipped) => SearchStatus::Skipped,
                Ok(SearchOutcome::Listings(listings)) => {
                    self.listings = listings;
                    SearchStatus::Replaced(self.listings.len())
                }
                Err(error) => {
                    // Degrade to an empty-results state, never an error
                    // screen. No retry.
                    self.listings.clear();
                    SearchStatus::Failed(error.to_string())
                }
            },
            Backend::Demo => {
                self.listings = filter::apply(&demo::demo_listings(), criteria);
                SearchStatus::Replaced(self.listings.len())
            }
        }
    }

    fn refresh_favorites(&mut self) -> FavoritesStatus {
        match &self.backend {
            Backend::Remote { client, .. } => {
                match client.fetch_favorites(&self.session.user_id) {
                    Ok(favorites) => {
                        self.favorites.replace(favorites);
                        FavoritesStatus::Replaced(self.favorites.len())
                    }
                    // Keep the stale-but-consistent local set.
                    Err(error) => FavoritesStatus::KeptStale(error.to_string()),
                }
            }
            Backend::Demo => FavoritesStatus::Replaced(self.favorites.len()),
        }
    }

    fn toggle_favorite(&mut self, listing_id: &str) -> ToggleStatus {
        // Flip locally first for instant feedback, then reconcile to the
        // server's authoritative answer. A failed or rejected mutation
        // rolls the flip back.
        let optimistic = self.favorites.toggle(listing_id);

        let receipt = match &self.backend {
            Backend::Demo => {
                return if optimistic {
                    ToggleStatus::Favorited
                } else {
                    ToggleStatus::Unfavorited
                };
            }
            Backend::Remote { client, .. } => {
                client.toggle_favorite(&self.session.user_id, listing_id)
            }
        };

        match receipt {
            Ok(receipt) if receipt.success => {
                self.favorites.set_membership(listing_id, receipt.is_favorite);
                if receipt.is_favorite {
                    ToggleStatus::Favorited
                } else {
                    ToggleStatus::Unfavorited
                }
            }
            Ok(_) => {
                self.favorites.set_membership(listing_id, !optimistic);
                ToggleStatus::Reverted("server rejected the change".to_owned())
            }
            Err(error) => {
                self.favorites.set_membership(listing_id, !optimistic);
                ToggleStatus::Reverted(error.to_string())
            }
        }
    }

    fn logout(&mut self) -> Result<()> {
        match &self.backend {
            Backend::Remote { store, .. } => store.clear_token(),
            Backend::Demo => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApiRuntime;
    use anyhow::Result;
    use std::time::Duration;
    use vistacasa_api::Client;
    use vistacasa_app::{FilterCriteria, Session, demo::demo_listings};
    use vistacasa_auth::TokenStore;
    use vistacasa_testkit::{StubApi, search_body};
    use vistacasa_tui::{AppRuntime, FavoritesStatus, SearchStatus, ToggleStatus};

    fn remote_runtime(stub: &StubApi) -> Result<ApiRuntime> {
        let client = Client::new(stub.base_url(), Duration::from_secs(1))?;
        let store = TokenStore::open_memory()?;
        store.bootstrap()?;
        store.save_token("stub-token")?;
        Ok(ApiRuntime::remote(client, store, Session::new("user-1")))
    }

    fn city_criteria(city: &str) -> FilterCriteria {
        FilterCriteria {
            city: city.to_owned(),
            ..FilterCriteria::default()
        }
    }

    #[test]
    fn search_replaces_the_listing_collection() -> Result<()> {
        let stub = StubApi::spawn(search_body(&demo_listings()[..2]))?;
        let mut runtime = remote_runtime(&stub)?;

        let status = runtime.refresh_listings(&city_criteria("San Francisco"));
        assert_eq!(status, SearchStatus::Replaced(2));
        assert_eq!(runtime.listings().len(), 2);
        assert_eq!(runtime.listings()[0].id, "1");
        Ok(())
    }

    #[test]
    fn under_constrained_search_issues_no_request_and_keeps_listings() -> Result<()> {
        let stub = StubApi::spawn(search_body(&demo_listings()))?;
        let mut runtime = remote_runtime(&stub)?;

        runtime.refresh_listings(&city_criteria("Austin"));
        assert_eq!(stub.search_hits(), 1);
        let before = runtime.listings().len();

        let status = runtime.refresh_listings(&FilterCriteria {
            bedrooms: "3".to_owned(),
            min_price: "100000".to_owned(),
            ..FilterCriteria::default()
        });
        assert_eq!(status, SearchStatus::Skipped);
        assert_eq!(stub.search_hits(), 1);
        assert_eq!(runtime.listings().len(), before);
        Ok(())
    }

    #[test]
    fn failed_search_clears_the_listing_collection() -> Result<()> {
        let stub = StubApi::spawn(search_body(&demo_listings()))?;
        let mut runtime = remote_runtime(&stub)?;

        runtime.refresh_listings(&city_criteria("Austin"));
        assert!(!runtime.listings().is_empty());

        stub.set_fail_search(true);
        let status = runtime.refresh_listings(&city_criteria("Austin"));
        assert!(matches!(status, SearchStatus::Failed(_)));
        assert!(runtime.listings().is_empty());
        Ok(())
    }

    #[test]
    fn favorites_fetch_replaces_the_local_set() -> Result<()> {
        let stub = StubApi::spawn(search_body(&demo_listings()))?;
        stub.seed_favorites(["4", "9"]);
        let mut runtime = remote_runtime(&stub)?;

        let status = runtime.refresh_favorites();
        assert_eq!(status, FavoritesStatus::Replaced(2));
        assert!(runtime.favorites().contains("4"));
        assert!(runtime.favorites().contains("9"));
        Ok(())
    }

    #[test]
    fn failed_favorites_fetch_keeps_the_stale_local_set() -> Result<()> {
        let stub = StubApi::spawn(search_body(&demo_listings()))?;
        stub.seed_favorites(["4"]);
        let mut runtime = remote_runtime(&stub)?;
        runtime.refresh_favorites();

        stub.set_fail_favorites(true);
        stub.seed_favorites(["7"]);
        let status = runtime.refresh_favorites();
        assert!(matches!(status, FavoritesStatus::KeptStale(_)));
        // No partial overwrite: still the last successfully fetched set.
        assert!(runtime.favorites().contains("4"));
        assert!(!runtime.favorites().contains("7"));
        Ok(())
    }

    #[test]
    fn toggle_reconciles_local_and_server_state() -> Result<()> {
        let stub = StubApi::spawn(search_body(&demo_listings()))?;
        let mut runtime = remote_runtime(&stub)?;

        assert_eq!(runtime.toggle_favorite("9"), ToggleStatus::Favorited);
        assert!(runtime.favorites().contains("9"));
        assert_eq!(stub.favorite_ids(), vec!["9".to_owned()]);

        assert_eq!(runtime.toggle_favorite("9"), ToggleStatus::Unfavorited);
        assert!(!runtime.favorites().contains("9"));
        assert!(stub.favorite_ids().is_empty());
        Ok(())
    }

    #[test]
    fn double_toggle_restores_original_membership() -> Result<()> {
        let stub = StubApi::spawn(search_body(&demo_listings()))?;
        stub.seed_favorites(["4"]);
        let mut runtime = remote_runtime(&stub)?;
        runtime.refresh_favorites();
        let before: Vec<String> = runtime.favorites().iter().map(str::to_owned).collect();

        runtime.toggle_favorite("4");
        runtime.toggle_favorite("4");

        let after: Vec<String> = runtime.favorites().iter().map(str::to_owned).collect();
        assert_eq!(before, after);
        assert_eq!(stub.favorite_ids(), vec!["4".to_owned()]);
        Ok(())
    }

    #[test]
    fn failed_toggle_rolls_back_the_optimistic_flip() -> Result<()> {
        let stub = StubApi::spawn(search_body(&demo_listings()))?;
        let mut runtime = remote_runtime(&stub)?;

        stub.set_fail_favorites(true);
        let status = runtime.toggle_favorite("9");
        assert!(matches!(status, ToggleStatus::Reverted(_)));
        assert!(!runtime.favorites().contains("9"));

        // And the same for un-favoriting an existing favorite.
        stub.set_fail_favorites(false);
        runtime.toggle_favorite("9");
        stub.set_fail_favorites(true);
        let status = runtime.toggle_favorite("9");
        assert!(matches!(status, ToggleStatus::Reverted(_)));
        assert!(runtime.favorites().contains("9"));
        Ok(())
    }

    #[test]
    fn logout_clears_the_stored_token() -> Result<()> {
        let stub = StubApi::spawn(search_body(&demo_listings()))?;
        let client = Client::new(stub.base_url(), Duration::from_secs(1))?;
        let store = TokenStore::open_memory()?;
        store.bootstrap()?;
        store.save_token("stub-token")?;

        let mut runtime = ApiRuntime::remote(client, store, Session::new("user-1"));
        runtime.logout()?;

        let super::Backend::Remote { store, .. } = &runtime.backend else {
            panic!("expected remote backend");
        };
        assert_eq!(store.stored_token()?, None);
        Ok(())
    }

    #[test]
    fn demo_runtime_filters_client_side_and_toggles_locally() {
        let mut runtime = ApiRuntime::demo();
        assert_eq!(runtime.user_id(), "demo-user");
        assert_eq!(runtime.listings().len(), demo_listings().len());

        let status = runtime.refresh_listings(&city_criteria("seattle"));
        assert_eq!(status, SearchStatus::Replaced(1));
        assert_eq!(runtime.listings()[0].id, "4");

        // Empty criteria bring the full sample back.
        let status = runtime.refresh_listings(&FilterCriteria::default());
        assert_eq!(status, SearchStatus::Replaced(demo_listings().len()));

        assert_eq!(runtime.toggle_favorite("4"), ToggleStatus::Favorited);
        assert_eq!(runtime.toggle_favorite("4"), ToggleStatus::Unfavorited);
    }
}
