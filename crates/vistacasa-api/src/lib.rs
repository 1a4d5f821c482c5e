// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;
use vistacasa_app::{
    FavoriteSet, FilterCriteria, Listing, NO_ADDRESS, PLACEHOLDER_IMAGE_URL, UNKNOWN_CITY,
};

/// Result of a listing search. `Skipped` means the criteria could not
/// form a valid remote query, so no request was issued at all.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Skipped,
    Listings(Vec<Listing>),
}

/// The server's authoritative answer to a favorite toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleReceipt {
    pub success: bool,
    pub is_favorite: bool,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        Url::parse(&base_url)
            .with_context(|| format!("api.base_url {base_url:?} is not a valid URL"))?;

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Queries the listings endpoint with the non-empty criteria fields.
    /// Under-constrained criteria (no city and no complete price range)
    /// skip the request entirely.
    pub fn search(&self, criteria: &FilterCriteria) -> Result<SearchOutcome> {
        if !criteria.has_search_terms() {
            return Ok(SearchOutcome::Skipped);
        }

        let url = self.search_url(criteria)?;
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let envelope: SearchEnvelope = response.json().context("decode search response")?;
        let payload = envelope.into_payload()?;
        let listings = payload
            .data
            .iter()
            .filter_map(normalize_listing)
            .collect();
        Ok(SearchOutcome::Listings(listings))
    }

    fn search_url(&self, criteria: &FilterCriteria) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("build search URL")?;
        {
            let mut pairs = url.query_pairs_mut();
            let fields = [
                ("city", &criteria.city),
                ("min_price", &criteria.min_price),
                ("max_price", &criteria.max_price),
                ("bed", &criteria.bedrooms),
                ("bath", &criteria.bathrooms),
            ];
            for (name, value) in fields {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    pairs.append_pair(name, trimmed);
                }
            }
        }
        Ok(url)
    }

    /// Reads the user's favorite listing ids. Callers keep their current
    /// set when this fails.
    pub fn fetch_favorites(&self, user_id: &str) -> Result<FavoriteSet> {
        let mut url =
            Url::parse(&format!("{}/favorites", self.base_url)).context("build favorites URL")?;
        url.query_pairs_mut().append_pair("userId", user_id);

        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: FavoritesResponse = response.json().context("decode favorites response")?;
        Ok(FavoriteSet::from_ids(parsed.favorite_ids))
    }

    pub fn toggle_favorite(&self, user_id: &str, house_id: &str) -> Result<ToggleReceipt> {
        let request = ToggleRequest { user_id, house_id };
        let response = self
            .http
            .post(format!("{}/favorites", self.base_url))
            .json(&request)
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(status, &body));
        }

        let parsed: ToggleResponse = response.json().context("decode toggle response")?;
        Ok(ToggleReceipt {
            success: parsed.success,
            is_favorite: parsed.is_favorite,
        })
    }
}

/// The API answers either with the payload directly or through a
/// gateway envelope whose `body` holds the payload as a JSON string.
/// Variant order matters: `{"body": …}` must not fall through to
/// `Direct`, whose `data` field defaults.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchEnvelope {
    Wrapped { body: String },
    Direct(SearchPayload),
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    data: Vec<Value>,
}

impl SearchEnvelope {
    fn into_payload(self) -> Result<SearchPayload> {
        match self {
            Self::Wrapped { body } => {
                serde_json::from_str(&body).context("decode enveloped search body")
            }
            Self::Direct(payload) => Ok(payload),
        }
    }
}

const ID_FIELDS: [&str; 4] = ["id", "HouseID", "houseId", "house_id"];

/// Maps one raw record into a canonical listing. Missing or wrongly
/// typed fields fall back to defaults; a record with no usable id under
/// any known field name cannot be favorited and is dropped.
fn normalize_listing(raw: &Value) -> Option<Listing> {
    let id = ID_FIELDS
        .iter()
        .find_map(|field| id_string(raw.get(*field)?))?;

    Some(Listing {
        id,
        price: number_or_zero(raw.get("price")).max(0.0),
        city: string_or(raw.get("city"), UNKNOWN_CITY),
        address: string_or(raw.get("address"), NO_ADDRESS),
        bedrooms: number_or_zero(raw.get("bedrooms")) as i64,
        bathrooms: number_or_zero(raw.get("bathrooms")),
        sqft: (number_or_zero(raw.get("sqft")) as i64).max(0),
        image_url: string_or(raw.get("imageUrl"), PLACEHOLDER_IMAGE_URL),
        featured: raw
            .get("featured")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    })
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_owned())
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn string_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map_or_else(|| default.to_owned(), str::to_owned)
}

fn number_or_zero(value: Option<&Value>) -> f64 {
    let Some(value) = value else {
        return 0.0;
    };
    if let Some(number) = value.as_f64()
        && number.is_finite()
    {
        return number;
    }
    if let Some(text) = value.as_str()
        && let Ok(number) = text.trim().parse::<f64>()
        && number.is_finite()
    {
        return number;
    }
    0.0
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check api.base_url and your network ({} )",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(message) = parsed.message
        && !message.is_empty()
    {
        return anyhow!("server error ({}): {}", status.as_u16(), message);
    }

    if body.len() < 100 && !body.contains('{') {
        return anyhow!("server error ({}): {}", status.as_u16(), body);
    }

    anyhow!("server returned {}", status.as_u16())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleRequest<'a> {
    user_id: &'a str,
    house_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FavoritesResponse {
    #[serde(default)]
    favorite_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleResponse {
    success: bool,
    is_favorite: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{
        Client, SearchEnvelope, SearchOutcome, ToggleRequest, normalize_listing, number_or_zero,
    };
    use anyhow::Result;
    use serde_json::{Value, json};
    use std::time::Duration;
    use vistacasa_app::{FilterCriteria, NO_ADDRESS, PLACEHOLDER_IMAGE_URL, UNKNOWN_CITY};

    fn client() -> Client {
        Client::new("http://127.0.0.1:1/search", Duration::from_millis(50))
            .expect("client should initialize")
    }

    #[test]
    fn new_rejects_empty_and_invalid_base_url() {
        assert!(Client::new("", Duration::from_secs(1)).is_err());
        assert!(Client::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn search_url_includes_only_non_empty_fields() -> Result<()> {
        let criteria = FilterCriteria {
            city: "Austin".to_owned(),
            min_price: " 100000 ".to_owned(),
            bedrooms: "3".to_owned(),
            ..FilterCriteria::default()
        };
        let url = client().search_url(&criteria)?;
        assert_eq!(url.query(), Some("city=Austin&min_price=100000&bed=3"));
        Ok(())
    }

    #[test]
    fn search_url_with_full_criteria_maps_remote_field_names() -> Result<()> {
        let criteria = FilterCriteria {
            city: "San Francisco".to_owned(),
            min_price: "500000".to_owned(),
            max_price: "900000".to_owned(),
            bedrooms: "3".to_owned(),
            bathrooms: "2.5".to_owned(),
        };
        let url = client().search_url(&criteria)?;
        assert_eq!(
            url.query(),
            Some("city=San+Francisco&min_price=500000&max_price=900000&bed=3&bath=2.5")
        );
        Ok(())
    }

    #[test]
    fn under_constrained_search_skips_the_request() -> Result<()> {
        // The base URL is unreachable; reaching the network would error.
        let outcome = client().search(&FilterCriteria {
            bedrooms: "3".to_owned(),
            min_price: "100000".to_owned(),
            ..FilterCriteria::default()
        })?;
        assert_eq!(outcome, SearchOutcome::Skipped);
        Ok(())
    }

    #[test]
    fn direct_envelope_decodes() -> Result<()> {
        let envelope: SearchEnvelope =
            serde_json::from_str(r#"{"data":[{"id":"1","price":100}]}"#)?;
        assert_eq!(envelope.into_payload()?.data.len(), 1);
        Ok(())
    }

    #[test]
    fn gateway_envelope_decodes_nested_body() -> Result<()> {
        let envelope: SearchEnvelope =
            serde_json::from_str(r#"{"body":"{\"data\":[{\"HouseID\":\"9\",\"price\":300000}]}"}"#)?;
        let payload = envelope.into_payload()?;
        assert_eq!(payload.data.len(), 1);

        let listing = normalize_listing(&payload.data[0]).expect("record has an id");
        assert_eq!(listing.id, "9");
        assert_eq!(listing.price, 300_000.0);
        assert_eq!(listing.city, UNKNOWN_CITY);
        assert_eq!(listing.address, NO_ADDRESS);
        Ok(())
    }

    #[test]
    fn gateway_envelope_with_malformed_body_is_an_error() -> Result<()> {
        let envelope: SearchEnvelope = serde_json::from_str(r#"{"body":"not json"}"#)?;
        assert!(envelope.into_payload().is_err());
        Ok(())
    }

    #[test]
    fn normalize_defaults_missing_fields() {
        let listing = normalize_listing(&json!({"id": "12"})).expect("record has an id");
        assert_eq!(listing.price, 0.0);
        assert_eq!(listing.bedrooms, 0);
        assert_eq!(listing.bathrooms, 0.0);
        assert_eq!(listing.sqft, 0);
        assert_eq!(listing.city, UNKNOWN_CITY);
        assert_eq!(listing.address, NO_ADDRESS);
        assert_eq!(listing.image_url, PLACEHOLDER_IMAGE_URL);
        assert!(!listing.featured);
    }

    #[test]
    fn normalize_tolerates_wrongly_typed_fields() {
        let listing = normalize_listing(&json!({
            "id": 42,
            "price": "650000",
            "city": 7,
            "bedrooms": "three",
            "bathrooms": 2.5,
            "sqft": -50,
            "featured": "yes"
        }))
        .expect("record has an id");
        assert_eq!(listing.id, "42");
        assert_eq!(listing.price, 650_000.0);
        assert_eq!(listing.city, UNKNOWN_CITY);
        assert_eq!(listing.bedrooms, 0);
        assert_eq!(listing.bathrooms, 2.5);
        assert_eq!(listing.sqft, 0);
        assert!(!listing.featured);
    }

    #[test]
    fn normalize_clamps_negative_price() {
        let listing = normalize_listing(&json!({"id": "1", "price": -5})).expect("has id");
        assert_eq!(listing.price, 0.0);
    }

    #[test]
    fn normalize_coalesces_alternate_id_fields() {
        for key in ["id", "HouseID", "houseId", "house_id"] {
            let listing =
                normalize_listing(&json!({key: "77"})).expect("record has an id");
            assert_eq!(listing.id, "77");
        }
    }

    #[test]
    fn normalize_drops_records_without_any_id() {
        assert!(normalize_listing(&json!({"price": 100})).is_none());
        assert!(normalize_listing(&json!({"id": "   "})).is_none());
        assert!(normalize_listing(&json!({"id": null})).is_none());
    }

    #[test]
    fn number_coercion_never_produces_nan() {
        assert_eq!(number_or_zero(Some(&Value::String("NaN".into()))), 0.0);
        assert_eq!(number_or_zero(Some(&Value::Null)), 0.0);
        assert_eq!(number_or_zero(None), 0.0);
    }

    #[test]
    fn toggle_request_serializes_camel_case() -> Result<()> {
        let encoded = serde_json::to_string(&ToggleRequest {
            user_id: "user-1",
            house_id: "9",
        })?;
        assert_eq!(encoded, r#"{"userId":"user-1","houseId":"9"}"#);
        Ok(())
    }
}
