use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    error::{ApiError, truncate_body},
    model::{Coordinates, Place},
};

use super::{Geocoder, SearchMode};

const SERVICE: &str = "Nominatim";

/// Forward geocoding against a Nominatim `/search` endpoint.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    base_url: String,
    http: Client,
}

impl NominatimClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }

    fn query_params(query: &str, mode: SearchMode) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", query.to_string()),
            ("format", "json".to_string()),
        ];
        if mode.address_details() {
            params.push(("addressdetails", "1".to_string()));
        }
        params.push(("limit", mode.limit().to_string()));
        params
    }
}

#[derive(Debug, Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
    display_name: String,
}

impl TryFrom<NominatimHit> for Place {
    type Error = ApiError;

    fn try_from(hit: NominatimHit) -> Result<Self, Self::Error> {
        let latitude = hit
            .lat
            .trim()
            .parse::<f64>()
            .map_err(|e| ApiError::parse(SERVICE, format!("bad lat '{}': {e}", hit.lat)))?;
        let longitude = hit
            .lon
            .trim()
            .parse::<f64>()
            .map_err(|e| ApiError::parse(SERVICE, format!("bad lon '{}': {e}", hit.lon)))?;

        Ok(Place {
            display_name: hit.display_name,
            coordinates: Coordinates::new(latitude, longitude),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    #[instrument(skip(self), fields(mode = %mode))]
    async fn search(&self, query: &str, mode: SearchMode) -> Result<Vec<Place>, ApiError> {
        let res = self
            .http
            .get(self.search_url())
            .query(&Self::query_params(query, mode))
            .send()
            .await
            .map_err(|source| ApiError::Request {
                service: SERVICE,
                source,
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|source| ApiError::Request {
            service: SERVICE,
            source,
        })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                service: SERVICE,
                status,
                body: truncate_body(&body),
            });
        }

        let hits: Vec<NominatimHit> =
            serde_json::from_str(&body).map_err(|e| ApiError::parse(SERVICE, e.to_string()))?;

        debug!(hits = hits.len(), "geocoding response received");

        let hits = hits.into_iter().take(mode.limit());
        match mode {
            SearchMode::Single => hits.map(Place::try_from).collect(),
            // a suggestion only needs its name; drop hits we cannot place
            SearchMode::Suggestions => Ok(hits
                .filter_map(|hit| {
                    Place::try_from(hit)
                        .inspect_err(|e| warn!(error = %e, "skipping suggestion"))
                        .ok()
                })
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mode_params() {
        let params = NominatimClient::query_params("Oslo", SearchMode::Single);
        assert_eq!(
            params,
            vec![
                ("q", "Oslo".to_string()),
                ("format", "json".to_string()),
                ("limit", "1".to_string()),
            ]
        );
    }

    #[test]
    fn suggestion_mode_asks_for_address_details() {
        let params = NominatimClient::query_params("Ber", SearchMode::Suggestions);
        assert!(params.contains(&("addressdetails", "1".to_string())));
        assert!(params.contains(&("limit", "10".to_string())));
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let client = NominatimClient::new(Client::new(), "http://localhost:8080/");
        assert_eq!(client.search_url(), "http://localhost:8080/search");
    }

    #[test]
    fn hit_with_string_coordinates_converts() {
        let hit = NominatimHit {
            lat: "52.5170365".into(),
            lon: "13.3888599".into(),
            display_name: "Berlin, Deutschland".into(),
        };
        let place = Place::try_from(hit).expect("valid hit");
        assert_eq!(place.coordinates, Coordinates::new(52.5170365, 13.3888599));
        assert_eq!(place.display_name, "Berlin, Deutschland");
    }

    #[test]
    fn hit_with_garbage_coordinates_is_a_parse_error() {
        let hit = NominatimHit {
            lat: "north".into(),
            lon: "13.4".into(),
            display_name: "Nowhere".into(),
        };
        let err = Place::try_from(hit).unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }));
    }
}
