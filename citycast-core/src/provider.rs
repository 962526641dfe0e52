use crate::{
    Config,
    error::ApiError,
    model::{Coordinates, Forecast, Place},
    provider::{metno::MetNoClient, nominatim::NominatimClient},
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, sync::Arc};

pub mod metno;
pub mod nominatim;

/// How many geocoding hits a lookup wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Resolve a confirmed search to one place.
    Single,
    /// Autocomplete candidates while the user types.
    Suggestions,
}

impl SearchMode {
    pub const fn limit(self) -> usize {
        match self {
            SearchMode::Single => 1,
            SearchMode::Suggestions => 10,
        }
    }

    pub const fn address_details(self) -> bool {
        matches!(self, SearchMode::Suggestions)
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SearchMode::Single => "single",
            SearchMode::Suggestions => "suggestions",
        })
    }
}

/// Free text to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Returns at most `mode.limit()` places in the order the service ranked them.
    /// An empty vector means nothing matched.
    async fn search(&self, query: &str, mode: SearchMode) -> Result<Vec<Place>, ApiError>;
}

/// Coordinates to a forecast snapshot.
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    async fn forecast(&self, coordinates: Coordinates) -> Result<Forecast, ApiError>;
}

/// Shared HTTP client carrying the configured identification and timeout.
pub fn http_client(config: &Config) -> anyhow::Result<Client> {
    let mut builder = Client::builder().user_agent(config.user_agent());
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build().context("Failed to build HTTP client")
}

/// Construct the geocoder from config.
pub fn geocoder_from_config(config: &Config, http: Client) -> Arc<dyn Geocoder> {
    Arc::new(NominatimClient::new(http, config.geocoding_url()))
}

/// Construct the forecast source from config.
pub fn forecast_source_from_config(config: &Config, http: Client) -> Arc<dyn ForecastSource> {
    Arc::new(MetNoClient::new(http, config.forecast_url(), config.user_agent()))
}
