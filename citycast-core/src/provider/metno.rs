use async_trait::async_trait;
use reqwest::{Client, header::USER_AGENT};
use tracing::{debug, instrument};

use crate::{
    error::{ApiError, truncate_body},
    model::{Coordinates, Forecast},
};

use super::ForecastSource;

const SERVICE: &str = "MET Norway";

/// Locationforecast 2.0 "compact" client.
#[derive(Debug, Clone)]
pub struct MetNoClient {
    base_url: String,
    user_agent: String,
    http: Client,
}

impl MetNoClient {
    pub fn new(http: Client, base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            http,
        }
    }

    fn compact_url(&self) -> String {
        format!("{}/compact", self.base_url)
    }

    /// Coordinates go out with at most 4 decimals, the API's own resolution.
    fn query_params(coordinates: Coordinates) -> [(&'static str, String); 2] {
        [
            ("lat", format_coordinate(coordinates.latitude)),
            ("lon", format_coordinate(coordinates.longitude)),
        ]
    }
}

fn format_coordinate(value: f64) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    rounded.to_string()
}

#[async_trait]
impl ForecastSource for MetNoClient {
    #[instrument(skip(self), fields(lat = %coordinates.latitude, lon = %coordinates.longitude))]
    async fn forecast(&self, coordinates: Coordinates) -> Result<Forecast, ApiError> {
        let res = self
            .http
            .get(self.compact_url())
            .header(USER_AGENT, &self.user_agent)
            .query(&Self::query_params(coordinates))
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

        let forecast: Forecast =
            serde_json::from_str(&body).map_err(|e| ApiError::parse(SERVICE, e.to_string()))?;

        debug!(
            steps = forecast.properties.timeseries.len(),
            "forecast response received"
        );

        Ok(forecast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_are_rounded_to_four_decimals() {
        let params = MetNoClient::query_params(Coordinates::new(52.5170365, 13.3888599));
        assert_eq!(params[0], ("lat", "52.517".to_string()));
        assert_eq!(params[1], ("lon", "13.3889".to_string()));
    }

    #[test]
    fn default_city_coordinates_are_sent_as_is() {
        let params = MetNoClient::query_params(Coordinates::new(59.9139, 10.7522));
        assert_eq!(params[0].1, "59.9139");
        assert_eq!(params[1].1, "10.7522");
    }

    #[test]
    fn compact_url_is_built_from_base() {
        let client = MetNoClient::new(Client::new(), "http://localhost:1234/", "ua");
        assert_eq!(client.compact_url(), "http://localhost:1234/compact");
    }
}
