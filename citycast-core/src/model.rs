use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Decimal-degree coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// The place the widget currently shows weather for.
///
/// Label and coordinates live in one value so a successful geocode replaces
/// both at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub label: String,
    pub coordinates: Coordinates,
}

impl Location {
    /// Fallback city used until the user searches for something else.
    pub fn oslo() -> Self {
        Self {
            label: "Oslo".to_string(),
            coordinates: Coordinates::new(59.9139, 10.7522),
        }
    }
}

/// One geocoding hit.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub display_name: String,
    pub coordinates: Coordinates,
}

/// Partial model of a Locationforecast "compact" response.
///
/// Every leaf is optional; the accessors below return `None` for anything the
/// upstream left out instead of failing the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub properties: ForecastProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ForecastProperties {
    #[serde(default)]
    pub meta: Option<ForecastMeta>,
    #[serde(default)]
    pub timeseries: Vec<TimeStep>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ForecastMeta {
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TimeStep {
    #[serde(default)]
    pub data: StepData,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StepData {
    #[serde(default)]
    pub instant: Instant,
    #[serde(default)]
    pub next_1_hours: Option<NextHours>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Instant {
    #[serde(default)]
    pub details: InstantDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InstantDetails {
    #[serde(default)]
    pub air_temperature: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NextHours {
    #[serde(default)]
    pub summary: Option<Summary>,
    #[serde(default)]
    pub details: Option<NextHoursDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub symbol_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NextHoursDetails {
    #[serde(default)]
    pub precipitation_amount: Option<f64>,
}

impl Forecast {
    /// The only entry the widget reads: index 0 of the timeseries.
    pub fn current(&self) -> Option<&TimeStep> {
        self.properties.timeseries.first()
    }

    pub fn air_temperature(&self) -> Option<f64> {
        self.current()?.data.instant.details.air_temperature
    }

    pub fn wind_speed(&self) -> Option<f64> {
        self.current()?.data.instant.details.wind_speed
    }

    pub fn precipitation_amount(&self) -> Option<f64> {
        self.next_hour()?.details.as_ref()?.precipitation_amount
    }

    pub fn symbol_code(&self) -> Option<&str> {
        self.next_hour()?.summary.as_ref()?.symbol_code.as_deref()
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.properties.meta.as_ref()?.updated_at
    }

    fn next_hour(&self) -> Option<&NextHours> {
        self.current()?.data.next_1_hours.as_ref()
    }
}
