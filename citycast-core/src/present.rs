//! Display values derived from a forecast snapshot. Nothing here does I/O.

use crate::model::Forecast;

/// Weather artwork for the next hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherIcon {
    Clear,
    Cloud,
    Drizzle,
    Rain,
    Snow,
}

impl WeatherIcon {
    /// Scanned in order; the first keyword contained in the code wins.
    const KEYWORDS: [(&'static str, WeatherIcon); 5] = [
        ("clear", WeatherIcon::Clear),
        ("cloud", WeatherIcon::Cloud),
        ("drizzle", WeatherIcon::Drizzle),
        ("rain", WeatherIcon::Rain),
        ("snow", WeatherIcon::Snow),
    ];

    pub fn glyph(self) -> &'static str {
        match self {
            WeatherIcon::Clear => "☀",
            WeatherIcon::Cloud => "☁",
            WeatherIcon::Drizzle => "🌦",
            WeatherIcon::Rain => "🌧",
            WeatherIcon::Snow => "❄",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WeatherIcon::Clear => "clear",
            WeatherIcon::Cloud => "cloudy",
            WeatherIcon::Drizzle => "drizzle",
            WeatherIcon::Rain => "rain",
            WeatherIcon::Snow => "snow",
        }
    }
}

/// Tint of the clock, keyed off the same summary code as the icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClockColor {
    Gold,
    Silver,
    SteelBlue,
    NearWhite,
    #[default]
    White,
}

impl ClockColor {
    // No drizzle entry: drizzle codes keep the plain white clock.
    const KEYWORDS: [(&'static str, ClockColor); 4] = [
        ("clear", ClockColor::Gold),
        ("cloud", ClockColor::Silver),
        ("rain", ClockColor::SteelBlue),
        ("snow", ClockColor::NearWhite),
    ];

    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            ClockColor::Gold => (0xFF, 0xD7, 0x00),
            ClockColor::Silver => (0xC0, 0xC0, 0xC0),
            ClockColor::SteelBlue => (0x46, 0x82, 0xB4),
            ClockColor::NearWhite => (0xF0, 0xF8, 0xFF),
            ClockColor::White => (0xFF, 0xFF, 0xFF),
        }
    }
}

fn first_match<T: Copy>(symbol_code: Option<&str>, table: &[(&str, T)]) -> Option<T> {
    let code = symbol_code?.to_lowercase();
    table
        .iter()
        .find(|(keyword, _)| code.contains(keyword))
        .map(|(_, value)| *value)
}

/// Icon for a summary code. Unknown or absent codes show the clear icon.
pub fn icon_for_symbol(symbol_code: Option<&str>) -> WeatherIcon {
    first_match(symbol_code, &WeatherIcon::KEYWORDS).unwrap_or(WeatherIcon::Clear)
}

/// Icon for the widget: nothing at all until there is a snapshot.
pub fn snapshot_icon(forecast: Option<&Forecast>) -> Option<WeatherIcon> {
    forecast.map(|f| icon_for_symbol(f.symbol_code()))
}

/// Clock tint for a summary code. Unknown or absent codes give white.
pub fn clock_color(symbol_code: Option<&str>) -> ClockColor {
    first_match(symbol_code, &ClockColor::KEYWORDS).unwrap_or_default()
}

/// Numeric fields of the current timeseries entry, unconverted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Readings {
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub precipitation: Option<f64>,
}

impl Readings {
    pub fn from_forecast(forecast: &Forecast) -> Self {
        Self {
            temperature: forecast.air_temperature(),
            wind_speed: forecast.wind_speed(),
            precipitation: forecast.precipitation_amount(),
        }
    }

    pub fn temperature_text(&self) -> String {
        format!("{}°C", blank_if_absent(self.temperature))
    }

    pub fn wind_text(&self) -> String {
        format!("{} m/s", blank_if_absent(self.wind_speed))
    }

    pub fn precipitation_text(&self) -> String {
        format!("{} mm", blank_if_absent(self.precipitation))
    }
}

/// Absent values render as nothing, not as a dash or "n/a".
fn blank_if_absent(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
