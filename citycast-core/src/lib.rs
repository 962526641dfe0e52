//! Core library for the `citycast` weather widget.
//!
//! This crate defines:
//! - Configuration handling
//! - Geocoding (Nominatim) and forecast (MET Norway) clients behind traits
//! - The widget state machine and the runtime that executes its effects
//! - Pure display derivations (icon, clock color, readings)
//!
//! It is used by `citycast-cli`, but can also drive other front ends.

pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod present;
pub mod provider;
pub mod runtime;
pub mod widget;

pub use config::{Config, LocationConfig};
pub use error::ApiError;
pub use model::{Coordinates, Forecast, Location, Place};
pub use provider::{ForecastSource, Geocoder, SearchMode};
pub use runtime::Dispatcher;
pub use widget::{Effect, Event, NavKey, StalePolicy, Widget, WidgetState};
