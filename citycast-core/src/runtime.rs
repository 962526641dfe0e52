//! Executes widget effects against the real (or fake) clients.
//!
//! Each effect runs as its own tokio task. Results travel back to the UI loop
//! as [`Event`]s on an unbounded channel; nothing here touches widget state.
//! Superseded requests are never cancelled, the widget decides what to do
//! with late answers.

use std::sync::Arc;

use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{debug, warn};

use crate::{
    error::ApiError,
    model::{Coordinates, Forecast, Location, Place},
    provider::{ForecastSource, Geocoder, SearchMode},
    widget::{Effect, Event, RequestId, Widget},
};

#[derive(Debug, Clone)]
pub struct Dispatcher {
    geocoder: Arc<dyn Geocoder>,
    forecasts: Arc<dyn ForecastSource>,
    events: UnboundedSender<Event>,
}

impl Dispatcher {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        forecasts: Arc<dyn ForecastSource>,
        events: UnboundedSender<Event>,
    ) -> Self {
        Self {
            geocoder,
            forecasts,
            events,
        }
    }

    /// Feed one event to the widget and start whatever it asks for.
    pub fn apply(&self, widget: &mut Widget, event: Event) {
        if let Some(effect) = widget.handle(event) {
            self.dispatch(effect);
        }
    }

    pub fn dispatch(&self, effect: Effect) -> JoinHandle<()> {
        debug!(?effect, "dispatching");
        let events = self.events.clone();

        match effect {
            Effect::FetchSuggestions { id, query } => {
                let geocoder = Arc::clone(&self.geocoder);
                tokio::spawn(async move {
                    let event = suggestions(geocoder.as_ref(), id, &query).await;
                    let _ = events.send(event);
                })
            }
            Effect::ResolvePlace { id, query } => {
                let geocoder = Arc::clone(&self.geocoder);
                tokio::spawn(async move {
                    let event = resolve(geocoder.as_ref(), id, query).await;
                    let _ = events.send(event);
                })
            }
            Effect::FetchForecast { id, coordinates } => {
                let forecasts = Arc::clone(&self.forecasts);
                // Owned by the future, so an abort before the first poll still reports.
                let completion = ForecastCompletion::new(id, events);
                tokio::spawn(async move {
                    let event = forecast(forecasts.as_ref(), id, coordinates).await;
                    completion.finish(event);
                })
            }
        }
    }
}

async fn suggestions(geocoder: &dyn Geocoder, id: RequestId, query: &str) -> Event {
    match geocoder.search(query, SearchMode::Suggestions).await {
        Ok(places) => Event::SuggestionsLoaded {
            id,
            names: places.into_iter().map(|p| p.display_name).collect(),
        },
        Err(e) => {
            warn!(error = %e, %id, "fetching city suggestions failed");
            Event::SuggestionsFailed { id }
        }
    }
}

async fn resolve(geocoder: &dyn Geocoder, id: RequestId, query: String) -> Event {
    match geocoder.search(&query, SearchMode::Single).await {
        Ok(places) => Event::PlaceResolved {
            id,
            place: places.into_iter().next(),
            query,
        },
        Err(e) => {
            warn!(error = %e, %id, "fetching coordinates failed");
            Event::PlaceFailed { id }
        }
    }
}

async fn forecast(source: &dyn ForecastSource, id: RequestId, coordinates: Coordinates) -> Event {
    match source.forecast(coordinates).await {
        Ok(forecast) => Event::ForecastLoaded { id, forecast },
        Err(e) => {
            warn!(error = %e, %id, "fetching weather data failed");
            Event::ForecastFailed { id }
        }
    }
}

/// Reports the end of a forecast request exactly once.
///
/// If the task is aborted or panics before [`finish`](Self::finish), drop
/// reports a failure so the widget's loading flag is released.
struct ForecastCompletion {
    id: RequestId,
    events: UnboundedSender<Event>,
    finished: bool,
}

impl ForecastCompletion {
    fn new(id: RequestId, events: UnboundedSender<Event>) -> Self {
        Self {
            id,
            events,
            finished: false,
        }
    }

    fn finish(mut self, event: Event) {
        self.finished = true;
        let _ = self.events.send(event);
    }
}

impl Drop for ForecastCompletion {
    fn drop(&mut self) {
        if !self.finished {
            warn!(id = %self.id, "forecast task ended without a result");
            let _ = self.events.send(Event::ForecastFailed { id: self.id });
        }
    }
}

/// Result of a one-shot lookup outside the interactive widget.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub location: Location,
    pub place: Place,
    pub forecast: Forecast,
}

/// Resolve `query` and fetch its forecast in one go.
///
/// `Ok(None)` means the geocoder found nothing.
pub async fn lookup(
    geocoder: &dyn Geocoder,
    forecasts: &dyn ForecastSource,
    query: &str,
) -> Result<Option<Lookup>, ApiError> {
    let Some(place) = geocoder
        .search(query, SearchMode::Single)
        .await?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };

    let forecast = forecasts.forecast(place.coordinates).await?;

    Ok(Some(Lookup {
        location: Location {
            label: query.to_string(),
            coordinates: place.coordinates,
        },
        place,
        forecast,
    }))
}
