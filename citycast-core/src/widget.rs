//! Widget state and its update rules.
//!
//! [`Widget`] owns every piece of UI state. Each event type has one handler;
//! handlers never perform I/O, they hand back an [`Effect`] for the runtime to
//! execute. Results come back later as events tagged with the [`RequestId`] of
//! the effect that produced them.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    clock,
    model::{Coordinates, Forecast, Location, Place},
    present::{self, ClockColor},
};

pub const PLACE_NOT_FOUND: &str = "Place not found";

/// Identity of one issued request. Strictly increasing per widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What to do with a response that arrives after a newer request of the same
/// kind was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StalePolicy {
    /// Only the newest request of each kind may update state.
    #[default]
    #[serde(rename = "ignore")]
    IgnoreStale,
    /// Apply every response in arrival order; the last one to land wins even
    /// if it answers an older request.
    #[serde(rename = "accept")]
    LastArrivalWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Enter,
    Down,
    Up,
}

/// Work the runtime must carry out on the widget's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchSuggestions { id: RequestId, query: String },
    ResolvePlace { id: RequestId, query: String },
    FetchForecast { id: RequestId, coordinates: Coordinates },
}

impl Effect {
    pub fn id(&self) -> RequestId {
        match self {
            Effect::FetchSuggestions { id, .. }
            | Effect::ResolvePlace { id, .. }
            | Effect::FetchForecast { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    InputChanged(String),
    Key(NavKey),
    SuggestionClicked(usize),
    SearchClicked,
    SuggestionsLoaded { id: RequestId, names: Vec<String> },
    SuggestionsFailed { id: RequestId },
    /// `place` is `None` when the geocoder found nothing.
    PlaceResolved {
        id: RequestId,
        query: String,
        place: Option<Place>,
    },
    PlaceFailed { id: RequestId },
    ForecastLoaded { id: RequestId, forecast: Forecast },
    /// Also sent when a forecast task ends without producing a result.
    ForecastFailed { id: RequestId },
    Tick(String),
}

/// Everything the widget renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetState {
    pub input: String,
    pub suggestions: Vec<String>,
    pub active_suggestion: Option<usize>,
    pub location: Location,
    pub forecast: Option<Forecast>,
    pub loading: bool,
    pub clock_color: ClockColor,
    pub current_time: String,
    pub notice: Option<String>,
}

#[derive(Debug, Default)]
struct Latest {
    suggestions: Option<RequestId>,
    resolve: Option<RequestId>,
    forecast: Option<RequestId>,
}

#[derive(Debug)]
pub struct Widget {
    state: WidgetState,
    policy: StalePolicy,
    next_id: u64,
    latest: Latest,
}

impl Widget {
    pub fn new(location: Location, policy: StalePolicy) -> Self {
        Self {
            state: WidgetState {
                input: String::new(),
                suggestions: Vec::new(),
                active_suggestion: None,
                location,
                forecast: None,
                loading: false,
                clock_color: ClockColor::default(),
                current_time: clock::format_now(),
                notice: None,
            },
            policy,
            next_id: 0,
            latest: Latest::default(),
        }
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn policy(&self) -> StalePolicy {
        self.policy
    }

    /// First forecast for the startup location.
    pub fn mount(&mut self) -> Effect {
        self.fetch_forecast()
    }

    pub fn handle(&mut self, event: Event) -> Option<Effect> {
        match event {
            Event::InputChanged(text) => self.on_input_changed(text),
            Event::Key(key) => self.on_key(key),
            Event::SuggestionClicked(index) => self.on_suggestion_clicked(index),
            Event::SearchClicked => self.on_search_clicked(),
            Event::SuggestionsLoaded { id, names } => {
                self.on_suggestions_loaded(id, names);
                None
            }
            Event::SuggestionsFailed { id } => {
                self.on_suggestions_failed(id);
                None
            }
            Event::PlaceResolved { id, query, place } => self.on_place_resolved(id, query, place),
            Event::PlaceFailed { id } => {
                self.on_place_failed(id);
                None
            }
            Event::ForecastLoaded { id, forecast } => {
                self.on_forecast_loaded(id, forecast);
                None
            }
            Event::ForecastFailed { id } => {
                self.on_forecast_failed(id);
                None
            }
            Event::Tick(time) => {
                self.on_tick(time);
                None
            }
        }
    }

    pub fn on_input_changed(&mut self, text: String) -> Option<Effect> {
        self.state.notice = None;
        let wants_suggestions = text.chars().count() > 1;
        self.state.input = text;

        if wants_suggestions {
            let id = self.next_request_id();
            self.latest.suggestions = Some(id);
            Some(Effect::FetchSuggestions {
                id,
                query: self.state.input.clone(),
            })
        } else {
            self.clear_suggestions();
            None
        }
    }

    /// Enter selects the highlighted suggestion when there is one and searches
    /// the raw input otherwise.
    pub fn on_key(&mut self, key: NavKey) -> Option<Effect> {
        self.state.notice = None;
        match key {
            NavKey::Enter => match self.state.active_suggestion {
                Some(index) => self.select(index),
                None => self.search(),
            },
            NavKey::Down => {
                if let Some(last) = self.state.suggestions.len().checked_sub(1) {
                    self.state.active_suggestion = Some(match self.state.active_suggestion {
                        None => 0,
                        Some(i) => (i + 1).min(last),
                    });
                }
                None
            }
            NavKey::Up => {
                if !self.state.suggestions.is_empty() {
                    self.state.active_suggestion =
                        Some(self.state.active_suggestion.map_or(0, |i| i.saturating_sub(1)));
                }
                None
            }
        }
    }

    pub fn on_suggestion_clicked(&mut self, index: usize) -> Option<Effect> {
        self.state.notice = None;
        self.select(index)
    }

    pub fn on_search_clicked(&mut self) -> Option<Effect> {
        self.state.notice = None;
        self.search()
    }

    pub fn on_suggestions_loaded(&mut self, id: RequestId, mut names: Vec<String>) {
        if !self.accept(Kind::Suggestions, id) {
            return;
        }
        names.truncate(crate::provider::SearchMode::Suggestions.limit());
        self.state.suggestions = names;
        self.state.active_suggestion = None;
    }

    pub fn on_suggestions_failed(&mut self, id: RequestId) {
        if self.accept(Kind::Suggestions, id) {
            self.state.suggestions.clear();
            self.state.active_suggestion = None;
        }
    }

    pub fn on_place_resolved(
        &mut self,
        id: RequestId,
        query: String,
        place: Option<Place>,
    ) -> Option<Effect> {
        if !self.accept(Kind::Resolve, id) {
            return None;
        }
        match place {
            Some(place) => {
                self.state.location = Location {
                    label: query,
                    coordinates: place.coordinates,
                };
                Some(self.fetch_forecast())
            }
            None => {
                self.state.notice = Some(PLACE_NOT_FOUND.to_string());
                None
            }
        }
    }

    pub fn on_place_failed(&mut self, id: RequestId) {
        // Nothing to undo; the location stays as it was.
        self.accept(Kind::Resolve, id);
    }

    pub fn on_forecast_loaded(&mut self, id: RequestId, forecast: Forecast) {
        if !self.accept(Kind::Forecast, id) {
            return;
        }
        self.state.clock_color = present::clock_color(forecast.symbol_code());
        self.state.forecast = Some(forecast);
        self.state.loading = false;
    }

    pub fn on_forecast_failed(&mut self, id: RequestId) {
        if self.accept(Kind::Forecast, id) {
            self.state.loading = false;
        }
    }

    pub fn on_tick(&mut self, time: String) {
        self.state.current_time = time;
    }

    fn select(&mut self, index: usize) -> Option<Effect> {
        let text = self.state.suggestions.get(index)?.clone();
        self.state.input = text.clone();
        self.clear_suggestions();
        Some(self.resolve(text))
    }

    fn search(&mut self) -> Option<Effect> {
        if self.state.input.trim().is_empty() {
            return None;
        }
        self.clear_suggestions();
        Some(self.resolve(self.state.input.clone()))
    }

    fn resolve(&mut self, query: String) -> Effect {
        let id = self.next_request_id();
        self.latest.resolve = Some(id);
        Effect::ResolvePlace { id, query }
    }

    fn fetch_forecast(&mut self) -> Effect {
        let id = self.next_request_id();
        self.latest.forecast = Some(id);
        self.state.loading = true;
        Effect::FetchForecast {
            id,
            coordinates: self.state.location.coordinates,
        }
    }

    fn clear_suggestions(&mut self) {
        self.state.suggestions.clear();
        self.state.active_suggestion = None;
        // Whatever is still in flight no longer matches the input.
        self.latest.suggestions = None;
    }

    fn next_request_id(&mut self) -> RequestId {
        self.next_id += 1;
        RequestId(self.next_id)
    }

    fn accept(&mut self, kind: Kind, id: RequestId) -> bool {
        let slot = match kind {
            Kind::Suggestions => &mut self.latest.suggestions,
            Kind::Resolve => &mut self.latest.resolve,
            Kind::Forecast => &mut self.latest.forecast,
        };
        let is_latest = *slot == Some(id);
        if is_latest {
            *slot = None;
        }
        match self.policy {
            StalePolicy::IgnoreStale => {
                if !is_latest {
                    debug!(?kind, %id, "ignoring stale response");
                }
                is_latest
            }
            StalePolicy::LastArrivalWins => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Suggestions,
    Resolve,
    Forecast,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> Widget {
        Widget::new(Location::oslo(), StalePolicy::IgnoreStale)
    }

    fn place(name: &str, lat: f64, lon: f64) -> Place {
        Place {
            display_name: name.to_string(),
            coordinates: Coordinates::new(lat, lon),
        }
    }

    fn forecast(symbol: &str) -> Forecast {
        serde_json::from_value(serde_json::json!({
            "properties": { "timeseries": [{
                "data": {
                    "instant": { "details": { "air_temperature": 4.2, "wind_speed": 6.1 } },
                    "next_1_hours": {
                        "summary": { "symbol_code": symbol },
                        "details": { "precipitation_amount": 1.3 }
                    }
                }
            }]}
        }))
        .expect("valid forecast")
    }

    fn with_suggestions(w: &mut Widget, names: &[&str]) {
        let effect = w.on_input_changed("Ber".into()).expect("fetch issued");
        w.on_suggestions_loaded(effect.id(), names.iter().map(|s| s.to_string()).collect());
    }

    #[test]
    fn typing_three_chars_fetches_suggestions() {
        let mut w = widget();

        let effect = w.on_input_changed("Ber".into());
        let Some(Effect::FetchSuggestions { id, query }) = effect else {
            panic!("expected a suggestion fetch");
        };
        assert_eq!(query, "Ber");

        w.on_suggestions_loaded(id, vec!["Berlin".into(), "Bern".into()]);
        assert_eq!(w.state().suggestions, vec!["Berlin", "Bern"]);
        assert_eq!(w.state().active_suggestion, None);
    }

    #[test]
    fn short_input_clears_without_fetching() {
        let mut w = widget();
        with_suggestions(&mut w, &["Berlin", "Bern"]);

        assert_eq!(w.on_input_changed("B".into()), None);
        assert!(w.state().suggestions.is_empty());

        assert_eq!(w.on_input_changed(String::new()), None);
        assert!(w.state().suggestions.is_empty());
    }

    #[test]
    fn input_length_counts_characters_not_bytes() {
        let mut w = widget();
        assert_eq!(w.on_input_changed("Ø".into()), None);
        assert!(w.on_input_changed("Øs".into()).is_some());
    }

    #[test]
    fn late_suggestions_after_clearing_are_dropped() {
        let mut w = widget();
        let effect = w.on_input_changed("Ber".into()).expect("fetch issued");
        w.on_input_changed("B".into());

        w.on_suggestions_loaded(effect.id(), vec!["Berlin".into()]);
        assert!(w.state().suggestions.is_empty());
    }

    #[test]
    fn suggestions_are_capped_at_ten() {
        let mut w = widget();
        let effect = w.on_input_changed("San".into()).expect("fetch issued");
        let names = (0..15).map(|i| format!("San {i}")).collect();

        w.on_suggestions_loaded(effect.id(), names);
        assert_eq!(w.state().suggestions.len(), 10);
        assert_eq!(w.state().suggestions[0], "San 0");
    }

    #[test]
    fn failed_suggestions_empty_the_list_silently() {
        let mut w = widget();
        with_suggestions(&mut w, &["Berlin"]);
        let effect = w.on_input_changed("Berl".into()).expect("fetch issued");

        w.on_suggestions_failed(effect.id());
        assert!(w.state().suggestions.is_empty());
        assert_eq!(w.state().notice, None);
    }

    #[test]
    fn arrow_keys_stay_in_bounds() {
        let mut w = widget();
        with_suggestions(&mut w, &["Berlin", "Bern"]);

        for _ in 0..5 {
            w.on_key(NavKey::Down);
        }
        assert_eq!(w.state().active_suggestion, Some(1));

        for _ in 0..5 {
            w.on_key(NavKey::Up);
        }
        assert_eq!(w.state().active_suggestion, Some(0));
    }

    #[test]
    fn arrow_up_from_nothing_lands_on_first() {
        let mut w = widget();
        with_suggestions(&mut w, &["Berlin", "Bern"]);

        w.on_key(NavKey::Up);
        assert_eq!(w.state().active_suggestion, Some(0));
    }

    #[test]
    fn arrow_keys_on_empty_list_keep_none() {
        let mut w = widget();

        w.on_key(NavKey::Down);
        assert_eq!(w.state().active_suggestion, None);
        w.on_key(NavKey::Up);
        assert_eq!(w.state().active_suggestion, None);
    }

    #[test]
    fn down_down_enter_selects_second_suggestion() {
        let mut w = widget();
        with_suggestions(&mut w, &["Berlin, Deutschland", "Bern, Schweiz"]);

        w.on_key(NavKey::Down);
        w.on_key(NavKey::Down);
        assert_eq!(w.state().active_suggestion, Some(1));

        let effect = w.on_key(NavKey::Enter);
        let Some(Effect::ResolvePlace { query, .. }) = effect else {
            panic!("expected a resolve");
        };
        assert_eq!(query, "Bern, Schweiz");
        assert_eq!(w.state().input, "Bern, Schweiz");
        assert!(w.state().suggestions.is_empty());
        assert_eq!(w.state().active_suggestion, None);
    }

    #[test]
    fn enter_without_selection_searches_input() {
        let mut w = widget();
        with_suggestions(&mut w, &["Berlin"]);

        let effect = w.on_key(NavKey::Enter);
        assert!(matches!(effect, Some(Effect::ResolvePlace { ref query, .. }) if query == "Ber"));
        assert!(w.state().suggestions.is_empty());
    }

    #[test]
    fn blank_search_does_nothing() {
        let mut w = widget();
        w.on_input_changed("  ".into());

        assert_eq!(w.on_search_clicked(), None);
        assert_eq!(w.on_key(NavKey::Enter), None);
    }

    #[test]
    fn click_selects_and_out_of_range_click_is_ignored() {
        let mut w = widget();
        with_suggestions(&mut w, &["Berlin", "Bern"]);

        assert_eq!(w.on_suggestion_clicked(7), None);
        assert_eq!(w.state().suggestions.len(), 2);

        let effect = w.on_suggestion_clicked(0);
        assert!(matches!(effect, Some(Effect::ResolvePlace { ref query, .. }) if query == "Berlin"));
        assert_eq!(w.state().active_suggestion, None);
    }

    #[test]
    fn resolved_place_updates_label_and_coordinates_together() {
        let mut w = widget();
        w.on_input_changed("Bergen".into());
        let resolve = w.on_search_clicked().expect("resolve issued");

        let effect = w.on_place_resolved(
            resolve.id(),
            "Bergen".into(),
            Some(place("Bergen, Vestland, Norge", 60.3943, 5.3259)),
        );

        assert_eq!(
            w.state().location,
            Location {
                label: "Bergen".into(),
                coordinates: Coordinates::new(60.3943, 5.3259),
            }
        );
        assert!(matches!(
            effect,
            Some(Effect::FetchForecast { coordinates, .. }) if coordinates == Coordinates::new(60.3943, 5.3259)
        ));
        assert!(w.state().loading);
    }

    #[test]
    fn not_found_shows_notice_and_keeps_location() {
        let mut w = widget();
        w.on_input_changed("Atlantis".into());
        let resolve = w.on_search_clicked().expect("resolve issued");

        let effect = w.on_place_resolved(resolve.id(), "Atlantis".into(), None);

        assert_eq!(effect, None);
        assert_eq!(w.state().location, Location::oslo());
        assert_eq!(w.state().notice.as_deref(), Some(PLACE_NOT_FOUND));

        w.on_input_changed("Atl".into());
        assert_eq!(w.state().notice, None);
    }

    #[test]
    fn failed_resolve_changes_nothing() {
        let mut w = widget();
        w.on_input_changed("Bergen".into());
        let resolve = w.on_search_clicked().expect("resolve issued");

        w.on_place_failed(resolve.id());
        assert_eq!(w.state().location, Location::oslo());
        assert_eq!(w.state().notice, None);
    }

    #[test]
    fn mount_fetches_default_location_and_sets_loading() {
        let mut w = widget();
        assert!(!w.state().loading);

        let effect = w.mount();
        assert!(matches!(
            effect,
            Effect::FetchForecast { coordinates, .. } if coordinates == Coordinates::new(59.9139, 10.7522)
        ));
        assert!(w.state().loading);
    }

    #[test]
    fn rain_showers_tint_clock_steel_blue() {
        let mut w = widget();
        let effect = w.mount();

        w.on_forecast_loaded(effect.id(), forecast("rainshowers_day"));

        assert!(!w.state().loading);
        assert_eq!(w.state().clock_color, ClockColor::SteelBlue);
        assert_eq!(
            present::snapshot_icon(w.state().forecast.as_ref()),
            Some(present::WeatherIcon::Rain)
        );
    }

    #[test]
    fn failed_forecast_keeps_previous_snapshot() {
        let mut w = widget();
        let first = w.mount();
        w.on_forecast_loaded(first.id(), forecast("clearsky_day"));

        w.on_input_changed("Bergen".into());
        let resolve = w.on_search_clicked().expect("resolve issued");
        let second = w
            .on_place_resolved(resolve.id(), "Bergen".into(), Some(place("Bergen", 60.39, 5.32)))
            .expect("forecast issued");
        assert!(w.state().loading);

        w.on_forecast_failed(second.id());

        assert!(!w.state().loading);
        assert_eq!(w.state().forecast, Some(forecast("clearsky_day")));
        assert_eq!(w.state().clock_color, ClockColor::Gold);
    }

    #[test]
    fn stale_forecast_is_ignored_and_loading_waits_for_latest() {
        let mut w = widget();
        let old = w.mount();
        w.on_input_changed("Bergen".into());
        let resolve = w.on_search_clicked().expect("resolve issued");
        let new = w
            .on_place_resolved(resolve.id(), "Bergen".into(), Some(place("Bergen", 60.39, 5.32)))
            .expect("forecast issued");

        w.on_forecast_loaded(old.id(), forecast("snow"));
        assert!(w.state().forecast.is_none());
        assert!(w.state().loading);

        w.on_forecast_loaded(new.id(), forecast("cloudy"));
        assert_eq!(w.state().clock_color, ClockColor::Silver);
        assert!(!w.state().loading);
    }

    #[test]
    fn last_arrival_wins_applies_stale_responses() {
        let mut w = Widget::new(Location::oslo(), StalePolicy::LastArrivalWins);
        let first = w.on_input_changed("Ber".into()).expect("fetch issued");
        let second = w.on_input_changed("Berg".into()).expect("fetch issued");

        w.on_suggestions_loaded(second.id(), vec!["Bergen".into()]);
        w.on_suggestions_loaded(first.id(), vec!["Berlin".into(), "Bern".into()]);

        assert_eq!(w.state().suggestions, vec!["Berlin", "Bern"]);
    }

    #[test]
    fn last_arrival_wins_stale_forecast_clears_loading() {
        let mut w = Widget::new(Location::oslo(), StalePolicy::LastArrivalWins);
        let old = w.mount();
        w.on_input_changed("Bergen".into());
        let resolve = w.on_search_clicked().expect("resolve issued");
        w.on_place_resolved(resolve.id(), "Bergen".into(), Some(place("Bergen", 60.39, 5.32)))
            .expect("forecast issued");
        assert!(w.state().loading);

        w.on_forecast_loaded(old.id(), forecast("snow"));

        assert!(!w.state().loading);
        assert_eq!(w.state().forecast, Some(forecast("snow")));
        assert_eq!(w.state().clock_color, ClockColor::NearWhite);
    }

    #[test]
    fn last_arrival_wins_stale_forecast_failure_clears_loading() {
        let mut w = Widget::new(Location::oslo(), StalePolicy::LastArrivalWins);
        let old = w.mount();
        w.on_input_changed("Bergen".into());
        let resolve = w.on_search_clicked().expect("resolve issued");
        w.on_place_resolved(resolve.id(), "Bergen".into(), Some(place("Bergen", 60.39, 5.32)))
            .expect("forecast issued");

        w.on_forecast_failed(old.id());

        assert!(!w.state().loading);
        assert!(w.state().forecast.is_none());
    }

    #[test]
    fn request_ids_increase() {
        let mut w = widget();
        let a = w.mount();
        let b = w.on_input_changed("Oslo".into()).expect("fetch issued");
        assert!(b.id() > a.id());
    }

    #[test]
    fn tick_updates_time() {
        let mut w = widget();
        w.handle(Event::Tick("12:34:56".into()));
        assert_eq!(w.state().current_time, "12:34:56");
    }
}
