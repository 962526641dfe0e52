use anyhow::{Context, anyhow, bail};
use chrono::Local;
use citycast_core::{
    Config, Location, SearchMode, StalePolicy,
    present::{Readings, snapshot_icon},
    provider::{forecast_source_from_config, geocoder_from_config, http_client},
    runtime::{self, Lookup},
};
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{Select, Text};
use tracing::info;

use crate::tui;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycast", version, about = "Weather for any city, in your terminal")]
pub struct Cli {
    /// How to treat a response that arrives after a newer request was sent.
    #[arg(long, value_enum, global = true)]
    pub stale: Option<StaleArg>,

    /// Defaults to the interactive widget.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the interactive weather widget.
    Tui,

    /// Print the current weather for a place and exit.
    Show {
        /// City or address.
        place: String,
    },

    /// Print the city suggestions the widget would offer for some text.
    Suggest {
        /// Partial city name, at least two characters.
        query: String,
    },

    /// Set the default city, User-Agent and stale-response policy.
    Configure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StaleArg {
    /// Only the newest request of each kind updates the widget.
    Ignore,
    /// Every response is applied; whichever lands last wins.
    Accept,
}

impl From<StaleArg> for StalePolicy {
    fn from(value: StaleArg) -> Self {
        match value {
            StaleArg::Ignore => StalePolicy::IgnoreStale,
            StaleArg::Accept => StalePolicy::LastArrivalWins,
        }
    }
}

impl Cli {
    pub fn is_interactive(&self) -> bool {
        matches!(self.command, None | Some(Command::Tui))
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        if let Some(stale) = self.stale {
            config.stale_responses = Some(stale.into());
        }

        match self.command.unwrap_or(Command::Tui) {
            Command::Tui => tui::run(&config).await,
            Command::Show { place } => show(&config, &place).await,
            Command::Suggest { query } => suggest(&config, &query).await,
            Command::Configure => configure(config).await,
        }
    }
}

async fn show(config: &Config, place: &str) -> anyhow::Result<()> {
    if place.trim().is_empty() {
        bail!("Place must not be empty");
    }

    let http = http_client(config)?;
    let geocoder = geocoder_from_config(config, http.clone());
    let forecasts = forecast_source_from_config(config, http);

    let found = runtime::lookup(geocoder.as_ref(), forecasts.as_ref(), place)
        .await
        .with_context(|| format!("Failed to look up weather for '{place}'"))?
        .ok_or_else(|| anyhow!("Place not found: '{place}'"))?;

    println!("{}", format_report(&found));
    Ok(())
}

async fn suggest(config: &Config, query: &str) -> anyhow::Result<()> {
    if query.chars().count() <= 1 {
        bail!("Suggestions need at least two characters, got '{query}'");
    }

    let http = http_client(config)?;
    let geocoder = geocoder_from_config(config, http);

    let places = geocoder
        .search(query, SearchMode::Suggestions)
        .await
        .with_context(|| format!("Failed to fetch suggestions for '{query}'"))?;

    if places.is_empty() {
        println!("No suggestions for '{query}'.");
    }
    for (i, place) in places.iter().enumerate() {
        println!("{:>2}. {}", i + 1, place.display_name);
    }
    Ok(())
}

async fn configure(mut config: Config) -> anyhow::Result<()> {
    let agent = Text::new("User-Agent (application name and a contact):")
        .with_default(config.user_agent())
        .prompt()
        .context("Failed to read User-Agent")?;
    config.set_user_agent(agent);

    let current = config.default_location();
    let city = Text::new("Default city:")
        .with_default(&current.label)
        .prompt()
        .context("Failed to read default city")?;

    if city.trim() != current.label {
        let http = http_client(&config)?;
        let geocoder = geocoder_from_config(&config, http);
        let place = geocoder
            .search(city.trim(), SearchMode::Single)
            .await
            .with_context(|| format!("Failed to look up '{city}'"))?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Place not found: '{city}'"))?;

        println!("Found: {}", place.display_name);
        config.set_default_location(&Location {
            label: city.trim().to_string(),
            coordinates: place.coordinates,
        });
    }

    let policies = vec![StaleArg::Ignore, StaleArg::Accept];
    let policy = Select::new("Late responses from older requests:", policies)
        .prompt()
        .context("Failed to read stale-response policy")?;
    config.stale_responses = Some(policy.into());

    config.save()?;
    let path = Config::config_file_path()?;
    info!(path = %path.display(), "configuration saved");
    println!("Saved configuration to {}", path.display());
    Ok(())
}

impl std::fmt::Display for StaleArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StaleArg::Ignore => "ignore (only the newest request counts)",
            StaleArg::Accept => "accept (whatever arrives last wins)",
        })
    }
}

fn format_report(found: &Lookup) -> String {
    let readings = Readings::from_forecast(&found.forecast);
    let mut lines = vec![format!(
        "{} ({})",
        found.location.label, found.place.display_name
    )];

    let headline = match snapshot_icon(Some(&found.forecast)) {
        Some(icon) => format!("{} {}  {}", icon.glyph(), icon.label(), readings.temperature_text()),
        None => readings.temperature_text(),
    };
    lines.push(headline);
    lines.push(format!("Precipitation: {}", readings.precipitation_text()));
    lines.push(format!("Wind: {}", readings.wind_text()));

    if let Some(updated) = found.forecast.updated_at() {
        lines.push(format!(
            "Updated: {}",
            updated.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use citycast_core::{Coordinates, Place};

    fn lookup(forecast: &str) -> Lookup {
        Lookup {
            location: Location {
                label: "Oslo".into(),
                coordinates: Coordinates::new(59.9139, 10.7522),
            },
            place: Place {
                display_name: "Oslo, Norge".into(),
                coordinates: Coordinates::new(59.9139, 10.7522),
            },
            forecast: serde_json::from_str(forecast).expect("valid forecast json"),
        }
    }

    #[test]
    fn report_lists_all_readings() {
        let found = lookup(
            r#"{"properties":{"meta":{"updated_at":"2024-01-15T11:32:14Z"},"timeseries":[{"data":{
                "instant":{"details":{"air_temperature":-2.5,"wind_speed":3.4}},
                "next_1_hours":{"summary":{"symbol_code":"lightsnow"},"details":{"precipitation_amount":0.2}}
            }}]}}"#,
        );

        let report = format_report(&found);

        assert!(report.starts_with("Oslo (Oslo, Norge)"));
        assert!(report.contains("snow  -2.5°C"));
        assert!(report.contains("Precipitation: 0.2 mm"));
        assert!(report.contains("Wind: 3.4 m/s"));
        assert!(report.contains("Updated: 2024-01-1"));
    }

    #[test]
    fn report_leaves_missing_values_blank() {
        let found = lookup(
            r#"{"properties":{"timeseries":[{"data":{"instant":{"details":{"air_temperature":1}}}}]}}"#,
        );

        let report = format_report(&found);

        assert!(report.contains("clear  1°C"));
        assert!(report.contains("Precipitation:  mm"));
        assert!(report.contains("Wind:  m/s"));
        assert!(!report.contains("Updated"));
    }

    #[test]
    fn stale_arg_maps_to_policy() {
        assert_eq!(StalePolicy::from(StaleArg::Ignore), StalePolicy::IgnoreStale);
        assert_eq!(StalePolicy::from(StaleArg::Accept), StalePolicy::LastArrivalWins);
    }

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::parse_from(["citycast"]);
        assert!(cli.is_interactive());

        let cli = Cli::parse_from(["citycast", "show", "Oslo", "--stale", "accept"]);
        assert!(!cli.is_interactive());
        assert_eq!(cli.stale, Some(StaleArg::Accept));
    }
}
