// SPDX-FileCopyrightText: 2026 Chatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenWeather current-conditions client.

use std::time::Duration;

use async_trait::async_trait;
use chatrelay_config::model::WeatherConfig;
use chatrelay_core::{RelayError, WeatherService};
use serde::Deserialize;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    name: String,
    #[serde(default)]
    weather: Vec<Condition>,
    main: MainReadings,
    #[serde(default)]
    wind: Option<Wind>,
    #[serde(default)]
    sys: Option<Sys>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct Sys {
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// [`WeatherService`] backed by the OpenWeather `/weather` endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    units: String,
    lang: String,
}

impl OpenWeatherClient {
    /// Builds a client from the `[weather]` section. Returns `None` without an API key.
    pub fn from_config(config: &WeatherConfig) -> Result<Option<Self>, RelayError> {
        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Lookup {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Some(Self {
            client,
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            units: config.units.clone(),
            lang: config.lang.clone(),
        }))
    }

    fn unit_symbols(&self) -> (&'static str, &'static str) {
        match self.units.as_str() {
            "imperial" => ("°F", "mph"),
            "standard" => ("K", "m/s"),
            _ => ("°C", "m/s"),
        }
    }

    fn format(&self, w: &CurrentWeather) -> String {
        let (temp_unit, speed_unit) = self.unit_symbols();
        let place = match w.sys.as_ref().and_then(|s| s.country.as_deref()) {
            Some(country) => format!("{}, {country}", w.name),
            None => w.name.clone(),
        };
        let description = w
            .weather
            .first()
            .map(|c| c.description.as_str())
            .unwrap_or("unknown conditions");
        let mut summary = format!(
            "{place}: {description}, {:.1}{temp_unit} (feels like {:.1}{temp_unit}), humidity {}%",
            w.main.temp, w.main.feels_like, w.main.humidity
        );
        if let Some(wind) = &w.wind {
            summary.push_str(&format!(", wind {:.1} {speed_unit}", wind.speed));
        }
        summary
    }
}

#[async_trait]
impl WeatherService for OpenWeatherClient {
    async fn current(&self, location: &str) -> Result<String, RelayError> {
        let url = format!("{}/weather", self.base_url);
        debug!(location, "fetching current weather");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", location),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(|e| RelayError::Lookup {
                message: format!("weather request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| RelayError::Lookup {
            message: format!("failed to read weather response: {e}"),
        })?;
        if !status.is_success() {
            let detail = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(RelayError::Lookup {
                message: format!("weather lookup for {location} failed: {detail}"),
            });
        }

        let weather: CurrentWeather = serde_json::from_str(&body).map_err(|e| RelayError::Lookup {
            message: format!("unexpected weather response: {e}"),
        })?;
        Ok(self.format(&weather))
    }
}

/// Stand-in used when no weather API key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredWeather;

#[async_trait]
impl WeatherService for UnconfiguredWeather {
    async fn current(&self, _location: &str) -> Result<String, RelayError> {
        Err(RelayError::Lookup {
            message: "weather API key is not configured".into(),
        })
    }
}
