//! Weather lookup proxy with a time-boxed cache
//!
//! Free-text location in, current conditions plus a multi-day forecast
//! out. Lookups run a geocode-then-forecast chain against Open-Meteo and
//! are cached for a bounded time keyed by the raw location string. When
//! the requested location cannot be resolved the configured fallback
//! location is tried; when upstream fails entirely a mock payload is
//! returned instead of an error, so the display client never sees an
//! upstream failure.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::WeatherConfig;

const GEOCODE_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Weather payload served to the display client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    /// Resolved place name (may differ from the query)
    pub location: String,
    /// Current temperature in degrees Celsius
    pub temperature: f64,
    /// Human-readable current condition
    pub condition: String,
    /// Display-mode hint: true during daylight hours
    pub is_day: bool,
    pub forecast: Vec<DailyForecast>,
    /// True when this is the hardcoded payload after total upstream failure
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub date: String,
    pub temperature_max: f64,
    pub temperature_min: f64,
    pub condition: String,
}

struct CacheEntry {
    fetched_at: DateTime<Utc>,
    report: WeatherReport,
}

/// Weather proxy with an in-memory, time-boxed cache.
pub struct WeatherService {
    client: reqwest::Client,
    cache: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    fallback_location: String,
    forecast_days: u8,
}

impl WeatherService {
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            cache: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(config.cache_ttl_secs as i64),
            fallback_location: config.fallback_location.clone(),
            forecast_days: config.forecast_days,
        })
    }

    /// Look up weather for a free-text location.
    ///
    /// Never fails: upstream errors degrade to the fallback location and
    /// finally to a mock payload.
    pub async fn lookup(&self, location: Option<&str>) -> WeatherReport {
        let query = location
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.fallback_location.as_str())
            .to_string();

        // Cache is keyed by the raw location string
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&query) {
                if Utc::now() - entry.fetched_at < self.ttl {
                    debug!(location = %query, "Serving cached weather");
                    return entry.report.clone();
                }
            }
        }

        let report = match self.fetch(&query).await {
            Ok(report) => report,
            Err(e) => {
                warn!(location = %query, error = %e, "Weather lookup failed, trying fallback location");
                if query != self.fallback_location {
                    match self.fetch(&self.fallback_location).await {
                        Ok(report) => report,
                        Err(e) => {
                            warn!(error = %e, "Fallback weather lookup failed, serving mock payload");
                            return self.mock_report();
                        }
                    }
                } else {
                    return self.mock_report();
                }
            }
        };

        let mut cache = self.cache.write().await;
        cache.insert(
            query.clone(),
            CacheEntry {
                fetched_at: Utc::now(),
                report: report.clone(),
            },
        );
        info!(location = %query, resolved = %report.location, "Cached weather report");
        report
    }

    /// Geocode-then-forecast chain.
    async fn fetch(&self, location: &str) -> Result<WeatherReport> {
        let place = self.geocode(location).await?;
        let response = self.forecast(place.latitude, place.longitude).await?;

        let current = response.current_weather;
        let daily = response.daily;

        let forecast = daily
            .time
            .iter()
            .enumerate()
            .map(|(i, date)| DailyForecast {
                date: date.clone(),
                temperature_max: daily.temperature_2m_max.get(i).copied().unwrap_or_default(),
                temperature_min: daily.temperature_2m_min.get(i).copied().unwrap_or_default(),
                condition: describe_weather_code(daily.weathercode.get(i).copied().unwrap_or(0))
                    .to_string(),
            })
            .collect();

        Ok(WeatherReport {
            location: place.name,
            temperature: current.temperature,
            condition: describe_weather_code(current.weathercode).to_string(),
            is_day: current.is_day == 1,
            forecast,
            fallback: false,
        })
    }

    async fn geocode(&self, location: &str) -> Result<GeoPlace> {
        let response: GeocodeResponse = self
            .client
            .get(GEOCODE_URL)
            .query(&[("name", location), ("count", "1")])
            .send()
            .await
            .context("Geocoding request failed")?
            .error_for_status()
            .context("Geocoding returned an error status")?
            .json()
            .await
            .context("Failed to decode geocoding response")?;

        response
            .results
            .and_then(|mut places| {
                if places.is_empty() {
                    None
                } else {
                    Some(places.remove(0))
                }
            })
            .ok_or_else(|| anyhow!("No geocoding match for {location:?}"))
    }

    async fn forecast(&self, latitude: f64, longitude: f64) -> Result<ForecastResponse> {
        self.client
            .get(FORECAST_URL)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_string()),
                (
                    "daily",
                    "temperature_2m_max,temperature_2m_min,weathercode".to_string(),
                ),
                ("timezone", "auto".to_string()),
                ("forecast_days", self.forecast_days.to_string()),
            ])
            .send()
            .await
            .context("Forecast request failed")?
            .error_for_status()
            .context("Forecast returned an error status")?
            .json()
            .await
            .context("Failed to decode forecast response")
    }

    /// Hardcoded payload served when every upstream lookup fails.
    fn mock_report(&self) -> WeatherReport {
        WeatherReport {
            location: self.fallback_location.clone(),
            temperature: 18.0,
            condition: "Partly cloudy".to_string(),
            is_day: true,
            forecast: Vec::new(),
            fallback: true,
        }
    }
}

/// Human-readable condition for a WMO weather interpretation code.
pub fn describe_weather_code(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51..=57 => "Drizzle",
        61..=67 => "Rain",
        71..=77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95..=99 => "Thunderstorm",
        _ => "Unknown",
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    results: Option<Vec<GeoPlace>>,
}

#[derive(Debug, Deserialize)]
struct GeoPlace {
    name: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
    daily: DailyBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    weathercode: u8,
    is_day: u8,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<String>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    weathercode: Vec<u8>,
}
