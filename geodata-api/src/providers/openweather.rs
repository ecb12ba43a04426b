//! OpenWeather current-weather provider.
//!
//! Queries the `/weather` endpoint with metric units and Spanish
//! descriptions and normalizes the payload into [`WeatherRecord`]s.
//! Without an API key (or when the upstream call fails) the endpoints
//! serve simulated weather over the demo city list.

use std::time::Duration;

use chrono::Utc;
use rand::Rng;

use geodata_store::FetchError;

use crate::config::ApiConfig;
use crate::providers::miteco::DEMO_CITIES;
use crate::types::WeatherRecord;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Weather provider over the OpenWeather current-weather API.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl WeatherProvider {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(
            config.openweather_api_key.clone(),
            config.openweather_base_url.clone(),
        )
    }

    /// Whether live data can be requested at all.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Current weather for one city by name.
    pub async fn fetch_city(&self, city: &str) -> Result<WeatherRecord, FetchError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| FetchError::upstream("no OpenWeather API key configured"))?;

        let url = format!("{}/weather", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", key),
                ("units", "metric"),
                ("lang", "es"),
            ])
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| FetchError::upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::payload(e.to_string()))?;
        Ok(record_from_payload(&payload, city))
    }

    /// Current weather for the demo city list, up to `limit` cities.
    /// Cities that fail individually are skipped.
    pub async fn fetch_demo_cities(&self, limit: usize) -> Result<Vec<WeatherRecord>, FetchError> {
        let mut records = Vec::new();
        for &(name, _, _) in DEMO_CITIES.iter().take(limit.min(DEMO_CITIES.len())) {
            match self.fetch_city(name).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(city = name, error = %e, "weather fetch failed, skipping city")
                }
            }
        }
        if records.is_empty() {
            return Err(FetchError::upstream("no city returned weather data"));
        }
        Ok(records)
    }
}

/// Map an OpenWeather payload onto the wire shape, defaulting any
/// missing field rather than failing the whole record.
fn record_from_payload(payload: &serde_json::Value, fallback_city: &str) -> WeatherRecord {
    let f = |path: &[&str]| -> f64 {
        path.iter()
            .fold(Some(payload), |v, k| v.and_then(|v| v.get(k)))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    };
    let s = |path: &[&str], default: &str| -> String {
        path.iter()
            .fold(Some(payload), |v, k| v.and_then(|v| v.get(k)))
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    };
    let weather0 = payload
        .get("weather")
        .and_then(|w| w.get(0))
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    let ws = |key: &str, default: &str| -> String {
        weather0
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or(default)
            .to_string()
    };

    WeatherRecord {
        city: s(&["name"], fallback_city),
        country: s(&["sys", "country"], "ES"),
        temperature: f(&["main", "temp"]),
        feels_like: f(&["main", "feels_like"]),
        humidity: f(&["main", "humidity"]) as i32,
        pressure: f(&["main", "pressure"]) as i32,
        wind_speed: f(&["wind", "speed"]),
        wind_deg: f(&["wind", "deg"]) as i32,
        weather_main: ws("main", "Unknown"),
        weather_description: ws("description", "sin datos"),
        weather_icon: ws("icon", "01d"),
        clouds: f(&["clouds", "all"]) as i32,
        visibility: f(&["visibility"]) as i32,
        lat: f(&["coord", "lat"]),
        lon: f(&["coord", "lon"]),
        timestamp: Utc::now().to_rfc3339(),
    }
}

// ============================================================================
// MOCK WEATHER
// ============================================================================

/// Simulated weather for one demo city.
fn mock_record(name: &str, lat: f64, lon: f64) -> WeatherRecord {
    let mut rng = rand::rng();
    let temperature: f64 = rng.random_range(8.0..32.0);
    let conditions = [
        ("Clear", "cielo claro", "01d"),
        ("Clouds", "nubes dispersas", "03d"),
        ("Clouds", "muy nuboso", "04d"),
        ("Rain", "lluvia ligera", "10d"),
    ];
    let (main, description, icon) = conditions[rng.random_range(0..conditions.len())];

    WeatherRecord {
        city: name.to_string(),
        country: "ES".to_string(),
        temperature: (temperature * 10.0).round() / 10.0,
        feels_like: ((temperature + rng.random_range(-2.0..2.0)) * 10.0).round() / 10.0,
        humidity: rng.random_range(30..90),
        pressure: rng.random_range(995..1030),
        wind_speed: (rng.random_range(0.0..12.0f64) * 10.0).round() / 10.0,
        wind_deg: rng.random_range(0..360),
        weather_main: main.to_string(),
        weather_description: description.to_string(),
        weather_icon: icon.to_string(),
        clouds: rng.random_range(0..100),
        visibility: 10_000,
        lat,
        lon,
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Simulated weather for up to `limit` demo cities.
pub fn mock_weather(limit: usize) -> Vec<WeatherRecord> {
    DEMO_CITIES
        .iter()
        .take(limit.min(DEMO_CITIES.len()))
        .map(|(name, lat, lon)| mock_record(name, *lat, *lon))
        .collect()
}

/// Simulated weather for an arbitrary city name; coordinates come from
/// the demo list when the city is on it.
pub fn mock_weather_for_city(city: &str) -> WeatherRecord {
    let (lat, lon) = DEMO_CITIES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(city))
        .map(|(_, lat, lon)| (*lat, *lon))
        .unwrap_or((40.4168, -3.7038));
    mock_record(city, lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_full_payload() {
        let payload = json!({
            "name": "Madrid",
            "sys": {"country": "ES"},
            "coord": {"lat": 40.4168, "lon": -3.7038},
            "main": {"temp": 21.5, "feels_like": 20.9, "humidity": 45, "pressure": 1016},
            "wind": {"speed": 3.6, "deg": 210},
            "clouds": {"all": 20},
            "visibility": 10000,
            "weather": [{"main": "Clear", "description": "cielo claro", "icon": "01d"}]
        });

        let record = record_from_payload(&payload, "fallback");
        assert_eq!(record.city, "Madrid");
        assert_eq!(record.temperature, 21.5);
        assert_eq!(record.humidity, 45);
        assert_eq!(record.wind_deg, 210);
        assert_eq!(record.weather_description, "cielo claro");
        assert_eq!(record.lat, 40.4168);
    }

    #[test]
    fn test_record_from_sparse_payload() {
        let payload = json!({"main": {"temp": 15.0}});
        let record = record_from_payload(&payload, "Cuenca");

        assert_eq!(record.city, "Cuenca");
        assert_eq!(record.country, "ES");
        assert_eq!(record.temperature, 15.0);
        assert_eq!(record.feels_like, 0.0);
        assert_eq!(record.weather_main, "Unknown");
    }

    #[test]
    fn test_mock_weather_limit_and_ranges() {
        let records = mock_weather(4);
        assert_eq!(records.len(), 4);
        for record in &records {
            assert!((8.0..32.0).contains(&record.temperature));
            assert!((0..=360).contains(&record.wind_deg));
            assert_eq!(record.country, "ES");
        }
        assert_eq!(mock_weather(100).len(), DEMO_CITIES.len());
    }

    #[test]
    fn test_mock_weather_known_city_coords() {
        let record = mock_weather_for_city("barcelona");
        assert!((record.lat - 41.3851).abs() < 1e-9);

        // Unknown cities fall back to Madrid's coordinates.
        let record = mock_weather_for_city("Cuenca");
        assert!((record.lat - 40.4168).abs() < 1e-9);
    }
}
