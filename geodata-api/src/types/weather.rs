//! Weather endpoint wire types.

use serde::{Deserialize, Serialize};

fn default_limit() -> usize {
    6
}

/// Query parameters for GET /api/weather/data.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct WeatherQuery {
    /// City name; absent = the fixed Spanish demo city list
    pub city: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Current weather for one city, normalized from OpenWeather.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WeatherRecord {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub pressure: i32,
    pub wind_speed: f64,
    pub wind_deg: i32,
    pub weather_main: String,
    pub weather_description: String,
    pub weather_icon: String,
    pub clouds: i32,
    pub visibility: i32,
    pub lat: f64,
    pub lon: f64,
    pub timestamp: String,
}

/// Response for GET /api/weather/data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WeatherResponse {
    pub data: Vec<WeatherRecord>,
    pub count: usize,
    /// Present when serving simulated data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}
