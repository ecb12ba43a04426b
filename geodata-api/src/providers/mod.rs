//! Upstream open-data providers.
//!
//! One module per feed: the INE housing-price CSV (the only provider
//! behind the cache/snapshot service), the MITECO air-quality index and
//! the OpenWeather current-weather API. Each module also ships a
//! deterministic-enough mock generator for local development and
//! upstream outages.

pub mod ine;
pub mod miteco;
pub mod openweather;

pub use ine::{IneHousingFetcher, MockHousingFetcher};
pub use miteco::AirQualityProvider;
pub use openweather::WeatherProvider;
