//! API Configuration Module
//!
//! Configuration for CORS, the housing cache TTL and upstream feed
//! settings. Loaded from environment variables with sensible defaults
//! for development.

use std::time::Duration;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration for CORS and cache tuning.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    /// Example: "https://geodata.example.org,http://localhost:5173"
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    // ========================================================================
    // Housing Cache Configuration
    // ========================================================================
    /// Time-to-live of the housing cache generation.
    pub housing_ttl: Duration,

    // ========================================================================
    // Upstream Feeds
    // ========================================================================
    /// OpenWeather API key. `None` means serve mock weather data.
    pub openweather_api_key: Option<String>,

    /// OpenWeather base URL.
    pub openweather_base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            // CORS defaults: permissive for development
            cors_origins: Vec::new(), // Empty = allow all
            cors_allow_credentials: false,
            cors_max_age_secs: 86400, // 24 hours

            housing_ttl: geodata_store::DEFAULT_CACHE_TTL,

            openweather_api_key: None,
            openweather_base_url: "https://api.openweathermap.org/data/2.5".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `GEODATA_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `GEODATA_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `GEODATA_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `GEODATA_HOUSING_TTL_HOURS`: Housing cache TTL in hours (default: 24)
    /// - `OPENWEATHER_API_KEY`: OpenWeather key (unset = mock weather data)
    /// - `OPENWEATHER_BASE_URL`: OpenWeather base URL
    pub fn from_env() -> Self {
        let cors_origins = std::env::var("GEODATA_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = std::env::var("GEODATA_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = std::env::var("GEODATA_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        let housing_ttl = std::env::var("GEODATA_HOUSING_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|hours| Duration::from_secs(hours * 3600))
            .unwrap_or(geodata_store::DEFAULT_CACHE_TTL);

        let openweather_api_key = std::env::var("OPENWEATHER_API_KEY")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let openweather_base_url = std::env::var("OPENWEATHER_BASE_URL")
            .unwrap_or_else(|_| "https://api.openweathermap.org/data/2.5".to_string());

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
            housing_ttl,
            openweather_api_key,
            openweather_base_url,
        }
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_allow_credentials);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert_eq!(config.housing_ttl, Duration::from_secs(24 * 3600));
        assert!(config.openweather_api_key.is_none());
    }

    #[test]
    fn test_is_production() {
        let mut config = ApiConfig::default();
        assert!(!config.is_production());

        config.cors_origins = vec!["https://geodata.example.org".to_string()];
        assert!(config.is_production());
    }
}
