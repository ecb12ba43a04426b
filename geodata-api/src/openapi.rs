//! OpenAPI Specification for the Geo-Data API
//!
//! Generates the OpenAPI document from the route annotations and wire
//! types via utoipa.

use utoipa::OpenApi;

use crate::error::{ApiError, ErrorCode};
use crate::routes::{self, air_quality, covid, elections, housing, weather};
use crate::types::*;

use geodata_core::{DataSource, HousingMetric, HousingTipo};

/// OpenAPI document for the Geo-Data API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Geo-Data API",
        version = "0.1.0",
        description = "Spanish open-data REST API: housing prices (INE, cached with snapshots), covid cases, 2023 election results, air quality and current weather",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT"),
    ),
    servers(
        (url = "http://localhost:8000", description = "Local Development")
    ),
    tags(
        (name = "Housing", description = "INE housing price index through the lazy-refresh cache and snapshot ledger"),
        (name = "Covid", description = "Covid case series and aggregates"),
        (name = "Elections", description = "2023 congress results per municipality"),
        (name = "AirQuality", description = "MITECO air-quality index stations"),
        (name = "Weather", description = "Current weather via OpenWeather"),
        (name = "Meta", description = "Service banner, dataset catalog and health"),
    ),
    paths(
        // === Housing Routes ===
        housing::get_data,
        housing::get_metadata,
        housing::get_snapshot_dates,
        housing::get_snapshot_data,
        housing::clear_cache,
        housing::health,

        // === Covid Routes ===
        covid::get_data,
        covid::get_stats,
        covid::get_filtered,

        // === Elections Routes ===
        elections::get_data,
        elections::get_municipality,
        elections::get_stats,
        elections::get_party,

        // === Air Quality Routes ===
        air_quality::get_stations,
        air_quality::get_station,
        air_quality::get_stats,
        air_quality::get_pollutants,
        air_quality::health,

        // === Weather Routes ===
        weather::get_data,

        // === Meta Routes ===
        routes::banner,
        routes::datasets,
        routes::health,
    ),
    components(
        schemas(
            // Errors
            ApiError,
            ErrorCode,

            // Core domain
            DataSource,
            HousingMetric,
            HousingTipo,

            // Housing
            HousingRecord,
            HousingDataResponse,
            HousingMetadataResponse,
            SnapshotRecord,
            SnapshotDatesResponse,
            SnapshotDataResponse,
            ClearCacheResponse,
            HousingHealthResponse,

            // Covid
            CovidRecord,
            CovidDataResponse,
            CovidCommunityTotals,
            CovidProvinceTotals,
            CovidTotals,
            CovidStatsResponse,
            CovidFiltersApplied,
            CovidFilterResponse,

            // Elections
            MunicipalityResult,
            MunicipalityLight,
            ElectionRows,
            ElectionsDataResponse,
            MunicipalityResponse,
            PartyTotals,
            ElectionTotals,
            WinnerShare,
            ElectionStatsResponse,
            PartyByCommunity,
            PartyResultsResponse,

            // Air quality
            Station,
            StationLight,
            StationRows,
            StationsResponse,
            StationDetailResponse,
            AirQualityStatsResponse,
            PollutantsResponse,
            AirQualityHealthResponse,

            // Weather
            WeatherRecord,
            WeatherResponse,

            // Meta
            routes::ApiBanner,
            routes::DatasetDescriptor,
            routes::DatasetsResponse,
            routes::HealthResponse,
        )
    ),
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_document_generates() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("Geo-Data API"));
    }

    #[test]
    fn test_openapi_covers_all_route_groups() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for prefix in [
            "/api/housing/",
            "/api/covid/",
            "/api/elections/",
            "/api/air-quality/",
            "/api/weather/",
        ] {
            assert!(
                paths.iter().any(|p| p.starts_with(prefix)),
                "missing paths under {}",
                prefix
            );
        }
        assert!(paths.iter().any(|p| p.as_str() == "/health"));
    }

    #[test]
    fn test_openapi_has_error_schema() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.schemas.contains_key("ApiError"));
        assert!(components.schemas.contains_key("HousingDataResponse"));
        assert!(components.schemas.contains_key("Station"));
    }
}
