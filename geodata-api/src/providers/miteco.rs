//! MITECO air-quality provider.
//!
//! Downloads the national ICA (Índice de Calidad del Aire) last-hour
//! CSV and converts station rows into the unified [`Station`] shape.
//! The ICA scale runs 1-6; it maps onto the 1-5 AQI used on the wire
//! with 6 clamping to 5. Mock stations over the demo city list back
//! the endpoints when the feed is down.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;

use geodata_store::FetchError;

use crate::types::Station;

/// ICA last-hour feed.
const MITECO_LAST_HOUR_URL: &str = "https://ica.miteco.es/datos/ica-ultima-hora.csv";

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Pollutants reported by the ICA feed.
pub static POLLUTANTS: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("PM2.5", "Particulate matter < 2.5 μm"),
        ("PM10", "Particulate matter < 10 μm"),
        ("NO2", "Nitrogen dioxide"),
        ("O3", "Ozone"),
        ("SO2", "Sulphur dioxide"),
        ("CO", "Carbon monoxide"),
        ("BaP", "Benzo(a)pyrene"),
    ])
});

/// Demo cities used by the mock generators (shared with the weather
/// provider's fallback).
pub const DEMO_CITIES: [(&str, f64, f64); 6] = [
    ("Madrid", 40.4168, -3.7038),
    ("Barcelona", 41.3851, 2.1734),
    ("Valencia", 39.4699, -0.3763),
    ("Sevilla", 37.3891, -5.9845),
    ("Bilbao", 43.2630, -2.9350),
    ("Málaga", 36.7194, -4.4200),
];

/// Map an ICA index (1-6) to the wire AQI (1-5); 6 clamps to 5, and
/// anything else means "no data".
pub fn ica_to_aqi(ica: i32) -> i32 {
    match ica {
        1..=5 => ica,
        6 => 5,
        _ => 0,
    }
}

/// Map a MITECO station type to a station class.
fn station_class_for(tipo: &str) -> i32 {
    match tipo {
        "FONDO" => 1,
        "INDUSTRIAL" => 2,
        "RURAL" => 3,
        "TRAFICO" => 4,
        _ => 1,
    }
}

/// Quality text, map color and recommendation for an AQI level.
pub fn quality_info(aqi: i32) -> (&'static str, &'static str, &'static str) {
    match aqi {
        1 => ("Buena", "#00e400", "Calidad del aire satisfactoria."),
        2 => ("Moderada", "#feca57", "Aceptable para la mayoría."),
        3 => (
            "Mala",
            "#ff7e00",
            "Grupos sensibles deben reducir actividad exterior.",
        ),
        4 => (
            "Muy Mala",
            "#ff0000",
            "Todos deben reducir actividad exterior.",
        ),
        5 => ("Extremadamente Mala", "#8f3f97", "Evitar actividad exterior."),
        _ => ("Sin datos", "#cccccc", "No hay datos disponibles."),
    }
}

/// One parsed row of the ICA CSV.
#[derive(Debug, Clone)]
struct IcaReading {
    cod_estacion: String,
    nombre: String,
    tipo: String,
    lat: f64,
    lon: f64,
    activa: bool,
    fecha: String,
    indice_ica: Option<i32>,
    debido_a: Option<String>,
}

/// Air-quality provider over the MITECO ICA feed.
#[derive(Debug, Clone)]
pub struct AirQualityProvider {
    client: reqwest::Client,
    url: String,
}

impl Default for AirQualityProvider {
    fn default() -> Self {
        Self::new(MITECO_LAST_HOUR_URL)
    }
}

impl AirQualityProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// Download and convert the last-hour station list.
    pub async fn fetch_stations(&self) -> Result<Vec<Station>, FetchError> {
        tracing::info!(url = %self.url, "downloading MITECO ICA CSV");
        let response = self
            .client
            .get(&self.url)
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

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::upstream(e.to_string()))?;

        let readings = parse_ica_csv(&text)?;
        tracing::info!(stations = readings.len(), "MITECO ICA CSV parsed");
        Ok(readings.iter().map(station_from_reading).collect())
    }
}

/// Parse the ICA CSV. Rows missing a station code, a name or usable
/// coordinates are skipped; a row with no index is kept as a station
/// without data.
fn parse_ica_csv(text: &str) -> Result<Vec<IcaReading>, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| FetchError::payload(e.to_string()))?
        .clone();
    let col = |name: &str| headers.iter().position(|h| h.trim() == name);

    let (Some(i_cod), Some(i_nombre), Some(i_lat), Some(i_lon)) = (
        col("cod_estacion"),
        col("nombre"),
        col("latitud"),
        col("longitud"),
    ) else {
        return Err(FetchError::payload("missing expected ICA columns"));
    };
    let i_tipo = col("tipo");
    let i_activa = col("activa");
    let i_fecha = col("fecha");
    let i_indice = col("indice");
    let i_debido = col("debido_a");

    let field = |record: &csv::StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| record.get(i))
            .unwrap_or_default()
            .trim()
            .to_string()
    };

    let mut readings = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| FetchError::payload(e.to_string()))?;

        let cod_estacion = field(&record, Some(i_cod));
        let nombre = field(&record, Some(i_nombre));
        if cod_estacion.is_empty() || nombre.is_empty() {
            continue;
        }

        let lat = field(&record, Some(i_lat)).parse::<f64>().ok();
        let lon = field(&record, Some(i_lon)).parse::<f64>().ok();
        let (Some(lat), Some(lon)) = (lat, lon) else {
            continue;
        };
        if lat == 0.0 || lon == 0.0 {
            continue;
        }

        let fecha = field(&record, i_fecha);
        let debido_a = field(&record, i_debido);
        readings.push(IcaReading {
            cod_estacion,
            nombre,
            tipo: field(&record, i_tipo),
            lat,
            lon,
            activa: field(&record, i_activa).eq_ignore_ascii_case("true"),
            fecha: if fecha.is_empty() {
                Utc::now().to_rfc3339()
            } else {
                fecha
            },
            indice_ica: field(&record, i_indice).parse::<i32>().ok(),
            debido_a: if debido_a.is_empty() {
                None
            } else {
                Some(debido_a)
            },
        });
    }

    if readings.is_empty() {
        return Err(FetchError::payload("ICA CSV contained no usable stations"));
    }
    Ok(readings)
}

fn station_id_for(cod_estacion: &str) -> i64 {
    if let Ok(id) = cod_estacion.parse::<i64>() {
        return id;
    }
    let mut hasher = DefaultHasher::new();
    cod_estacion.hash(&mut hasher);
    (hasher.finish() % 1_000_000) as i64
}

fn station_from_reading(r: &IcaReading) -> Station {
    let has_data = matches!(r.indice_ica, Some(ica) if ica > 0);
    let aqi = r.indice_ica.map(ica_to_aqi).unwrap_or(0);
    let (text, color, recommendation) = quality_info(if has_data { aqi } else { 0 });

    Station {
        id: station_id_for(&r.cod_estacion),
        station_code: r.cod_estacion.clone(),
        eoi_code: format!("ES{}", r.cod_estacion),
        name: r.nombre.clone(),
        country_code: "ES".to_string(),
        country: "Spain".to_string(),
        station_class: station_class_for(&r.tipo),
        station_type: r.tipo.clone(),
        lat: r.lat,
        lon: r.lon,
        available_pollutants: r.debido_a.iter().cloned().collect(),
        // Concentration proxy derived from the index; the feed itself
        // only publishes the index.
        last_measurement: if has_data {
            r.indice_ica.map(|ica| ica as f64 * 10.0)
        } else {
            None
        },
        last_aqi: if has_data { aqi } else { 0 },
        pollutant: r.debido_a.clone(),
        unit: has_data.then(|| "ICA".to_string()),
        quality_text: text.to_string(),
        quality_color: color.to_string(),
        recommendation: if has_data {
            recommendation.to_string()
        } else {
            "Estación sin datos en la última medición.".to_string()
        },
        last_updated: r.fecha.clone(),
        is_mock: false,
        has_real_data: has_data,
        is_active: r.activa,
        data_source: "MITECO ICA".to_string(),
        ica_index: r.indice_ica,
        ica_contaminant: r.debido_a.clone(),
    }
}

/// Mock stations over the demo city list.
pub fn mock_stations(limit: usize) -> Vec<Station> {
    let mut rng = rand::rng();
    DEMO_CITIES
        .iter()
        .take(limit.min(DEMO_CITIES.len()))
        .enumerate()
        .map(|(i, (name, lat, lon))| {
            let pm25: f64 = rng.random_range(10.0..25.0);
            let aqi = aqi_for_pm25(pm25);
            let (text, color, recommendation) = quality_info(aqi);
            Station {
                id: 1000 + i as i64,
                station_code: format!("MOCK{:04}", i),
                eoi_code: format!("ESMOCK{:04}", i),
                name: format!("Estación {}", name),
                country_code: "ES".to_string(),
                country: "Spain".to_string(),
                station_class: rng.random_range(1..=4),
                station_type: "MOCK".to_string(),
                lat: lat + rng.random_range(-0.05..0.05),
                lon: lon + rng.random_range(-0.05..0.05),
                available_pollutants: vec![
                    "PM2.5".to_string(),
                    "PM10".to_string(),
                    "NO2".to_string(),
                ],
                last_measurement: Some((pm25 * 100.0).round() / 100.0),
                last_aqi: aqi,
                pollutant: Some("PM2.5".to_string()),
                unit: Some("µg/m³".to_string()),
                quality_text: text.to_string(),
                quality_color: color.to_string(),
                recommendation: recommendation.to_string(),
                last_updated: Utc::now().to_rfc3339(),
                is_mock: true,
                has_real_data: false,
                is_active: true,
                data_source: "Datos simulados".to_string(),
                ica_index: None,
                ica_contaminant: None,
            }
        })
        .collect()
}

/// WHO breakpoints for PM2.5.
fn aqi_for_pm25(concentration: f64) -> i32 {
    match concentration {
        c if c <= 15.0 => 1,
        c if c <= 30.0 => 2,
        c if c <= 55.0 => 3,
        c if c <= 110.0 => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
cod_estacion,nombre,tipo,latitud,longitud,activa,fecha,indice,debido_a
28079004,Pza. de España,TRAFICO,40.4239,-3.7122,true,2024-06-01T10:00:00,2,NO2
08019043,Eixample,FONDO,41.3853,2.1539,true,2024-06-01T10:00:00,6,O3
41091016,Torneo,INDUSTRIAL,37.3986,-5.9963,false,2024-06-01T10:00:00,,
badrow,,RURAL,1.0,1.0,true,,,
nocoords,Estación X,RURAL,,,true,,3,PM10
";

    #[test]
    fn test_parse_fixture() {
        let readings = parse_ica_csv(FIXTURE).unwrap();
        // Rows without a name or coordinates are dropped.
        assert_eq!(readings.len(), 3);

        assert_eq!(readings[0].cod_estacion, "28079004");
        assert_eq!(readings[0].indice_ica, Some(2));
        assert!(readings[0].activa);

        assert_eq!(readings[2].indice_ica, None);
        assert!(!readings[2].activa);
    }

    #[test]
    fn test_ica_to_aqi_clamps_six() {
        assert_eq!(ica_to_aqi(1), 1);
        assert_eq!(ica_to_aqi(5), 5);
        assert_eq!(ica_to_aqi(6), 5);
        assert_eq!(ica_to_aqi(0), 0);
        assert_eq!(ica_to_aqi(99), 0);
    }

    #[test]
    fn test_station_conversion() {
        let readings = parse_ica_csv(FIXTURE).unwrap();
        let stations: Vec<Station> = readings.iter().map(station_from_reading).collect();

        // ICA 6 clamps to AQI 5.
        assert_eq!(stations[1].last_aqi, 5);
        assert_eq!(stations[1].quality_text, "Extremadamente Mala");
        assert_eq!(stations[1].station_class, 1);

        // No index: no data, grey quality.
        assert!(!stations[2].has_real_data);
        assert_eq!(stations[2].last_aqi, 0);
        assert_eq!(stations[2].quality_color, "#cccccc");
        assert_eq!(stations[2].station_class, 2);

        assert_eq!(stations[0].id, 28079004);
        assert_eq!(stations[0].eoi_code, "ES28079004");
    }

    #[test]
    fn test_station_id_hash_fallback() {
        let id = station_id_for("ES-XYZ");
        assert!((0..1_000_000).contains(&id));
        // Stable for the same input.
        assert_eq!(id, station_id_for("ES-XYZ"));
    }

    #[test]
    fn test_mock_stations_respect_limit() {
        assert_eq!(mock_stations(2).len(), 2);
        assert_eq!(mock_stations(100).len(), DEMO_CITIES.len());
        assert!(mock_stations(3).iter().all(|s| s.is_mock));
    }

    #[test]
    fn test_pm25_breakpoints() {
        assert_eq!(aqi_for_pm25(10.0), 1);
        assert_eq!(aqi_for_pm25(20.0), 2);
        assert_eq!(aqi_for_pm25(50.0), 3);
        assert_eq!(aqi_for_pm25(100.0), 4);
        assert_eq!(aqi_for_pm25(200.0), 5);
    }
}
