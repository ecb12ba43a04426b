//! INE housing-price fetcher.
//!
//! Downloads the IPV (Índice de Precios de Vivienda) CSV from the INE
//! and normalizes it into [`NewHousingRow`]s: semicolon separators,
//! decimal commas, a region cell of the form "NN Name" (empty for the
//! national aggregate), and an encoding that drifts between UTF-8-BOM
//! and Latin-1 depending on the day.

use async_trait::async_trait;
use std::time::Duration;

use geodata_core::{NewHousingRow, Period, NATIONAL_CCAA_CODE};
use geodata_store::{FetchError, HousingFetcher};

/// INE IPV dataset, all series, CSV.
const INE_IPV_CSV_URL: &str = "https://www.ine.es/jaxiT3/files/t/es/csv_bdsc/25171.csv?nocab=1";

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Live [`HousingFetcher`] against the INE download service.
#[derive(Debug, Clone)]
pub struct IneHousingFetcher {
    client: reqwest::Client,
    url: String,
}

impl Default for IneHousingFetcher {
    fn default() -> Self {
        Self::new(INE_IPV_CSV_URL)
    }
}

impl IneHousingFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl HousingFetcher for IneHousingFetcher {
    async fn fetch_current(&self) -> Result<Vec<NewHousingRow>, FetchError> {
        tracing::info!(url = %self.url, "downloading INE housing CSV");
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

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::upstream(e.to_string()))?;

        let text = decode_ine_payload(&bytes);
        let rows = parse_ine_csv(&text)?;
        tracing::info!(rows = rows.len(), "INE housing CSV parsed");
        Ok(rows)
    }
}

/// Decode the INE payload. UTF-8 (with or without BOM) is tried first;
/// the historical Latin-1 variant is the fallback.
fn decode_ine_payload(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors && text.contains("ndice") {
        return text.into_owned();
    }
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Parse the IPV CSV body. Columns: national level, region, housing
/// type, metric, period ("YYYYTQ"), value (decimal comma, may be empty).
fn parse_ine_csv(text: &str) -> Result<Vec<NewHousingRow>, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| FetchError::payload(e.to_string()))?;
        if record.len() < 6 {
            return Err(FetchError::payload(format!(
                "row {}: expected 6 columns, got {}",
                idx + 2,
                record.len(),
            )));
        }

        let periodo = record[4].trim().to_string();
        let period = Period::parse(&periodo).map_err(|e| {
            FetchError::payload(format!("row {}: {}", idx + 2, e))
        })?;

        let (ccaa_codigo, ccaa_nombre) = parse_region_cell(record[1].trim());

        rows.push(NewHousingRow {
            periodo,
            anio: period.anio,
            trimestre: period.trimestre,
            ccaa_codigo,
            ccaa_nombre,
            tipo_vivienda: record[2].trim().to_string(),
            metrica: record[3].trim().to_string(),
            valor: parse_decimal_comma(record[5].trim()),
        });
    }

    if rows.is_empty() {
        return Err(FetchError::payload("CSV contained no data rows"));
    }
    Ok(rows)
}

/// Split a region cell of the form "13 Madrid, Comunidad de". An empty
/// cell is the national aggregate.
fn parse_region_cell(cell: &str) -> (String, String) {
    if cell.is_empty() {
        return (NATIONAL_CCAA_CODE.to_string(), "Nacional".to_string());
    }
    match cell.split_once(char::is_whitespace) {
        Some((code, name)) if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) => {
            (code.to_string(), name.trim().to_string())
        }
        _ => (NATIONAL_CCAA_CODE.to_string(), cell.to_string()),
    }
}

/// Parse a value like "105,3". Empty or unparseable values become `None`.
fn parse_decimal_comma(value: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    value.replace(',', ".").parse::<f64>().ok()
}

// ============================================================================
// MOCK FETCHER
// ============================================================================

/// Deterministic mock rows for local development: 2020-2025, all
/// quarters, the three housing types, two metrics, national + Madrid.
pub fn mock_rows() -> Vec<NewHousingRow> {
    let mut rows = Vec::new();
    for anio in 2020..=2025 {
        for trimestre in 1..=4 {
            for tipo in ["General", "Vivienda nueva", "Vivienda segunda mano"] {
                for metrica in ["Índice", "Variación trimestral"] {
                    for (codigo, nombre) in [("00", "Nacional"), ("13", "Madrid, Comunidad de")] {
                        let valor = 100.0 + (anio - 2020) as f64 * 5.0 + trimestre as f64;
                        rows.push(NewHousingRow {
                            periodo: format!("{}T{}", anio, trimestre),
                            anio,
                            trimestre,
                            ccaa_codigo: codigo.to_string(),
                            ccaa_nombre: nombre.to_string(),
                            tipo_vivienda: tipo.to_string(),
                            metrica: metrica.to_string(),
                            valor: Some(valor),
                        });
                    }
                }
            }
        }
    }
    rows
}

/// [`HousingFetcher`] backed by [`mock_rows`].
#[derive(Debug, Clone, Default)]
pub struct MockHousingFetcher;

#[async_trait]
impl HousingFetcher for MockHousingFetcher {
    async fn fetch_current(&self) -> Result<Vec<NewHousingRow>, FetchError> {
        Ok(mock_rows())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "\
Nivel;Comunidades y Ciudades Autónomas;General, vivienda nueva y de segunda mano;Índices y tasas;Periodo;Total
Nacional;;General;Índice;2024T3;105,3
Nacional;13 Madrid, Comunidad de;General;Índice;2024T3;112,8
Nacional;01 Andalucía;Vivienda nueva;Variación anual;2024T2;
Nacional;16 País Vasco;General;Variación trimestral;2023T4;-0,7
";

    #[test]
    fn test_parse_fixture() {
        let rows = parse_ine_csv(FIXTURE).unwrap();
        assert_eq!(rows.len(), 4);

        // Blank region cell is the national aggregate.
        assert_eq!(rows[0].ccaa_codigo, "00");
        assert_eq!(rows[0].ccaa_nombre, "Nacional");
        assert_eq!(rows[0].valor, Some(105.3));
        assert_eq!(rows[0].anio, 2024);
        assert_eq!(rows[0].trimestre, 3);

        assert_eq!(rows[1].ccaa_codigo, "13");
        assert_eq!(rows[1].ccaa_nombre, "Madrid, Comunidad de");

        // Empty value cell parses to None.
        assert_eq!(rows[2].valor, None);
        assert_eq!(rows[2].metrica, "Variación anual");

        // Negative decimal-comma value.
        assert_eq!(rows[3].valor, Some(-0.7));
    }

    #[test]
    fn test_parse_rejects_garbage_period() {
        let bad = "a;b;c;d;e;f\nNacional;;General;Índice;garbage;100,0\n";
        assert!(parse_ine_csv(bad).is_err());
    }

    #[test]
    fn test_parse_rejects_empty_body() {
        let empty = "a;b;c;d;e;f\n";
        assert!(parse_ine_csv(empty).is_err());
    }

    #[test]
    fn test_region_cell_variants() {
        assert_eq!(
            parse_region_cell(""),
            ("00".to_string(), "Nacional".to_string())
        );
        assert_eq!(
            parse_region_cell("04 Balears, Illes"),
            ("04".to_string(), "Balears, Illes".to_string())
        );
        // No leading code: keep the text, treat as national.
        assert_eq!(
            parse_region_cell("Nacional"),
            ("00".to_string(), "Nacional".to_string())
        );
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(parse_decimal_comma("105,3"), Some(105.3));
        assert_eq!(parse_decimal_comma("-2,15"), Some(-2.15));
        assert_eq!(parse_decimal_comma(""), None);
        assert_eq!(parse_decimal_comma(".."), None);
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // "Índice" in Latin-1 bytes.
        let latin1 = [0xCDu8, b'n', b'd', b'i', b'c', b'e'];
        let decoded = decode_ine_payload(&latin1);
        assert!(decoded.contains("ndice"));
    }

    #[test]
    fn test_mock_rows_cover_both_regions() {
        let rows = mock_rows();
        assert!(!rows.is_empty());
        assert!(rows.iter().any(|r| r.ccaa_codigo == "00"));
        assert!(rows.iter().any(|r| r.ccaa_codigo == "13"));
        assert!(rows.iter().all(|r| (1..=4).contains(&r.trimestre)));
    }
}
