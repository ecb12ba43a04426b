//! Elections endpoint wire types.
//!
//! The 2023 congress results are stored per municipality with one vote
//! column per party. The party list is closed: query handlers validate
//! party names against [`VALID_PARTIES`] before any SQL is built.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fixed set of party vote columns in the results table. Party
/// aggregation queries only ever interpolate column names from this
/// list, never raw request input.
pub const VALID_PARTIES: [&str; 14] = [
    "pp", "psoe", "vox", "sumar", "erc", "jxcat_junts", "eh_bildu", "eaj_pnv", "bng", "cca",
    "upn", "pacma", "cup_pr", "fo",
];

fn default_limit() -> i64 {
    100
}

/// Query parameters for GET /api/elections/data.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
pub struct ElectionsDataQuery {
    /// Municipality name substring
    pub municipio: Option<String>,
    /// Province name substring
    pub provincia: Option<String>,
    /// Community name substring
    pub comunidad: Option<String>,
    /// Winning party (exact match)
    pub partido_ganador: Option<String>,
    /// Minimum turnout percentage (0-100)
    pub min_participacion: Option<f64>,
    /// Maximum turnout percentage (0-100)
    pub max_participacion: Option<f64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    /// Map-ready subset: coordinates, name, winner, turnout
    #[serde(default)]
    pub light: bool,
}

/// Full per-municipality election row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MunicipalityResult {
    pub codigo_ine: String,
    pub nombre_municipio: String,
    pub nombre_provincia: String,
    pub nombre_comunidad: String,
    pub poblacion: Option<i32>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub num_mesas: Option<i32>,
    pub censo: Option<i32>,
    pub votantes: Option<i32>,
    pub votos_validos: Option<i32>,
    pub votos_candidaturas: Option<i32>,
    pub votos_blanco: Option<i32>,
    pub votos_nulos: Option<i32>,
    pub pp: Option<i32>,
    pub psoe: Option<i32>,
    pub vox: Option<i32>,
    pub sumar: Option<i32>,
    pub erc: Option<i32>,
    pub jxcat_junts: Option<i32>,
    pub eh_bildu: Option<i32>,
    pub eaj_pnv: Option<i32>,
    pub bng: Option<i32>,
    pub cca: Option<i32>,
    pub upn: Option<i32>,
    pub pacma: Option<i32>,
    pub cup_pr: Option<i32>,
    pub fo: Option<i32>,
    pub participacion: Option<f64>,
    pub partido_ganador: Option<String>,
    pub votos_ganador: Option<i32>,
    pub total_votos_partidos: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Map-ready subset returned in light mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MunicipalityLight {
    pub codigo_ine: String,
    pub nombre_municipio: String,
    pub nombre_provincia: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub partido_ganador: Option<String>,
    pub participacion: Option<f64>,
    pub poblacion: Option<i32>,
}

/// Rows of a /api/elections/data response (shape depends on light mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(untagged)]
pub enum ElectionRows {
    Full(Vec<MunicipalityResult>),
    Light(Vec<MunicipalityLight>),
}

impl ElectionRows {
    pub fn len(&self) -> usize {
        match self {
            ElectionRows::Full(rows) => rows.len(),
            ElectionRows::Light(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Response for GET /api/elections/data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ElectionsDataResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub offset: i64,
    pub limit: i64,
    pub has_more: bool,
    pub light_mode: bool,
    pub data: ElectionRows,
}

/// Response for GET /api/elections/municipality/{codigo_ine}.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MunicipalityResponse {
    pub success: bool,
    pub data: MunicipalityResult,
}

/// National vote totals for the main parties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PartyTotals {
    #[serde(rename = "PP")]
    pub pp: i64,
    #[serde(rename = "PSOE")]
    pub psoe: i64,
    #[serde(rename = "VOX")]
    pub vox: i64,
    #[serde(rename = "SUMAR")]
    pub sumar: i64,
    #[serde(rename = "ERC")]
    pub erc: i64,
}

/// National aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ElectionTotals {
    pub total_municipios: i64,
    pub total_censo: i64,
    pub total_votantes: i64,
    pub participacion_media: f64,
    pub totales_partidos: PartyTotals,
}

/// How many municipalities each party won.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct WinnerShare {
    pub partido: String,
    pub municipios_ganados: i64,
    pub porcentaje: f64,
}

/// Response for GET /api/elections/stats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ElectionStatsResponse {
    pub success: bool,
    pub stats: ElectionTotals,
    pub distribucion_ganadores: Vec<WinnerShare>,
}

/// Per-community aggregation for one party.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PartyByCommunity {
    pub comunidad: String,
    pub total_municipios: i64,
    pub total_votos: i64,
    pub censo_comunidad: i64,
    pub porcentaje_votos: f64,
}

/// Response for GET /api/elections/party/{partido}.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PartyResultsResponse {
    pub success: bool,
    pub partido: String,
    pub count: usize,
    pub data: Vec<PartyByCommunity>,
}
