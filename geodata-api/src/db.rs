//! Database Connection Pool Module
//!
//! PostgreSQL connection pooling via deadpool-postgres plus the typed
//! query wrappers for the direct-read datasets (covid cases, election
//! results). The housing cache has its own store implementation in
//! [`crate::pg_store`]; this client never touches those tables.

use deadpool_postgres::{Config, ManagerConfig, Pool, RecyclingMethod, Runtime};
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

use crate::error::{ApiError, ApiResult};
use crate::types::{
    CovidCommunityTotals, CovidFilterQuery, CovidProvinceTotals, CovidRecord, CovidTotals,
    ElectionTotals, ElectionsDataQuery, MunicipalityLight, MunicipalityResult, PartyByCommunity,
    PartyTotals, WinnerShare, VALID_PARTIES,
};

// ============================================================================
// CONNECTION POOL CONFIGURATION
// ============================================================================

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// PostgreSQL host
    pub host: String,
    /// PostgreSQL port
    pub port: u16,
    /// Database name
    pub dbname: String,
    /// Database user
    pub user: String,
    /// Database password
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// Connection timeout
    pub timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "geodata".to_string(),
            user: "postgres".to_string(),
            password: "".to_string(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Create a new database configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("GEODATA_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("GEODATA_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("GEODATA_DB_NAME").unwrap_or_else(|_| "geodata".to_string()),
            user: std::env::var("GEODATA_DB_USER").unwrap_or_else(|_| "postgres".to_string()),
            password: std::env::var("GEODATA_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("GEODATA_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(16),
            timeout: Duration::from_secs(
                std::env::var("GEODATA_DB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());

        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))?;

        Ok(pool)
    }
}

// ============================================================================
// DATABASE CLIENT WRAPPER
// ============================================================================

const MUNICIPALITY_COLUMNS: &str = "\
    m.codigo_ine, m.nombre_municipio, m.nombre_provincia, m.nombre_comunidad, \
    m.poblacion, m.lat, m.lon, \
    e.num_mesas, e.censo, e.votantes, e.votos_validos, e.votos_candidaturas, \
    e.votos_blanco, e.votos_nulos, \
    e.pp, e.psoe, e.vox, e.sumar, e.erc, e.jxcat_junts, e.eh_bildu, e.eaj_pnv, \
    e.bng, e.cca, e.upn, e.pacma, e.cup_pr, e.fo, \
    e.participacion, e.partido_ganador, e.votos_ganador, e.total_votos_partidos, \
    e.created_at";

/// Database client wrapping a connection pool with typed queries for
/// the covid and elections tables.
#[derive(Clone)]
pub struct DbClient {
    pool: Pool,
}

impl DbClient {
    /// Create a new database client with the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create a new database client from configuration.
    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        let pool = config.create_pool()?;
        Ok(Self::new(pool))
    }

    /// Get the current pool size for observability.
    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Get a connection from the pool.
    async fn get_conn(&self) -> ApiResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(ApiError::from)
    }

    /// Validate pool connectivity with a trivial query.
    pub async fn health_check(&self) -> ApiResult<()> {
        let conn = self.get_conn().await?;
        conn.query_one("SELECT 1", &[]).await?;
        Ok(())
    }

    // ========================================================================
    // COVID QUERIES
    // ========================================================================

    /// All covid case rows, ordered by date then community, with
    /// coordinates extracted from the PostGIS point.
    pub async fn covid_list(&self) -> ApiResult<Vec<CovidRecord>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                "SELECT fecha, comunidad_autonoma, provincia, casos_confirmados, \
                        ingresos_uci, fallecidos, altas, \
                        ST_Y(geom)::float8 AS lat, ST_X(geom)::float8 AS lon \
                 FROM covid_cases \
                 ORDER BY fecha, comunidad_autonoma",
                &[],
            )
            .await?;

        Ok(rows.iter().map(covid_record_from_row).collect())
    }

    /// Aggregated covid statistics: per-community, per-province and
    /// national totals.
    pub async fn covid_stats(
        &self,
    ) -> ApiResult<(Vec<CovidCommunityTotals>, Vec<CovidProvinceTotals>, CovidTotals)> {
        let conn = self.get_conn().await?;

        let by_community = conn
            .query(
                "SELECT comunidad_autonoma, \
                        SUM(casos_confirmados)::bigint AS total_casos, \
                        COALESCE(SUM(fallecidos), 0)::bigint AS total_fallecidos, \
                        AVG(casos_confirmados)::float8 AS promedio_diario \
                 FROM covid_cases \
                 GROUP BY comunidad_autonoma \
                 ORDER BY comunidad_autonoma",
                &[],
            )
            .await?;

        let by_province = conn
            .query(
                "SELECT provincia, comunidad_autonoma, \
                        SUM(casos_confirmados)::bigint AS total_casos, \
                        COALESCE(SUM(fallecidos), 0)::bigint AS total_fallecidos \
                 FROM covid_cases \
                 GROUP BY provincia, comunidad_autonoma \
                 ORDER BY comunidad_autonoma, provincia",
                &[],
            )
            .await?;

        let totals = conn
            .query_one(
                "SELECT COALESCE(SUM(casos_confirmados), 0)::bigint AS total_casos, \
                        COALESCE(SUM(fallecidos), 0)::bigint AS total_fallecidos, \
                        COALESCE(SUM(ingresos_uci), 0)::bigint AS total_uci, \
                        COUNT(DISTINCT fecha)::bigint AS dias_registrados \
                 FROM covid_cases",
                &[],
            )
            .await?;

        Ok((
            by_community
                .iter()
                .map(|r| CovidCommunityTotals {
                    comunidad: r.get("comunidad_autonoma"),
                    total_casos: r.get("total_casos"),
                    total_fallecidos: r.get("total_fallecidos"),
                    promedio_diario: r.get("promedio_diario"),
                })
                .collect(),
            by_province
                .iter()
                .map(|r| CovidProvinceTotals {
                    provincia: r.get("provincia"),
                    comunidad: r.get("comunidad_autonoma"),
                    total_casos: r.get("total_casos"),
                    total_fallecidos: r.get("total_fallecidos"),
                })
                .collect(),
            CovidTotals {
                total_casos: totals.get("total_casos"),
                total_fallecidos: totals.get("total_fallecidos"),
                total_uci: totals.get("total_uci"),
                dias_registrados: totals.get("dias_registrados"),
            },
        ))
    }

    /// Filtered covid rows. "todas" for comunidad/provincia disables
    /// that filter; names match as ILIKE substrings.
    pub async fn covid_filter(&self, q: &CovidFilterQuery) -> ApiResult<Vec<CovidRecord>> {
        let conn = self.get_conn().await?;

        let mut sql = String::from(
            "SELECT fecha, comunidad_autonoma, provincia, casos_confirmados, \
                    ingresos_uci, fallecidos, altas, \
                    ST_Y(geom)::float8 AS lat, ST_X(geom)::float8 AS lon \
             FROM covid_cases WHERE 1=1",
        );

        let comunidad_pat = q
            .comunidad
            .as_deref()
            .filter(|c| !c.eq_ignore_ascii_case("todas"))
            .map(|c| format!("%{}%", c));
        let provincia_pat = q
            .provincia
            .as_deref()
            .filter(|p| !p.eq_ignore_ascii_case("todas"))
            .map(|p| format!("%{}%", p));

        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(pat) = &comunidad_pat {
            params.push(pat);
            sql.push_str(&format!(" AND comunidad_autonoma ILIKE ${}", params.len()));
        }
        if let Some(pat) = &provincia_pat {
            params.push(pat);
            sql.push_str(&format!(" AND provincia ILIKE ${}", params.len()));
        }
        if let Some(desde) = &q.fecha_inicio {
            params.push(desde);
            sql.push_str(&format!(" AND fecha >= ${}", params.len()));
        }
        if let Some(hasta) = &q.fecha_fin {
            params.push(hasta);
            sql.push_str(&format!(" AND fecha <= ${}", params.len()));
        }
        if let Some(min) = &q.min_casos {
            params.push(min);
            sql.push_str(&format!(" AND casos_confirmados >= ${}", params.len()));
        }
        if let Some(max) = &q.max_casos {
            params.push(max);
            sql.push_str(&format!(" AND casos_confirmados <= ${}", params.len()));
        }
        sql.push_str(" ORDER BY fecha, comunidad_autonoma");

        let rows = conn.query(&sql, &params).await?;
        Ok(rows.iter().map(covid_record_from_row).collect())
    }

    // ========================================================================
    // ELECTIONS QUERIES
    // ========================================================================

    /// Filtered election rows plus the pre-pagination total.
    pub async fn elections_list(
        &self,
        q: &ElectionsDataQuery,
    ) -> ApiResult<(Vec<MunicipalityResult>, i64)> {
        let conn = self.get_conn().await?;

        let (where_sql, owned) = elections_where_clause(q);
        let params: Vec<&(dyn ToSql + Sync)> = owned
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let sql = format!(
            "SELECT {} FROM municipios_espana m \
             JOIN elecciones_congreso_2023 e ON m.codigo_ine = e.municipio_ine \
             WHERE 1=1{} \
             ORDER BY m.nombre_municipio LIMIT ${} OFFSET ${}",
            MUNICIPALITY_COLUMNS,
            where_sql,
            params.len() + 1,
            params.len() + 2,
        );
        let mut page_params = params.clone();
        page_params.push(&q.limit);
        page_params.push(&q.offset);

        let rows = conn.query(&sql, &page_params).await?;

        let count_sql = format!(
            "SELECT COUNT(*)::bigint FROM municipios_espana m \
             JOIN elecciones_congreso_2023 e ON m.codigo_ine = e.municipio_ine \
             WHERE 1=1{}",
            where_sql,
        );
        let total: i64 = conn.query_one(&count_sql, &params).await?.get(0);

        Ok((rows.iter().map(municipality_from_row).collect(), total))
    }

    /// One municipality's full election row, or `None`.
    pub async fn elections_municipality(
        &self,
        codigo_ine: &str,
    ) -> ApiResult<Option<MunicipalityResult>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {} FROM municipios_espana m \
             JOIN elecciones_congreso_2023 e ON m.codigo_ine = e.municipio_ine \
             WHERE m.codigo_ine = $1",
            MUNICIPALITY_COLUMNS,
        );
        let row = conn.query_opt(&sql, &[&codigo_ine]).await?;
        Ok(row.as_ref().map(municipality_from_row))
    }

    /// National aggregates and the winner distribution.
    pub async fn elections_stats(&self) -> ApiResult<(ElectionTotals, Vec<WinnerShare>)> {
        let conn = self.get_conn().await?;

        let totals = conn
            .query_one(
                "SELECT COUNT(*)::bigint AS total_municipios, \
                        COALESCE(SUM(censo), 0)::bigint AS total_censo, \
                        COALESCE(SUM(votantes), 0)::bigint AS total_votantes, \
                        COALESCE(AVG(participacion), 0)::float8 AS participacion_media, \
                        COALESCE(SUM(pp), 0)::bigint AS total_pp, \
                        COALESCE(SUM(psoe), 0)::bigint AS total_psoe, \
                        COALESCE(SUM(vox), 0)::bigint AS total_vox, \
                        COALESCE(SUM(sumar), 0)::bigint AS total_sumar, \
                        COALESCE(SUM(erc), 0)::bigint AS total_erc \
                 FROM elecciones_congreso_2023",
                &[],
            )
            .await?;

        let winners = conn
            .query(
                "SELECT partido_ganador, \
                        COUNT(*)::bigint AS municipios_ganados, \
                        ROUND(COUNT(*) * 100.0 / \
                              (SELECT COUNT(*) FROM elecciones_congreso_2023), 2)::float8 \
                            AS porcentaje \
                 FROM elecciones_congreso_2023 \
                 WHERE partido_ganador != 'sin_datos' \
                 GROUP BY partido_ganador \
                 ORDER BY municipios_ganados DESC",
                &[],
            )
            .await?;

        Ok((
            ElectionTotals {
                total_municipios: totals.get("total_municipios"),
                total_censo: totals.get("total_censo"),
                total_votantes: totals.get("total_votantes"),
                participacion_media: totals.get("participacion_media"),
                totales_partidos: PartyTotals {
                    pp: totals.get("total_pp"),
                    psoe: totals.get("total_psoe"),
                    vox: totals.get("total_vox"),
                    sumar: totals.get("total_sumar"),
                    erc: totals.get("total_erc"),
                },
            },
            winners
                .iter()
                .map(|r| WinnerShare {
                    partido: r.get("partido_ganador"),
                    municipios_ganados: r.get("municipios_ganados"),
                    porcentaje: r.get("porcentaje"),
                })
                .collect(),
        ))
    }

    /// Per-community aggregation for one party. The party name must be
    /// in [`VALID_PARTIES`]; it names a column and is interpolated into
    /// the SQL, so the whitelist check is load-bearing.
    pub async fn elections_party(&self, partido: &str) -> ApiResult<Vec<PartyByCommunity>> {
        if !VALID_PARTIES.contains(&partido) {
            return Err(ApiError::invalid_filter("partido", partido).with_details(
                serde_json::json!({ "valid_parties": VALID_PARTIES }),
            ));
        }

        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT m.nombre_comunidad, \
                    COUNT(*)::bigint AS total_municipios, \
                    COALESCE(SUM(e.{p}), 0)::bigint AS total_votos, \
                    COALESCE(SUM(e.censo), 0)::bigint AS censo_comunidad, \
                    COALESCE(ROUND(SUM(e.{p}) * 100.0 / \
                        NULLIF(SUM(e.votos_validos), 0), 2), 0)::float8 AS porcentaje_votos \
             FROM municipios_espana m \
             JOIN elecciones_congreso_2023 e ON m.codigo_ine = e.municipio_ine \
             GROUP BY m.nombre_comunidad \
             HAVING SUM(e.{p}) > 0 \
             ORDER BY total_votos DESC",
            p = partido,
        );

        let rows = conn.query(&sql, &[]).await?;
        Ok(rows
            .iter()
            .map(|r| PartyByCommunity {
                comunidad: r.get("nombre_comunidad"),
                total_municipios: r.get("total_municipios"),
                total_votos: r.get("total_votos"),
                censo_comunidad: r.get("censo_comunidad"),
                porcentaje_votos: r.get("porcentaje_votos"),
            })
            .collect())
    }
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn covid_record_from_row(row: &tokio_postgres::Row) -> CovidRecord {
    CovidRecord {
        fecha: row.get("fecha"),
        comunidad: row.get("comunidad_autonoma"),
        provincia: row.get("provincia"),
        casos: row.get("casos_confirmados"),
        ingresos_uci: row.get("ingresos_uci"),
        fallecidos: row.get("fallecidos"),
        altas: row.get("altas"),
        lat: row.get("lat"),
        lon: row.get("lon"),
    }
}

fn municipality_from_row(row: &tokio_postgres::Row) -> MunicipalityResult {
    MunicipalityResult {
        codigo_ine: row.get("codigo_ine"),
        nombre_municipio: row.get("nombre_municipio"),
        nombre_provincia: row.get("nombre_provincia"),
        nombre_comunidad: row.get("nombre_comunidad"),
        poblacion: row.get("poblacion"),
        lat: row.get("lat"),
        lon: row.get("lon"),
        num_mesas: row.get("num_mesas"),
        censo: row.get("censo"),
        votantes: row.get("votantes"),
        votos_validos: row.get("votos_validos"),
        votos_candidaturas: row.get("votos_candidaturas"),
        votos_blanco: row.get("votos_blanco"),
        votos_nulos: row.get("votos_nulos"),
        pp: row.get("pp"),
        psoe: row.get("psoe"),
        vox: row.get("vox"),
        sumar: row.get("sumar"),
        erc: row.get("erc"),
        jxcat_junts: row.get("jxcat_junts"),
        eh_bildu: row.get("eh_bildu"),
        eaj_pnv: row.get("eaj_pnv"),
        bng: row.get("bng"),
        cca: row.get("cca"),
        upn: row.get("upn"),
        pacma: row.get("pacma"),
        cup_pr: row.get("cup_pr"),
        fo: row.get("fo"),
        participacion: row.get("participacion"),
        partido_ganador: row.get("partido_ganador"),
        votos_ganador: row.get("votos_ganador"),
        total_votos_partidos: row.get("total_votos_partidos"),
        created_at: row.get("created_at"),
    }
}

impl From<&MunicipalityResult> for MunicipalityLight {
    fn from(m: &MunicipalityResult) -> Self {
        Self {
            codigo_ine: m.codigo_ine.clone(),
            nombre_municipio: m.nombre_municipio.clone(),
            nombre_provincia: m.nombre_provincia.clone(),
            lat: m.lat,
            lon: m.lon,
            partido_ganador: m.partido_ganador.clone(),
            participacion: m.participacion,
            poblacion: m.poblacion,
        }
    }
}

/// Build the shared WHERE fragment for the elections list and count
/// queries. Returns the SQL tail and the owned parameter values in
/// placeholder order.
fn elections_where_clause(
    q: &ElectionsDataQuery,
) -> (String, Vec<Box<dyn ToSql + Sync + Send>>) {
    let mut sql = String::new();
    let mut owned: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();

    if let Some(municipio) = &q.municipio {
        owned.push(Box::new(format!("%{}%", municipio)));
        sql.push_str(&format!(" AND m.nombre_municipio ILIKE ${}", owned.len()));
    }
    if let Some(provincia) = &q.provincia {
        owned.push(Box::new(format!("%{}%", provincia)));
        sql.push_str(&format!(" AND m.nombre_provincia ILIKE ${}", owned.len()));
    }
    if let Some(comunidad) = &q.comunidad {
        owned.push(Box::new(format!("%{}%", comunidad)));
        sql.push_str(&format!(" AND m.nombre_comunidad ILIKE ${}", owned.len()));
    }
    if let Some(partido) = &q.partido_ganador {
        owned.push(Box::new(partido.clone()));
        sql.push_str(&format!(" AND e.partido_ganador = ${}", owned.len()));
    }
    if let Some(min) = q.min_participacion {
        owned.push(Box::new(min));
        sql.push_str(&format!(" AND e.participacion >= ${}", owned.len()));
    }
    if let Some(max) = q.max_participacion {
        owned.push(Box::new(max));
        sql.push_str(&format!(" AND e.participacion <= ${}", owned.len()));
    }

    (sql, owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(partido_ganador: Option<&str>) -> ElectionsDataQuery {
        ElectionsDataQuery {
            municipio: None,
            provincia: None,
            comunidad: None,
            partido_ganador: partido_ganador.map(String::from),
            min_participacion: None,
            max_participacion: None,
            limit: 100,
            offset: 0,
            light: false,
        }
    }

    #[test]
    fn test_where_clause_empty() {
        let (sql, owned) = elections_where_clause(&query(None));
        assert!(sql.is_empty());
        assert!(owned.is_empty());
    }

    #[test]
    fn test_where_clause_placeholders_in_order() {
        let mut q = query(Some("PP"));
        q.municipio = Some("Madrid".to_string());
        q.min_participacion = Some(60.0);

        let (sql, owned) = elections_where_clause(&q);
        assert_eq!(owned.len(), 3);
        assert!(sql.contains("m.nombre_municipio ILIKE $1"));
        assert!(sql.contains("e.partido_ganador = $2"));
        assert!(sql.contains("e.participacion >= $3"));
    }

    #[test]
    fn test_default_db_config() {
        let config = DbConfig::default();
        assert_eq!(config.dbname, "geodata");
        assert_eq!(config.port, 5432);
        assert_eq!(config.max_size, 16);
    }
}
