//! PostgreSQL implementation of the housing store.
//!
//! The current generation lives in `housing_ine_cache` (natural key
//! enforced by the `uq_housing_cache` constraint); the historical
//! ledger lives in `housing_ine_snapshot` with no uniqueness. The
//! generation swap runs in a single transaction: snapshot, delete,
//! insert, commit. Readers see the pre- or post-swap generation, never
//! a mix.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use tokio_postgres::types::ToSql;

use geodata_core::{CacheEntry, HousingFilter, NewHousingRow, SnapshotEntry};
use geodata_store::{HousingStore, StoreError, StoreResult};

const CACHE_COLUMNS: &str =
    "periodo, anio, trimestre, ccaa_codigo, ccaa_nombre, tipo_vivienda, metrica, valor";

/// [`HousingStore`] backed by PostgreSQL.
#[derive(Clone)]
pub struct PgHousingStore {
    pool: Pool,
}

impl PgHousingStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> StoreResult<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::unavailable(e.to_string()))
    }
}

fn query_err(e: tokio_postgres::Error) -> StoreError {
    StoreError::query_failed(e.to_string())
}

/// Append the housing filter as a WHERE tail. Placeholders continue
/// from `params.len() + 1`; matched values are pushed onto `owned`.
fn filter_clause(
    filter: &HousingFilter,
    owned: &mut Vec<Box<dyn ToSql + Sync + Send>>,
) -> String {
    let mut sql = String::new();

    owned.push(Box::new(filter.metric.as_label().to_string()));
    sql.push_str(&format!(" AND metrica = ${}", owned.len()));

    owned.push(Box::new(filter.tipo.as_label().to_string()));
    sql.push_str(&format!(" AND tipo_vivienda = ${}", owned.len()));

    // "00" is a literal region value, so one equality covers both the
    // national-aggregate case and ordinary region codes.
    if let Some(ccaa) = &filter.ccaa {
        owned.push(Box::new(ccaa.clone()));
        sql.push_str(&format!(" AND ccaa_codigo = ${}", owned.len()));
    }
    if let Some(desde) = filter.anio_desde {
        owned.push(Box::new(desde));
        sql.push_str(&format!(" AND anio >= ${}", owned.len()));
    }
    if let Some(hasta) = filter.anio_hasta {
        owned.push(Box::new(hasta));
        sql.push_str(&format!(" AND anio <= ${}", owned.len()));
    }

    sql
}

fn cache_entry_from_row(row: &tokio_postgres::Row) -> CacheEntry {
    CacheEntry {
        periodo: row.get("periodo"),
        anio: row.get("anio"),
        trimestre: row.get("trimestre"),
        ccaa_codigo: row.get("ccaa_codigo"),
        ccaa_nombre: row.get("ccaa_nombre"),
        tipo_vivienda: row.get("tipo_vivienda"),
        metrica: row.get("metrica"),
        valor: row.get("valor"),
        cached_at: row.get("cached_at"),
    }
}

fn snapshot_entry_from_row(row: &tokio_postgres::Row) -> SnapshotEntry {
    SnapshotEntry {
        periodo: row.get("periodo"),
        anio: row.get("anio"),
        trimestre: row.get("trimestre"),
        ccaa_codigo: row.get("ccaa_codigo"),
        ccaa_nombre: row.get("ccaa_nombre"),
        tipo_vivienda: row.get("tipo_vivienda"),
        metrica: row.get("metrica"),
        valor: row.get("valor"),
        snapshot_date: row.get("snapshot_date"),
    }
}

#[async_trait]
impl HousingStore for PgHousingStore {
    async fn latest_cached_at(&self) -> StoreResult<Option<DateTime<Utc>>> {
        let conn = self.get_conn().await?;
        let row = conn
            .query_one("SELECT MAX(cached_at) FROM housing_ine_cache", &[])
            .await
            .map_err(query_err)?;
        Ok(row.get(0))
    }

    async fn read_current(&self, filter: &HousingFilter) -> StoreResult<Vec<CacheEntry>> {
        let conn = self.get_conn().await?;

        let mut owned: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();
        let where_sql = filter_clause(filter, &mut owned);
        let params: Vec<&(dyn ToSql + Sync)> = owned
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let sql = format!(
            "SELECT {}, cached_at FROM housing_ine_cache WHERE 1=1{} \
             ORDER BY anio DESC, trimestre DESC, ccaa_codigo",
            CACHE_COLUMNS, where_sql,
        );
        let rows = conn.query(&sql, &params).await.map_err(query_err)?;
        Ok(rows.iter().map(cache_entry_from_row).collect())
    }

    async fn read_all_current(&self) -> StoreResult<Vec<CacheEntry>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {}, cached_at FROM housing_ine_cache", CACHE_COLUMNS);
        let rows = conn.query(&sql, &[]).await.map_err(query_err)?;
        Ok(rows.iter().map(cache_entry_from_row).collect())
    }

    async fn replace_generation(
        &self,
        rows: &[NewHousingRow],
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut conn = self.get_conn().await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| StoreError::transaction_failed(e.to_string()))?;

        // Freeze the outgoing generation under one shared timestamp.
        tx.execute(
            &format!(
                "INSERT INTO housing_ine_snapshot ({cols}, snapshot_date) \
                 SELECT {cols}, $1 FROM housing_ine_cache",
                cols = CACHE_COLUMNS,
            ),
            &[&now],
        )
        .await
        .map_err(|e| StoreError::write_failed(e.to_string()))?;

        tx.execute("DELETE FROM housing_ine_cache", &[])
            .await
            .map_err(|e| StoreError::write_failed(e.to_string()))?;

        // Rows sharing a natural key collapse via the upsert, so the
        // committed row count can be below rows.len().
        let insert = tx
            .prepare(&format!(
                "INSERT INTO housing_ine_cache ({}, cached_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 ON CONFLICT ON CONSTRAINT uq_housing_cache \
                 DO UPDATE SET ccaa_nombre = EXCLUDED.ccaa_nombre, \
                               valor = EXCLUDED.valor, \
                               cached_at = EXCLUDED.cached_at",
                CACHE_COLUMNS,
            ))
            .await
            .map_err(|e| StoreError::write_failed(e.to_string()))?;

        for row in rows {
            tx.execute(
                &insert,
                &[
                    &row.periodo,
                    &row.anio,
                    &row.trimestre,
                    &row.ccaa_codigo,
                    &row.ccaa_nombre,
                    &row.tipo_vivienda,
                    &row.metrica,
                    &row.valor,
                    &now,
                ],
            )
            .await
            .map_err(|e| StoreError::write_failed(e.to_string()))?;
        }

        let count: i64 = tx
            .query_one("SELECT COUNT(*)::bigint FROM housing_ine_cache", &[])
            .await
            .map_err(query_err)?
            .get(0);

        tx.commit()
            .await
            .map_err(|e| StoreError::transaction_failed(e.to_string()))?;

        Ok(count as u64)
    }

    async fn clear_current(&self) -> StoreResult<u64> {
        let conn = self.get_conn().await?;
        conn.execute("DELETE FROM housing_ine_cache", &[])
            .await
            .map_err(|e| StoreError::write_failed(e.to_string()))
    }

    async fn snapshot_dates(&self) -> StoreResult<Vec<DateTime<Utc>>> {
        let conn = self.get_conn().await?;
        let rows = conn
            .query(
                "SELECT DISTINCT snapshot_date FROM housing_ine_snapshot \
                 ORDER BY snapshot_date DESC",
                &[],
            )
            .await
            .map_err(query_err)?;
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    async fn read_snapshot(
        &self,
        filter: &HousingFilter,
        as_of: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<SnapshotEntry>> {
        let conn = self.get_conn().await?;

        // With as_of, pin the most recent generation at or before the
        // cutoff; no qualifying generation means an empty result.
        let generation: Option<DateTime<Utc>> = match as_of {
            Some(cutoff) => {
                let row = conn
                    .query_one(
                        "SELECT MAX(snapshot_date) FROM housing_ine_snapshot \
                         WHERE snapshot_date <= $1",
                        &[&cutoff],
                    )
                    .await
                    .map_err(query_err)?;
                let best: Option<DateTime<Utc>> = row.get(0);
                if best.is_none() {
                    return Ok(Vec::new());
                }
                best
            }
            None => None,
        };

        let mut owned: Vec<Box<dyn ToSql + Sync + Send>> = Vec::new();
        if let Some(pinned) = generation {
            owned.push(Box::new(pinned));
        }
        let gen_sql = if generation.is_some() {
            " AND snapshot_date = $1".to_string()
        } else {
            String::new()
        };
        let where_sql = filter_clause(filter, &mut owned);
        let params: Vec<&(dyn ToSql + Sync)> = owned
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let sql = format!(
            "SELECT {}, snapshot_date FROM housing_ine_snapshot WHERE 1=1{}{} \
             ORDER BY snapshot_date DESC, anio DESC, trimestre DESC",
            CACHE_COLUMNS, gen_sql, where_sql,
        );
        let rows = conn.query(&sql, &params).await.map_err(query_err)?;
        Ok(rows.iter().map(snapshot_entry_from_row).collect())
    }
}
