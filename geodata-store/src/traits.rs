//! Storage and fetcher traits for the housing cache.
//!
//! Both traits are object safe on purpose: route state holds
//! `Arc<dyn HousingStore>` / `Arc<dyn HousingFetcher>` so that tests can
//! substitute the in-memory store and scripted fetchers for PostgreSQL
//! and the live INE feed.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geodata_core::{CacheEntry, HousingFilter, NewHousingRow, SnapshotEntry};

use crate::error::{FetchError, StoreResult};

/// Backing store for the housing cache and its snapshot ledger.
///
/// # Contract
///
/// - The cache store holds exactly one generation at a time; its natural
///   key (periodo, ccaa_codigo, tipo_vivienda, metrica) is unique.
///   Conflicting rows within one `replace_generation` call collapse to
///   one row, never two.
/// - `replace_generation` is atomic: snapshot the prior generation under
///   one shared timestamp, delete it, insert the new rows. On any
///   failure the store must be left exactly as it was before the call.
/// - The snapshot ledger has no uniqueness constraint and is never
///   touched by `clear_current`.
/// - Readers observe either the pre-swap or the post-swap generation,
///   never a mix.
#[async_trait]
pub trait HousingStore: Send + Sync {
    /// Timestamp of the current generation, or `None` when the cache is empty.
    async fn latest_cached_at(&self) -> StoreResult<Option<DateTime<Utc>>>;

    /// Read the current generation through a filter, ordered by
    /// (anio DESC, trimestre DESC).
    async fn read_current(&self, filter: &HousingFilter) -> StoreResult<Vec<CacheEntry>>;

    /// Read the entire current generation, unfiltered and unordered.
    async fn read_all_current(&self) -> StoreResult<Vec<CacheEntry>>;

    /// Atomically snapshot the prior generation and replace it with
    /// `rows`, all stamped with `now`. Returns the number of rows stored
    /// after natural-key collapse.
    async fn replace_generation(&self, rows: &[NewHousingRow], now: DateTime<Utc>)
        -> StoreResult<u64>;

    /// Delete all current cache rows without snapshotting them.
    /// Returns the number of rows removed.
    async fn clear_current(&self) -> StoreResult<u64>;

    /// Distinct snapshot dates, newest first.
    async fn snapshot_dates(&self) -> StoreResult<Vec<DateTime<Utc>>>;

    /// Read snapshot rows through a filter. When `as_of` is given, only
    /// the most recent generation with snapshot_date <= as_of is
    /// returned; otherwise all qualifying snapshot rows, newest
    /// generation first.
    async fn read_snapshot(
        &self,
        filter: &HousingFilter,
        as_of: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<SnapshotEntry>>;
}

/// External data fetcher consumed by the refresh flow.
///
/// Rows come back fully normalized: parsed numeric value, resolved
/// region code/name, canonical period/year/quarter and labels. The
/// cache service does no parsing itself.
#[async_trait]
pub trait HousingFetcher: Send + Sync {
    async fn fetch_current(&self) -> Result<Vec<NewHousingRow>, FetchError>;
}
