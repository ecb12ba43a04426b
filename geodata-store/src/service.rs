//! Cache/refresh service for housing data.
//!
//! Decides staleness, serves filtered reads and runs the refresh cycle:
//! snapshot the old generation, swap in the new one, all inside one
//! store transaction. A refresh is triggered lazily by whichever request
//! first observes staleness; competing refreshes are tolerated (the
//! ledger simply gains back-to-back generations) and never deduplicated.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use geodata_core::{CacheEntry, DataSource, HousingFilter, NewHousingRow, SnapshotEntry};

use crate::error::{FetchError, StoreError, StoreResult};
use crate::traits::{HousingFetcher, HousingStore};

/// Maximum age of a generation before it must be refreshed (24 hours).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Error serving housing data through the lazy-refresh protocol.
#[derive(Debug, Clone, Error)]
pub enum ServeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The upstream fetch failed and the cache had nothing to fall back on.
    #[error(transparent)]
    Upstream(#[from] FetchError),
}

/// Service mediating between the fetcher, the cache store and the
/// snapshot ledger.
#[derive(Clone)]
pub struct HousingCacheService {
    store: Arc<dyn HousingStore>,
    ttl: Duration,
}

impl HousingCacheService {
    /// Create a service with the default 24 h TTL.
    pub fn new(store: Arc<dyn HousingStore>) -> Self {
        Self::with_ttl(store, DEFAULT_CACHE_TTL)
    }

    /// Create a service with an explicit TTL.
    pub fn with_ttl(store: Arc<dyn HousingStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether the current generation is fresh enough to serve.
    ///
    /// An empty cache is never fresh. Reads may race with a concurrent
    /// swap; that is an acceptable staleness window, not a correctness
    /// violation.
    pub async fn is_fresh(&self) -> StoreResult<bool> {
        let latest = self.store.latest_cached_at().await?;
        let Some(cached_at) = latest else {
            tracing::debug!("housing cache is empty");
            return Ok(false);
        };

        let age = Utc::now().signed_duration_since(cached_at);
        let fresh = age
            .to_std()
            .map(|age| age < self.ttl)
            // cached_at in the future counts as fresh (clock skew).
            .unwrap_or(true);
        tracing::debug!(age_secs = age.num_seconds(), fresh, "housing cache freshness");
        Ok(fresh)
    }

    /// Filtered read of the current generation, newest periods first.
    pub async fn read_filtered(&self, filter: &HousingFilter) -> StoreResult<Vec<CacheEntry>> {
        self.store.read_current(filter).await
    }

    /// The entire current generation, unfiltered.
    pub async fn read_all(&self) -> StoreResult<Vec<CacheEntry>> {
        self.store.read_all_current().await
    }

    /// Replace the current generation with `rows`.
    ///
    /// The prior generation (if any) is written to the snapshot ledger
    /// under one shared timestamp before being replaced; failure at any
    /// point leaves the prior generation current. Returns the number of
    /// rows stored.
    pub async fn refresh(&self, rows: &[NewHousingRow]) -> StoreResult<u64> {
        let now = Utc::now();
        let count = self.store.replace_generation(rows, now).await?;
        tracing::info!(rows = count, "housing cache refreshed");
        Ok(count)
    }

    /// Administrative clear of the current generation. Deliberately does
    /// not snapshot: a manual invalidation is not a generation worth
    /// preserving.
    pub async fn clear(&self) -> StoreResult<u64> {
        let count = self.store.clear_current().await?;
        tracing::info!(rows = count, "housing cache cleared");
        Ok(count)
    }

    /// Distinct snapshot dates, newest first.
    pub async fn snapshot_dates(&self) -> StoreResult<Vec<DateTime<Utc>>> {
        self.store.snapshot_dates().await
    }

    /// Filtered read of the snapshot ledger.
    pub async fn read_snapshot(
        &self,
        filter: &HousingFilter,
        as_of: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<SnapshotEntry>> {
        self.store.read_snapshot(filter, as_of).await
    }

    /// Serve housing data through the lazy-refresh protocol.
    ///
    /// Fresh cache: serve it. Stale or empty: fetch upstream, refresh
    /// the cache and serve the new generation. If the upstream fetch
    /// fails, fall back to whatever is cached, even stale; only when
    /// that is also empty does the fetch error surface.
    pub async fn current_data(
        &self,
        filter: &HousingFilter,
        fetcher: &dyn HousingFetcher,
    ) -> Result<(Vec<CacheEntry>, DataSource), ServeError> {
        if self.is_fresh().await? {
            let entries = self.read_filtered(filter).await?;
            return Ok((entries, DataSource::Cache));
        }

        tracing::info!("housing cache stale or empty, fetching upstream");
        match fetcher.fetch_current().await {
            Ok(rows) => {
                // A refresh failure is not fatal to this request: the
                // fetched rows themselves cannot be served (only cached
                // rows are), so fall through to the stale cache.
                if let Err(e) = self.refresh(&rows).await {
                    tracing::error!(error = %e, "housing cache refresh failed");
                    let stale = self.read_filtered(filter).await?;
                    if stale.is_empty() {
                        return Err(ServeError::Store(e));
                    }
                    return Ok((stale, DataSource::Cache));
                }
                let entries = self.read_filtered(filter).await?;
                Ok((entries, DataSource::Ine))
            }
            Err(fetch_err) => {
                tracing::warn!(error = %fetch_err, "upstream fetch failed, trying stale cache");
                let stale = self.read_filtered(filter).await?;
                if stale.is_empty() {
                    Err(ServeError::Upstream(fetch_err))
                } else {
                    Ok((stale, DataSource::Cache))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHousingStore;
    use async_trait::async_trait;
    use geodata_core::{HousingMetric, HousingTipo};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn row(periodo: &str, ccaa: &str, nombre: &str, valor: f64) -> NewHousingRow {
        let period = geodata_core::Period::parse(periodo).unwrap();
        NewHousingRow {
            periodo: periodo.to_string(),
            anio: period.anio,
            trimestre: period.trimestre,
            ccaa_codigo: ccaa.to_string(),
            ccaa_nombre: nombre.to_string(),
            tipo_vivienda: "General".to_string(),
            metrica: "Índice".to_string(),
            valor: Some(valor),
        }
    }

    /// Índice/General rows for Nacional ("00") and Madrid ("13"),
    /// quarters 1-4 of 2020-2024.
    fn seed_rows() -> Vec<NewHousingRow> {
        let mut rows = Vec::new();
        for anio in 2020..=2024 {
            for trimestre in 1..=4 {
                let periodo = format!("{}T{}", anio, trimestre);
                rows.push(row(&periodo, "00", "Nacional", 100.0 + anio as f64));
                rows.push(row(&periodo, "13", "Madrid, Comunidad de", 110.0 + anio as f64));
            }
        }
        rows
    }

    fn index_filter() -> HousingFilter {
        HousingFilter::new(HousingMetric::Index, HousingTipo::General)
    }

    fn service() -> (Arc<MemoryHousingStore>, HousingCacheService) {
        let store = Arc::new(MemoryHousingStore::new());
        let svc = HousingCacheService::new(store.clone());
        (store, svc)
    }

    struct StaticFetcher {
        rows: Vec<NewHousingRow>,
        calls: AtomicUsize,
    }

    impl StaticFetcher {
        fn new(rows: Vec<NewHousingRow>) -> Self {
            Self {
                rows,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HousingFetcher for StaticFetcher {
        async fn fetch_current(&self) -> Result<Vec<NewHousingRow>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.clone())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl HousingFetcher for FailingFetcher {
        async fn fetch_current(&self) -> Result<Vec<NewHousingRow>, FetchError> {
            Err(FetchError::upstream("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_empty_cache_is_not_fresh() {
        let (_, svc) = service();
        assert!(!svc.is_fresh().await.unwrap());
    }

    #[tokio::test]
    async fn test_fresh_after_refresh() {
        let (_, svc) = service();
        svc.refresh(&seed_rows()).await.unwrap();
        assert!(svc.is_fresh().await.unwrap());
    }

    #[tokio::test]
    async fn test_stale_after_ttl() {
        let store = Arc::new(MemoryHousingStore::new());
        let svc = HousingCacheService::with_ttl(store.clone(), Duration::from_secs(0));
        svc.refresh(&seed_rows()).await.unwrap();
        // Zero TTL: any age is stale.
        assert!(!svc.is_fresh().await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_atomicity_counts() {
        let (store, svc) = service();
        let first = seed_rows();
        let n = svc.refresh(&first).await.unwrap();
        assert_eq!(n as usize, first.len());
        assert!(svc.snapshot_dates().await.unwrap().is_empty());

        let second = vec![row("2025T1", "00", "Nacional", 130.0)];
        svc.refresh(&second).await.unwrap();

        // Exactly one new snapshot date, holding the prior generation.
        let dates = svc.snapshot_dates().await.unwrap();
        assert_eq!(dates.len(), 1);
        assert_eq!(store.snapshot_len().await, first.len());
        assert_eq!(svc.read_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_preserves_generation() {
        let (store, svc) = service();
        svc.refresh(&seed_rows()).await.unwrap();
        let before = svc.read_filtered(&index_filter()).await.unwrap();
        let dates_before = svc.snapshot_dates().await.unwrap();

        store.fail_next_replace().await;
        let err = svc.refresh(&[row("2025T1", "00", "Nacional", 130.0)]).await;
        assert!(err.is_err());

        assert_eq!(svc.read_filtered(&index_filter()).await.unwrap(), before);
        assert_eq!(svc.snapshot_dates().await.unwrap(), dates_before);
    }

    #[tokio::test]
    async fn test_filter_scenario_madrid_since_2022() {
        let (_, svc) = service();
        svc.refresh(&seed_rows()).await.unwrap();

        let filter = index_filter().with_ccaa("13").with_years(Some(2022), None);
        let entries = svc.read_filtered(&filter).await.unwrap();

        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.ccaa_codigo == "13" && e.anio >= 2022));
        // Newest first.
        let ordered: Vec<(i32, i32)> = entries.iter().map(|e| (e.anio, e.trimestre)).collect();
        let mut sorted = ordered.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(ordered, sorted);
        assert_eq!(ordered.first(), Some(&(2024, 4)));
    }

    #[tokio::test]
    async fn test_region_00_returns_national_only() {
        let (_, svc) = service();
        svc.refresh(&seed_rows()).await.unwrap();

        let filter = index_filter().with_ccaa("00");
        let entries = svc.read_filtered(&filter).await.unwrap();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.ccaa_codigo == "00"));

        // No region filter returns both regions.
        let all = svc.read_filtered(&index_filter()).await.unwrap();
        assert!(all.len() > entries.len());
    }

    #[tokio::test]
    async fn test_clear_is_not_a_snapshot() {
        let (_, svc) = service();
        svc.refresh(&seed_rows()).await.unwrap();
        svc.refresh(&seed_rows()).await.unwrap();
        let dates_before = svc.snapshot_dates().await.unwrap();

        svc.clear().await.unwrap();

        assert!(svc.read_all().await.unwrap().is_empty());
        assert!(!svc.is_fresh().await.unwrap());
        assert_eq!(svc.snapshot_dates().await.unwrap(), dates_before);
    }

    #[tokio::test]
    async fn test_idempotent_reread() {
        let (_, svc) = service();
        svc.refresh(&seed_rows()).await.unwrap();
        let filter = index_filter().with_ccaa("13");
        let first = svc.read_filtered(&filter).await.unwrap();
        let second = svc.read_filtered(&filter).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_current_data_serves_fresh_cache_without_fetching() {
        let (_, svc) = service();
        svc.refresh(&seed_rows()).await.unwrap();

        let fetcher = StaticFetcher::new(vec![row("2025T1", "00", "Nacional", 130.0)]);
        let (entries, source) = svc.current_data(&index_filter(), &fetcher).await.unwrap();

        assert_eq!(source, DataSource::Cache);
        assert!(!entries.is_empty());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_current_data_refreshes_empty_cache() {
        let (_, svc) = service();
        let fetcher = StaticFetcher::new(seed_rows());

        let (entries, source) = svc.current_data(&index_filter(), &fetcher).await.unwrap();

        assert_eq!(source, DataSource::Ine);
        assert!(!entries.is_empty());
        assert_eq!(fetcher.calls(), 1);
        // The refresh wrote through the cache, so the next read is fresh.
        assert!(svc.is_fresh().await.unwrap());
    }

    #[tokio::test]
    async fn test_current_data_falls_back_to_stale_cache() {
        let store = Arc::new(MemoryHousingStore::new());
        let svc = HousingCacheService::with_ttl(store.clone(), Duration::from_secs(0));
        svc.refresh(&seed_rows()).await.unwrap();

        // Cache is stale (zero TTL) and the upstream is down.
        let (entries, source) = svc.current_data(&index_filter(), &FailingFetcher).await.unwrap();
        assert_eq!(source, DataSource::Cache);
        assert!(!entries.is_empty());
    }

    #[tokio::test]
    async fn test_current_data_fails_when_cache_empty_and_upstream_down() {
        let (_, svc) = service();
        let err = svc.current_data(&index_filter(), &FailingFetcher).await;
        assert!(matches!(err, Err(ServeError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_current_data_survives_refresh_failure_with_stale_cache() {
        let store = Arc::new(MemoryHousingStore::new());
        let svc = HousingCacheService::with_ttl(store.clone(), Duration::from_secs(0));
        svc.refresh(&seed_rows()).await.unwrap();

        store.fail_next_replace().await;
        let fetcher = StaticFetcher::new(vec![row("2025T1", "00", "Nacional", 130.0)]);
        let (entries, source) = svc.current_data(&index_filter(), &fetcher).await.unwrap();

        assert_eq!(source, DataSource::Cache);
        assert!(!entries.is_empty());
    }
}
