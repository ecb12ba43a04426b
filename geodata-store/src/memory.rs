//! In-memory housing store.
//!
//! Backs tests and local development. Mirrors the PostgreSQL store's
//! contract: natural-key uniqueness in the current generation, an
//! append-only snapshot ledger, and an all-or-nothing generation swap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use geodata_core::{CacheEntry, HousingFilter, HousingKey, NewHousingRow, SnapshotEntry};

use crate::error::{StoreError, StoreResult};
use crate::traits::HousingStore;

#[derive(Debug, Default)]
struct Inner {
    /// Current generation, keyed by the natural key (enforces uniqueness).
    current: BTreeMap<HousingKey, CacheEntry>,
    /// Append-only snapshot ledger.
    snapshots: Vec<SnapshotEntry>,
    /// Test hook: make the next replace_generation fail before mutating.
    fail_next_replace: bool,
}

/// In-memory implementation of [`HousingStore`].
#[derive(Debug, Default)]
pub struct MemoryHousingStore {
    inner: RwLock<Inner>,
}

impl MemoryHousingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arrange for the next `replace_generation` call to fail without
    /// mutating any state. Used to exercise rollback behavior in tests.
    pub async fn fail_next_replace(&self) {
        self.inner.write().await.fail_next_replace = true;
    }

    /// Number of rows in the current generation.
    pub async fn current_len(&self) -> usize {
        self.inner.read().await.current.len()
    }

    /// Number of rows in the snapshot ledger.
    pub async fn snapshot_len(&self) -> usize {
        self.inner.read().await.snapshots.len()
    }
}

fn sort_newest_first(entries: &mut [CacheEntry]) {
    entries.sort_by(|a, b| {
        b.anio
            .cmp(&a.anio)
            .then(b.trimestre.cmp(&a.trimestre))
            .then(a.ccaa_codigo.cmp(&b.ccaa_codigo))
    });
}

#[async_trait]
impl HousingStore for MemoryHousingStore {
    async fn latest_cached_at(&self) -> StoreResult<Option<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        Ok(inner.current.values().map(|e| e.cached_at).max())
    }

    async fn read_current(&self, filter: &HousingFilter) -> StoreResult<Vec<CacheEntry>> {
        let inner = self.inner.read().await;
        let mut out: Vec<CacheEntry> = inner
            .current
            .values()
            .filter(|e| filter.matches(&e.metrica, &e.tipo_vivienda, &e.ccaa_codigo, e.anio))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        Ok(out)
    }

    async fn read_all_current(&self) -> StoreResult<Vec<CacheEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.current.values().cloned().collect())
    }

    async fn replace_generation(
        &self,
        rows: &[NewHousingRow],
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;

        if inner.fail_next_replace {
            inner.fail_next_replace = false;
            return Err(StoreError::write_failed("injected failure"));
        }

        // Stage the new generation first; only mutate once nothing can fail.
        let mut staged: BTreeMap<HousingKey, CacheEntry> = BTreeMap::new();
        for row in rows {
            staged.insert(row.key(), CacheEntry::from_row(row, now));
        }

        if !inner.current.is_empty() {
            let frozen: Vec<SnapshotEntry> = inner
                .current
                .values()
                .map(|e| SnapshotEntry::from_cache(e, now))
                .collect();
            inner.snapshots.extend(frozen);
        }

        let count = staged.len() as u64;
        inner.current = staged;
        Ok(count)
    }

    async fn clear_current(&self) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let count = inner.current.len() as u64;
        inner.current.clear();
        Ok(count)
    }

    async fn snapshot_dates(&self) -> StoreResult<Vec<DateTime<Utc>>> {
        let inner = self.inner.read().await;
        let mut dates: Vec<DateTime<Utc>> =
            inner.snapshots.iter().map(|s| s.snapshot_date).collect();
        dates.sort_unstable();
        dates.dedup();
        dates.reverse();
        Ok(dates)
    }

    async fn read_snapshot(
        &self,
        filter: &HousingFilter,
        as_of: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<SnapshotEntry>> {
        let inner = self.inner.read().await;

        // With as_of, pin the most recent generation captured at or
        // before that instant and return only its rows.
        let generation: Option<DateTime<Utc>> = match as_of {
            Some(cutoff) => {
                let best = inner
                    .snapshots
                    .iter()
                    .map(|s| s.snapshot_date)
                    .filter(|d| *d <= cutoff)
                    .max();
                if best.is_none() {
                    return Ok(Vec::new());
                }
                best
            }
            None => None,
        };

        let mut out: Vec<SnapshotEntry> = inner
            .snapshots
            .iter()
            .filter(|s| generation.map_or(true, |g| s.snapshot_date == g))
            .filter(|s| filter.matches(&s.metrica, &s.tipo_vivienda, &s.ccaa_codigo, s.anio))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.snapshot_date
                .cmp(&a.snapshot_date)
                .then(b.anio.cmp(&a.anio))
                .then(b.trimestre.cmp(&a.trimestre))
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geodata_core::{HousingMetric, HousingTipo};
    use proptest::prelude::*;

    fn row(periodo: &str, ccaa: &str, valor: Option<f64>) -> NewHousingRow {
        let period = geodata_core::Period::parse(periodo).unwrap();
        NewHousingRow {
            periodo: periodo.to_string(),
            anio: period.anio,
            trimestre: period.trimestre,
            ccaa_codigo: ccaa.to_string(),
            ccaa_nombre: geodata_core::ccaa_name(ccaa).unwrap_or("?").to_string(),
            tipo_vivienda: "General".to_string(),
            metrica: "Índice".to_string(),
            valor,
        }
    }

    fn index_filter() -> HousingFilter {
        HousingFilter::new(HousingMetric::Index, HousingTipo::General)
    }

    #[tokio::test]
    async fn test_empty_store_has_no_generation() {
        let store = MemoryHousingStore::new();
        assert_eq!(store.latest_cached_at().await.unwrap(), None);
        assert!(store.read_current(&index_filter()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_generation_counts_rows() {
        let store = MemoryHousingStore::new();
        let rows = vec![row("2024T1", "00", Some(100.0)), row("2024T2", "00", Some(101.0))];
        let count = store.replace_generation(&rows, Utc::now()).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.current_len().await, 2);
        // First generation: nothing to snapshot.
        assert_eq!(store.snapshot_len().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_keys_collapse() {
        let store = MemoryHousingStore::new();
        let rows = vec![row("2024T1", "13", Some(100.0)), row("2024T1", "13", Some(105.0))];
        let count = store.replace_generation(&rows, Utc::now()).await.unwrap();
        assert_eq!(count, 1);
        let read = store.read_current(&index_filter()).await.unwrap();
        assert_eq!(read.len(), 1);
        // Last write wins on conflict.
        assert_eq!(read[0].valor, Some(105.0));
    }

    #[tokio::test]
    async fn test_second_generation_snapshots_the_first() {
        let store = MemoryHousingStore::new();
        let first = vec![row("2023T4", "00", Some(99.0)), row("2024T1", "00", Some(100.0))];
        store.replace_generation(&first, Utc::now()).await.unwrap();

        let second = vec![row("2024T2", "00", Some(102.0))];
        store.replace_generation(&second, Utc::now()).await.unwrap();

        assert_eq!(store.current_len().await, 1);
        assert_eq!(store.snapshot_len().await, 2);
        assert_eq!(store.snapshot_dates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_state_untouched() {
        let store = MemoryHousingStore::new();
        let first = vec![row("2024T1", "00", Some(100.0))];
        store.replace_generation(&first, Utc::now()).await.unwrap();
        let before = store.read_all_current().await.unwrap();
        let dates_before = store.snapshot_dates().await.unwrap();

        store.fail_next_replace().await;
        let second = vec![row("2024T2", "00", Some(102.0))];
        let err = store.replace_generation(&second, Utc::now()).await;
        assert!(matches!(err, Err(StoreError::WriteFailed { .. })));

        assert_eq!(store.read_all_current().await.unwrap(), before);
        assert_eq!(store.snapshot_dates().await.unwrap(), dates_before);

        // The failure is one-shot; the next replace succeeds.
        store.replace_generation(&second, Utc::now()).await.unwrap();
        assert_eq!(store.current_len().await, 1);
    }

    #[tokio::test]
    async fn test_clear_current_keeps_snapshots() {
        let store = MemoryHousingStore::new();
        store
            .replace_generation(&[row("2024T1", "00", Some(100.0))], Utc::now())
            .await
            .unwrap();
        store
            .replace_generation(&[row("2024T2", "00", Some(101.0))], Utc::now())
            .await
            .unwrap();
        let dates_before = store.snapshot_dates().await.unwrap();

        let removed = store.clear_current().await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.current_len().await, 0);
        assert_eq!(store.latest_cached_at().await.unwrap(), None);
        assert_eq!(store.snapshot_dates().await.unwrap(), dates_before);
    }

    #[tokio::test]
    async fn test_read_current_ordering() {
        let store = MemoryHousingStore::new();
        let rows = vec![
            row("2023T2", "00", Some(1.0)),
            row("2024T3", "00", Some(2.0)),
            row("2024T1", "00", Some(3.0)),
        ];
        store.replace_generation(&rows, Utc::now()).await.unwrap();
        let read = store.read_current(&index_filter()).await.unwrap();
        let periods: Vec<&str> = read.iter().map(|e| e.periodo.as_str()).collect();
        assert_eq!(periods, vec!["2024T3", "2024T1", "2023T2"]);
    }

    #[tokio::test]
    async fn test_read_snapshot_as_of_pins_one_generation() {
        let store = MemoryHousingStore::new();
        let t1 = Utc::now() - chrono::Duration::hours(2);
        let t2 = Utc::now() - chrono::Duration::hours(1);
        store
            .replace_generation(&[row("2024T1", "00", Some(100.0))], t1)
            .await
            .unwrap();
        // Supersede twice so the ledger has two generations.
        store
            .replace_generation(&[row("2024T2", "00", Some(101.0))], t2)
            .await
            .unwrap();
        store
            .replace_generation(&[row("2024T3", "00", Some(102.0))], Utc::now())
            .await
            .unwrap();

        let dates = store.snapshot_dates().await.unwrap();
        assert_eq!(dates.len(), 2);

        // as_of between the two snapshot dates pins the older generation.
        let mid = dates[1] + chrono::Duration::minutes(1);
        let rows = store.read_snapshot(&index_filter(), Some(mid)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].periodo, "2024T1");

        // as_of before every snapshot returns nothing.
        let early = dates[1] - chrono::Duration::hours(10);
        assert!(store
            .read_snapshot(&index_filter(), Some(early))
            .await
            .unwrap()
            .is_empty());

        // No as_of returns the full qualifying ledger, newest first.
        let all = store.read_snapshot(&index_filter(), None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].periodo, "2024T2");
    }

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    fn arb_rows() -> impl Strategy<Value = Vec<NewHousingRow>> {
        prop::collection::vec(
            (
                2000i32..2030,
                1i32..=4,
                prop::sample::select(vec!["00", "01", "09", "13"]),
            ),
            0..40,
        )
        .prop_map(|keys| {
            keys.into_iter()
                .map(|(anio, trimestre, ccaa)| {
                    row(&format!("{}T{}", anio, trimestre), ccaa, Some(anio as f64))
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_replace_collapses_to_distinct_keys(rows in arb_rows()) {
            let distinct: std::collections::BTreeSet<HousingKey> =
                rows.iter().map(|r| r.key()).collect();
            let store = MemoryHousingStore::new();
            let count = block_on(store.replace_generation(&rows, Utc::now())).unwrap();
            prop_assert_eq!(count as usize, distinct.len());
            prop_assert_eq!(block_on(store.current_len()), distinct.len());
        }

        #[test]
        fn prop_read_current_is_newest_first(rows in arb_rows()) {
            let store = MemoryHousingStore::new();
            block_on(store.replace_generation(&rows, Utc::now())).unwrap();
            let read = block_on(store.read_current(&index_filter())).unwrap();
            let order_key = |e: &CacheEntry| {
                (
                    std::cmp::Reverse(e.anio),
                    std::cmp::Reverse(e.trimestre),
                    e.ccaa_codigo.clone(),
                )
            };
            for pair in read.windows(2) {
                prop_assert!(order_key(&pair[0]) <= order_key(&pair[1]));
            }
        }
    }
}
