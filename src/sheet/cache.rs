//! Time-boxed memoization of worksheet reads.

use super::{Row, SheetBackend, SheetResult};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::trace;

/// Wraps a backend and caches `read_all_values` per worksheet for a fixed TTL.
///
/// Any write to a worksheet drops its cached grid, so a reader always sees
/// its own writes. A read that overlaps a write is returned to its caller but
/// not kept. Point reads (`row_values`, `cell`) go to the inner backend.
pub struct CachedBackend {
    inner: Arc<dyn SheetBackend>,
    values: Cache<String, Arc<Vec<Row>>>,
    /// Bumped before every invalidation.
    generation: AtomicU64,
}

impl CachedBackend {
    pub fn new(inner: Arc<dyn SheetBackend>, ttl: Duration) -> Self {
        Self {
            inner,
            values: Cache::builder()
                .max_capacity(64)
                .time_to_live(ttl)
                .build(),
            generation: AtomicU64::new(0),
        }
    }

    async fn invalidate(&self, worksheet: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.values.invalidate(worksheet).await;
    }
}

#[async_trait]
impl SheetBackend for CachedBackend {
    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    async fn worksheet_names(&self) -> SheetResult<Vec<String>> {
        self.inner.worksheet_names().await
    }

    async fn ensure_worksheet(&self, worksheet: &str, headers: &[&str]) -> SheetResult<()> {
        self.inner.ensure_worksheet(worksheet, headers).await?;
        self.invalidate(worksheet).await;
        Ok(())
    }

    async fn read_all_values(&self, worksheet: &str) -> SheetResult<Vec<Row>> {
        if let Some(rows) = self.values.get(worksheet).await {
            trace!(worksheet, "Serving worksheet from cache");
            return Ok(rows.as_ref().clone());
        }
        let started = self.generation.load(Ordering::SeqCst);
        let rows = self.inner.read_all_values(worksheet).await?;
        if self.generation.load(Ordering::SeqCst) == started {
            self.values
                .insert(worksheet.to_string(), Arc::new(rows.clone()))
                .await;
            // A write may have invalidated between the check and the insert.
            if self.generation.load(Ordering::SeqCst) != started {
                self.values.invalidate(worksheet).await;
            }
        }
        Ok(rows)
    }

    async fn row_values(&self, worksheet: &str, row: usize) -> SheetResult<Row> {
        self.inner.row_values(worksheet, row).await
    }

    async fn cell(&self, worksheet: &str, row: usize, col: usize) -> SheetResult<Option<String>> {
        self.inner.cell(worksheet, row, col).await
    }

    async fn append_row(&self, worksheet: &str, values: Row) -> SheetResult<()> {
        let result = self.inner.append_row(worksheet, values).await;
        self.invalidate(worksheet).await;
        result
    }

    async fn update_row(&self, worksheet: &str, row: usize, values: Row) -> SheetResult<()> {
        let result = self.inner.update_row(worksheet, row, values).await;
        self.invalidate(worksheet).await;
        result
    }

    async fn delete_row(&self, worksheet: &str, row: usize) -> SheetResult<()> {
        let result = self.inner.delete_row(worksheet, row).await;
        self.invalidate(worksheet).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::SqliteWorkbook;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;

    fn row(cells: &[&str]) -> Row {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn writes_through_cache_are_visible() {
        let inner = Arc::new(SqliteWorkbook::open_in_memory().unwrap());
        let cached = CachedBackend::new(inner.clone(), Duration::from_secs(300));
        cached.ensure_worksheet("s", &["h"]).await.unwrap();

        assert_eq!(cached.read_all_values("s").await.unwrap().len(), 1);
        cached.append_row("s", row(&["one"])).await.unwrap();
        assert_eq!(cached.read_all_values("s").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reads_within_ttl_hit_the_cache() {
        let inner = Arc::new(SqliteWorkbook::open_in_memory().unwrap());
        let cached = CachedBackend::new(inner.clone(), Duration::from_secs(300));
        cached.ensure_worksheet("s", &["h"]).await.unwrap();
        cached.read_all_values("s").await.unwrap();

        // Bypass the wrapper: the cached grid stays stale until the TTL or a write.
        inner.append_row("s", row(&["hidden"])).await.unwrap();
        assert_eq!(cached.read_all_values("s").await.unwrap().len(), 1);

        cached.update_row("s", 1, row(&["h2"])).await.unwrap();
        let rows = cached.read_all_values("s").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "h2");
    }

    /// Holds the first full read open until released, after taking its snapshot.
    struct SlowFirstRead {
        inner: SqliteWorkbook,
        armed: AtomicBool,
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl SheetBackend for SlowFirstRead {
        fn kind(&self) -> &'static str {
            "slow"
        }

        async fn worksheet_names(&self) -> SheetResult<Vec<String>> {
            self.inner.worksheet_names().await
        }

        async fn ensure_worksheet(&self, worksheet: &str, headers: &[&str]) -> SheetResult<()> {
            self.inner.ensure_worksheet(worksheet, headers).await
        }

        async fn read_all_values(&self, worksheet: &str) -> SheetResult<Vec<Row>> {
            let rows = self.inner.read_all_values(worksheet).await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.started.notify_one();
                self.release.notified().await;
            }
            Ok(rows)
        }

        async fn append_row(&self, worksheet: &str, values: Row) -> SheetResult<()> {
            self.inner.append_row(worksheet, values).await
        }

        async fn update_row(&self, worksheet: &str, row: usize, values: Row) -> SheetResult<()> {
            self.inner.update_row(worksheet, row, values).await
        }

        async fn delete_row(&self, worksheet: &str, row: usize) -> SheetResult<()> {
            self.inner.delete_row(worksheet, row).await
        }
    }

    #[tokio::test]
    async fn read_overlapping_a_write_is_not_cached() {
        let slow = Arc::new(SlowFirstRead {
            inner: SqliteWorkbook::open_in_memory().unwrap(),
            armed: AtomicBool::new(false),
            started: Notify::new(),
            release: Notify::new(),
        });
        let cached = Arc::new(CachedBackend::new(slow.clone(), Duration::from_secs(300)));
        cached.ensure_worksheet("s", &["h"]).await.unwrap();
        slow.armed.store(true, Ordering::SeqCst);

        let reader = tokio::spawn({
            let cached = Arc::clone(&cached);
            async move { cached.read_all_values("s").await.unwrap().len() }
        });
        slow.started.notified().await;
        cached.append_row("s", row(&["one"])).await.unwrap();
        slow.release.notify_one();

        // The overlapping reader saw the old grid, but must not have cached it.
        assert_eq!(reader.await.unwrap(), 1);
        assert_eq!(cached.read_all_values("s").await.unwrap().len(), 2);
    }
}
