use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::khaapa::insights::error::Result;
use crate::khaapa::insights::model::LoadReport;

/// Default staleness window for cached load results.
pub const DEFAULT_STALENESS: Duration = Duration::from_secs(300);

#[derive(Debug)]
struct Snapshot {
    loaded_at: Instant,
    report: Arc<LoadReport>,
}

/// Caller-owned cache for the result of one load pass.
///
/// A cached report is served until it is older than the staleness window; a
/// zero window reloads on every call. Failed loads are never cached. The lock
/// is held across a load so concurrent callers share one pass.
#[derive(Debug)]
pub struct TableCache {
    staleness: Duration,
    slot: Mutex<Option<Snapshot>>,
}

impl TableCache {
    pub fn new(staleness: Duration) -> Self {
        Self {
            staleness,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached report, loading a fresh one when missing or stale.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<LoadReport>>
    where
        F: FnOnce() -> Result<LoadReport>,
    {
        let mut slot = self.slot.lock();
        if let Some(snapshot) = slot.as_ref() {
            if snapshot.loaded_at.elapsed() < self.staleness {
                debug!(age = ?snapshot.loaded_at.elapsed(), "serving cached tables");
                return Ok(Arc::clone(&snapshot.report));
            }
        }
        Self::store(&mut slot, load)
    }

    /// Loads unconditionally and replaces the cached report.
    pub fn refresh<F>(&self, load: F) -> Result<Arc<LoadReport>>
    where
        F: FnOnce() -> Result<LoadReport>,
    {
        let mut slot = self.slot.lock();
        Self::store(&mut slot, load)
    }

    /// Drops the cached report.
    pub fn invalidate(&self) {
        self.slot.lock().take();
    }

    /// `true` when the next [`get_or_load`](Self::get_or_load) will reload.
    pub fn is_stale(&self) -> bool {
        self.slot
            .lock()
            .as_ref()
            .is_none_or(|snapshot| snapshot.loaded_at.elapsed() >= self.staleness)
    }

    fn store<F>(slot: &mut Option<Snapshot>, load: F) -> Result<Arc<LoadReport>>
    where
        F: FnOnce() -> Result<LoadReport>,
    {
        let report = Arc::new(load()?);
        *slot = Some(Snapshot {
            loaded_at: Instant::now(),
            report: Arc::clone(&report),
        });
        Ok(report)
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new(DEFAULT_STALENESS)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::khaapa::insights::error::ToolError;
    use crate::khaapa::insights::model::Table;

    fn report(name: &str) -> LoadReport {
        LoadReport {
            tables: vec![Table {
                source_name: name.to_string(),
                columns: Vec::new(),
                rows: Vec::new(),
            }],
            skipped: Vec::new(),
            folder_found: true,
        }
    }

    #[test]
    fn fresh_reports_are_reused() {
        let cache = TableCache::new(Duration::from_secs(60));
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            Ok(report("first"))
        };

        assert!(cache.is_stale());
        cache.get_or_load(load).unwrap();
        cache.get_or_load(load).unwrap();
        assert_eq!(loads.get(), 1);
        assert!(!cache.is_stale());
    }

    #[test]
    fn zero_window_reloads_every_time() {
        let cache = TableCache::new(Duration::ZERO);
        let loads = Cell::new(0);
        let load = || {
            loads.set(loads.get() + 1);
            Ok(report("again"))
        };

        cache.get_or_load(load).unwrap();
        cache.get_or_load(load).unwrap();
        assert_eq!(loads.get(), 2);
    }

    #[test]
    fn refresh_replaces_and_invalidate_clears() {
        let cache = TableCache::new(Duration::from_secs(60));
        cache.get_or_load(|| Ok(report("old"))).unwrap();
        let refreshed = cache.refresh(|| Ok(report("new"))).unwrap();
        assert_eq!(refreshed.tables[0].source_name, "new");

        let served = cache.get_or_load(|| Ok(report("unused"))).unwrap();
        assert_eq!(served.tables[0].source_name, "new");

        cache.invalidate();
        assert!(cache.is_stale());
    }

    #[test]
    fn failed_loads_are_not_cached() {
        let cache = TableCache::new(Duration::from_secs(60));
        let failed = cache.get_or_load(|| Err(ToolError::SourceUnavailable("offline".into())));
        assert!(failed.is_err());
        assert!(cache.is_stale());

        let loaded = cache.get_or_load(|| Ok(report("recovered"))).unwrap();
        assert_eq!(loaded.tables[0].source_name, "recovered");
    }
}
