use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cheap counters over the ingest and read paths. Observability only, never
/// part of any contract.
#[derive(Debug, Default)]
pub struct Metrics {
    atxs_processed: AtomicU64,
    atxs_stored: AtomicU64,
    atxs_rejected: AtomicU64,
    atx_cache_hits: AtomicU64,
    active_set_cache_hits: AtomicU64,
    active_set_cache_misses: AtomicU64,
}

pub type SharedMetrics = Arc<Metrics>;

impl Metrics {
    pub fn inc_processed(&self) {
        self.atxs_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stored(&self) {
        self.atxs_stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.atxs_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_atx_cache_hits(&self) {
        self.atx_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_active_set_cache_hits(&self) {
        self.active_set_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_active_set_cache_misses(&self) {
        self.active_set_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            atxs_processed: self.atxs_processed.load(Ordering::Relaxed),
            atxs_stored: self.atxs_stored.load(Ordering::Relaxed),
            atxs_rejected: self.atxs_rejected.load(Ordering::Relaxed),
            atx_cache_hits: self.atx_cache_hits.load(Ordering::Relaxed),
            active_set_cache_hits: self.active_set_cache_hits.load(Ordering::Relaxed),
            active_set_cache_misses: self.active_set_cache_misses.load(Ordering::Relaxed),
        }
    }
}

/// A copy of all counters as plain values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub atxs_processed: u64,
    pub atxs_stored: u64,
    pub atxs_rejected: u64,
    pub atx_cache_hits: u64,
    pub active_set_cache_hits: u64,
    pub active_set_cache_misses: u64,
}

impl Display for MetricsSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Atx DB Metrics Snapshot:")?;
        writeln!(f, "  Atxs processed: {}", self.atxs_processed)?;
        writeln!(f, "  Atxs stored: {}", self.atxs_stored)?;
        writeln!(f, "  Atxs rejected: {}", self.atxs_rejected)?;
        writeln!(f, "  Atx cache hits: {}", self.atx_cache_hits)?;
        writeln!(f, "  Active set cache hits: {}", self.active_set_cache_hits)?;
        writeln!(
            f,
            "  Active set cache misses: {}",
            self.active_set_cache_misses
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_copies_counters() {
        let metrics = Metrics::default();
        metrics.inc_processed();
        metrics.inc_processed();
        metrics.inc_stored();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.atxs_processed, 2);
        assert_eq!(snapshot.atxs_stored, 1);
        assert_eq!(snapshot.atxs_rejected, 0);
    }
}
