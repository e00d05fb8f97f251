//! Lightweight global metrics for statepack.
//!
//! Потокобезопасные атомарные счётчики:
//! - Capture (полные прогоны и попадания в окно кэша)
//! - Restore
//! - Archive (байты записанных/прочитанных архивов)

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// ----- Capture -----
static CAPTURES_TOTAL: AtomicU64 = AtomicU64::new(0);
static CAPTURE_CACHE_HITS: AtomicU64 = AtomicU64::new(0);

// ----- Restore -----
static RESTORES_TOTAL: AtomicU64 = AtomicU64::new(0);

// ----- Archive -----
static ARCHIVE_BYTES_WRITTEN: AtomicU64 = AtomicU64::new(0);
static ARCHIVE_BYTES_READ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub captures_total: u64,
    pub capture_cache_hits: u64,
    pub restores_total: u64,
    pub archive_bytes_written: u64,
    pub archive_bytes_read: u64,
}

impl MetricsSnapshot {
    /// Доля capture-вызовов, закрытых окном кэша.
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.captures_total + self.capture_cache_hits;
        if total == 0 {
            0.0
        } else {
            self.capture_cache_hits as f64 / total as f64
        }
    }
}

// ----- Recorders -----
pub fn record_capture() {
    CAPTURES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_capture_cache_hit() {
    CAPTURE_CACHE_HITS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_restore() {
    RESTORES_TOTAL.fetch_add(1, Ordering::Relaxed);
}

pub fn record_archive_written(bytes: u64) {
    ARCHIVE_BYTES_WRITTEN.fetch_add(bytes, Ordering::Relaxed);
}

pub fn record_archive_read(bytes: u64) {
    ARCHIVE_BYTES_READ.fetch_add(bytes, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn metrics_snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        captures_total: CAPTURES_TOTAL.load(Ordering::Relaxed),
        capture_cache_hits: CAPTURE_CACHE_HITS.load(Ordering::Relaxed),
        restores_total: RESTORES_TOTAL.load(Ordering::Relaxed),
        archive_bytes_written: ARCHIVE_BYTES_WRITTEN.load(Ordering::Relaxed),
        archive_bytes_read: ARCHIVE_BYTES_READ.load(Ordering::Relaxed),
    }
}

pub fn reset_metrics() {
    CAPTURES_TOTAL.store(0, Ordering::Relaxed);
    CAPTURE_CACHE_HITS.store(0, Ordering::Relaxed);
    RESTORES_TOTAL.store(0, Ordering::Relaxed);
    ARCHIVE_BYTES_WRITTEN.store(0, Ordering::Relaxed);
    ARCHIVE_BYTES_READ.store(0, Ordering::Relaxed);
}
