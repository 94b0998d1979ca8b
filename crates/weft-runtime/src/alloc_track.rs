// src/alloc_track.rs
//! Live-instance tracking for managed values.
//!
//! Every managed allocation made through [`crate::boxed`] is counted against
//! its runtime type slot, and every release is subtracted again. A slot that
//! drifts away from zero after a graph has finished means generated code
//! leaked (positive) or double-freed (negative).
//!
//! Disabled by default; `enable_tracking()` turns it on. When disabled,
//! `track_alloc`/`track_dealloc` check the flag and return immediately.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::{TYPE_FLOAT_LIST, TYPE_OPAQUE, TYPE_TEXT};

/// Number of type slots. Must be greater than the highest TYPE_* constant.
pub const NUM_TYPE_SLOTS: usize = 16;

/// Per-type live counters, indexed by runtime type id.
static TYPE_COUNTERS: [AtomicI64; NUM_TYPE_SLOTS] = {
    #[allow(clippy::declare_interior_mutable_const)]
    const ZERO: AtomicI64 = AtomicI64::new(0);
    [ZERO; NUM_TYPE_SLOTS]
};

/// Sum of all per-type counters.
static TOTAL: AtomicI64 = AtomicI64::new(0);

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable tracking. Idempotent.
pub fn enable_tracking() {
    if !ENABLED.swap(true, Ordering::Relaxed) {
        tracing::debug!("managed allocation tracking enabled");
    }
}

/// Whether tracking is currently active.
pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Record a new live instance of the given runtime type.
#[inline]
pub fn track_alloc(type_id: u32) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }
    TOTAL.fetch_add(1, Ordering::Relaxed);
    if let Some(counter) = TYPE_COUNTERS.get(type_id as usize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Record the release of an instance of the given runtime type.
#[inline]
pub fn track_dealloc(type_id: u32) {
    if !ENABLED.load(Ordering::Relaxed) {
        return;
    }
    TOTAL.fetch_sub(1, Ordering::Relaxed);
    if let Some(counter) = TYPE_COUNTERS.get(type_id as usize) {
        counter.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Live instances of a single runtime type. Out-of-range ids report zero.
pub fn live_count(type_id: u32) -> i64 {
    TYPE_COUNTERS
        .get(type_id as usize)
        .map_or(0, |counter| counter.load(Ordering::Relaxed))
}

/// Snapshot the current total live count.
pub fn snapshot() -> i64 {
    TOTAL.load(Ordering::Relaxed)
}

/// Difference between the current total and a previous snapshot.
pub fn delta(snap: i64) -> i64 {
    TOTAL.load(Ordering::Relaxed) - snap
}

/// Non-zero per-type counts as `(type_id, count)` pairs.
pub fn report() -> Vec<(u32, i64)> {
    TYPE_COUNTERS
        .iter()
        .enumerate()
        .filter_map(|(i, counter)| {
            let count = counter.load(Ordering::Relaxed);
            (count != 0).then_some((i as u32, count))
        })
        .collect()
}

/// Human-readable name for a runtime type id.
pub fn type_name(type_id: u32) -> &'static str {
    match type_id {
        TYPE_OPAQUE => "Opaque",
        TYPE_FLOAT_LIST => "FloatList",
        TYPE_TEXT => "Text",
        _ => "Unknown",
    }
}
