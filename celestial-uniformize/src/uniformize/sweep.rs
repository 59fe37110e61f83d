//! Sweep scheduling: turn per-cell rankings into one output order.
//!
//! Sweep `k` takes the `k`-th ranked row of every cell, visiting cells in
//! ascending order. The first sweep therefore yields at most one row per
//! occupied cell, and no cell contributes its second row before every cell
//! has contributed its first.

use super::buckets::CellBuckets;

/// Output of the sweep pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOrder {
    /// Row indices in output order.
    pub rows: Vec<usize>,
    /// Number of rows emitted by each sweep.
    pub per_sweep: Vec<usize>,
}

/// Interleave `buckets` over `sweeps` passes.
///
/// With `sweeps = None` there is no cap: as many sweeps run as the largest
/// bucket holds rows, so every stored row is emitted. The output length is
/// the sum over cells of `min(bucket_len, sweeps)`.
pub fn sweep_order(buckets: &CellBuckets, sweeps: Option<usize>) -> SweepOrder {
    let n_sweeps = sweeps.unwrap_or_else(|| buckets.largest_bucket());
    let mut rows = Vec::with_capacity(buckets.total_members());
    let mut per_sweep = Vec::with_capacity(n_sweeps);

    for k in 0..n_sweeps {
        let start = rows.len();
        for (_, bucket) in buckets.iter() {
            if let Some(&row) = bucket.get(k) {
                rows.push(row);
            }
        }
        let emitted = rows.len() - start;
        tracing::info!("Sweep {}: {} stars", k + 1, emitted);
        per_sweep.push(emitted);
    }

    SweepOrder { rows, per_sweep }
}
