//! Sparse cell → bucket store.
//!
//! A bucket lists the row indices assigned to one cell in the order they
//! were accepted. The store only appends; capacity is enforced by the
//! binning pass, which knows the priority order.

use std::collections::BTreeMap;

/// Buckets keyed by cell, iterated in ascending cell order.
#[derive(Debug, Default, Clone)]
pub struct CellBuckets {
    cells: BTreeMap<u64, Vec<usize>>,
}

impl CellBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket for `cell`, created empty on first access.
    pub fn find_or_create(&mut self, cell: u64) -> &mut Vec<usize> {
        self.cells.entry(cell).or_default()
    }

    /// Bucket for `cell`, or `None` if the cell was never touched.
    pub fn find(&self, cell: u64) -> Option<&[usize]> {
        self.cells.get(&cell).map(Vec::as_slice)
    }

    /// Number of cells holding a bucket.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Total number of rows across all buckets.
    pub fn total_members(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn largest_bucket(&self) -> usize {
        self.cells.values().map(Vec::len).max().unwrap_or(0)
    }

    /// `(cell, bucket)` pairs in ascending cell order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[usize])> + '_ {
        self.cells.iter().map(|(&cell, rows)| (cell, rows.as_slice()))
    }
}
