//! Capacity-bounded spatial uniformization of a point catalog.
//!
//! The pipeline runs in four stages:
//!
//! 1. **Order**: rows are visited in priority order (a sort column,
//!    ascending or descending, stable on ties) or in input order.
//! 2. **Bin**: each row is placed in its fine cell unless the cell is
//!    outside the [`Region`], a row already kept nearby is within the
//!    dedup radius, or the cell's bucket is full.
//! 3. **Sweep**: buckets are interleaved by rank; see [`sweep`].
//! 4. **Write**: the selected rows are taken from the table in sweep order.
//!
//! Because rows arrive in priority order, a full bucket already holds the
//! best rows its cell will ever see, so late arrivals can be dropped.
//!
//! # Example
//!
//! ```ignore
//! use celestial_uniformize::{uniformize, UniformizeConfig};
//!
//! let mut config = UniformizeConfig::new(256, 4);
//! config.sort_column = Some("MAG".into());
//! config.dedup_radius_arcsec = 1.0;
//!
//! let result = uniformize(&table, &config)?;
//! println!("kept {} of {}", result.report.kept, result.report.input_rows);
//! ```

pub mod buckets;
pub mod dedup;
pub mod sweep;

use indicatif::ProgressBar;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

use crate::error::{Result, UniformizeError};
use crate::grid::{is_valid_coordinate, Region, SkyGrid, TileBounds};
use crate::table;

pub use buckets::CellBuckets;
pub use dedup::DuplicateFilter;
pub use sweep::{sweep_order, SweepOrder};

/// `region_cell` value meaning "no restriction".
pub const WHOLE_SKY: i64 = -1;

const PROGRESS_STRIDE: usize = 1 << 16;

/// Parameters of one uniformization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformizeConfig {
    /// Right ascension column, in degrees.
    pub ra_column: String,
    /// Declination column, in degrees.
    pub dec_column: String,
    /// Priority column; rows are visited in its order when set.
    pub sort_column: Option<String>,
    pub sort_ascending: bool,
    /// Coarse tile to process, or [`WHOLE_SKY`].
    pub region_cell: i64,
    /// nside of the coarse tiling; required when `region_cell >= 0`.
    pub region_nside: u32,
    /// Fine cells of overlap kept beyond the tile border.
    pub margin_cells: u32,
    /// nside of the working grid.
    pub nside: u32,
    /// Duplicate radius in arcseconds; 0 disables deduplication.
    pub dedup_radius_arcsec: f64,
    /// Rows kept per cell and number of sweeps; 0 means no cap.
    pub sweeps: usize,
}

impl UniformizeConfig {
    /// Whole-sky run on an `nside` grid keeping `sweeps` rows per cell.
    pub fn new(nside: u32, sweeps: usize) -> Self {
        Self {
            ra_column: "RA".to_string(),
            dec_column: "DEC".to_string(),
            sort_column: None,
            sort_ascending: true,
            region_cell: WHOLE_SKY,
            region_nside: 0,
            margin_cells: 0,
            nside,
            dedup_radius_arcsec: 0.0,
            sweeps,
        }
    }

    /// Per-cell capacity; `None` when uncapped.
    pub fn capacity(&self) -> Option<usize> {
        (self.sweeps > 0).then_some(self.sweeps)
    }

    pub fn grid(&self) -> Result<SkyGrid> {
        SkyGrid::from_nside(self.nside)
    }

    /// Validate the configuration and build the working grid and region.
    ///
    /// # Errors
    /// Returns a configuration error for an unrepresentable nside, a fine
    /// nside that is not a multiple of the region nside, a region cell out
    /// of range, or a negative or non-finite dedup radius.
    pub fn plan(&self) -> Result<(SkyGrid, Region)> {
        let grid = self.grid()?;
        if !(self.dedup_radius_arcsec >= 0.0 && self.dedup_radius_arcsec.is_finite()) {
            return Err(UniformizeError::configuration(format!(
                "Dedup radius must be a non-negative number of arcsec, got {}",
                self.dedup_radius_arcsec
            )));
        }
        let region = match self.region_cell {
            WHOLE_SKY => Region::WholeSky,
            cell if cell >= 0 => {
                if self.region_nside == 0 {
                    return Err(UniformizeError::configuration(
                        "Region nside is required when a region cell is given",
                    ));
                }
                if self.nside % self.region_nside != 0 {
                    return Err(UniformizeError::configuration(format!(
                        "Fine nside {} must be a multiple of the coarse nside {}",
                        self.nside, self.region_nside
                    )));
                }
                let coarse = SkyGrid::from_nside(self.region_nside)?;
                let bounds = TileBounds::new(grid, coarse, cell as u64)?;
                Region::tile(bounds, self.margin_cells)
            }
            cell => {
                return Err(UniformizeError::configuration(format!(
                    "Region cell must be {} (whole sky) or a cell index, got {}",
                    WHOLE_SKY, cell
                )));
            }
        };
        Ok((grid, region))
    }
}

/// Row counts of the binning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinningCounts {
    pub out_of_region: usize,
    pub duplicates: usize,
    pub over_capacity: usize,
    pub kept: usize,
}

/// Result of [`select`]: the output row order plus diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Input row indices in output order.
    pub rows: Vec<usize>,
    pub counts: BinningCounts,
    /// Rows emitted by each sweep.
    pub per_sweep: Vec<usize>,
    /// Cells holding at least one kept row.
    pub occupied_cells: usize,
    /// Size of the region's margin ring, 0 for the whole sky.
    pub margin_cells: usize,
}

/// Summary of a run, suitable for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformizeReport {
    pub config: UniformizeConfig,
    pub input_rows: usize,
    pub out_of_region: usize,
    pub duplicates: usize,
    pub over_capacity: usize,
    /// Rows written, equal to the sum of `sweep_counts`.
    pub kept: usize,
    pub occupied_cells: usize,
    pub region_margin_cells: usize,
    pub sweep_counts: Vec<usize>,
}

/// A uniformized table and its report.
#[derive(Debug, Clone)]
pub struct Uniformized {
    pub table: DataFrame,
    pub report: UniformizeReport,
}

/// Row visiting order for `keys`: stable, NaN keys last in both directions.
pub fn priority_order(keys: &[f64], ascending: bool) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| compare_keys(keys[a], keys[b], ascending));
    order
}

fn compare_keys(a: f64, b: f64, ascending: bool) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) if ascending => a.total_cmp(&b),
        (false, false) => b.total_cmp(&a),
    }
}

/// Choose and order the rows to keep.
///
/// `ra` and `dec` are in degrees and index the same rows; `priority`, when
/// given, holds one sort key per row. Rows are binned on the working grid of
/// `config`, then interleaved by [`sweep_order`].
///
/// # Errors
/// Returns a configuration error for an invalid `config` or for columns of
/// differing lengths, or [`UniformizeError::InvalidCoordinate`] naming a row
/// whose position cannot be placed on the sphere.
pub fn select(
    ra: &[f64],
    dec: &[f64],
    priority: Option<&[f64]>,
    config: &UniformizeConfig,
    progress: &ProgressBar,
) -> Result<Selection> {
    let (grid, region) = config.plan()?;
    select_planned(ra, dec, priority, config, &grid, &region, progress)
}

fn select_planned(
    ra: &[f64],
    dec: &[f64],
    priority: Option<&[f64]>,
    config: &UniformizeConfig,
    grid: &SkyGrid,
    region: &Region,
    progress: &ProgressBar,
) -> Result<Selection> {
    check_lengths(ra.len(), dec.len(), priority.map(<[f64]>::len))?;
    log_plan(grid, region, config);

    let order = match priority {
        Some(keys) => priority_order(keys, config.sort_ascending),
        None => (0..ra.len()).collect(),
    };

    let cells = locate(grid, ra, dec)?;
    let filter = DuplicateFilter::new(config.dedup_radius_arcsec);
    let positions: Vec<[f64; 3]> = match filter {
        Some(_) => ra
            .par_iter()
            .zip(dec.par_iter())
            .map(|(&r, &d)| dedup::unit_vector(r, d))
            .collect(),
        None => Vec::new(),
    };

    let binner = Binner {
        grid,
        region,
        filter: filter.as_ref(),
        capacity: config.capacity(),
        cells: &cells,
        positions: &positions,
    };
    let (buckets, counts) = binner.run(&order, progress);
    tracing::info!("{} outside the region", counts.out_of_region);
    tracing::info!("{} duplicates", counts.duplicates);
    tracing::info!("{} over cell capacity", counts.over_capacity);

    let sweeps = sweep_order(&buckets, config.capacity());
    tracing::info!("Total: {} stars", sweeps.rows.len());

    Ok(Selection {
        rows: sweeps.rows,
        counts,
        per_sweep: sweeps.per_sweep,
        occupied_cells: buckets.len(),
        margin_cells: region.margin_cells().len(),
    })
}

fn check_lengths(ra: usize, dec: usize, priority: Option<usize>) -> Result<()> {
    if ra != dec {
        return Err(UniformizeError::configuration(format!(
            "RA and Dec columns differ in length ({} vs {})",
            ra, dec
        )));
    }
    if let Some(keys) = priority.filter(|&n| n != ra) {
        return Err(UniformizeError::configuration(format!(
            "Priority column has {} values for {} rows",
            keys, ra
        )));
    }
    Ok(())
}

fn log_plan(grid: &SkyGrid, region: &Region, config: &UniformizeConfig) {
    tracing::info!(
        nside = grid.nside(),
        cells = grid.n_cells(),
        "HEALPix side length: {:.4} arcmin",
        grid.side_length_arcmin()
    );
    if let Some(bounds) = region.bounds() {
        tracing::info!(
            cell = bounds.cell(),
            region_nside = bounds.coarse().nside(),
            interior = bounds.interior_size(),
            margin = region.margin_cells().len(),
            "Processing region tile"
        );
    }
    let side_arcsec = grid.side_length_arcmin() * 60.0;
    if config.dedup_radius_arcsec > side_arcsec {
        tracing::warn!(
            "Dedup radius {} arcsec exceeds the cell side ({:.2} arcsec); duplicates beyond adjacent cells are missed",
            config.dedup_radius_arcsec,
            side_arcsec
        );
    }
}

/// Fine cell of every row, computed in parallel.
fn locate(grid: &SkyGrid, ra: &[f64], dec: &[f64]) -> Result<Vec<u64>> {
    ra.par_iter()
        .zip(dec.par_iter())
        .enumerate()
        .map(|(row, (&r, &d))| {
            if is_valid_coordinate(r, d) {
                Ok(grid.cell_of(r, d))
            } else {
                Err(UniformizeError::InvalidCoordinate { row, ra: r, dec: d })
            }
        })
        .collect()
}

/// Sequential binning pass over rows in priority order.
struct Binner<'a> {
    grid: &'a SkyGrid,
    region: &'a Region,
    filter: Option<&'a DuplicateFilter>,
    capacity: Option<usize>,
    cells: &'a [u64],
    positions: &'a [[f64; 3]],
}

impl Binner<'_> {
    fn run(&self, order: &[usize], progress: &ProgressBar) -> (CellBuckets, BinningCounts) {
        let mut buckets = CellBuckets::new();
        let mut counts = BinningCounts::default();
        progress.set_length(order.len() as u64);

        for (i, &row) in order.iter().enumerate() {
            if i % PROGRESS_STRIDE == 0 {
                progress.set_position(i as u64);
            }
            let cell = self.cells[row];
            if !self.region.contains(cell) {
                counts.out_of_region += 1;
                continue;
            }
            if let Some(filter) = self.filter {
                let candidate = &self.positions[row];
                if filter.is_duplicate(self.grid, cell, candidate, &buckets, self.positions) {
                    counts.duplicates += 1;
                    continue;
                }
            }
            let bucket = buckets.find_or_create(cell);
            if self.capacity.is_some_and(|cap| bucket.len() >= cap) {
                counts.over_capacity += 1;
                continue;
            }
            bucket.push(row);
            counts.kept += 1;
        }

        progress.finish_and_clear();
        (buckets, counts)
    }
}

/// Uniformize an in-memory catalog.
pub fn uniformize(df: &DataFrame, config: &UniformizeConfig) -> Result<Uniformized> {
    uniformize_with_progress(df, config, &ProgressBar::hidden())
}

/// [`uniformize`], reporting binning progress on `progress`.
pub fn uniformize_with_progress(
    df: &DataFrame,
    config: &UniformizeConfig,
    progress: &ProgressBar,
) -> Result<Uniformized> {
    let (grid, region) = config.plan()?;
    uniformize_planned(df, config, &grid, &region, progress)
}

fn uniformize_planned(
    df: &DataFrame,
    config: &UniformizeConfig,
    grid: &SkyGrid,
    region: &Region,
    progress: &ProgressBar,
) -> Result<Uniformized> {
    table::check_row_count(df)?;
    let ra = table::float_column(df, &config.ra_column)?;
    let dec = table::float_column(df, &config.dec_column)?;
    let priority = match &config.sort_column {
        Some(name) => {
            tracing::info!("Sorting by {}...", name);
            Some(table::float_column_lossy(df, name)?)
        }
        None => None,
    };

    let selection = select_planned(&ra, &dec, priority.as_deref(), config, grid, region, progress)?;
    let output = table::take_rows(df, &selection.rows)?;

    let report = UniformizeReport {
        config: config.clone(),
        input_rows: df.height(),
        out_of_region: selection.counts.out_of_region,
        duplicates: selection.counts.duplicates,
        over_capacity: selection.counts.over_capacity,
        kept: selection.rows.len(),
        occupied_cells: selection.occupied_cells,
        region_margin_cells: selection.margin_cells,
        sweep_counts: selection.per_sweep,
    };
    Ok(Uniformized {
        table: output,
        report,
    })
}

/// Read `input`, uniformize it, and write the result to `output`.
///
/// The configuration and output format are checked before `input` is
/// read; `output` is replaced only after the whole table has been written.
pub fn uniformize_file(
    input: &Path,
    output: &Path,
    config: &UniformizeConfig,
    progress: &ProgressBar,
) -> Result<UniformizeReport> {
    let (grid, region) = config.plan()?;
    table::TableFormat::from_path(output)?;
    let df = table::read_table(input)?;
    tracing::info!(rows = df.height(), columns = df.width(), "Read {:?}", input);

    let Uniformized {
        table: mut selected,
        report,
    } = uniformize_planned(&df, config, &grid, &region, progress)?;
    tracing::info!("Writing output...");
    table::write_table(&mut selected, output)?;
    Ok(report)
}
