//! Spatially uniform subsets of large star catalogs.
//!
//! A catalog is binned on a HEALPix grid, near-duplicate positions are
//! dropped, and at most `sweeps` rows are kept per cell, chosen by a
//! priority column such as magnitude. Kept rows are written in sweep order:
//! the best row of every cell first, then the second best, and so on, so any
//! prefix of the output is itself roughly uniform on the sky.
//!
//! Work can be restricted to one coarse HEALPix tile, optionally padded with
//! a margin of fine cells so neighbouring tiles overlap.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`grid`] | [`SkyGrid`] nested indexing, neighbours, coarse/fine conversion |
//! | [`grid::region`] | [`Region`] tiles and margin rings |
//! | [`uniformize`](mod@uniformize) | [`UniformizeConfig`], binning, [`select`], [`uniformize()`] |
//! | [`uniformize::buckets`] | [`CellBuckets`](uniformize::CellBuckets) per-cell row store |
//! | [`uniformize::dedup`] | [`DuplicateFilter`](uniformize::DuplicateFilter) chord-distance test |
//! | [`uniformize::sweep`] | [`sweep_order`](uniformize::sweep_order) interleaving |
//! | [`table`] | CSV and Parquet catalogs via `polars` |
//! | [`error`] | [`UniformizeError`] |
//!
//! # Quick Start
//!
//! ```ignore
//! use celestial_uniformize::{uniformize_file, UniformizeConfig};
//! use indicatif::ProgressBar;
//!
//! let mut config = UniformizeConfig::new(1024, 3);
//! config.sort_column = Some("phot_g_mean_mag".into());
//! config.dedup_radius_arcsec = 1.0;
//!
//! let report = uniformize_file(
//!     "gaia.parquet".as_ref(),
//!     "uniform.parquet".as_ref(),
//!     &config,
//!     &ProgressBar::hidden(),
//! )?;
//! ```
//!
//! # Features
//!
//! - **`cli`**: Enables the `forge` binary (`forge uniformize`, `forge region`).

pub mod error;
pub mod grid;
pub mod table;
pub mod uniformize;

pub use error::{Result, UniformizeError};
pub use grid::{Region, SkyGrid, TileBounds};
pub use uniformize::{
    priority_order, select, uniformize, uniformize_file, uniformize_with_progress, Selection,
    UniformizeConfig, UniformizeReport, Uniformized,
};
