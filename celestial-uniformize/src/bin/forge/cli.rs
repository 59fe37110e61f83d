//! CLI argument definitions for forge

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forge")]
#[command(about = "Spatial uniformization of star catalogs")]
#[command(version)]
pub struct Cli {
    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select a spatially uniform, deduplicated subset of a catalog
    Uniformize(UniformizeArgs),

    /// Describe a coarse HEALPix tile and its margin on a fine grid
    Region(RegionArgs),
}

#[derive(Parser)]
pub struct UniformizeArgs {
    /// Input catalog (.csv or .parquet)
    #[arg(long)]
    pub input: PathBuf,

    /// Output catalog (.csv or .parquet)
    #[arg(long)]
    pub output: PathBuf,

    /// Right ascension column, degrees
    #[arg(long, default_value = "RA")]
    pub ra_column: String,

    /// Declination column, degrees
    #[arg(long, default_value = "DEC")]
    pub dec_column: String,

    /// Priority column; rows are kept best-first in this order
    #[arg(long)]
    pub sort_column: Option<String>,

    /// Sort the priority column in descending order
    #[arg(long)]
    pub descending: bool,

    /// Coarse tile to process (-1 = whole sky)
    #[arg(long, default_value = "-1", allow_hyphen_values = true)]
    pub region_cell: i64,

    /// nside of the coarse tiling
    #[arg(long, default_value = "0")]
    pub region_nside: u32,

    /// Fine cells of overlap kept around the tile
    #[arg(long, default_value = "0")]
    pub margin_cells: u32,

    /// nside of the working grid (power of two)
    #[arg(long)]
    pub nside: u32,

    /// Duplicate radius in arcseconds (0 = no deduplication)
    #[arg(long, default_value = "0")]
    pub dedup_arcsec: f64,

    /// Rows kept per cell, one per sweep (0 = no cap)
    #[arg(long)]
    pub sweeps: usize,

    /// Number of threads for parallel processing (0 = all cores)
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// Write a JSON run report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Parser)]
pub struct RegionArgs {
    /// Coarse tile index
    #[arg(long)]
    pub region_cell: u64,

    /// nside of the coarse tiling
    #[arg(long)]
    pub region_nside: u32,

    /// nside of the fine grid
    #[arg(long)]
    pub nside: u32,

    /// Fine cells of margin around the tile
    #[arg(long, default_value = "0")]
    pub margin_cells: u32,

    /// Print every margin cell
    #[arg(long)]
    pub list: bool,

    /// Margin cell list to validate and compare with the computed margin
    #[arg(long)]
    pub cells: Option<PathBuf>,
}
