//! Processing regions: the whole sky, or one coarse tile plus a margin.
//!
//! A tiled run processes one coarse cell (`region_cell` at `region_nside`)
//! of the fine grid. With a margin, fine cells just outside the tile are kept
//! as well, so neighbouring tiles overlap and each can deduplicate against
//! the other's sources.

use super::SkyGrid;
use crate::error::{Result, UniformizeError};

/// Boundary predicate for a tiled run.
///
/// Holds the coarse tile and both grids; [`contains`](Self::contains) is a
/// pure function of these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileBounds {
    cell: u64,
    coarse: SkyGrid,
    fine: SkyGrid,
}

impl TileBounds {
    /// Describe coarse cell `cell` of `coarse`, addressed through `fine`.
    ///
    /// # Errors
    /// Returns a configuration error if `fine` is coarser than `coarse` (the
    /// fine nside is then not a multiple of the coarse nside) or if `cell` is
    /// not a cell of `coarse`.
    pub fn new(fine: SkyGrid, coarse: SkyGrid, cell: u64) -> Result<Self> {
        if fine.depth() < coarse.depth() {
            return Err(UniformizeError::configuration(format!(
                "Fine nside {} must be a multiple of the coarse nside {}",
                fine.nside(),
                coarse.nside()
            )));
        }
        if cell >= coarse.n_cells() {
            return Err(UniformizeError::configuration(format!(
                "Region cell {} out of range for nside {} ({} cells)",
                cell,
                coarse.nside(),
                coarse.n_cells()
            )));
        }
        Ok(Self { cell, coarse, fine })
    }

    pub fn cell(&self) -> u64 {
        self.cell
    }

    pub fn coarse(&self) -> &SkyGrid {
        &self.coarse
    }

    pub fn fine(&self) -> &SkyGrid {
        &self.fine
    }

    /// Fine cells per tile edge (`fine_nside / coarse_nside`).
    pub fn cells_per_edge(&self) -> u32 {
        self.fine.nside() / self.coarse.nside()
    }

    /// Number of fine cells inside the tile.
    pub fn interior_size(&self) -> u64 {
        let r = self.cells_per_edge() as u64;
        r * r
    }

    /// True if fine cell `cell` lies inside the tile.
    pub fn contains(&self, cell: u64) -> bool {
        self.fine.to_coarse(cell, &self.coarse) == self.cell
    }

    /// Fine cells along the tile's perimeter, each listed once.
    ///
    /// Walks the four edges in face-local coordinates; every coordinate stays
    /// inside the tile's own base cell, so none can leave `[0, nside)`.
    pub fn boundary_seeds(&self) -> Vec<u64> {
        let r = self.cells_per_edge();
        let (base, bx, by) = self.coarse.decompose(self.cell);
        let x0 = bx * r;
        let y0 = by * r;
        let x1 = x0 + r - 1;
        let y1 = y0 + r - 1;
        debug_assert!(x1 < self.fine.nside() && y1 < self.fine.nside());

        if r == 1 {
            return vec![self.fine.compose(base, x0, y0)];
        }

        let mut seeds = Vec::with_capacity(4 * (r as usize - 1));
        for i in 0..r - 1 {
            seeds.push(self.fine.compose(base, x0 + i, y0));
            seeds.push(self.fine.compose(base, x1, y0 + i));
            seeds.push(self.fine.compose(base, x1 - i, y1));
            seeds.push(self.fine.compose(base, x0, y1 - i));
        }
        seeds
    }
}

/// The set of fine cells a run accepts points from.
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    /// No restriction; no cell set is built.
    WholeSky,
    /// One coarse tile. `margin` lists, in ascending order, the fine cells
    /// outside the tile that are within the margin of its border.
    Tile { bounds: TileBounds, margin: Vec<u64> },
}

impl Region {
    /// Build the region for `bounds` extended by `margin_cells` fine cells.
    ///
    /// With a zero margin no growth is performed and membership reduces to
    /// the tile predicate.
    pub fn tile(bounds: TileBounds, margin_cells: u32) -> Self {
        if margin_cells == 0 {
            return Self::Tile {
                bounds,
                margin: Vec::new(),
            };
        }
        let seeds = bounds.boundary_seeds();
        tracing::debug!(
            seeds = seeds.len(),
            cells_per_edge = bounds.cells_per_edge(),
            "Boundary cells of region tile"
        );
        let margin = bounds
            .fine()
            .grow_region(&seeds, margin_cells, |cell| !bounds.contains(cell));
        Self::Tile { bounds, margin }
    }

    /// Build a tile region from an explicit list of margin cells.
    ///
    /// # Errors
    /// Returns [`UniformizeError::InvalidRegion`] unless `margin` is strictly
    /// ascending and every cell lies outside the tile on the fine grid.
    pub fn from_margin_cells(bounds: TileBounds, margin: Vec<u64>) -> Result<Self> {
        if let Some(pos) = margin.windows(2).position(|w| w[0] >= w[1]) {
            return Err(UniformizeError::InvalidRegion(format!(
                "margin cells not strictly ascending at position {}: {} then {}",
                pos,
                margin[pos],
                margin[pos + 1]
            )));
        }
        let n_cells = bounds.fine().n_cells();
        if let Some(&cell) = margin
            .iter()
            .find(|&&c| c >= n_cells || bounds.contains(c))
        {
            return Err(UniformizeError::InvalidRegion(format!(
                "margin cell {} is inside the tile or off the grid",
                cell
            )));
        }
        Ok(Self::Tile { bounds, margin })
    }

    /// Parse a whitespace-separated list of margin cells and validate it
    /// with [`from_margin_cells`](Self::from_margin_cells).
    pub fn from_cell_list(bounds: TileBounds, text: &str) -> Result<Self> {
        let margin = text
            .split_whitespace()
            .map(|token| {
                token.parse::<u64>().map_err(|_| {
                    UniformizeError::InvalidRegion(format!("'{}' is not a cell index", token))
                })
            })
            .collect::<Result<Vec<u64>>>()?;
        Self::from_margin_cells(bounds, margin)
    }

    pub fn is_whole_sky(&self) -> bool {
        matches!(self, Self::WholeSky)
    }

    pub fn bounds(&self) -> Option<&TileBounds> {
        match self {
            Self::WholeSky => None,
            Self::Tile { bounds, .. } => Some(bounds),
        }
    }

    pub fn margin_cells(&self) -> &[u64] {
        match self {
            Self::WholeSky => &[],
            Self::Tile { margin, .. } => margin,
        }
    }

    /// True if points in fine cell `cell` belong to this run.
    pub fn contains(&self, cell: u64) -> bool {
        match self {
            Self::WholeSky => true,
            Self::Tile { bounds, margin } => {
                bounds.contains(cell) || margin.binary_search(&cell).is_ok()
            }
        }
    }
}
