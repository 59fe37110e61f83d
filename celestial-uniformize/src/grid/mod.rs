//! Nested HEALPix grid used to bin catalog positions.
//!
//! [`SkyGrid`] wraps a `cdshealpix` nested layer at a fixed resolution and
//! adds the operations the uniformizer needs on top of it: conversion to a
//! coarser grid, face-local `(x, y)` addressing, and predicate-filtered
//! region growth through neighbour rings.
//!
//! Cell identifiers use the nested scheme, so the cells of a coarse cell at
//! depth `d` are the contiguous range of fine cells sharing its bits in the
//! top `2 * d + 4` positions.

pub mod region;

use cdshealpix::nested::{self, Layer};
use std::collections::HashSet;
use std::f64::consts::PI;
use std::fmt;

use crate::error::{Result, UniformizeError};

pub use region::{Region, TileBounds};

/// Deepest nested layer `cdshealpix` can address (nside = 2^29).
pub const MAX_DEPTH: u8 = 29;

/// Number of base cells tiling the sphere at depth 0.
pub const BASE_CELLS: u64 = 12;

const ARCMIN_PER_RAD: f64 = 180.0 * 60.0 / PI;

/// A HEALPix nested grid at one resolution.
///
/// Cheap to copy: the underlying layer is a static table owned by
/// `cdshealpix`.
#[derive(Clone, Copy)]
pub struct SkyGrid {
    depth: u8,
    layer: &'static Layer,
}

impl SkyGrid {
    /// Build the grid for a HEALPix `nside`.
    ///
    /// # Errors
    /// Returns a configuration error if `nside` is zero, not a power of two,
    /// or finer than [`MAX_DEPTH`] allows.
    pub fn from_nside(nside: u32) -> Result<Self> {
        if nside == 0 || !nside.is_power_of_two() {
            return Err(UniformizeError::configuration(format!(
                "HEALPix nside must be a positive power of two, got {}",
                nside
            )));
        }
        let depth = nside.trailing_zeros() as u8;
        if depth > MAX_DEPTH {
            return Err(UniformizeError::configuration(format!(
                "Maximum HEALPix nside is {}, got {}",
                1u32 << MAX_DEPTH,
                nside
            )));
        }
        Ok(Self::from_depth(depth))
    }

    /// Build the grid for a nested depth (nside = 2^depth).
    ///
    /// # Panics
    /// Panics if `depth > MAX_DEPTH`.
    pub fn from_depth(depth: u8) -> Self {
        assert!(depth <= MAX_DEPTH, "HEALPix depth {} out of range", depth);
        Self {
            depth,
            layer: nested::get(depth),
        }
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn nside(&self) -> u32 {
        1u32 << self.depth
    }

    /// Total number of cells, `12 * nside^2`.
    pub fn n_cells(&self) -> u64 {
        let nside = self.nside() as u64;
        BASE_CELLS * nside * nside
    }

    /// Side length of an (equal-area) cell, in arcminutes.
    pub fn side_length_arcmin(&self) -> f64 {
        libm::sqrt(4.0 * PI / self.n_cells() as f64) * ARCMIN_PER_RAD
    }

    /// Cell containing the position `(ra_deg, dec_deg)`.
    ///
    /// The caller must pass a coordinate accepted by [`is_valid_coordinate`].
    pub fn cell_of(&self, ra_deg: f64, dec_deg: f64) -> u64 {
        debug_assert!(is_valid_coordinate(ra_deg, dec_deg));
        let lon = ra_deg.rem_euclid(360.0).to_radians();
        let lat = dec_deg.to_radians();
        self.layer.hash(lon, lat)
    }

    /// The ring of cells sharing an edge or a corner with `cell`.
    ///
    /// Holds 8 cells except next to base-cell corners, where 7 or 6 exist.
    pub fn neighbours(&self, cell: u64) -> Vec<u64> {
        self.layer.neighbours(cell, false).values_vec()
    }

    /// Convert a cell of this grid to the cell containing it at `coarse`.
    pub fn to_coarse(&self, cell: u64, coarse: &SkyGrid) -> u64 {
        debug_assert!(coarse.depth <= self.depth);
        cell >> (2 * (self.depth - coarse.depth) as u32)
    }

    /// Split a cell into its base cell and face-local `(x, y)` coordinates.
    pub fn decompose(&self, cell: u64) -> (u8, u32, u32) {
        let shift = 2 * self.depth as u32;
        let base = (cell >> shift) as u8;
        let (x, y) = pix2xy_nest(cell & ((1u64 << shift) - 1), self.depth);
        (base, x, y)
    }

    /// Inverse of [`decompose`](Self::decompose).
    pub fn compose(&self, base: u8, x: u32, y: u32) -> u64 {
        debug_assert!(x < self.nside() && y < self.nside());
        ((base as u64) << (2 * self.depth as u32)) | xy2pix_nest(x, y, self.depth)
    }

    /// Grow a region outward from `seeds` through `steps` neighbour rings.
    ///
    /// A cell reached for the first time is retained, and expanded on the
    /// next ring, only if `keep` accepts it. Seeds themselves are not part of
    /// the result. The returned cells are in ascending order.
    pub fn grow_region<F>(&self, seeds: &[u64], steps: u32, keep: F) -> Vec<u64>
    where
        F: Fn(u64) -> bool,
    {
        let mut visited: HashSet<u64> = seeds.iter().copied().collect();
        let mut frontier: Vec<u64> = seeds.to_vec();
        let mut grown = Vec::new();

        for _ in 0..steps {
            if frontier.is_empty() {
                break;
            }
            let mut next = Vec::new();
            for &cell in &frontier {
                for neighbour in self.neighbours(cell) {
                    if visited.insert(neighbour) && keep(neighbour) {
                        grown.push(neighbour);
                        next.push(neighbour);
                    }
                }
            }
            frontier = next;
        }

        grown.sort_unstable();
        grown
    }
}

impl fmt::Debug for SkyGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkyGrid")
            .field("depth", &self.depth)
            .field("nside", &self.nside())
            .finish()
    }
}

impl PartialEq for SkyGrid {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth
    }
}

impl Eq for SkyGrid {}

/// True if `(ra_deg, dec_deg)` can be placed on the grid.
pub fn is_valid_coordinate(ra_deg: f64, dec_deg: f64) -> bool {
    ra_deg.is_finite() && dec_deg.is_finite() && (-90.0..=90.0).contains(&dec_deg)
}

/// Interleave face coordinates into a nested in-face index (Z-order curve),
/// `x` on the even bits.
fn xy2pix_nest(x: u32, y: u32, depth: u8) -> u64 {
    let mut result: u64 = 0;
    for i in 0..depth as u32 {
        let bit_x = ((x >> i) & 1) as u64;
        let bit_y = ((y >> i) & 1) as u64;
        result |= (bit_x << (2 * i)) | (bit_y << (2 * i + 1));
    }
    result
}

fn pix2xy_nest(pix: u64, depth: u8) -> (u32, u32) {
    let mut x: u32 = 0;
    let mut y: u32 = 0;
    for i in 0..depth as u32 {
        x |= (((pix >> (2 * i)) & 1) as u32) << i;
        y |= (((pix >> (2 * i + 1)) & 1) as u32) << i;
    }
    (x, y)
}
