//! Proximity-based duplicate rejection.
//!
//! Positions are compared as unit vectors using the squared chord length,
//! so each pair costs a few multiplications instead of a trigonometric
//! separation. A radius `θ` maps to the chord threshold `(2 sin(θ/2))²`.
//!
//! Only the candidate's own cell and its neighbour ring are searched. That
//! is complete only while the cell side is larger than the radius; the
//! pipeline warns when it is not.

use super::buckets::CellBuckets;
use crate::grid::SkyGrid;

const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// Unit vector for `(ra_deg, dec_deg)`.
pub fn unit_vector(ra_deg: f64, dec_deg: f64) -> [f64; 3] {
    let ra = ra_deg.to_radians();
    let dec = dec_deg.to_radians();
    let cos_dec = libm::cos(dec);
    [libm::cos(ra) * cos_dec, libm::sin(ra) * cos_dec, libm::sin(dec)]
}

/// Squared straight-line distance between two unit vectors.
pub fn chord_distance_sq(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

/// Squared chord length subtending `radius_arcsec` on the unit sphere.
pub fn arcsec_to_chord_sq(radius_arcsec: f64) -> f64 {
    let chord = 2.0 * libm::sin(radius_arcsec * ARCSEC_TO_RAD / 2.0);
    chord * chord
}

/// Rejects candidates that lie within a fixed radius of an accepted row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuplicateFilter {
    radius_arcsec: f64,
    max_chord_sq: f64,
}

impl DuplicateFilter {
    /// Filter for `radius_arcsec`; `None` when the radius disables dedup.
    pub fn new(radius_arcsec: f64) -> Option<Self> {
        if radius_arcsec > 0.0 {
            Some(Self {
                radius_arcsec,
                max_chord_sq: arcsec_to_chord_sq(radius_arcsec),
            })
        } else {
            None
        }
    }

    pub fn radius_arcsec(&self) -> f64 {
        self.radius_arcsec
    }

    pub fn max_chord_sq(&self) -> f64 {
        self.max_chord_sq
    }

    /// True if some row already in `buckets`, in `cell` or one of its
    /// neighbours, lies strictly closer than the radius to `candidate`.
    ///
    /// `positions` holds the unit vector of every row, indexed by row.
    pub fn is_duplicate(
        &self,
        grid: &SkyGrid,
        cell: u64,
        candidate: &[f64; 3],
        buckets: &CellBuckets,
        positions: &[[f64; 3]],
    ) -> bool {
        if self.collides_in(buckets.find(cell), candidate, positions) {
            return true;
        }
        grid.neighbours(cell)
            .into_iter()
            .any(|n| self.collides_in(buckets.find(n), candidate, positions))
    }

    fn collides_in(
        &self,
        bucket: Option<&[usize]>,
        candidate: &[f64; 3],
        positions: &[[f64; 3]],
    ) -> bool {
        bucket.is_some_and(|rows| {
            rows.iter()
                .any(|&row| chord_distance_sq(candidate, &positions[row]) < self.max_chord_sq)
        })
    }
}
