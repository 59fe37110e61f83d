use celestial_uniformize::table::{float_column, read_table, write_table};
use celestial_uniformize::uniformize::dedup::{arcsec_to_chord_sq, chord_distance_sq, unit_vector};
use celestial_uniformize::{uniformize, uniformize_file, SkyGrid, UniformizeConfig, UniformizeError};
use indicatif::ProgressBar;
use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use tempfile::TempDir;

fn catalog(ra: Vec<f64>, dec: Vec<f64>, mag: Vec<f64>) -> DataFrame {
    let id: Vec<u32> = (0..ra.len() as u32).collect();
    df!("ID" => id, "RA" => ra, "DEC" => dec, "MAG" => mag).unwrap()
}

fn ids(df: &DataFrame) -> Vec<u32> {
    df.column("ID")
        .unwrap()
        .as_materialized_series()
        .u32()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap())
        .collect()
}

/// Deterministic pseudo-random sky: uniform in RA and sin(Dec), with every
/// seventh source repeated 0.5 arcsec away.
fn synthetic_sky(n: usize) -> DataFrame {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1u64 << 53) as f64
    };
    let (mut ra, mut dec, mut mag) = (Vec::new(), Vec::new(), Vec::new());
    while ra.len() < n {
        let r = next() * 360.0;
        let d = (next() * 2.0 - 1.0).asin().to_degrees();
        let m = 6.0 + next() * 10.0;
        ra.push(r);
        dec.push(d);
        mag.push(m);
        if ra.len() % 7 == 0 && ra.len() < n {
            ra.push(r);
            dec.push((d + 0.5 / 3600.0).min(90.0));
            mag.push(m + 0.1);
        }
    }
    catalog(ra, dec, mag)
}

fn output_cells(df: &DataFrame, grid: &SkyGrid) -> Vec<u64> {
    let ra = float_column(df, "RA").unwrap();
    let dec = float_column(df, "DEC").unwrap();
    ra.iter().zip(&dec).map(|(&r, &d)| grid.cell_of(r, d)).collect()
}

#[test]
fn test_whole_sky_one_per_cell_in_cell_order() {
    let ra = vec![45.0, 135.0, 225.0, 315.0, 0.0, 90.0, 180.0, 270.0, 45.0, 135.0];
    let dec = vec![60.0, 60.0, 60.0, 60.0, 0.0, 0.0, 0.0, 0.0, -60.0, -60.0];
    let df = catalog(ra, dec, vec![10.0; 10]);
    let grid = SkyGrid::from_nside(1).unwrap();

    let input_cells: HashSet<u64> = output_cells(&df, &grid).into_iter().collect();
    assert_eq!(input_cells.len(), 10, "fixture must use distinct cells");

    let result = uniformize(&df, &UniformizeConfig::new(1, 1)).unwrap();
    assert_eq!(result.table.height(), 10);
    let cells = output_cells(&result.table, &grid);
    assert!(cells.windows(2).all(|w| w[0] < w[1]), "cells not ascending: {:?}", cells);
    assert_eq!(result.report.sweep_counts, vec![10]);
    assert_eq!(result.report.out_of_region, 0);
    assert_eq!(result.report.duplicates, 0);
}

#[test]
fn test_duplicate_pair_keeps_best_by_priority() {
    // Row 0 is fainter, so the brighter row 1 is visited first and survives.
    let df = catalog(
        vec![210.0, 210.0 + 0.3 / 3600.0],
        vec![-33.0, -33.0],
        vec![14.2, 11.7],
    );
    let mut config = UniformizeConfig::new(64, 4);
    config.sort_column = Some("MAG".into());
    config.dedup_radius_arcsec = 2.0;

    let result = uniformize(&df, &config).unwrap();
    assert_eq!(ids(&result.table), vec![1]);
    assert_eq!(result.report.duplicates, 1);
}

#[test]
fn test_bounded_region_drops_outside_points() {
    let coarse = SkyGrid::from_nside(2).unwrap();
    let fine = SkyGrid::from_nside(32).unwrap();
    let region_cell = coarse.cell_of(45.0, 40.0);

    let ra = vec![45.0, 44.0, 46.5, 200.0, 300.0, 10.0, 120.0, 45.0];
    let dec = vec![40.0, 41.0, 39.0, -50.0, 10.0, -5.0, 70.0, -40.0];
    let outside = ra
        .iter()
        .zip(&dec)
        .filter(|&(&r, &d)| coarse.cell_of(r, d) != region_cell)
        .count();
    assert!(outside >= 4);
    let df = catalog(ra, dec, vec![10.0; 8]);

    let mut config = UniformizeConfig::new(32, 0);
    config.region_cell = region_cell as i64;
    config.region_nside = 2;

    let result = uniformize(&df, &config).unwrap();
    assert_eq!(result.report.out_of_region, outside);
    assert_eq!(result.table.height(), 8 - outside);
    for cell in output_cells(&result.table, &fine) {
        assert_eq!(fine.to_coarse(cell, &coarse), region_cell);
    }
}

#[test]
fn test_cell_capacity_keeps_first_by_priority() {
    // Five candidates in one cell, plus one in a distant cell.
    let ra = vec![80.0, 80.01, 80.02, 80.03, 80.04, 250.0];
    let dec = vec![20.0, 20.0, 20.0, 20.0, 20.0, -20.0];
    let mag = vec![13.0, 9.0, 15.0, 10.0, 12.0, 8.0];
    let df = catalog(ra, dec, mag);
    let mut config = UniformizeConfig::new(8, 2);
    config.sort_column = Some("MAG".into());

    let result = uniformize(&df, &config).unwrap();
    assert_eq!(result.report.over_capacity, 3);
    assert_eq!(result.report.sweep_counts, vec![2, 1]);

    let kept = ids(&result.table);
    assert_eq!(kept.len(), 3);
    // Sweep 1 holds the best of each cell, sweep 2 the runner-up.
    let first_sweep: HashSet<u32> = kept[..2].iter().copied().collect();
    assert_eq!(first_sweep, HashSet::from([1, 5]));
    assert_eq!(kept[2], 3);
}

#[test]
fn test_descending_priority() {
    let df = catalog(vec![80.0, 80.01, 80.02], vec![20.0; 3], vec![1.0, 3.0, 2.0]);
    let mut config = UniformizeConfig::new(8, 1);
    config.sort_column = Some("MAG".into());
    config.sort_ascending = false;

    let result = uniformize(&df, &config).unwrap();
    assert_eq!(ids(&result.table), vec![1]);
}

#[test]
fn test_capacity_and_interleaving_properties() {
    let df = synthetic_sky(4000);
    let grid = SkyGrid::from_nside(4).unwrap();
    let mut config = UniformizeConfig::new(4, 3);
    config.sort_column = Some("MAG".into());

    let result = uniformize(&df, &config).unwrap();
    let cells = output_cells(&result.table, &grid);

    let mut per_cell: HashMap<u64, usize> = HashMap::new();
    for &cell in &cells {
        *per_cell.entry(cell).or_default() += 1;
    }
    assert!(per_cell.values().all(|&n| n <= 3));
    assert_eq!(result.report.occupied_cells, per_cell.len());

    let mut start = 0;
    let mut previous: Option<HashSet<u64>> = None;
    for &count in &result.report.sweep_counts {
        let sweep = &cells[start..start + count];
        assert!(sweep.windows(2).all(|w| w[0] < w[1]));
        let members: HashSet<u64> = sweep.iter().copied().collect();
        if let Some(prev) = &previous {
            assert!(members.is_subset(prev));
        }
        previous = Some(members);
        start += count;
    }
    assert_eq!(start, cells.len());
    assert_eq!(
        result.report.kept + result.report.over_capacity,
        result.report.input_rows
    );
}

#[test]
fn test_no_duplicates_among_neighbours() {
    let df = synthetic_sky(3000);
    let grid = SkyGrid::from_nside(16).unwrap();
    let radius = 900.0;
    let mut config = UniformizeConfig::new(16, 0);
    config.sort_column = Some("MAG".into());
    config.dedup_radius_arcsec = radius;

    let result = uniformize(&df, &config).unwrap();
    assert!(result.report.duplicates >= 300);

    let ra = float_column(&result.table, "RA").unwrap();
    let dec = float_column(&result.table, "DEC").unwrap();
    let cells = output_cells(&result.table, &grid);
    let vectors: Vec<[f64; 3]> = ra.iter().zip(&dec).map(|(&r, &d)| unit_vector(r, d)).collect();
    let threshold = arcsec_to_chord_sq(radius);

    for i in 0..vectors.len() {
        let near: HashSet<u64> = grid
            .neighbours(cells[i])
            .into_iter()
            .chain([cells[i]])
            .collect();
        for j in (i + 1)..vectors.len() {
            if near.contains(&cells[j]) {
                assert!(
                    chord_distance_sq(&vectors[i], &vectors[j]) >= threshold,
                    "rows {} and {} closer than {} arcsec",
                    i,
                    j,
                    radius
                );
            }
        }
    }
}

#[test]
fn test_margin_region_contains_tile() {
    let df = synthetic_sky(4000);
    let coarse = SkyGrid::from_nside(2).unwrap();
    let fine = SkyGrid::from_nside(16).unwrap();
    let region_cell = 21;

    let mut config = UniformizeConfig::new(16, 0);
    config.region_cell = region_cell as i64;
    config.region_nside = 2;
    let tile_only = uniformize(&df, &config).unwrap();

    config.margin_cells = 2;
    let with_margin = uniformize(&df, &config).unwrap();
    assert!(with_margin.report.region_margin_cells > 0);
    assert!(with_margin.table.height() > tile_only.table.height());

    let inside = output_cells(&with_margin.table, &fine)
        .into_iter()
        .filter(|&c| fine.to_coarse(c, &coarse) == region_cell)
        .count();
    assert_eq!(inside, tile_only.table.height());
}

#[test]
fn test_repeated_runs_identical() {
    let df = synthetic_sky(2000);
    let mut config = UniformizeConfig::new(8, 2);
    config.sort_column = Some("MAG".into());
    config.dedup_radius_arcsec = 5.0;

    let a = uniformize(&df, &config).unwrap();
    let b = uniformize(&df, &config).unwrap();
    assert_eq!(ids(&a.table), ids(&b.table));
    assert_eq!(a.report, b.report);
}

#[test]
fn test_file_round_trip_preserves_columns() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.csv");
    let output = dir.path().join("uniform.parquet");
    let mut df = synthetic_sky(500);
    write_table(&mut df, &input).unwrap();

    let mut config = UniformizeConfig::new(4, 2);
    config.sort_column = Some("MAG".into());
    let report = uniformize_file(&input, &output, &config, &ProgressBar::hidden()).unwrap();

    let back = read_table(&output).unwrap();
    assert_eq!(back.height(), report.kept);
    assert_eq!(back.get_column_names(), df.get_column_names());
    assert!(!dir.path().join("uniform.parquet.tmp").exists());
}

#[test]
fn test_missing_column_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.csv");
    let output = dir.path().join("out.csv");
    let mut df = synthetic_sky(50);
    write_table(&mut df, &input).unwrap();

    let mut config = UniformizeConfig::new(4, 1);
    config.dec_column = "DEJ2000".into();
    let err = uniformize_file(&input, &output, &config, &ProgressBar::hidden()).unwrap_err();
    assert!(
        matches!(err, UniformizeError::MissingColumn { ref column } if column == "DEJ2000"),
        "unexpected error: {}",
        err
    );
    assert!(!output.exists());

    let mut config = UniformizeConfig::new(4, 1);
    config.sort_column = Some("PHOT_G".into());
    let err = uniformize_file(&input, &output, &config, &ProgressBar::hidden()).unwrap_err();
    assert!(matches!(err, UniformizeError::MissingColumn { .. }));
    assert!(!output.exists());
}

#[test]
fn test_configuration_error_before_reading() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("never-created.csv");
    let output = dir.path().join("out.csv");

    let mut config = UniformizeConfig::new(64, 1);
    config.region_cell = 5;
    config.region_nside = 128;
    let err = uniformize_file(&input, &output, &config, &ProgressBar::hidden()).unwrap_err();
    assert!(err.is_configuration(), "unexpected error: {}", err);

    let config = UniformizeConfig::new(100, 1);
    let err = uniformize_file(&input, &output, &config, &ProgressBar::hidden()).unwrap_err();
    assert!(err.is_configuration(), "unexpected error: {}", err);
}

#[test]
fn test_invalid_coordinate_names_row() {
    let df = catalog(vec![10.0, f64::NAN, 30.0], vec![0.0, 0.0, 0.0], vec![1.0; 3]);
    let err = uniformize(&df, &UniformizeConfig::new(4, 1)).unwrap_err();
    assert!(matches!(err, UniformizeError::InvalidCoordinate { row: 1, .. }));
}

#[test]
fn test_text_priority_column_is_rejected_before_output() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.csv");
    let output = dir.path().join("out.csv");
    let mut df = df!(
        "RA" => [10.0, 10.01, 10.02],
        "DEC" => [5.0, 5.0, 5.0],
        "MAG" => ["bright", "faint", "medium"],
    )
    .unwrap();
    write_table(&mut df, &input).unwrap();

    let mut config = UniformizeConfig::new(8, 1);
    config.sort_column = Some("MAG".into());
    let err = uniformize_file(&input, &output, &config, &ProgressBar::hidden()).unwrap_err();
    assert!(
        matches!(err, UniformizeError::NonNumericColumn { ref column, .. } if column == "MAG"),
        "unexpected error: {}",
        err
    );
    assert!(!output.exists());
}
