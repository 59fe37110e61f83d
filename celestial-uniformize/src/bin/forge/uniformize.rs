//! Uniformize a catalog file.
//!
//! Reads a CSV or Parquet catalog, keeps at most `--sweeps` rows per HEALPix
//! cell after region and duplicate filtering, and writes the kept rows in
//! sweep order.

use crate::cli::{Cli, UniformizeArgs};
use anyhow::Context;
use celestial_uniformize::table::TableFormat;
use celestial_uniformize::{uniformize_file, UniformizeConfig, UniformizeReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::time::Instant;

pub fn run(args: &UniformizeArgs, cli: &Cli) -> anyhow::Result<()> {
    validate_paths(args)?;
    let config = build_config(args);
    print_plan(args, &config, cli);
    configure_thread_pool(args.threads);

    let start = Instant::now();
    let pb = create_progress_bar();
    let report = uniformize_file(&args.input, &args.output, &config, &pb)
        .with_context(|| format!("Failed to uniformize {:?}", args.input))?;
    let elapsed = start.elapsed().as_secs_f64();

    print_stats(&report, elapsed);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json).with_context(|| format!("Failed to write report {:?}", path))?;
        println!("Report: {:?}", path);
    }
    Ok(())
}

fn validate_paths(args: &UniformizeArgs) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input catalog not found: {:?}", args.input);
    }
    TableFormat::from_path(&args.input)?;
    TableFormat::from_path(&args.output)?;
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn build_config(args: &UniformizeArgs) -> UniformizeConfig {
    UniformizeConfig {
        ra_column: args.ra_column.clone(),
        dec_column: args.dec_column.clone(),
        sort_column: args.sort_column.clone(),
        sort_ascending: !args.descending,
        region_cell: args.region_cell,
        region_nside: args.region_nside,
        margin_cells: args.margin_cells,
        nside: args.nside,
        dedup_radius_arcsec: args.dedup_arcsec,
        sweeps: args.sweeps,
    }
}

fn print_plan(args: &UniformizeArgs, config: &UniformizeConfig, cli: &Cli) {
    println!("=== Uniformize Catalog ===");
    println!("Input: {:?}", args.input);
    println!("Output: {:?}", args.output);
    println!("Columns: RA={} Dec={}", config.ra_column, config.dec_column);
    match &config.sort_column {
        Some(col) => println!(
            "Sort: {} ({})",
            col,
            if config.sort_ascending { "ascending" } else { "descending" }
        ),
        None => println!("Sort: input order"),
    }
    println!("nside: {}", config.nside);
    if config.region_cell >= 0 {
        println!(
            "Region: cell {} at nside {} (+{} margin cells)",
            config.region_cell, config.region_nside, config.margin_cells
        );
    } else {
        println!("Region: whole sky");
    }
    if config.dedup_radius_arcsec > 0.0 {
        println!("Dedup radius: {} arcsec", config.dedup_radius_arcsec);
    } else {
        println!("Dedup radius: off");
    }
    match config.capacity() {
        Some(cap) => println!("Sweeps: {}", cap),
        None => println!("Sweeps: unlimited"),
    }
    println!("Threads: {}", resolve_threads(args.threads));
    println!("Verbose: {}", cli.verbose);
    println!();
}

fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        threads
    }
}

fn configure_thread_pool(threads: usize) {
    rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_threads(threads))
        .build_global()
        .ok();
}

fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb
}

fn print_stats(report: &UniformizeReport, elapsed: f64) {
    println!();
    println!("=== Uniformize Statistics ===");
    println!("Input rows: {}", report.input_rows);
    if report.region_margin_cells > 0 {
        println!("Margin cells: {}", report.region_margin_cells);
    }
    println!("Outside region: {}", report.out_of_region);
    println!("Duplicates: {}", report.duplicates);
    println!("Over cell capacity: {}", report.over_capacity);
    println!("Occupied cells: {}", report.occupied_cells);
    for (k, count) in report.sweep_counts.iter().enumerate() {
        println!("Sweep {}: {} stars", k + 1, count);
    }
    println!(
        "Kept: {} ({:.1}%)",
        report.kept,
        if report.input_rows > 0 {
            report.kept as f64 / report.input_rows as f64 * 100.0
        } else {
            0.0
        }
    );
    println!("Elapsed: {:.1}s", elapsed);
}
