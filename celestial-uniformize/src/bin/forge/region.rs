//! Inspect a coarse tile and its margin on a fine grid.

use crate::cli::{Cli, RegionArgs};
use anyhow::Context;
use celestial_uniformize::{Region, SkyGrid, TileBounds};
use std::fs;
use std::path::Path;

pub fn run(args: &RegionArgs, cli: &Cli) -> anyhow::Result<()> {
    let fine = SkyGrid::from_nside(args.nside)?;
    let coarse = SkyGrid::from_nside(args.region_nside)?;
    let bounds = TileBounds::new(fine, coarse, args.region_cell)?;
    let seeds = bounds.boundary_seeds();
    let region = Region::tile(bounds, args.margin_cells);

    println!("=== HEALPix Region ===");
    println!("Coarse cell: {} (nside {})", args.region_cell, args.region_nside);
    println!("Fine nside: {}", args.nside);
    println!("Cells per edge: {}", bounds.cells_per_edge());
    println!("Interior cells: {}", bounds.interior_size());
    println!("Boundary seeds: {}", seeds.len());
    println!("Margin rings: {}", args.margin_cells);
    println!("Margin cells: {}", region.margin_cells().len());
    println!("Fine cell side: {:.4} arcmin", fine.side_length_arcmin());

    if let Some(path) = &args.cells {
        compare_cell_list(path, bounds, &region)?;
    }

    if args.list || cli.verbose {
        println!();
        for cell in region.margin_cells() {
            println!("{}", cell);
        }
    }
    Ok(())
}

fn compare_cell_list(path: &Path, bounds: TileBounds, computed: &Region) -> anyhow::Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read cell list {:?}", path))?;
    let listed = Region::from_cell_list(bounds, &text)
        .with_context(|| format!("Invalid cell list {:?}", path))?;

    let missing = computed
        .margin_cells()
        .iter()
        .filter(|&&c| !listed.contains(c))
        .count();
    let extra = listed
        .margin_cells()
        .iter()
        .filter(|&&c| !computed.contains(c))
        .count();

    println!();
    println!("=== Cell List {:?} ===", path);
    println!("Listed cells: {}", listed.margin_cells().len());
    println!("Missing from list: {}", missing);
    println!("Not in computed margin: {}", extra);
    Ok(())
}
