mod common;

use common::{PlanarFrame, grid_with};
use flood_mesh::colour::WaterPalette;
use flood_mesh::error::RangeQuantity;
use flood_mesh::range::compute_range;
use flood_mesh::{
    ElevationField, FlatElevation, FloodGrid, FloodMeshConfig, MeshingJob, NoYield, TileMesh,
    VolumetricTileMesher, partition,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn run_job(grid: &FloodGrid, tiles_per_side: usize) -> Vec<TileMesh> {
    let config = FloodMeshConfig {
        tiles_per_side,
        elevation_batch: 5,
        range_batch: 11,
        tile_batch: 2,
        ..FloodMeshConfig::default()
    };
    let mut job = MeshingJob::new(grid, FlatElevation(3.0), PlanarFrame, config).unwrap();
    let mut meshes = Vec::new();
    job.run(&mut meshes, &mut NoYield).unwrap();
    meshes
}

/// Top colours keyed by global grid vertex.
fn top_colours(meshes: &[TileMesh]) -> HashMap<(usize, usize), [f32; 4]> {
    let mut colours = HashMap::new();
    for mesh in meshes.iter().filter(|m| !m.is_empty()) {
        let columns = mesh.tile.size_x() + 1;
        for (i, colour) in mesh.colours[..mesh.vert_count_per_side].iter().enumerate() {
            let cell = (mesh.tile.y_min + i / columns, mesh.tile.x_min + i % columns);
            colours.insert(cell, *colour);
        }
    }
    colours
}

#[test]
fn test_equal_depth_means_equal_colour_across_tiles() {
    let grid = grid_with(8, 8, |y, x| ((y * 3 + x) % 4) as f64 * 0.5, |y, x| (y + x) % 7 != 3);
    let meshes = run_job(&grid, 2);
    let colours = top_colours(&meshes);

    let mut by_depth: HashMap<u64, [f32; 4]> = HashMap::new();
    for ((y, x), colour) in colours {
        if !grid.is_valid(y, x) {
            continue;
        }
        let key = grid.water_depth(y, x).to_bits();
        let seen = by_depth.entry(key).or_insert(colour);
        assert_eq!(*seen, colour, "depth {} coloured twice", grid.water_depth(y, x));
    }
    assert_eq!(by_depth.len(), 4);
}

#[test]
fn test_hue_uses_global_range_but_alpha_does_not() {
    let narrow = grid_with(4, 4, |y, _| if y == 0 { 0.0 } else { 1.0 }, |_, _| true);
    let wide = grid_with(
        4,
        4,
        |y, _| match y {
            0 => 0.0,
            3 => 4.0,
            _ => 1.0,
        },
        |_, _| true,
    );

    let a = top_colours(&run_job(&narrow, 1))[&(2, 2)];
    let b = top_colours(&run_job(&wide, 1))[&(2, 2)];

    // Same 1 m depth: alpha from the fixed 2 m scale, hue from each grid's range.
    assert!((a[3] - 0.45).abs() < 1e-6);
    assert_eq!(a[3], b[3]);
    assert_ne!(&a[..3], &b[..3]);
}

#[test]
fn test_regeneration_is_identical() {
    let grid = grid_with(9, 7, |y, x| (y * x) as f64 * 0.1, |y, x| (y * 7 + x) % 5 != 0);
    let heights = (0..63).map(|i| i as f64 * 0.25).collect();
    let field = ElevationField::from_values(9, 7, heights).unwrap();
    let range = compute_range(grid.water_depths(), grid.validity(), RangeQuantity::WaterDepth).ok();
    let palette = WaterPalette::default();
    let mesher = VolumetricTileMesher::new(&grid, &field, range, &palette, 0.1, &PlanarFrame);

    for tile in partition(9, 7, 3).unwrap() {
        let first = mesher.build(&tile).unwrap();
        let second = mesher.build(&tile).unwrap();
        assert_eq!(first, second);
    }
    assert_eq!(run_job(&grid, 3), run_job(&grid, 3));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_vertex_count_ignores_validity(
        height in 2usize..12,
        width in 2usize..12,
        tiles in 1usize..5,
        seed in any::<u64>(),
    ) {
        prop_assume!(tiles <= height && tiles <= width);
        let bit = |y: usize, x: usize| (seed >> ((y * width + x) % 64)) & 1 == 1;
        let grid = grid_with(height, width, |y, x| (y + x) as f64 * 0.1, bit);

        let meshes = run_job(&grid, tiles);
        prop_assert_eq!(meshes.len(), tiles * tiles);
        for mesh in &meshes {
            let tile = mesh.tile;
            let any_valid = (tile.y_min..=tile.y_max)
                .any(|y| (tile.x_min..=tile.x_max).any(|x| grid.is_valid(y, x)));
            if any_valid {
                prop_assert_eq!(mesh.vertex_count(), 2 * tile.vert_count_per_side());
                prop_assert_eq!(mesh.colours.len(), mesh.vertex_count());
                prop_assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
                prop_assert_eq!(mesh.indices.len() % 3, 0);
            } else {
                prop_assert!(mesh.is_empty());
            }
        }
    }

    #[test]
    fn prop_invalid_vertices_are_never_referenced(
        height in 2usize..10,
        width in 2usize..10,
        seed in any::<u64>(),
    ) {
        let bit = |y: usize, x: usize| (seed >> ((y * width + x) % 64)) & 1 == 1;
        let grid = grid_with(height, width, |_, _| 1.0, bit);
        for mesh in run_job(&grid, 1).iter().filter(|m| !m.is_empty()) {
            let per_side = mesh.vert_count_per_side;
            let columns = mesh.tile.size_x() + 1;
            for &i in &mesh.indices {
                let local = i as usize % per_side;
                let (y, x) = (mesh.tile.y_min + local / columns, mesh.tile.x_min + local % columns);
                prop_assert!(grid.is_valid(y, x));
            }
        }
    }
}
