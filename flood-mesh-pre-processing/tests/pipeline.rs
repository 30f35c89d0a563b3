mod common;

use common::{PlanarFrame, grid_with, uniform_grid};
use flood_mesh::loader::{load_sample_folder, write_sample_folder};
use flood_mesh::manifest::{FloodManifest, TileWriter, read_tile_file};
use flood_mesh::schedule::Stage;
use flood_mesh::{
    EnuFrame, FlatElevation, FloodGrid, FloodMeshConfig, Flow, GeodeticPoint, GridSlot,
    JobProgress, JobReport, LocalFrameResolver, MeshError, MeshingJob, NoYield, TileMesh,
    YieldPoint,
};
use std::fs;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

fn config(tiles_per_side: usize) -> FloodMeshConfig {
    FloodMeshConfig {
        tiles_per_side,
        tile_batch: 1,
        ..FloodMeshConfig::default()
    }
}

#[test]
fn test_tiles_stream_to_another_thread() {
    let grid = Arc::new(uniform_grid(12, 12, 0.5));
    let (tx, rx) = mpsc::channel::<TileMesh>();

    let worker = {
        let grid = Arc::clone(&grid);
        thread::spawn(move || -> Result<JobReport, MeshError> {
            let mut sink = tx;
            let mut job = MeshingJob::new(&grid, FlatElevation(1.0), PlanarFrame, config(3))?;
            job.run(&mut sink, &mut NoYield)
        })
    };

    let received: Vec<TileMesh> = rx.iter().collect();
    let report = worker.join().unwrap().unwrap();
    assert_eq!(received.len(), 9);
    assert_eq!(report.tiles_assembled, 9);
    let order: Vec<_> = received.iter().map(|m| (m.tile.py, m.tile.px)).collect();
    assert_eq!(order[0], (0, 0));
    assert_eq!(order[8], (2, 2));
}

#[test]
fn test_dropped_receiver_fails_the_job() {
    let grid = uniform_grid(4, 4, 0.5);
    let (tx, rx) = mpsc::channel::<TileMesh>();
    drop(rx);
    let mut sink = tx;
    let mut job = MeshingJob::new(&grid, FlatElevation(0.0), PlanarFrame, config(2)).unwrap();
    let result = job.run(&mut sink, &mut NoYield);
    assert!(matches!(result, Err(MeshError::Sink { py: 0, px: 0, .. })));
}

#[test]
fn test_reload_abandons_without_partial_tiles() {
    let slot = GridSlot::new();
    let grid = slot.publish(uniform_grid(8, 8, 1.0));
    let mut job = MeshingJob::new(&grid, FlatElevation(0.0), PlanarFrame, config(4)).unwrap();

    let mut guard = slot.guard();
    let reloader = slot.clone();
    let mut built = 0;
    let mut yielder = |progress: &JobProgress| {
        if progress.stage == Stage::BuildingTiles {
            built = progress.done;
            if progress.done == 5 {
                reloader.publish(uniform_grid(8, 8, 2.0));
            }
        }
        guard.yield_now(progress)
    };

    let mut meshes = Vec::new();
    let result = job.run(&mut meshes, &mut yielder);
    assert!(matches!(result, Err(MeshError::Abandoned)));
    assert_eq!(built, 5);
    assert_eq!(meshes.len(), 5);
    assert!(meshes.iter().all(|m| m.vertex_count() == 2 * m.vert_count_per_side));
    assert_eq!(slot.current().unwrap().water_depth(0, 0), 2.0);
}

#[test]
fn test_step_driven_host_loop() {
    let grid = uniform_grid(6, 6, 1.0);
    let mut job = MeshingJob::new(&grid, FlatElevation(0.0), PlanarFrame, config(2)).unwrap();
    let mut meshes = Vec::new();
    let mut frames = 0;
    let mut next_frame = |_: &JobProgress| {
        frames += 1;
        Flow::Continue
    };
    let report = job.run(&mut meshes, &mut next_frame).unwrap();
    assert!(frames >= 4);
    assert_eq!(report.tiles_assembled, 4);
}

#[test]
fn test_sample_folder_to_tile_files() {
    let dir = std::env::temp_dir().join(format!("flood-mesh-pipeline-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);

    let base = (-87.62, 41.88);
    let source = {
        let g = grid_with(6, 6, |y, x| (y + x) as f64 * 0.2, |y, x| !(y == 5 && x == 5));
        let geodetic = (0..36)
            .map(|i| {
                GeodeticPoint::new(
                    base.0 + (i % 6) as f64 * 1e-5,
                    base.1 - (i / 6) as f64 * 1e-5,
                )
            })
            .collect();
        let (depth, valid) = (g.water_depths().to_vec(), g.validity().to_vec());
        FloodGrid::from_geodetic(6, 6, geodetic, depth, valid).unwrap()
    };
    write_sample_folder(&dir.join("sample"), &source, "EPSG:4326").unwrap();

    let grid = load_sample_folder(&dir.join("sample")).unwrap();
    let frame = EnuFrame::new(base.0, base.1, 0.0);
    let mut job = MeshingJob::new(&grid, FlatElevation(180.0), frame, config(2)).unwrap();
    let mut writer = TileWriter::new(&dir.join("out")).unwrap();
    let report = job.run(&mut writer, &mut NoYield).unwrap();
    let manifest = writer.finish(2, &report).unwrap();

    assert_eq!(manifest.tiles.len(), 4);
    let written: FloodManifest =
        serde_json::from_str(&fs::read_to_string(dir.join("out/manifest.json")).unwrap()).unwrap();
    assert_eq!(written.tiles[3].file, "tiles/tile_01_01.bin");
    assert_eq!(written.depth_range, report.depth_range);

    let tile = read_tile_file(&dir.join("out").join(&written.tiles[0].file)).unwrap();
    assert_eq!(tile.positions.len(), written.tiles[0].vertex_count);
    assert_eq!(tile.indices.len(), written.tiles[0].index_count);
    // Anchors sit at height 0, so local heights carry the terrain.
    for p in &tile.positions {
        assert!(p[0].abs() < 10.0 && p[2].abs() < 10.0);
        assert!(p[1] > 179.0 && p[1] < 183.0);
    }

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_enu_frame_keeps_small_height_offsets() {
    let frame = EnuFrame::new(151.2, -33.86, 0.0);
    let anchor = frame.to_global_fixed(151.2, -33.86, 0.0);
    let point = frame.to_global_fixed(151.2, -33.86, 0.37);
    let local = frame.to_local(anchor, point);

    assert!(anchor.length() > 6.3e6);
    assert!((local.y - 0.37).abs() < 1e-4);
    assert!(local.x.abs() < 1e-4 && local.z.abs() < 1e-4);
}
