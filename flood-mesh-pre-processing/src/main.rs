/// Flood mesh generator main entry point
use clap::Parser;
use flood_mesh::dds::write_r32f_dds;
use flood_mesh::elevation::{ElevationResolver, FlatElevation};
use flood_mesh::heightmap::HeightmapElevation;
use flood_mesh::loader::load_sample_folder;
use flood_mesh::manifest::TileWriter;
use flood_mesh::{EnuFrame, FloodMeshConfig, GeodeticPoint, GridSlot, MeshingJob};
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Parser, Debug)]
#[command(
    name = "flood-mesh",
    version,
    about = "Build volumetric flood tiles from a processed sample folder"
)]
struct Args {
    /// Processed sample folder containing flood_data_meta.json
    sample_dir: PathBuf,

    /// Output directory, defaults to <SAMPLE_DIR>/flood_mesh
    #[arg(long)]
    output: Option<PathBuf>,

    /// R32F terrain raster with a .json georeference sidecar
    #[arg(long)]
    heightmap: Option<PathBuf>,

    /// JSON pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Georeference origin as LON,LAT,H. Defaults to the centre cell at height 0
    #[arg(long, value_parser = parse_origin, allow_hyphen_values = true)]
    origin: Option<[f64; 3]>,

    /// Also write the sampled elevation field as an R32F DDS
    #[arg(long, default_value_t = false)]
    export_elevation: bool,
}

fn parse_origin(text: &str) -> Result<[f64; 3], String> {
    let parts: Vec<f64> = text
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("{}: {}", p, e)))
        .collect::<Result<_, _>>()?;
    match parts.as_slice() {
        [lon, lat, h] => Ok([*lon, *lat, *h]),
        _ => Err(format!("expected LON,LAT,H, got {} values", parts.len())),
    }
}

/// Terrain source chosen on the command line.
enum Terrain {
    Flat(FlatElevation),
    Heightmap(HeightmapElevation),
}

impl ElevationResolver for Terrain {
    fn sample_elevation(&mut self, points: &[GeodeticPoint]) -> Vec<Option<f64>> {
        match self {
            Terrain::Flat(flat) => flat.sample_elevation(points),
            Terrain::Heightmap(heightmap) => heightmap.sample_elevation(points),
        }
    }
}

fn export_elevation(
    output_dir: &Path,
    field: &flood_mesh::ElevationField,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = output_dir.join(format!(
        "elevation_{}x{}.dds",
        field.width(),
        field.height()
    ));
    let data: Vec<f32> = field.values().iter().map(|&h| h as f32).collect();
    write_r32f_dds(&path, field.width(), field.height(), &data)?;
    println!("Exported elevation field: {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FloodMeshConfig::load(path)?,
        None => FloodMeshConfig::default(),
    };
    config.show_progress = true;
    let tiles_per_side = config.tiles_per_side;

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| args.sample_dir.join("flood_mesh"));

    println!("Starting flood mesh generation: {}", args.sample_dir.display());

    // Load the grid in the background while the terrain source opens.
    let slot = GridSlot::new();
    let ready = slot.subscribe();
    let loader = {
        let slot = slot.clone();
        let sample_dir = args.sample_dir.clone();
        thread::spawn(move || {
            load_sample_folder(&sample_dir).map(|grid| {
                slot.publish(grid);
            })
        })
    };

    let terrain = match &args.heightmap {
        Some(path) => Terrain::Heightmap(HeightmapElevation::open(path)?),
        None => {
            log::info!("No heightmap given, using flat terrain at 0 m");
            Terrain::Flat(FlatElevation(0.0))
        }
    };

    loader
        .join()
        .map_err(|_| "grid loader thread panicked")??;
    let grid = ready.recv()?;

    let [lon, lat, h] = args.origin.unwrap_or_else(|| {
        let centre = grid.geodetic(grid.height() / 2, grid.width() / 2);
        [centre.lon, centre.lat, 0.0]
    });
    println!("Georeference origin: ({:.7}, {:.7}, {:.2})", lon, lat, h);

    let mut job = MeshingJob::new(&grid, terrain, EnuFrame::new(lon, lat, h), config)?;
    let mut writer = TileWriter::new(&output_dir)?;
    let report = job.run(&mut writer, &mut slot.guard())?;

    if args.export_elevation {
        export_elevation(&output_dir, job.elevation())?;
    }
    writer.finish(tiles_per_side, &report)?;

    println!("Flood mesh generation complete!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_parsing() {
        assert_eq!(parse_origin("-87.6, 41.8,12.5"), Ok([-87.6, 41.8, 12.5]));
        assert!(parse_origin("1,2").is_err());
        assert!(parse_origin("a,b,c").is_err());
    }
}
