/// On-disk tile output and the manifest that indexes it.
use crate::assembler::{MeshSink, SinkError};
use crate::error::MeshError;
use crate::grid::GeodeticPoint;
use crate::job::JobReport;
use crate::mesher::TileMesh;
use crate::range::ValueRange;
use half::f16;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const TILE_MAGIC: &[u8; 4] = b"FMT1";
const HEADER_LEN: usize = 16;

/// Manifest entry for a written tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileEntry {
    pub py: usize,
    pub px: usize,
    /// Inclusive grid sub-rectangle `[y_min, y_max, x_min, x_max]`
    pub cells: [usize; 4],
    pub anchor_geodetic: GeodeticPoint,
    /// Anchor position in the rendering frame
    pub anchor_scene: [f64; 3],
    pub vertex_count: usize,
    pub index_count: usize,
    pub file: String,
}

/// Index of every tile written during one pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloodManifest {
    pub tiles_per_side: usize,
    pub depth_range: Option<ValueRange>,
    pub elevation_range: Option<ValueRange>,
    pub empty_tiles: usize,
    /// Tiles that could not be written
    pub rejected_tiles: usize,
    pub diagnostics: usize,
    pub tiles: Vec<TileEntry>,
}

/// Writes each non-empty tile to `tiles/` as it arrives.
pub struct TileWriter {
    output_dir: PathBuf,
    entries: Vec<TileEntry>,
    skipped: usize,
}

impl TileWriter {
    pub fn new(output_dir: &Path) -> Result<Self, MeshError> {
        fs::create_dir_all(output_dir.join("tiles"))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            entries: Vec::new(),
            skipped: 0,
        })
    }

    pub fn tile_file_name(py: usize, px: usize) -> String {
        format!("tiles/tile_{:02}_{:02}.bin", py, px)
    }

    pub fn entries(&self) -> &[TileEntry] {
        &self.entries
    }

    /// Write `manifest.json` and print a summary.
    pub fn finish(
        mut self,
        tiles_per_side: usize,
        report: &JobReport,
    ) -> Result<FloodManifest, MeshError> {
        self.entries.sort_by_key(|e| (e.py, e.px));
        let manifest = FloodManifest {
            tiles_per_side,
            depth_range: report.depth_range,
            elevation_range: report.elevation_range,
            empty_tiles: self.skipped,
            rejected_tiles: report.tiles_rejected,
            diagnostics: report.diagnostics.len(),
            tiles: self.entries,
        };

        let manifest_path = self.output_dir.join("manifest.json");
        fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

        println!("Generated manifest: {}", manifest_path.display());
        print_manifest_summary(&manifest);
        Ok(manifest)
    }
}

fn print_manifest_summary(manifest: &FloodManifest) {
    println!("Manifest Summary:");
    println!(
        "  Tiles: {} written, {} empty ({}x{} grid)",
        manifest.tiles.len(),
        manifest.empty_tiles,
        manifest.tiles_per_side,
        manifest.tiles_per_side
    );
    match manifest.depth_range {
        Some(range) => println!("  Water depth: {:.3} to {:.3} m", range.min, range.max),
        None => println!("  Water depth: no valid cells"),
    }
    if let Some(range) = manifest.elevation_range {
        println!("  Elevation: {:.2} to {:.2} m", range.min, range.max);
    }
    let vertices: usize = manifest.tiles.iter().map(|t| t.vertex_count).sum();
    let triangles: usize = manifest.tiles.iter().map(|t| t.index_count / 3).sum();
    println!("  Vertices: {}, triangles: {}", vertices, triangles);
    if manifest.rejected_tiles > 0 {
        println!("  Rejected: {} tiles not written", manifest.rejected_tiles);
    }
    if manifest.diagnostics > 0 {
        println!("  Diagnostics: {}", manifest.diagnostics);
    }
}

impl MeshSink for TileWriter {
    fn accept(&mut self, mesh: TileMesh) -> Result<(), SinkError> {
        let (py, px) = (mesh.tile.py, mesh.tile.px);
        let anchor = match (&mesh.anchor, mesh.is_empty()) {
            (Some(anchor), false) => *anchor,
            _ => {
                self.skipped += 1;
                return Ok(());
            }
        };

        let file = Self::tile_file_name(py, px);
        let bytes = encode_tile(&mesh).map_err(|e| SinkError::Rejected(e.to_string()))?;
        fs::write(self.output_dir.join(&file), bytes)
            .map_err(|e| SinkError::Rejected(format!("{}: {}", file, e)))?;

        let tile = mesh.tile;
        self.entries.push(TileEntry {
            py,
            px,
            cells: [tile.y_min, tile.y_max, tile.x_min, tile.x_max],
            anchor_geodetic: anchor.geodetic,
            anchor_scene: anchor.scene_position.to_array(),
            vertex_count: mesh.vertex_count(),
            index_count: mesh.indices.len(),
            file,
        });
        Ok(())
    }
}

/// Serialize a tile: header, f32 positions, f16 colours, u32 indices.
///
/// Fails when a count does not fit the u32 header fields.
pub fn encode_tile(mesh: &TileMesh) -> Result<Vec<u8>, io::Error> {
    let vertices = mesh.positions.len();
    let header = [vertices, mesh.vert_count_per_side, mesh.indices.len()];
    let mut bytes =
        Vec::with_capacity(HEADER_LEN + vertices * (12 + 8) + mesh.indices.len() * 4);

    bytes.extend_from_slice(TILE_MAGIC);
    for count in header {
        let count = u32::try_from(count).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("count {} overflows the tile header", count),
            )
        })?;
        bytes.extend_from_slice(&count.to_le_bytes());
    }

    let components: &[f32] = bytemuck::cast_slice(mesh.positions.as_slice());
    for c in components {
        bytes.extend_from_slice(&c.to_le_bytes());
    }
    let channels: &[f32] = bytemuck::cast_slice(mesh.colours.as_slice());
    for c in channels {
        bytes.extend_from_slice(&f16::from_f32(*c).to_bits().to_le_bytes());
    }
    for i in &mesh.indices {
        bytes.extend_from_slice(&i.to_le_bytes());
    }
    Ok(bytes)
}

/// Decoded tile file. Colours are widened back to f32.
#[derive(Debug, Clone, PartialEq)]
pub struct TileFile {
    pub vert_count_per_side: usize,
    pub positions: Vec<[f32; 3]>,
    pub colours: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

fn malformed(path: &Path, what: &str) -> MeshError {
    MeshError::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{}: {}", path.display(), what),
    ))
}

fn le_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes(bytemuck::pod_read_unaligned(bytes))
}

pub fn read_tile_file(path: &Path) -> Result<TileFile, MeshError> {
    let bytes = fs::read(path)?;
    if bytes.len() < HEADER_LEN || &bytes[..4] != TILE_MAGIC {
        return Err(malformed(path, "missing tile header"));
    }

    let vertices = le_u32(&bytes[4..8]) as usize;
    let vert_count_per_side = le_u32(&bytes[8..12]) as usize;
    let index_count = le_u32(&bytes[12..16]) as usize;

    let positions_end = HEADER_LEN + vertices * 12;
    let colours_end = positions_end + vertices * 8;
    let indices_end = colours_end + index_count * 4;
    if bytes.len() != indices_end {
        return Err(malformed(path, "length does not match header counts"));
    }

    let positions = bytes[HEADER_LEN..positions_end]
        .chunks_exact(12)
        .map(|v| {
            let c = |k: usize| {
                f32::from_le_bytes(bytemuck::pod_read_unaligned(&v[k * 4..k * 4 + 4]))
            };
            [c(0), c(1), c(2)]
        })
        .collect();
    let colours = bytes[positions_end..colours_end]
        .chunks_exact(8)
        .map(|v| {
            let c = |k: usize| {
                let bits = u16::from_le_bytes(bytemuck::pod_read_unaligned(&v[k * 2..k * 2 + 2]));
                f16::from_bits(bits).to_f32()
            };
            [c(0), c(1), c(2), c(3)]
        })
        .collect();
    let indices = bytes[colours_end..].chunks_exact(4).map(le_u32).collect();

    Ok(TileFile {
        vert_count_per_side,
        positions,
        colours,
        indices,
    })
}
