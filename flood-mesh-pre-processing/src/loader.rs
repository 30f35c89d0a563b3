/// Processed flood sample folder reader
use crate::error::MeshError;
use crate::grid::{FloodGrid, GeodeticPoint};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const METADATA_FILE: &str = "flood_data_meta.json";
pub const ECEF_FILE: &str = "ecef_matrix.bin";
pub const WGS84_FILE: &str = "wgs84_matrix.bin";
pub const SRC_CRS_FILE: &str = "src_crs_matrix.bin";
pub const WATER_DEPTH_FILE: &str = "water_depth_matrix.bin";
pub const INVALID_MASK_FILE: &str = "invalid_mask.bin";

/// Contents of `flood_data_meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    /// `[height, width]`
    pub shape: [usize; 2],
    #[serde(default)]
    pub dtype: String,
    #[serde(default)]
    pub mask_dtype: String,
    #[serde(default)]
    pub crs: String,
    /// Affine raster transform in the source CRS
    #[serde(default)]
    pub transform: Vec<f64>,
}

impl SampleMetadata {
    pub fn read(dir: &Path) -> Result<Self, MeshError> {
        let text = fs::read_to_string(dir.join(METADATA_FILE))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn height(&self) -> usize {
        self.shape[0]
    }

    pub fn width(&self) -> usize {
        self.shape[1]
    }

    /// `height * width`, rejecting shapes that overflow.
    pub fn cell_count(&self) -> Result<usize, MeshError> {
        self.height().checked_mul(self.width()).ok_or_else(|| {
            MeshError::MalformedGrid(format!("shape {:?} overflows the cell count", self.shape))
        })
    }
}

/// Read a whole-file f64 matrix with `components` values per cell.
fn read_f64_matrix(
    path: &Path,
    cells: usize,
    components: usize,
) -> Result<Vec<f64>, MeshError> {
    let expected = cells
        .checked_mul(components * size_of::<f64>())
        .ok_or_else(|| {
            MeshError::MalformedGrid(format!(
                "{}: {} cells of {} values overflow the byte count",
                path.display(),
                cells,
                components
            ))
        })?;
    let raw = fs::read(path)?;
    if raw.len() != expected {
        return Err(MeshError::MalformedGrid(format!(
            "{} holds {} bytes, expected {}",
            path.display(),
            raw.len(),
            expected
        )));
    }

    Ok(raw
        .chunks_exact(size_of::<f64>())
        .map(|chunk| f64::from_le_bytes(bytemuck::pod_read_unaligned(chunk)))
        .collect())
}

fn pairs(values: Vec<f64>) -> Vec<[f64; 2]> {
    values.chunks_exact(2).map(|c| [c[0], c[1]]).collect()
}

/// Load a processed sample folder into a [`FloodGrid`].
///
/// Every matrix must match the declared shape exactly. The on-disk mask
/// flags invalid cells; the grid stores validity.
pub fn load_sample_folder(dir: &Path) -> Result<FloodGrid, MeshError> {
    let meta = SampleMetadata::read(dir)?;
    let (height, width) = (meta.height(), meta.width());
    let cells = meta.cell_count()?;
    log::info!(
        "Loading {}x{} flood sample from {} (crs {})",
        height,
        width,
        dir.display(),
        if meta.crs.is_empty() { "unknown" } else { meta.crs.as_str() }
    );

    let ecef = pairs(read_f64_matrix(&dir.join(ECEF_FILE), cells, 2)?);
    let geodetic = pairs(read_f64_matrix(&dir.join(WGS84_FILE), cells, 2)?)
        .into_iter()
        .map(|[lon, lat]| GeodeticPoint::new(lon, lat))
        .collect();
    let src_crs = pairs(read_f64_matrix(&dir.join(SRC_CRS_FILE), cells, 2)?);
    let water_depth = read_f64_matrix(&dir.join(WATER_DEPTH_FILE), cells, 1)?;

    let mask_path = dir.join(INVALID_MASK_FILE);
    let mask = fs::read(&mask_path)?;
    if mask.len() != cells {
        return Err(MeshError::MalformedGrid(format!(
            "{} holds {} bytes, expected {}",
            mask_path.display(),
            mask.len(),
            cells
        )));
    }
    let valid = mask.iter().map(|&flag| flag == 0).collect();

    let grid = FloodGrid::new(height, width, ecef, geodetic, src_crs, water_depth, valid)?;
    log::info!(
        "Loaded {} cells, {} valid",
        grid.cell_count(),
        grid.valid_count()
    );
    Ok(grid)
}

/// Write a grid in the processed sample folder layout.
pub fn write_sample_folder(dir: &Path, grid: &FloodGrid, crs: &str) -> Result<(), MeshError> {
    fs::create_dir_all(dir)?;
    let meta = SampleMetadata {
        shape: [grid.height(), grid.width()],
        dtype: "float64".into(),
        mask_dtype: "uint8".into(),
        crs: crs.into(),
        transform: Vec::new(),
    };
    fs::write(dir.join(METADATA_FILE), serde_json::to_string_pretty(&meta)?)?;

    let encode_pairs = |pick: &dyn Fn(usize, usize) -> [f64; 2]| -> Vec<u8> {
        let mut bytes = Vec::with_capacity(grid.cell_count() * 16);
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                for v in pick(y, x) {
                    bytes.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        bytes
    };

    fs::write(dir.join(ECEF_FILE), encode_pairs(&|y, x| grid.ecef(y, x)))?;
    fs::write(
        dir.join(WGS84_FILE),
        encode_pairs(&|y, x| {
            let p = grid.geodetic(y, x);
            [p.lon, p.lat]
        }),
    )?;
    fs::write(dir.join(SRC_CRS_FILE), encode_pairs(&|y, x| grid.src_crs(y, x)))?;

    let depth: Vec<u8> = grid
        .water_depths()
        .iter()
        .flat_map(|d| d.to_le_bytes())
        .collect();
    fs::write(dir.join(WATER_DEPTH_FILE), depth)?;

    let mask: Vec<u8> = grid.validity().iter().map(|&v| u8::from(!v)).collect();
    fs::write(dir.join(INVALID_MASK_FILE), mask)?;
    Ok(())
}
