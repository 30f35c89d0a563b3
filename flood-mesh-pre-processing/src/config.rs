/// Pipeline configuration, loadable from JSON
use crate::colour::WaterPalette;
use crate::error::MeshError;
use constants::tiling::{
    BOTTOM_SURFACE_OFFSET, DEFAULT_ELEVATION_BATCH, DEFAULT_RANGE_BATCH, DEFAULT_TILE_BATCH,
    DEFAULT_TILES_PER_SIDE,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodMeshConfig {
    /// Tiles along each side of the square tile arrangement
    pub tiles_per_side: usize,
    /// Lift of the bottom surface above terrain (meters)
    pub bottom_offset: f64,
    pub palette: WaterPalette,
    /// Valid cells per elevation query batch
    pub elevation_batch: usize,
    /// Cells per range reduction chunk
    pub range_batch: usize,
    /// Tiles per generation chunk
    pub tile_batch: usize,
    pub show_progress: bool,
}

impl Default for FloodMeshConfig {
    fn default() -> Self {
        Self {
            tiles_per_side: DEFAULT_TILES_PER_SIDE,
            bottom_offset: BOTTOM_SURFACE_OFFSET,
            palette: WaterPalette::default(),
            elevation_batch: DEFAULT_ELEVATION_BATCH,
            range_batch: DEFAULT_RANGE_BATCH,
            tile_batch: DEFAULT_TILE_BATCH,
            show_progress: false,
        }
    }
}

impl FloodMeshConfig {
    /// Read a JSON config. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, MeshError> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MeshError> {
        if self.tiles_per_side == 0 {
            return Err(MeshError::InvalidConfig("tiles_per_side must be at least 1".into()));
        }
        for (name, value) in [
            ("elevation_batch", self.elevation_batch),
            ("range_batch", self.range_batch),
            ("tile_batch", self.tile_batch),
        ] {
            if value == 0 {
                return Err(MeshError::InvalidConfig(format!("{} must be at least 1", name)));
            }
        }
        if !self.bottom_offset.is_finite() {
            return Err(MeshError::InvalidConfig("bottom_offset must be finite".into()));
        }
        Ok(())
    }
}
