/// Tiles per side of the square tile arrangement
pub const DEFAULT_TILES_PER_SIDE: usize = 16;

/// Overlap into the previous tile along each interior edge (cells)
pub const SKIRT_CELLS: usize = 1;

/// Lift of the bottom surface above the terrain (meters)
pub const BOTTOM_SURFACE_OFFSET: f64 = 0.1;

/// Elevation queries issued between yield points
pub const DEFAULT_ELEVATION_BATCH: usize = 10_000;

/// Cells scanned per range reduction chunk
pub const DEFAULT_RANGE_BATCH: usize = 10_000;

/// Tiles generated between yield points
pub const DEFAULT_TILE_BATCH: usize = 10;

/// Elevation stored for invalid or unsampled cells
pub const ELEVATION_SENTINEL: f64 = 0.0;
