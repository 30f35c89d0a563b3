/// Error and diagnostic types for the meshing pipeline.
use std::fmt;

/// Quantity a range reduction was computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeQuantity {
    WaterDepth,
    Elevation,
}

impl fmt::Display for RangeQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeQuantity::WaterDepth => write!(f, "water depth"),
            RangeQuantity::Elevation => write!(f, "elevation"),
        }
    }
}

/// Where an empty range was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeScope {
    Grid,
    Tile { py: usize, px: usize },
}

impl fmt::Display for RangeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeScope::Grid => write!(f, "grid"),
            RangeScope::Tile { py, px } => write!(f, "tile ({}, {})", py, px),
        }
    }
}

/// Recoverable conditions. Reported and collected, never fatal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Diagnostic {
    #[error("no elevation sample for cell ({y}, {x}) at ({lon:.7}, {lat:.7}), using sentinel")]
    MissingElevationSample { y: usize, x: usize, lon: f64, lat: f64 },
    #[error("no valid cells for {quantity} range in {scope}")]
    EmptyValidRange {
        quantity: RangeQuantity,
        scope: RangeScope,
    },
    #[error("anchor cell ({center_y}, {center_x}) of tile ({py}, {px}) lies outside the grid")]
    OutOfBoundsTileAnchor {
        py: usize,
        px: usize,
        center_y: usize,
        center_x: usize,
    },
    #[error("sink rejected tile ({py}, {px}): {reason}")]
    TileRejected { py: usize, px: usize, reason: String },
    #[error("tile ({py}, {px}) needs {vertices} vertices, more than u32 indices can address")]
    OversizedTile { py: usize, px: usize, vertices: usize },
}

/// Fatal errors. These abort the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("malformed grid: {0}")]
    MalformedGrid(String),
    #[error("invalid tiling: {tiles_per_side} tiles per side for a {height}x{width} grid")]
    InvalidTiling {
        tiles_per_side: usize,
        height: usize,
        width: usize,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("pipeline abandoned")]
    Abandoned,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("DDS error: {0}")]
    Dds(#[from] ddsfile::Error),
    #[error("sink closed at tile ({py}, {px}): {reason}")]
    Sink { py: usize, px: usize, reason: String },
}
