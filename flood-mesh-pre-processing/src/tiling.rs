/// Square tile partition of the grid index space with one-cell skirts
use crate::error::{Diagnostic, MeshError};
use constants::tiling::SKIRT_CELLS;
use serde::{Deserialize, Serialize};

/// One tile's sub-rectangle of grid vertices, bounds inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDescriptor {
    pub py: usize,
    pub px: usize,
    pub y_min: usize,
    pub y_max: usize,
    pub x_min: usize,
    pub x_max: usize,
    /// Nominal anchor cell, unchecked.
    pub center_y: usize,
    pub center_x: usize,
    /// Which sides lie on the outer boundary of the whole grid.
    pub on_top: bool,
    pub on_bottom: bool,
    pub on_left: bool,
    pub on_right: bool,
}

impl TileDescriptor {
    /// Unit cells along Y.
    pub fn size_y(&self) -> usize {
        self.y_max - self.y_min
    }

    /// Unit cells along X.
    pub fn size_x(&self) -> usize {
        self.x_max - self.x_min
    }

    /// Vertices in one layer of the tile's mesh.
    pub fn vert_count_per_side(&self) -> usize {
        (self.size_x() + 1) * (self.size_y() + 1)
    }

    /// Anchor cell, provided it lies inside a `height`×`width` grid.
    pub fn anchor_cell(&self, height: usize, width: usize) -> Result<(usize, usize), Diagnostic> {
        if self.center_y < height && self.center_x < width {
            Ok((self.center_y, self.center_x))
        } else {
            Err(Diagnostic::OutOfBoundsTileAnchor {
                py: self.py,
                px: self.px,
                center_y: self.center_y,
                center_x: self.center_x,
            })
        }
    }
}

/// Bounds of tile `p` along one axis of length `len` split `tiles` ways.
///
/// Base extent is `len / tiles - 1` cells starting at `p * stride`; tiles
/// after the first reach back by the skirt, and the last tile stretches to
/// the final grid line so the integer-division remainder is not dropped.
fn axis_span(p: usize, tiles: usize, len: usize) -> (usize, usize, usize) {
    let stride = len / tiles;
    let mut min = p * stride;
    let max = if p + 1 == tiles {
        len - 1
    } else {
        min + stride - 1
    };
    if p > 0 {
        min -= SKIRT_CELLS;
    }
    let center = p * stride + stride / 2;
    (min, max, center)
}

/// Divide an `height`×`width` grid into `tiles_per_side`² tiles, row-major.
pub fn partition(
    height: usize,
    width: usize,
    tiles_per_side: usize,
) -> Result<Vec<TileDescriptor>, MeshError> {
    if tiles_per_side == 0 || tiles_per_side > height || tiles_per_side > width {
        return Err(MeshError::InvalidTiling {
            tiles_per_side,
            height,
            width,
        });
    }

    let mut tiles = Vec::with_capacity(tiles_per_side * tiles_per_side);
    for py in 0..tiles_per_side {
        let (y_min, y_max, center_y) = axis_span(py, tiles_per_side, height);
        for px in 0..tiles_per_side {
            let (x_min, x_max, center_x) = axis_span(px, tiles_per_side, width);
            tiles.push(TileDescriptor {
                py,
                px,
                y_min,
                y_max,
                x_min,
                x_max,
                center_y,
                center_x,
                on_top: py == 0,
                on_bottom: py + 1 == tiles_per_side,
                on_left: px == 0,
                on_right: px + 1 == tiles_per_side,
            });
        }
    }

    Ok(tiles)
}
