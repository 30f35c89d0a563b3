/// Volumetric tile mesher: a capped water slab over the valid cells of one tile.
/// Top and bottom vertices pair up at `i` and `i + vert_count_per_side`.
use crate::colour::WaterPalette;
use crate::elevation::ElevationField;
use crate::error::{Diagnostic, RangeQuantity, RangeScope};
use crate::frame::LocalFrameResolver;
use crate::grid::{FloodGrid, GeodeticPoint};
use crate::range::ValueRange;
use crate::tiling::TileDescriptor;
use glam::DVec3;

/// Per-tile local coordinate origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileAnchor {
    pub center_y: usize,
    pub center_x: usize,
    pub geodetic: GeodeticPoint,
    /// Global-fixed position (ECEF meters)
    pub global_fixed: DVec3,
    /// Where the anchor sits in the rendering frame
    pub scene_position: DVec3,
}

/// Renderable geometry for one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMesh {
    pub tile: TileDescriptor,
    pub anchor: Option<TileAnchor>,
    pub vert_count_per_side: usize,
    /// Top layer followed by the bottom layer, anchor relative
    pub positions: Vec<[f32; 3]>,
    pub colours: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl TileMesh {
    /// Geometry-free mesh for a tile with nothing to draw.
    pub fn empty(tile: TileDescriptor) -> Self {
        Self {
            tile,
            anchor: None,
            vert_count_per_side: 0,
            positions: Vec::new(),
            colours: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

/// Append two triangles spanning the quad `i0 i1 / i2 i3`.
#[inline]
fn push_quad(indices: &mut Vec<u32>, i0: u32, i1: u32, i2: u32, i3: u32, clockwise: bool) {
    if clockwise {
        indices.extend_from_slice(&[i0, i1, i2, i1, i3, i2]);
    } else {
        indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
    }
}

/// Double-sided vertical quad from top edge `a`-`b` down to the bottom layer.
#[inline]
fn push_wall(indices: &mut Vec<u32>, a: u32, b: u32, offset: u32) {
    push_quad(indices, a, b, a + offset, b + offset, true);
    push_quad(indices, a, b, a + offset, b + offset, false);
}

/// Local vertex layout of a tile: `size_y + 1` rows of `size_x + 1` vertices.
#[derive(Debug, Clone, Copy)]
pub struct TileLayout {
    pub size_y: usize,
    pub size_x: usize,
}

impl TileLayout {
    /// Layout whose two vertex layers are addressable with u32 indices.
    pub fn checked(size_y: usize, size_x: usize) -> Option<Self> {
        let per_side = size_y.checked_add(1)?.checked_mul(size_x.checked_add(1)?)?;
        u32::try_from(per_side.checked_mul(2)?).ok()?;
        Some(Self { size_y, size_x })
    }

    /// Exact for layouts that pass [`checked`](Self::checked).
    #[inline]
    pub fn index(&self, ly: usize, lx: usize) -> u32 {
        (ly * (self.size_x + 1) + lx) as u32
    }

    pub fn vert_count_per_side(&self) -> usize {
        (self.size_y + 1) * (self.size_x + 1)
    }

    /// Corner indices `(i0, i1, i2, i3)` of unit cell `(ly, lx)`:
    /// i1 is one column over, i2 one row down.
    #[inline]
    fn corners(&self, ly: usize, lx: usize) -> (u32, u32, u32, u32) {
        let i0 = self.index(ly, lx);
        let i2 = self.index(ly + 1, lx);
        (i0, i0 + 1, i2, i2 + 1)
    }
}

/// Top and bottom caps over every fully valid unit cell.
pub fn emit_caps<M>(layout: TileLayout, valid: M, indices: &mut Vec<u32>)
where
    M: Fn(usize, usize) -> bool,
{
    let offset = layout.vert_count_per_side() as u32;
    for ly in 0..layout.size_y {
        for lx in 0..layout.size_x {
            if !(valid(ly, lx) && valid(ly, lx + 1) && valid(ly + 1, lx) && valid(ly + 1, lx + 1)) {
                continue;
            }
            let (i0, i1, i2, i3) = layout.corners(ly, lx);
            push_quad(indices, i0, i1, i2, i3, false);
            push_quad(indices, i0 + offset, i1 + offset, i2 + offset, i3 + offset, true);
        }
    }
}

/// Which tile sides lie on the outer rim of the whole grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct RimSides {
    pub top: bool,
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl From<&TileDescriptor> for RimSides {
    fn from(tile: &TileDescriptor) -> Self {
        Self {
            top: tile.on_top,
            bottom: tile.on_bottom,
            left: tile.on_left,
            right: tile.on_right,
        }
    }
}

/// Walls along rim edges whose two endpoints are valid. Interior seams get none.
pub fn emit_boundary_skirts<M>(layout: TileLayout, rim: RimSides, valid: M, indices: &mut Vec<u32>)
where
    M: Fn(usize, usize) -> bool,
{
    let offset = layout.vert_count_per_side() as u32;
    let TileLayout { size_y, size_x } = layout;

    // A zero-height tile has a single row that is both top and bottom.
    let mut rows = Vec::with_capacity(2);
    if rim.top {
        rows.push(0);
    }
    if rim.bottom && !(rim.top && size_y == 0) {
        rows.push(size_y);
    }
    for ly in rows {
        for lx in 0..size_x {
            if valid(ly, lx) && valid(ly, lx + 1) {
                push_wall(indices, layout.index(ly, lx), layout.index(ly, lx + 1), offset);
            }
        }
    }

    let mut columns = Vec::with_capacity(2);
    if rim.left {
        columns.push(0);
    }
    if rim.right && !(rim.left && size_x == 0) {
        columns.push(size_x);
    }
    for lx in columns {
        for ly in 0..size_y {
            if valid(ly, lx) && valid(ly + 1, lx) {
                push_wall(indices, layout.index(ly + 1, lx), layout.index(ly, lx), offset);
            }
        }
    }
}

/// Walls sealing cells that straddle an invalid region.
///
/// Cells with all four or none of their corners valid are skipped. Each
/// of the four edges is tested independently.
pub fn emit_interior_walls<M>(layout: TileLayout, valid: M, indices: &mut Vec<u32>)
where
    M: Fn(usize, usize) -> bool,
{
    let offset = layout.vert_count_per_side() as u32;
    for ly in 0..layout.size_y {
        for lx in 0..layout.size_x {
            let v00 = valid(ly, lx);
            let v01 = valid(ly, lx + 1);
            let v10 = valid(ly + 1, lx);
            let v11 = valid(ly + 1, lx + 1);

            let count = [v00, v01, v10, v11].iter().filter(|v| **v).count();
            if count == 0 || count == 4 {
                continue;
            }

            let (i0, i1, i2, i3) = layout.corners(ly, lx);
            // left
            if v00 && v10 {
                push_wall(indices, i2, i0, offset);
            }
            // right
            if v01 && v11 {
                push_wall(indices, i3, i1, offset);
            }
            // front
            if v10 && v11 {
                push_wall(indices, i2, i3, offset);
            }
            // back
            if v00 && v01 {
                push_wall(indices, i0, i1, offset);
            }
        }
    }
}

/// Builds [`TileMesh`]es from a grid and its populated elevation field.
pub struct VolumetricTileMesher<'a, F: LocalFrameResolver + ?Sized> {
    grid: &'a FloodGrid,
    elevation: &'a ElevationField,
    depth_range: Option<ValueRange>,
    palette: &'a WaterPalette,
    bottom_offset: f64,
    frame: &'a F,
}

impl<'a, F: LocalFrameResolver + ?Sized> VolumetricTileMesher<'a, F> {
    pub fn new(
        grid: &'a FloodGrid,
        elevation: &'a ElevationField,
        depth_range: Option<ValueRange>,
        palette: &'a WaterPalette,
        bottom_offset: f64,
        frame: &'a F,
    ) -> Self {
        Self {
            grid,
            elevation,
            depth_range,
            palette,
            bottom_offset,
            frame,
        }
    }

    /// Resolve the tile's anchor at its centre cell, at ellipsoid height 0.
    fn resolve_anchor(&self, tile: &TileDescriptor) -> Result<TileAnchor, Diagnostic> {
        let (center_y, center_x) = tile.anchor_cell(self.grid.height(), self.grid.width())?;
        let geodetic = self.grid.geodetic(center_y, center_x);
        let global_fixed = self.frame.to_global_fixed(geodetic.lon, geodetic.lat, 0.0);
        let scene_position = self.frame.scene_position(global_fixed);

        if log::log_enabled!(log::Level::Debug) {
            let (lon, lat, h) = self.frame.global_fixed_to_geodetic(global_fixed);
            log::debug!(
                "Tile ({}, {}) anchor ({}, {}): ({:.7}, {:.7}, {:.3}), ecef {:?}, scene {:?}",
                tile.py,
                tile.px,
                center_y,
                center_x,
                lon,
                lat,
                h,
                global_fixed,
                scene_position
            );
        }

        Ok(TileAnchor {
            center_y,
            center_x,
            geodetic,
            global_fixed,
            scene_position,
        })
    }

    /// Generate one tile. Tiles that cannot be anchored, are too large to
    /// index or hold no valid cells yield a diagnostic; callers substitute
    /// [`TileMesh::empty`].
    pub fn build(&self, tile: &TileDescriptor) -> Result<TileMesh, Diagnostic> {
        let anchor = self.resolve_anchor(tile)?;

        let grid = self.grid;
        let valid = |ly: usize, lx: usize| grid.is_valid(tile.y_min + ly, tile.x_min + lx);

        let (size_y, size_x) = (tile.size_y(), tile.size_x());
        let layout = TileLayout::checked(size_y, size_x).ok_or(Diagnostic::OversizedTile {
            py: tile.py,
            px: tile.px,
            vertices: (size_y + 1).saturating_mul(size_x + 1).saturating_mul(2),
        })?;
        let any_valid = (0..=layout.size_y).any(|ly| (0..=layout.size_x).any(|lx| valid(ly, lx)));
        if !any_valid {
            return Err(Diagnostic::EmptyValidRange {
                quantity: RangeQuantity::WaterDepth,
                scope: RangeScope::Tile {
                    py: tile.py,
                    px: tile.px,
                },
            });
        }

        let per_side = layout.vert_count_per_side();
        let mut positions = vec![[0.0f32; 3]; per_side * 2];
        let mut colours = vec![[0.0f32; 4]; per_side * 2];

        for ly in 0..=layout.size_y {
            for lx in 0..=layout.size_x {
                let (y, x) = (tile.y_min + ly, tile.x_min + lx);
                let i = layout.index(ly, lx) as usize;

                let p = grid.geodetic(y, x);
                let depth = if grid.is_valid(y, x) {
                    grid.water_depth(y, x)
                } else {
                    0.0
                };
                let bottom_height = self.elevation.get(y, x) + self.bottom_offset;
                let top_height = bottom_height + depth;

                let top = self.frame.to_global_fixed(p.lon, p.lat, top_height);
                let bottom = self.frame.to_global_fixed(p.lon, p.lat, bottom_height);
                positions[i] = self.frame.to_local(anchor.global_fixed, top).to_array();
                positions[i + per_side] =
                    self.frame.to_local(anchor.global_fixed, bottom).to_array();

                let (top_colour, bottom_colour) =
                    self.palette.vertex_colours(depth, self.depth_range.as_ref());
                colours[i] = top_colour;
                colours[i + per_side] = bottom_colour;
            }
        }

        let mut indices = Vec::new();
        emit_caps(layout, valid, &mut indices);
        emit_boundary_skirts(layout, RimSides::from(tile), valid, &mut indices);
        emit_interior_walls(layout, valid, &mut indices);

        Ok(TileMesh {
            tile: *tile,
            anchor: Some(anchor),
            vert_count_per_side: per_side,
            positions,
            colours,
            indices,
        })
    }
}
