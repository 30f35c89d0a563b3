#![allow(dead_code)]

use flood_mesh::elevation::ElevationField;
use flood_mesh::{FloodGrid, GeodeticPoint, LocalFrameResolver};
use glam::{DVec3, Vec3};

/// Flat-earth frame: degrees map straight to meters, x = lon, y = height, z = -lat.
pub struct PlanarFrame;

impl LocalFrameResolver for PlanarFrame {
    fn to_global_fixed(&self, lon: f64, lat: f64, height: f64) -> DVec3 {
        DVec3::new(lon, height, -lat)
    }

    fn to_local(&self, anchor: DVec3, point: DVec3) -> Vec3 {
        (point - anchor).as_vec3()
    }

    fn global_fixed_to_geodetic(&self, point: DVec3) -> (f64, f64, f64) {
        (point.x, -point.z, point.y)
    }

    fn scene_position(&self, point: DVec3) -> DVec3 {
        point
    }
}

/// Grid whose rows run south and columns east, one unit apart.
pub fn grid_with(
    height: usize,
    width: usize,
    depth: impl Fn(usize, usize) -> f64,
    valid: impl Fn(usize, usize) -> bool,
) -> FloodGrid {
    let mut geodetic = Vec::with_capacity(height * width);
    let mut depths = Vec::with_capacity(height * width);
    let mut validity = Vec::with_capacity(height * width);
    for y in 0..height {
        for x in 0..width {
            geodetic.push(GeodeticPoint::new(x as f64, -(y as f64)));
            depths.push(depth(y, x));
            validity.push(valid(y, x));
        }
    }
    FloodGrid::from_geodetic(height, width, geodetic, depths, validity).unwrap()
}

pub fn uniform_grid(height: usize, width: usize, depth: f64) -> FloodGrid {
    grid_with(height, width, |_, _| depth, |_, _| true)
}

pub fn flat_field(grid: &FloodGrid, height: f64) -> ElevationField {
    let heights = vec![height; grid.cell_count()];
    ElevationField::from_values(grid.height(), grid.width(), heights).unwrap()
}

pub fn normal(positions: &[[f32; 3]], [a, b, c]: [u32; 3]) -> Vec3 {
    let p = |i: u32| Vec3::from_array(positions[i as usize]);
    (p(b) - p(a)).cross(p(c) - p(a))
}
