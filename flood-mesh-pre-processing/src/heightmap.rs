/// Terrain elevation from a georeferenced R32F heightmap
use crate::dds::{R32fRaster, read_r32f_dds};
use crate::elevation::ElevationResolver;
use crate::error::MeshError;
use crate::grid::GeodeticPoint;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Geographic extent of a heightmap. Row 0 lies on `lat_max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl GeoBounds {
    /// Normalise a point to 0-1 across the extent, `None` outside it.
    fn normalize(&self, p: GeodeticPoint) -> Option<(f64, f64)> {
        let u = (p.lon - self.lon_min) / (self.lon_max - self.lon_min);
        let v = (self.lat_max - p.lat) / (self.lat_max - self.lat_min);
        ((0.0..=1.0).contains(&u) && (0.0..=1.0).contains(&v)).then_some((u, v))
    }
}

/// Bilinear terrain sampler backed by an in-memory raster.
#[derive(Debug, Clone)]
pub struct HeightmapElevation {
    raster: R32fRaster,
    bounds: GeoBounds,
}

impl HeightmapElevation {
    pub fn new(raster: R32fRaster, bounds: GeoBounds) -> Result<Self, MeshError> {
        let cells = raster.width.checked_mul(raster.height);
        if raster.width == 0 || raster.height == 0 || cells != Some(raster.data.len()) {
            return Err(MeshError::MalformedGrid(format!(
                "heightmap raster {}x{} holds {} values",
                raster.width,
                raster.height,
                raster.data.len()
            )));
        }
        if !(bounds.lon_max > bounds.lon_min && bounds.lat_max > bounds.lat_min) {
            return Err(MeshError::InvalidConfig(format!(
                "degenerate heightmap bounds {:?}",
                bounds
            )));
        }
        Ok(Self { raster, bounds })
    }

    /// Load `<stem>.dds` with its `<stem>.json` bounds sidecar.
    pub fn open(path: &Path) -> Result<Self, MeshError> {
        let raster = read_r32f_dds(path)?;
        let sidecar = path.with_extension("json");
        let bounds: GeoBounds = serde_json::from_str(&fs::read_to_string(&sidecar)?)?;

        log::info!(
            "Loaded {}x{} heightmap {} covering lon {:.5}..{:.5}, lat {:.5}..{:.5}",
            raster.width,
            raster.height,
            path.display(),
            bounds.lon_min,
            bounds.lon_max,
            bounds.lat_min,
            bounds.lat_max
        );

        Self::new(raster, bounds)
    }

    /// Sample height at a geodetic point with bilinear interpolation
    pub fn sample(&self, p: GeodeticPoint) -> Option<f64> {
        let (u, v) = self.bounds.normalize(p)?;
        let w = self.raster.width;
        let h = self.raster.height;

        // Convert normalized coords to continuous pixel space
        let pixel_x = u * (w - 1) as f64;
        let pixel_y = v * (h - 1) as f64;

        let x0 = pixel_x.floor() as usize;
        let y0 = pixel_y.floor() as usize;
        let x1 = (x0 + 1).min(w - 1);
        let y1 = (y0 + 1).min(h - 1);

        let wx = pixel_x - x0 as f64;
        let wy = pixel_y - y0 as f64;

        let at = |x: usize, y: usize| self.raster.data[y * w + x] as f64;
        let top = at(x0, y0) * (1.0 - wx) + at(x1, y0) * wx;
        let bottom = at(x0, y1) * (1.0 - wx) + at(x1, y1) * wx;
        let height = top * (1.0 - wy) + bottom * wy;

        height.is_finite().then_some(height)
    }
}

impl ElevationResolver for HeightmapElevation {
    fn sample_elevation(&mut self, points: &[GeodeticPoint]) -> Vec<Option<f64>> {
        points.par_iter().map(|p| self.sample(*p)).collect()
    }
}
