/// Flood simulation grid snapshot
use crate::error::MeshError;
use serde::{Deserialize, Serialize};

/// Geodetic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeodeticPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Immutable H×W raster of water depth samples.
///
/// Cells are stored row-major, `index = y * width + x`. Three coordinate
/// representations are kept per cell, only the geodetic one feeds geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodGrid {
    height: usize,
    width: usize,
    ecef: Vec<[f64; 2]>,
    geodetic: Vec<GeodeticPoint>,
    src_crs: Vec<[f64; 2]>,
    water_depth: Vec<f64>,
    valid: Vec<bool>,
}

impl FloodGrid {
    /// Build a grid from parallel row-major arrays.
    /// Every array must hold exactly `height * width` entries.
    pub fn new(
        height: usize,
        width: usize,
        ecef: Vec<[f64; 2]>,
        geodetic: Vec<GeodeticPoint>,
        src_crs: Vec<[f64; 2]>,
        water_depth: Vec<f64>,
        valid: Vec<bool>,
    ) -> Result<Self, MeshError> {
        if height == 0 || width == 0 {
            return Err(MeshError::MalformedGrid(format!(
                "empty shape {}x{}",
                height, width
            )));
        }

        let cells = height * width;
        let lengths = [
            ("ecef", ecef.len()),
            ("geodetic", geodetic.len()),
            ("src_crs", src_crs.len()),
            ("water_depth", water_depth.len()),
            ("valid", valid.len()),
        ];
        for (name, len) in lengths {
            if len != cells {
                return Err(MeshError::MalformedGrid(format!(
                    "{} holds {} cells, shape {}x{} needs {}",
                    name, len, height, width, cells
                )));
            }
        }

        Ok(Self {
            height,
            width,
            ecef,
            geodetic,
            src_crs,
            water_depth,
            valid,
        })
    }

    /// Build a grid carrying only geodetic positions; the projected
    /// representations mirror the geodetic coordinates.
    pub fn from_geodetic(
        height: usize,
        width: usize,
        geodetic: Vec<GeodeticPoint>,
        water_depth: Vec<f64>,
        valid: Vec<bool>,
    ) -> Result<Self, MeshError> {
        let mirrored: Vec<[f64; 2]> = geodetic.iter().map(|p| [p.lon, p.lat]).collect();
        Self::new(
            height,
            width,
            mirrored.clone(),
            geodetic,
            mirrored,
            water_depth,
            valid,
        )
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn cell_count(&self) -> usize {
        self.height * self.width
    }

    #[inline]
    pub fn index(&self, y: usize, x: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn geodetic(&self, y: usize, x: usize) -> GeodeticPoint {
        self.geodetic[self.index(y, x)]
    }

    #[inline]
    pub fn water_depth(&self, y: usize, x: usize) -> f64 {
        self.water_depth[self.index(y, x)]
    }

    #[inline]
    pub fn is_valid(&self, y: usize, x: usize) -> bool {
        self.valid[self.index(y, x)]
    }

    pub fn ecef(&self, y: usize, x: usize) -> [f64; 2] {
        self.ecef[self.index(y, x)]
    }

    pub fn src_crs(&self, y: usize, x: usize) -> [f64; 2] {
        self.src_crs[self.index(y, x)]
    }

    pub fn water_depths(&self) -> &[f64] {
        &self.water_depth
    }

    pub fn validity(&self) -> &[bool] {
        &self.valid
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }
}
