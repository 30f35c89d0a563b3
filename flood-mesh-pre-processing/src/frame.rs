/// Global-fixed to local frame conversion.
///
/// Global positions are WGS84 ECEF meters in f64. Mesh vertices are stored
/// in f32 relative to a per-tile anchor; the subtraction always happens in
/// f64 before narrowing, so vertex precision is independent of how far the
/// tile sits from the Earth's centre.
use constants::coordinate_system::{ENU_TO_SCENE, wgs84};
use glam::{DMat3, DVec3, Vec3};

/// Georeferencing service used by the mesher.
pub trait LocalFrameResolver {
    /// Geodetic degrees + ellipsoid height to global-fixed meters.
    fn to_global_fixed(&self, lon: f64, lat: f64, height: f64) -> DVec3;

    /// Position of `point` relative to `anchor`, in rendering axes, narrowed to f32.
    fn to_local(&self, anchor: DVec3, point: DVec3) -> Vec3;

    /// Inverse of [`LocalFrameResolver::to_global_fixed`], returns `(lon, lat, height)`.
    fn global_fixed_to_geodetic(&self, point: DVec3) -> (f64, f64, f64);

    /// Where a global-fixed position sits in the rendering frame.
    fn scene_position(&self, point: DVec3) -> DVec3;
}

#[inline]
pub fn geodetic_to_ecef(lon_deg: f64, lat_deg: f64, h_m: f64) -> DVec3 {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    let (sl, cl) = lat.sin_cos();
    let (so, co) = lon.sin_cos();
    let n = wgs84::A / (1.0 - wgs84::E2 * sl * sl).sqrt();
    DVec3::new(
        (n + h_m) * cl * co,
        (n + h_m) * cl * so,
        (n * (1.0 - wgs84::E2) + h_m) * sl,
    )
}

/// Bowring's closed form. Returns `(lon, lat, height)` in degrees and meters.
#[inline]
pub fn ecef_to_geodetic(p: DVec3) -> (f64, f64, f64) {
    use wgs84::*;

    let r = (p.x * p.x + p.y * p.y).sqrt();
    let lon = p.y.atan2(p.x);
    let theta = (p.z * A).atan2(r * B);
    let (st, ct) = theta.sin_cos();
    let lat = (p.z + E2P * B * st * st * st).atan2(r - E2 * A * ct * ct * ct);
    let sin_lat = lat.sin();
    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let h = r / lat.cos() - n;

    (lon.to_degrees(), lat.to_degrees(), h)
}

/// ECEF to scene rotation at a georeference origin.
fn ecef_to_scene_rotation(lon_deg: f64, lat_deg: f64) -> DMat3 {
    let (sp, cp) = lat_deg.to_radians().sin_cos();
    let (sl, cl) = lon_deg.to_radians().sin_cos();

    let east = DVec3::new(-sl, cl, 0.0);
    let north = DVec3::new(-sp * cl, -sp * sl, cp);
    let up = DVec3::new(cp * cl, cp * sl, sp);

    let ecef_to_enu = DMat3::from_cols(east, north, up).transpose();
    // Inner arrays of ENU_TO_SCENE are rows, glam reads them as columns.
    let enu_to_scene = DMat3::from_cols_array_2d(&ENU_TO_SCENE).transpose();
    enu_to_scene * ecef_to_enu
}

/// East/up/south-facing local frame on the WGS84 ellipsoid.
#[derive(Debug, Clone)]
pub struct EnuFrame {
    origin: DVec3,
    rotation: DMat3,
}

impl EnuFrame {
    /// Frame tangent to the ellipsoid at the given georeference origin.
    pub fn new(lon: f64, lat: f64, height: f64) -> Self {
        Self {
            origin: geodetic_to_ecef(lon, lat, height),
            rotation: ecef_to_scene_rotation(lon, lat),
        }
    }

    pub fn origin(&self) -> DVec3 {
        self.origin
    }
}

impl LocalFrameResolver for EnuFrame {
    fn to_global_fixed(&self, lon: f64, lat: f64, height: f64) -> DVec3 {
        geodetic_to_ecef(lon, lat, height)
    }

    fn to_local(&self, anchor: DVec3, point: DVec3) -> Vec3 {
        (self.rotation * (point - anchor)).as_vec3()
    }

    fn global_fixed_to_geodetic(&self, point: DVec3) -> (f64, f64, f64) {
        ecef_to_geodetic(point)
    }

    fn scene_position(&self, point: DVec3) -> DVec3 {
        self.rotation * (point - self.origin)
    }
}
