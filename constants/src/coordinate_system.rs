/// WGS84 ellipsoid used as the global-fixed (ECEF) frame
pub mod wgs84 {
    /// Semi-major axis (equatorial radius) in meters.
    pub const A: f64 = 6_378_137.0;

    /// Flattening factor (1 / 298.257223563).
    pub const F: f64 = 1.0 / 298.257_223_563;

    /// First eccentricity squared.
    pub const E2: f64 = F * (2.0 - F);

    /// Semi-minor axis (polar radius) in meters.
    pub const B: f64 = A * (1.0 - F);

    /// Second eccentricity squared.
    pub const E2P: f64 = (A * A - B * B) / (B * B);
}

/// Scene axes expressed in local east/north/up components (row-major: [x, y, z])
/// Default: X = east, Y = up, Z = -north (right-handed, Y-up)
pub const ENU_TO_SCENE: [[f64; 3]; 3] = [
    [1.0, 0.0, 0.0],  // X = E
    [0.0, 0.0, 1.0],  // Y = U
    [0.0, -1.0, 0.0], // Z = -N
];
