/// Colour of the shallowest water relative to the global depth range (RGB)
pub const SHALLOW_WATER_COLOUR: [f32; 3] = [0.1, 0.2, 1.0];

/// Colour of the deepest water relative to the global depth range (RGB, cyan)
pub const DEEP_WATER_COLOUR: [f32; 3] = [0.0, 1.0, 1.0];

/// Top surface alpha at zero depth
pub const TOP_ALPHA_MIN: f32 = 0.1;

/// Top surface alpha once depth reaches `ALPHA_DEPTH_SCALE`
pub const TOP_ALPHA_MAX: f32 = 0.8;

/// Depth in meters at which the top surface alpha saturates
pub const ALPHA_DEPTH_SCALE: f32 = 2.0;

/// Alpha of the underside layer
pub const BOTTOM_ALPHA: f32 = 0.1;
