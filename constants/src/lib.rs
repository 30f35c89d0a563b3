/// Shared defaults for flood mesh generation
pub mod coordinate_system;
pub mod render_settings;
pub mod tiling;
