/// Depth to vertex colour mapping
use crate::range::ValueRange;
use constants::render_settings::{
    ALPHA_DEPTH_SCALE, BOTTOM_ALPHA, DEEP_WATER_COLOUR, SHALLOW_WATER_COLOUR, TOP_ALPHA_MAX,
    TOP_ALPHA_MIN,
};
use serde::{Deserialize, Serialize};

/// Colour endpoints and alpha bounds for the water volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterPalette {
    /// RGB at the shallow end of the global depth range
    pub shallow: [f32; 3],
    /// RGB at the deep end of the global depth range
    pub deep: [f32; 3],
    pub top_alpha_min: f32,
    pub top_alpha_max: f32,
    /// Depth (meters) at which top alpha reaches `top_alpha_max`
    pub alpha_depth_scale: f32,
    pub bottom_alpha: f32,
}

impl Default for WaterPalette {
    fn default() -> Self {
        Self {
            shallow: SHALLOW_WATER_COLOUR,
            deep: DEEP_WATER_COLOUR,
            top_alpha_min: TOP_ALPHA_MIN,
            top_alpha_max: TOP_ALPHA_MAX,
            alpha_depth_scale: ALPHA_DEPTH_SCALE,
            bottom_alpha: BOTTOM_ALPHA,
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

impl WaterPalette {
    /// Hue for `depth`, normalised against the global depth range.
    /// A missing range (no valid cells) maps every depth to the shallow end.
    pub fn hue(&self, depth: f64, range: Option<&ValueRange>) -> [f32; 3] {
        let t = range.map_or(0.0, |r| r.normalize(depth));
        [
            lerp(self.shallow[0], self.deep[0], t),
            lerp(self.shallow[1], self.deep[1], t),
            lerp(self.shallow[2], self.deep[2], t),
        ]
    }

    /// Top surface alpha. Normalised by the fixed alpha depth scale rather
    /// than the depth range, so alpha saturates independently of hue.
    pub fn top_alpha(&self, depth: f64) -> f32 {
        let t = if self.alpha_depth_scale > 0.0 {
            (depth as f32 / self.alpha_depth_scale).clamp(0.0, 1.0)
        } else {
            1.0
        };
        lerp(self.top_alpha_min, self.top_alpha_max, t)
    }

    /// `(top, bottom)` RGBA for one grid vertex.
    pub fn vertex_colours(&self, depth: f64, range: Option<&ValueRange>) -> ([f32; 4], [f32; 4]) {
        let [r, g, b] = self.hue(depth, range);
        ([r, g, b, self.top_alpha(depth)], [r, g, b, self.bottom_alpha])
    }
}
