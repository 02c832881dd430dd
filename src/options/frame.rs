use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-frame setup.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[schemars(title = "Frame", inline)]
#[serde(default)]
pub struct FrameOptions {
    /// RGBA clear color for the GBuffer color channel and every
    /// post-process target. Transparent by default so the output layers
    /// over whatever the surface already holds.
    pub clear_color: [f32; 4],
}

impl FrameOptions {
    /// The clear color as a wgpu color.
    #[must_use]
    pub fn wgpu_clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color {
            r: f64::from(r),
            g: f64::from(g),
            b: f64::from(b),
            a: f64::from(a),
        }
    }
}
