use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Post-process chain toggles and bloom parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Effects", inline)]
#[serde(default)]
pub struct PostProcessingOptions {
    /// Run FXAA over the composed image.
    #[schemars(title = "FXAA")]
    pub fxaa_enabled: bool,
    /// Run bloom over the composed (and anti-aliased) image.
    #[schemars(title = "Bloom")]
    pub bloom_enabled: bool,
    /// Brightness above which pixels contribute to bloom.
    #[schemars(title = "Bloom Threshold", range(min = 0.0, max = 1.0), extend("step" = 0.05))]
    pub bloom_threshold: f32,
    /// Strength of the blurred glow added back onto the image.
    #[schemars(title = "Bloom Intensity", range(min = 0.0, max = 2.0), extend("step" = 0.05))]
    pub bloom_intensity: f32,
}

impl Default for PostProcessingOptions {
    fn default() -> Self {
        Self {
            fxaa_enabled: true,
            bloom_enabled: true,
            bloom_threshold: 0.8,
            bloom_intensity: 0.6,
        }
    }
}
