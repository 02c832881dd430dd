use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Debug visualization toggles.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[schemars(title = "Debug", inline)]
#[serde(default)]
pub struct DebugOptions {
    /// Draw the color, normal, depth and light buffers as tiles along the
    /// left edge of the output.
    #[schemars(title = "Show GBuffer")]
    pub show_debug_buffers: bool,
}
