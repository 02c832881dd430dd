//! Post-process compositor: combines the GBuffer into the final target,
//! optionally through FXAA and bloom.

mod bloom;
mod combine;
pub mod compositor;
pub mod fxaa;
pub mod screen_pass;
pub mod targets;

pub use compositor::{CompositeStep, Compositor, PostProcessPath};
pub use targets::{RenderTargetSet, TargetSlot, POST_FORMAT};
