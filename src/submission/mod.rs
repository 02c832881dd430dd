//! Per-frame submission queues.
//!
//! Scene traversal pushes lights and billboards here between
//! [`Renderer::update`](crate::renderer::Renderer::update) and
//! [`Renderer::draw`](crate::renderer::Renderer::draw). Queues are bounded:
//! submissions past capacity are dropped silently and only counted.

mod light;
mod queue;

use std::sync::Arc;

use glam::{Vec2, Vec3};
pub use light::{Light, LightKind, LightSubmission};
pub use queue::SubmissionQueue;

use crate::renderer::billboard::BillboardMaterial;

/// Light queue capacity per frame.
pub const MAX_VISIBLE_LIGHTS: usize = 512;

/// Billboard queue capacity per frame.
pub const MAX_VISIBLE_BILLBOARDS: usize = 2048;

/// A textured camera-facing quad drawn forward into the GBuffer.
#[derive(Clone)]
pub struct BillboardSubmission {
    /// Texture and bind group to draw with.
    pub material: Arc<BillboardMaterial>,
    /// World-space center.
    pub position: Vec3,
    /// World-space width and height.
    pub size: Vec2,
}

impl std::fmt::Debug for BillboardSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillboardSubmission")
            .field("material", &self.material.label())
            .field("position", &self.position)
            .field("size", &self.size)
            .finish()
    }
}
