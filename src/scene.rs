//! Interface to the external scene.
//!
//! The renderer never owns entities or geometry. Each frame it asks the
//! scene for the camera, resolves light owners to world transforms, and
//! hands it the open GBuffer pass to draw opaque geometry into.

use glam::{Mat4, Vec3};

/// Opaque index into the caller's entity registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EntityHandle(pub u32);

/// Camera matrices for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCamera {
    /// World-to-view transform.
    pub view: Mat4,
    /// View-to-clip transform (wgpu depth range 0..1).
    pub projection: Mat4,
    /// World-space eye position.
    pub position: Vec3,
}

impl FrameCamera {
    /// Camera at `eye` looking at `target` with a right-handed perspective
    /// projection.
    #[must_use]
    pub fn look_at(
        eye: Vec3,
        target: Vec3,
        fov_y_radians: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> Self {
        Self {
            view: Mat4::look_at_rh(eye, target, Vec3::Y),
            projection: Mat4::perspective_rh(fov_y_radians, aspect, near, far),
            position: eye,
        }
    }

    /// Combined world-to-clip transform.
    #[must_use]
    pub fn view_proj(&self) -> Mat4 {
        self.projection * self.view
    }
}

impl Default for FrameCamera {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            position: Vec3::ZERO,
        }
    }
}

/// The scene collaborator driven by [`Renderer::draw`](crate::renderer::Renderer::draw).
pub trait Scene {
    /// Camera for the frame being drawn.
    fn camera(&self) -> FrameCamera;

    /// World transform of `entity`, or `None` if it no longer exists.
    /// Point lights owned by unresolvable entities are skipped.
    fn entity_transform(&self, entity: EntityHandle) -> Option<Mat4>;

    /// Record opaque geometry into the open GBuffer pass.
    ///
    /// Pipelines must target the layout from
    /// [`gbuffer_color_targets`](crate::renderer::gbuffer::gbuffer_color_targets)
    /// (with [`Renderer::gbuffer_depth_format`](crate::renderer::Renderer::gbuffer_depth_format))
    /// and [`gbuffer_depth_stencil`](crate::renderer::gbuffer::gbuffer_depth_stencil).
    fn draw(&self, pass: &mut wgpu::RenderPass<'_>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_proj_maps_target_to_screen_center() {
        let camera = FrameCamera::look_at(
            Vec3::new(0.0, 2.0, 5.0),
            Vec3::ZERO,
            std::f32::consts::FRAC_PI_4,
            16.0 / 9.0,
            0.1,
            100.0,
        );
        let clip = camera.view_proj() * Vec3::ZERO.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5);
        assert!(ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }
}
