//! Per-frame uniform block shared by the GBuffer, lighting, billboard and
//! combine programs (`deep::frame::FrameUniforms` in WGSL).

use crate::gpu::pipeline_helpers::shared_uniform_buffer;
use crate::renderer::gbuffer::TargetSize;
use crate::scene::FrameCamera;

/// CPU mirror of the WGSL `FrameUniforms` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct FrameUniforms {
    pub(crate) view: [[f32; 4]; 4],
    pub(crate) projection: [[f32; 4]; 4],
    pub(crate) view_proj: [[f32; 4]; 4],
    pub(crate) inv_view_proj: [[f32; 4]; 4],
    pub(crate) camera_position: [f32; 4],
    pub(crate) clear_color: [f32; 4],
    pub(crate) gbuffer_size: [f32; 2],
    pub(crate) half_pixel: [f32; 2],
}

impl FrameUniforms {
    pub(crate) fn new(
        camera: &FrameCamera,
        size: TargetSize,
        clear_color: [f32; 4],
    ) -> Self {
        let view_proj = camera.view_proj();
        Self {
            view: camera.view.to_cols_array_2d(),
            projection: camera.projection.to_cols_array_2d(),
            view_proj: view_proj.to_cols_array_2d(),
            inv_view_proj: view_proj.inverse().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).to_array(),
            clear_color,
            gbuffer_size: size.as_vec2().to_array(),
            half_pixel: size.half_pixel().to_array(),
        }
    }
}

/// The uniform buffer plus its layout and bind group (group 0 of every
/// program that reads it).
pub(crate) struct FrameBindings {
    buffer: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl FrameBindings {
    pub(crate) fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Bind Group Layout"),
                entries: &[shared_uniform_buffer(0)],
            });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self {
            buffer,
            layout,
            bind_group,
        }
    }

    pub(crate) fn write(&self, queue: &wgpu::Queue, uniforms: &FrameUniforms) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(uniforms));
    }

    pub(crate) fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub(crate) fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};

    use super::*;

    #[test]
    fn layout_matches_wgsl_struct_size() {
        // 4 mat4 + 2 vec4 + 2 vec2
        assert_eq!(size_of::<FrameUniforms>(), 304);
        assert_eq!(size_of::<FrameUniforms>() % 16, 0);
    }

    #[test]
    fn inverse_view_proj_round_trips() {
        let camera = FrameCamera::look_at(
            Vec3::new(3.0, 4.0, 5.0),
            Vec3::ZERO,
            1.0,
            1.5,
            0.1,
            50.0,
        );
        let uniforms =
            FrameUniforms::new(&camera, TargetSize::new(800, 600), [0.0; 4]);
        let inv = Mat4::from_cols_array_2d(&uniforms.inv_view_proj);
        let product = Mat4::from_cols_array_2d(&uniforms.view_proj) * inv;
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn carries_size_and_half_pixel() {
        let uniforms = FrameUniforms::new(
            &FrameCamera::default(),
            TargetSize::new(1920, 1080),
            [0.25, 0.5, 0.75, 1.0],
        );
        assert_eq!(uniforms.gbuffer_size, [1920.0, 1080.0]);
        assert_eq!(uniforms.half_pixel, [0.5 / 1920.0, 0.5 / 1080.0]);
        assert_eq!(uniforms.clear_color, [0.25, 0.5, 0.75, 1.0]);
    }
}
