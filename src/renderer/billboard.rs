//! Billboard forward stage.
//!
//! Textured upright quads drawn inside the GBuffer scene pass after the
//! scene geometry. Each billboard is one instance of a shared unit quad;
//! its center and size come from a storage buffer indexed by
//! `instance_index`. Billboards write full emissive and the packed zero
//! normal, so they show their texture color without being lit by the
//! deferred lights.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use wgpu::util::DeviceExt;

use crate::error::DeferredError;
use crate::gpu::dynamic_buffer::TypedBuffer;
use crate::gpu::pipeline_helpers::{
    filtering_sampler, pipeline_layout, read_only_storage, texture_2d,
};
use crate::gpu::shader_composer::{ShaderComposer, ShaderName};
use crate::renderer::gbuffer::{gbuffer_color_targets, gbuffer_depth_stencil};
use crate::submission::BillboardSubmission;

/// World size of the unit quad before per-billboard scaling.
pub const BILLBOARD_SCALE: f32 = 1.0;

/// Multiplier on `alpha - 0.5`; texels where the product is negative are
/// discarded. `1.0` keeps opaque texels.
pub const ALPHA_TEST_DIRECTION: f32 = 1.0;

/// Vertex of the shared quad: corner offset and texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct QuadVertex {
    pub(crate) corner: [f32; 2],
    pub(crate) uv: [f32; 2],
}

/// The four quad corners, sized by [`BILLBOARD_SCALE`].
pub(crate) fn quad_vertices() -> [QuadVertex; 4] {
    let w = 0.5 * BILLBOARD_SCALE;
    [
        QuadVertex { corner: [-w, w], uv: [0.0, 0.0] },
        QuadVertex { corner: [w, w], uv: [1.0, 0.0] },
        QuadVertex { corner: [-w, -w], uv: [0.0, 1.0] },
        QuadVertex { corner: [w, -w], uv: [1.0, 1.0] },
    ]
}

/// Two triangles over [`quad_vertices`].
pub(crate) const QUAD_INDICES: [u16; 6] = [0, 1, 2, 1, 3, 2];

/// CPU mirror of the WGSL `GpuBillboard` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct GpuBillboard {
    position: [f32; 4],
    size: [f32; 4],
}

impl GpuBillboard {
    fn new(position: Vec3, size: Vec2) -> Self {
        Self {
            position: position.extend(1.0).to_array(),
            size: [size.x, size.y, ALPHA_TEST_DIRECTION, 0.0],
        }
    }
}

impl From<&BillboardSubmission> for GpuBillboard {
    fn from(b: &BillboardSubmission) -> Self {
        Self::new(b.position, b.size)
    }
}

/// A billboard texture and the bind group that samples it.
///
/// Create through [`Renderer::create_billboard_material`](crate::renderer::Renderer::create_billboard_material)
/// and share between submissions with `Arc`.
pub struct BillboardMaterial {
    label: String,
    bind_group: wgpu::BindGroup,
}

impl BillboardMaterial {
    /// Debug label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Pipeline, quad buffers and per-frame instance records.
pub struct BillboardStage {
    pipeline: wgpu::RenderPipeline,
    instances_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    quad_vertices: wgpu::Buffer,
    quad_indices: wgpu::Buffer,
    instances: TypedBuffer<GpuBillboard>,
    instances_bind_group: wgpu::BindGroup,
    records: Vec<GpuBillboard>,
}

impl BillboardStage {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        frame_layout: &wgpu::BindGroupLayout,
        depth_format: wgpu::TextureFormat,
        capacity: usize,
    ) -> Result<Self, DeferredError> {
        let instances_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Billboard Instances Layout"),
                entries: &[read_only_storage(0)],
            });
        let material_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Billboard Material Layout"),
                entries: &[texture_2d(0), filtering_sampler(1)],
            });

        let shader = composer.compose(device, ShaderName::RenderBillboards)?;
        let layout = pipeline_layout(
            device,
            "RenderBillboards",
            &[frame_layout, &instances_layout, &material_layout],
        );
        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("RenderBillboards Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: size_of::<QuadVertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x2,
                            1 => Float32x2
                        ],
                    }],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &gbuffer_color_targets(depth_format),
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(gbuffer_depth_stencil()),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Billboard Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            anisotropy_clamp: 16,
            ..Default::default()
        });

        let quad_vertices =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Billboard Quad Vertices"),
                contents: bytemuck::cast_slice(&quad_vertices()),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let quad_indices =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Billboard Quad Indices"),
                contents: bytemuck::cast_slice(&QUAD_INDICES),
                usage: wgpu::BufferUsages::INDEX,
            });

        let instances = TypedBuffer::with_capacity(
            device,
            "Billboard Instances",
            capacity,
            wgpu::BufferUsages::STORAGE,
        );
        let instances_bind_group =
            create_instances_bind_group(device, &instances_layout, &instances);

        Ok(Self {
            pipeline,
            instances_layout,
            material_layout,
            sampler,
            quad_vertices,
            quad_indices,
            instances,
            instances_bind_group,
            records: Vec::with_capacity(capacity),
        })
    }

    /// Wrap `view` in a material sampled with the shared anisotropic
    /// sampler.
    pub(crate) fn create_material(
        &self,
        device: &wgpu::Device,
        label: &str,
        view: &wgpu::TextureView,
    ) -> Arc<BillboardMaterial> {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        Arc::new(BillboardMaterial {
            label: label.to_owned(),
            bind_group,
        })
    }

    /// Upload this frame's billboard records.
    pub(crate) fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        billboards: &[BillboardSubmission],
    ) {
        self.records.clear();
        self.records.extend(billboards.iter().map(GpuBillboard::from));
        if self.instances.write(device, queue, &self.records) {
            self.instances_bind_group = create_instances_bind_group(
                device,
                &self.instances_layout,
                &self.instances,
            );
        }
    }

    /// Draw each billboard with its own material, in submission order.
    pub(crate) fn render(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        frame_bind_group: &wgpu::BindGroup,
        billboards: &[BillboardSubmission],
    ) {
        if billboards.is_empty() {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, frame_bind_group, &[]);
        pass.set_bind_group(1, &self.instances_bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad_vertices.slice(..));
        pass.set_index_buffer(
            self.quad_indices.slice(..),
            wgpu::IndexFormat::Uint16,
        );
        for (index, billboard) in billboards.iter().enumerate() {
            let instance = index as u32;
            pass.set_bind_group(2, &billboard.material.bind_group, &[]);
            pass.draw_indexed(
                0..QUAD_INDICES.len() as u32,
                0,
                instance..instance + 1,
            );
        }
    }
}

fn create_instances_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    instances: &TypedBuffer<GpuBillboard>,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Billboard Instances Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: instances.buffer().as_entire_binding(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner(v: &QuadVertex) -> Vec2 {
        Vec2::from_array(v.corner)
    }

    #[test]
    fn quad_is_centered_and_sized_by_scale() {
        let vertices = quad_vertices();
        let sum: Vec2 = vertices.iter().map(corner).sum();
        assert!(sum.abs_diff_eq(Vec2::ZERO, 1e-6));
        for v in &vertices {
            assert_eq!(corner(v).abs(), Vec2::splat(0.5 * BILLBOARD_SCALE));
        }
    }

    #[test]
    fn quad_triangles_share_a_consistent_winding() {
        let vertices = quad_vertices();
        let signs: Vec<f32> = QUAD_INDICES
            .chunks_exact(3)
            .map(|tri| {
                let a = corner(&vertices[tri[0] as usize]);
                let b = corner(&vertices[tri[1] as usize]);
                let c = corner(&vertices[tri[2] as usize]);
                (b - a).perp_dot(c - a).signum()
            })
            .collect();
        assert_eq!(signs.len(), 2);
        assert_eq!(signs[0], signs[1]);
    }

    #[test]
    fn uvs_put_texture_top_at_quad_top() {
        let vertices = quad_vertices();
        for v in &vertices {
            let expected_v = if v.corner[1] > 0.0 { 0.0 } else { 1.0 };
            assert_eq!(v.uv[1], expected_v);
        }
    }

    #[test]
    fn record_carries_alpha_test_direction() {
        let record =
            GpuBillboard::new(Vec3::new(1.0, 2.0, 3.0), Vec2::new(2.0, 4.0));
        assert_eq!(record.position, [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(record.size, [2.0, 4.0, 1.0, 0.0]);
        assert_eq!(size_of::<GpuBillboard>(), 32);
    }
}
