//! Opaque mesh batches rasterized into the GBuffer.
//!
//! A ready-made GBuffer program for scenes that only need lit, vertex
//! colored geometry. Scenes with their own materials build pipelines
//! against [`gbuffer_color_targets`] and [`gbuffer_depth_stencil`] instead.

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::error::DeferredError;
use crate::gpu::pipeline_helpers::{pipeline_layout, shared_uniform_buffer};
use crate::gpu::shader_composer::ShaderComposer;
use crate::renderer::gbuffer::{gbuffer_color_targets, gbuffer_depth_stencil};

/// One vertex of a GBuffer mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// World-space normal.
    pub normal: [f32; 3],
    /// RGB albedo; alpha is the emissive strength.
    pub color: [f32; 4],
}

impl MeshVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x4
    ];

    /// Vertex buffer layout matching `gbuffer_mesh.wgsl`.
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> =
        wgpu::VertexBufferLayout {
            array_stride: size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        };
}

/// Horizontal square of side `2 * half_extent` at height `y`, facing +Y.
#[must_use]
pub fn plane(half_extent: f32, y: f32, color: [f32; 4]) -> (Vec<MeshVertex>, Vec<u32>) {
    let normal = Vec3::Y.to_array();
    let vertices = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
        .into_iter()
        .map(|(x, z)| MeshVertex {
            position: [x * half_extent, y, z * half_extent],
            normal,
            color,
        })
        .collect();
    (vertices, vec![0, 2, 1, 0, 3, 2])
}

/// Uploaded vertex and index buffers.
pub struct MeshBatch {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

impl MeshBatch {
    /// Upload `vertices` and `indices` (triangle list).
    #[must_use]
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        vertices: &[MeshVertex],
        indices: &[u32],
    ) -> Self {
        let vertex_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertices")),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Indices")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            vertices: vertex_buffer,
            indices: index_buffer,
            index_count: indices.len() as u32,
        }
    }
}

/// Pipeline writing vertex-colored meshes into the GBuffer.
pub struct MeshPipeline {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl MeshPipeline {
    /// Compose `gbuffer_mesh.wgsl` and build the pipeline. `depth_format`
    /// must match the GBuffer's depth target
    /// ([`Renderer::gbuffer_depth_format`](crate::renderer::Renderer::gbuffer_depth_format)).
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::ShaderLoad`] if the program fails to compose.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self, DeferredError> {
        let shader = composer.compose_source(
            device,
            "GBufferMesh",
            include_str!("../../assets/shaders/raster/gbuffer_mesh.wgsl"),
            "raster/gbuffer_mesh.wgsl",
        )?;
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("GBuffer Mesh Layout"),
                entries: &[shared_uniform_buffer(0)],
            });
        let uniform_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("GBuffer Mesh Uniforms"),
                contents: bytemuck::bytes_of(&Mat4::IDENTITY.to_cols_array()),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("GBuffer Mesh Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        let layout =
            pipeline_layout(device, "GBufferMesh", &[&bind_group_layout]);
        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("GBufferMesh Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[MeshVertex::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &gbuffer_color_targets(depth_format),
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(gbuffer_depth_stencil()),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        Ok(Self {
            pipeline,
            uniform_buffer,
            bind_group,
        })
    }

    /// Camera transform for subsequent draws.
    pub fn set_view_proj(&self, queue: &wgpu::Queue, view_proj: Mat4) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&view_proj.to_cols_array()),
        );
    }

    /// Draw `batches` into the open GBuffer pass.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, batches: &[&MeshBatch]) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        for batch in batches {
            pass.set_vertex_buffer(0, batch.vertices.slice(..));
            pass.set_index_buffer(batch.indices.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..batch.index_count, 0, 0..1);
        }
    }
}
