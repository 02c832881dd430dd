//! FXAA pass: screen-space anti-aliasing of the combined image.

use wgpu::util::DeviceExt;

use crate::error::DeferredError;
use crate::gpu::pipeline_helpers::{
    cleared_attachment, create_screen_space_pipeline, filtering_sampler,
    linear_sampler, texture_2d, uniform_buffer,
};
use crate::gpu::shader_composer::{ShaderComposer, ShaderName};
use crate::gpu::texture::RenderTarget;

use super::screen_pass::ScreenPass;
use super::targets::POST_FORMAT;

/// Minimum local contrast, relative to the brightest neighbour, that
/// counts as an edge.
pub const EDGE_THRESHOLD: f32 = 0.125;
/// Absolute contrast below which dark regions are left alone.
pub const EDGE_THRESHOLD_MIN: f32 = 0.0312;

/// CPU mirror of the WGSL `FxaaParams` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct FxaaParams {
    inverse_size: [f32; 2],
    edge_threshold: f32,
    edge_threshold_min: f32,
}

impl FxaaParams {
    pub(crate) fn for_size(width: u32, height: u32) -> Self {
        Self {
            inverse_size: [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32],
            edge_threshold: EDGE_THRESHOLD,
            edge_threshold_min: EDGE_THRESHOLD_MIN,
        }
    }
}

pub(crate) struct FxaaPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params_buffer: wgpu::Buffer,
    bind_group: Option<wgpu::BindGroup>,
}

impl FxaaPass {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
    ) -> Result<Self, DeferredError> {
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("FXAA Bind Group Layout"),
                entries: &[
                    texture_2d(0),
                    filtering_sampler(1),
                    uniform_buffer(2),
                ],
            });
        let shader = composer.compose(device, ShaderName::Fxaa)?;
        let pipeline = create_screen_space_pipeline(
            device,
            "FXAA",
            &shader,
            POST_FORMAT,
            None,
            &[&layout],
        );
        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("FXAA Params Buffer"),
                contents: bytemuck::bytes_of(&FxaaParams::for_size(1, 1)),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        Ok(Self {
            pipeline,
            layout,
            sampler: linear_sampler(device, "FXAA Sampler"),
            params_buffer,
            bind_group: None,
        })
    }

    /// Read from `source`, or unbind when FXAA is off.
    pub(crate) fn bind_source(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: Option<&RenderTarget>,
    ) {
        self.bind_group = source.map(|source| {
            let (width, height) = source.size();
            queue.write_buffer(
                &self.params_buffer,
                0,
                bytemuck::bytes_of(&FxaaParams::for_size(width, height)),
            );
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("FXAA Bind Group"),
                layout: &self.layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(
                            &source.view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: self.params_buffer.as_entire_binding(),
                    },
                ],
            })
        });
    }
}

impl ScreenPass for FxaaPass {
    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear: wgpu::Color,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("FXAA Pass"),
            color_attachments: &[Some(cleared_attachment(target, clear))],
            ..Default::default()
        });
        let Some(bind_group) = &self.bind_group else {
            log::debug!("FXAA skipped: no source bound");
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
