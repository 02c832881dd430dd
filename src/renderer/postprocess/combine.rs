//! Combine pass: GBuffer color modulated by accumulated light, plus the
//! specular term carried in the light target's alpha. Pixels with no
//! geometry take the frame clear color.

use crate::error::DeferredError;
use crate::gpu::pipeline_helpers::{
    cleared_attachment, create_screen_space_pipeline, texture_2d,
    texture_2d_unfilterable,
};
use crate::gpu::shader_composer::{ShaderComposer, ShaderName};
use crate::renderer::gbuffer::GBuffer;

use super::screen_pass::ScreenPass;
use super::targets::POST_FORMAT;

pub(crate) struct CombinePass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    frame_bind_group: wgpu::BindGroup,
    gbuffer_bind_group: Option<wgpu::BindGroup>,
}

impl CombinePass {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        frame_layout: &wgpu::BindGroupLayout,
        frame_bind_group: &wgpu::BindGroup,
    ) -> Result<Self, DeferredError> {
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Combine GBuffer Layout"),
                entries: &[
                    texture_2d(0),
                    texture_2d(1),
                    texture_2d_unfilterable(2),
                ],
            });
        let shader = composer.compose(device, ShaderName::CombineFinal)?;
        let pipeline = create_screen_space_pipeline(
            device,
            "CombineFinal",
            &shader,
            POST_FORMAT,
            None,
            &[frame_layout, &layout],
        );
        Ok(Self {
            pipeline,
            layout,
            frame_bind_group: frame_bind_group.clone(),
            gbuffer_bind_group: None,
        })
    }

    pub(crate) fn bind_gbuffer(&mut self, device: &wgpu::Device, gbuffer: &GBuffer) {
        let views = [gbuffer.color(), gbuffer.light(), gbuffer.depth()];
        let entries: Vec<wgpu::BindGroupEntry<'_>> = views
            .iter()
            .zip(0u32..)
            .map(|(target, binding)| wgpu::BindGroupEntry {
                binding,
                resource: wgpu::BindingResource::TextureView(&target.view),
            })
            .collect();
        self.gbuffer_bind_group =
            Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Combine GBuffer Bind Group"),
                layout: &self.layout,
                entries: &entries,
            }));
    }
}

impl ScreenPass for CombinePass {
    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear: wgpu::Color,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Combine Pass"),
            color_attachments: &[Some(cleared_attachment(target, clear))],
            ..Default::default()
        });
        let Some(gbuffer_bind_group) = &self.gbuffer_bind_group else {
            log::debug!("combine skipped: GBuffer not bound");
            return;
        };
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, gbuffer_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
