//! Bloom pass: extracts bright pixels into a half-resolution target, blurs
//! them with a separable Gaussian, and adds the glow back onto the source.
//!
//! Pipeline: threshold (source -> mip), horizontal blur (mip -> ping),
//! vertical blur (ping -> mip), combine (source + mip -> destination).

use wgpu::util::DeviceExt;

use crate::error::DeferredError;
use crate::gpu::pipeline_helpers::{
    cleared_attachment, create_screen_space_pipeline, filtering_sampler,
    linear_sampler, texture_2d, uniform_buffer,
};
use crate::gpu::shader_composer::{ShaderComposer, ShaderName};
use crate::gpu::texture::RenderTarget;
use crate::renderer::gbuffer::TargetSize;

use super::screen_pass::ScreenPass;
use super::targets::POST_FORMAT;

/// Threshold and intensity, shared by the threshold and combine programs.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct BloomParams {
    threshold: f32,
    intensity: f32,
    texel_size: [f32; 2],
}

/// Blur direction params, must match WGSL `BlurParams`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurParams {
    texel_size: [f32; 2],
    horizontal: u32,
    _pad: u32,
}

impl BlurParams {
    fn new(size: TargetSize, horizontal: bool) -> Self {
        let texel = size.as_vec2().recip();
        Self {
            texel_size: texel.to_array(),
            horizontal: u32::from(horizontal),
            _pad: 0,
        }
    }
}

/// Half-resolution working targets and the bind groups reading them.
struct BloomChain {
    mip: RenderTarget,
    ping: RenderTarget,
    threshold_bind_group: wgpu::BindGroup,
    blur_bind_groups: [wgpu::BindGroup; 2],
    combine_bind_group: wgpu::BindGroup,
}

pub(crate) struct BloomPass {
    threshold_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    combine_pipeline: wgpu::RenderPipeline,
    single_layout: wgpu::BindGroupLayout,
    combine_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params: BloomParams,
    params_buffer: wgpu::Buffer,
    // [0 = horizontal, 1 = vertical]
    blur_buffers: [wgpu::Buffer; 2],
    chain: Option<BloomChain>,
}

impl BloomPass {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        threshold: f32,
        intensity: f32,
    ) -> Result<Self, DeferredError> {
        let single_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Bloom Single Input Layout"),
                entries: &[
                    texture_2d(0),
                    filtering_sampler(1),
                    uniform_buffer(2),
                ],
            });
        let combine_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Bloom Combine Layout"),
                entries: &[
                    texture_2d(0),
                    texture_2d(1),
                    filtering_sampler(2),
                    uniform_buffer(3),
                ],
            });

        let threshold_shader =
            composer.compose(device, ShaderName::BloomThreshold)?;
        let blur_shader = composer.compose(device, ShaderName::BloomBlur)?;
        let combine_shader = composer.compose(device, ShaderName::BloomCombine)?;

        let threshold_pipeline = create_screen_space_pipeline(
            device,
            "BloomThreshold",
            &threshold_shader,
            POST_FORMAT,
            None,
            &[&single_layout],
        );
        let blur_pipeline = create_screen_space_pipeline(
            device,
            "BloomBlur",
            &blur_shader,
            POST_FORMAT,
            None,
            &[&single_layout],
        );
        let combine_pipeline = create_screen_space_pipeline(
            device,
            "BloomCombine",
            &combine_shader,
            POST_FORMAT,
            None,
            &[&combine_layout],
        );

        let params = BloomParams {
            threshold,
            intensity,
            texel_size: [1.0, 1.0],
        };
        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bloom Params Buffer"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let blur_buffers = [true, false].map(|horizontal| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bloom Blur Params"),
                contents: bytemuck::bytes_of(&BlurParams::new(
                    TargetSize::new(1, 1),
                    horizontal,
                )),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            })
        });

        Ok(Self {
            threshold_pipeline,
            blur_pipeline,
            combine_pipeline,
            single_layout,
            combine_layout,
            sampler: linear_sampler(device, "Bloom Sampler"),
            params,
            params_buffer,
            blur_buffers,
            chain: None,
        })
    }

    /// Update threshold and intensity.
    pub(crate) fn set_params(
        &mut self,
        queue: &wgpu::Queue,
        threshold: f32,
        intensity: f32,
    ) {
        self.params.threshold = threshold;
        self.params.intensity = intensity;
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));
    }

    /// Read from `source`, or drop the working targets when bloom is off.
    pub(crate) fn bind_source(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        source: Option<&RenderTarget>,
    ) {
        let Some(source) = source else {
            self.chain = None;
            return;
        };
        let (width, height) = source.size();
        let half = TargetSize::new(width, height).halved();
        self.params.texel_size = half.as_vec2().recip().to_array();
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&self.params));
        for (buffer, horizontal) in self.blur_buffers.iter().zip([true, false]) {
            queue.write_buffer(
                buffer,
                0,
                bytemuck::bytes_of(&BlurParams::new(half, horizontal)),
            );
        }
        self.chain = Some(self.create_chain(device, source, half));
    }

    fn create_chain(
        &self,
        device: &wgpu::Device,
        source: &RenderTarget,
        half: TargetSize,
    ) -> BloomChain {
        let mip = RenderTarget::new(
            device,
            "Bloom Mip",
            half.width,
            half.height,
            POST_FORMAT,
        );
        let ping = RenderTarget::new(
            device,
            "Bloom Ping",
            half.width,
            half.height,
            POST_FORMAT,
        );
        let threshold_bind_group = self.single_input(
            device,
            "Bloom Threshold Bind Group",
            &source.view,
            &self.params_buffer,
        );
        let blur_bind_groups = [
            self.single_input(
                device,
                "Bloom Blur H Bind Group",
                &mip.view,
                &self.blur_buffers[0],
            ),
            self.single_input(
                device,
                "Bloom Blur V Bind Group",
                &ping.view,
                &self.blur_buffers[1],
            ),
        ];
        let combine_bind_group =
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Bloom Combine Bind Group"),
                layout: &self.combine_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(
                            &source.view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(&mip.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: self.params_buffer.as_entire_binding(),
                    },
                ],
            });
        BloomChain {
            mip,
            ping,
            threshold_bind_group,
            blur_bind_groups,
            combine_bind_group,
        }
    }

    fn single_input(
        &self,
        device: &wgpu::Device,
        label: &str,
        view: &wgpu::TextureView,
        params: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.single_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    }

    fn screen_pass(
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        target: &wgpu::TextureView,
        clear: wgpu::Color,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(cleared_attachment(target, clear))],
            ..Default::default()
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

impl ScreenPass for BloomPass {
    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear: wgpu::Color,
    ) {
        let Some(chain) = &self.chain else {
            log::debug!("bloom skipped: no source bound");
            let _ = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Bloom Clear"),
                color_attachments: &[Some(cleared_attachment(target, clear))],
                ..Default::default()
            });
            return;
        };
        let black = wgpu::Color::TRANSPARENT;
        Self::screen_pass(
            encoder,
            "Bloom Threshold",
            &self.threshold_pipeline,
            &chain.threshold_bind_group,
            &chain.mip.view,
            black,
        );
        Self::screen_pass(
            encoder,
            "Bloom Blur H",
            &self.blur_pipeline,
            &chain.blur_bind_groups[0],
            &chain.ping.view,
            black,
        );
        Self::screen_pass(
            encoder,
            "Bloom Blur V",
            &self.blur_pipeline,
            &chain.blur_bind_groups[1],
            &chain.mip.view,
            black,
        );
        Self::screen_pass(
            encoder,
            "Bloom Combine",
            &self.combine_pipeline,
            &chain.combine_bind_group,
            target,
            clear,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_match_wgsl_layout() {
        assert_eq!(size_of::<BloomParams>(), 16);
        assert_eq!(size_of::<BlurParams>(), 16);
    }

    #[test]
    fn blur_texel_is_one_half_res_pixel() {
        let half = TargetSize::new(1920, 1080).halved();
        let params = BlurParams::new(half, true);
        assert_eq!(params.texel_size, [1.0 / 960.0, 1.0 / 540.0]);
        assert_eq!(params.horizontal, 1);
        assert_eq!(BlurParams::new(half, false).horizontal, 0);
    }
}
