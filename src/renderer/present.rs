//! Present pass: blits the final target onto the output with alpha blending
//! and optionally overlays GBuffer debug tiles.

use crate::error::DeferredError;
use crate::gpu::pipeline_helpers::{
    create_screen_space_pipeline, filtering_sampler, linear_sampler,
    texture_2d,
};
use crate::gpu::shader_composer::{ShaderComposer, ShaderName};
use crate::gpu::texture::RenderTarget;
use crate::renderer::gbuffer::GBuffer;

/// Width of one debug buffer tile in output pixels.
pub const DEBUG_TILE_WIDTH: u32 = 320;
/// Height of one debug buffer tile in output pixels.
pub const DEBUG_TILE_HEIGHT: u32 = 180;

/// Pixel rectangle with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Rectangle at the origin covering `width` x `height`.
    #[must_use]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// `other` lies entirely inside `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }
}

/// Tiles for `count` debug buffers stacked down the left edge of `output`.
/// Tiles that would not fit entirely inside `output` are dropped.
#[must_use]
pub fn debug_tile_rects(output: Rect, count: usize) -> Vec<Rect> {
    (0..count as u32)
        .map(|i| Rect {
            x: output.x,
            y: output.y + i * DEBUG_TILE_HEIGHT,
            width: DEBUG_TILE_WIDTH,
            height: DEBUG_TILE_HEIGHT,
        })
        .take_while(|tile| output.contains(*tile))
        .collect()
}

pub(crate) struct Presenter {
    blend_pipeline: wgpu::RenderPipeline,
    tile_pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    final_bind_group: Option<wgpu::BindGroup>,
    // color, normal, depth snapshot, light
    tile_bind_groups: Vec<wgpu::BindGroup>,
}

impl Presenter {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        output_format: wgpu::TextureFormat,
    ) -> Result<Self, DeferredError> {
        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Present Bind Group Layout"),
                entries: &[texture_2d(0), filtering_sampler(1)],
            });
        let shader = composer.compose(device, ShaderName::Present)?;
        let blend_pipeline = create_screen_space_pipeline(
            device,
            "Present",
            &shader,
            output_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
            &[&layout],
        );
        let tile_pipeline = create_screen_space_pipeline(
            device,
            "Debug Tile",
            &shader,
            output_format,
            None,
            &[&layout],
        );
        Ok(Self {
            blend_pipeline,
            tile_pipeline,
            layout,
            sampler: linear_sampler(device, "Present Sampler"),
            final_bind_group: None,
            tile_bind_groups: Vec::new(),
        })
    }

    fn bind(&self, device: &wgpu::Device, target: &RenderTarget) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Present Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&target.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        })
    }

    /// Rebind after the final target or GBuffer was recreated.
    pub(crate) fn rebind(
        &mut self,
        device: &wgpu::Device,
        final_target: &RenderTarget,
        gbuffer: &GBuffer,
    ) {
        self.final_bind_group = Some(self.bind(device, final_target));
        self.tile_bind_groups = [
            gbuffer.color(),
            gbuffer.normal(),
            gbuffer.depth_debug(),
            gbuffer.light(),
        ]
        .into_iter()
        .map(|target| self.bind(device, target))
        .collect();
    }

    /// Blend the final target over `output` (format must match the one the
    /// presenter was built for), then draw debug tiles when requested.
    pub(crate) fn present(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        output: &wgpu::TextureView,
        output_rect: Rect,
        show_debug_buffers: bool,
    ) {
        let Some(final_bind_group) = &self.final_bind_group else {
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Present Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            ..Default::default()
        });
        pass.set_pipeline(&self.blend_pipeline);
        pass.set_bind_group(0, final_bind_group, &[]);
        pass.draw(0..3, 0..1);

        if !show_debug_buffers {
            return;
        }
        pass.set_pipeline(&self.tile_pipeline);
        let tiles = debug_tile_rects(output_rect, self.tile_bind_groups.len());
        for (tile, bind_group) in tiles.iter().zip(&self.tile_bind_groups) {
            pass.set_viewport(
                tile.x as f32,
                tile.y as f32,
                tile.width as f32,
                tile.height as f32,
                0.0,
                1.0,
            );
            pass.set_bind_group(0, bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiles_stack_down_the_left_edge() {
        let tiles = debug_tile_rects(Rect::from_size(1920, 1080), 4);
        assert_eq!(tiles.len(), 4);
        for (i, tile) in tiles.iter().enumerate() {
            assert_eq!(tile.x, 0);
            assert_eq!(tile.y, i as u32 * DEBUG_TILE_HEIGHT);
            assert_eq!(tile.width, DEBUG_TILE_WIDTH);
        }
    }

    #[test]
    fn tiles_that_overflow_are_dropped() {
        // 600 px fits three 180 px tiles.
        assert_eq!(debug_tile_rects(Rect::from_size(800, 600), 4).len(), 3);
        assert!(debug_tile_rects(Rect::from_size(200, 600), 4).is_empty());
    }

    #[test]
    fn contains_is_inclusive_of_edges() {
        let outer = Rect::from_size(320, 180);
        assert!(outer.contains(outer));
        assert!(!outer.contains(Rect { x: 1, ..outer }));
    }
}
