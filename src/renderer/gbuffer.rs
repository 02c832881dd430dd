//! GBuffer targets and the scene pass that fills them.
//!
//! | target        | format        | contents                               |
//! |---------------|---------------|----------------------------------------|
//! | color         | `Rgba8Unorm`  | rgb albedo, a emissive factor          |
//! | normal        | `Rgba8Unorm`  | rgb normal packed as `n * 0.5 + 0.5`, a specular intensity |
//! | depth         | `R32Float`    | NDC depth, 1.0 = far (`Rgba16Float` where `R32Float` is not renderable) |
//! | light         | `Rgba16Float` | rgb diffuse, a specular (accumulated)  |
//! | depth stencil | `Depth32Float`| hardware depth test for the scene pass |
//!
//! All targets share one size and are recreated together.

use glam::Vec2;

use crate::error::DeferredError;
use crate::gpu::pipeline_helpers::pipeline_layout;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::{ShaderComposer, ShaderName};
use crate::gpu::texture::RenderTarget;

/// Albedo + emissive target format.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Packed normal + specular target format.
pub const NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Linear-readable depth target format.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;
/// Depth target format on adapters that cannot render to [`DEPTH_FORMAT`].
/// Half precision: distant surfaces light with visible banding.
pub const FALLBACK_DEPTH_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Rgba16Float;
/// Light accumulation target format.
pub const LIGHT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Hardware depth attachment format.
pub const DEPTH_STENCIL_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Depth32Float;
/// Depth visualization snapshot format.
pub const DEPTH_DEBUG_FORMAT: wgpu::TextureFormat =
    wgpu::TextureFormat::Rgba8Unorm;

/// Pixel dimensions shared by every render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl TargetSize {
    /// Size clamped to at least 1x1.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Size as floats.
    #[must_use]
    pub fn as_vec2(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Offset from a texel corner to its center in UV units.
    #[must_use]
    pub fn half_pixel(self) -> Vec2 {
        Vec2::new(0.5 / self.width as f32, 0.5 / self.height as f32)
    }

    /// Half resolution, never below 1x1.
    #[must_use]
    pub fn halved(self) -> Self {
        Self::new(self.width / 2, self.height / 2)
    }
}

impl From<(u32, u32)> for TargetSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Render targets must be (re)created when none exist yet or the viewport
/// no longer matches them.
#[must_use]
pub fn needs_render_targets(
    current: Option<TargetSize>,
    viewport: TargetSize,
) -> bool {
    current != Some(viewport)
}

/// Depth target format for the context's adapter: [`DEPTH_FORMAT`] when
/// renderable, otherwise [`FALLBACK_DEPTH_FORMAT`].
#[must_use]
pub fn depth_format_for(context: &RenderContext) -> wgpu::TextureFormat {
    select_depth_format(context.supports_render_attachment(DEPTH_FORMAT))
}

fn select_depth_format(r32_renderable: bool) -> wgpu::TextureFormat {
    if r32_renderable {
        DEPTH_FORMAT
    } else {
        log::info!(
            "{DEPTH_FORMAT:?} is not renderable, storing GBuffer depth as \
             {FALLBACK_DEPTH_FORMAT:?}"
        );
        FALLBACK_DEPTH_FORMAT
    }
}

/// Color target states a scene pipeline must declare, in attachment order.
/// `depth_format` comes from [`depth_format_for`] (or
/// `Renderer::gbuffer_depth_format`).
#[must_use]
pub fn gbuffer_color_targets(
    depth_format: wgpu::TextureFormat,
) -> [Option<wgpu::ColorTargetState>; 3] {
    [COLOR_FORMAT, NORMAL_FORMAT, depth_format].map(|format| {
        Some(wgpu::ColorTargetState {
            format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })
    })
}

/// Depth state for opaque scene geometry.
#[must_use]
pub fn gbuffer_depth_stencil() -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format: DEPTH_STENCIL_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

/// The intermediate targets of the deferred pipeline.
pub struct GBuffer {
    size: TargetSize,
    depth_format: wgpu::TextureFormat,
    color: RenderTarget,
    normal: RenderTarget,
    depth: RenderTarget,
    light: RenderTarget,
    depth_stencil: RenderTarget,
    depth_debug: RenderTarget,
}

impl GBuffer {
    /// Allocate every target at `size`. Previous targets are simply dropped
    /// by the caller.
    #[must_use]
    pub fn create(
        device: &wgpu::Device,
        size: TargetSize,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let TargetSize { width, height } = size;
        log::info!("creating GBuffer {width}x{height}");
        Self {
            size,
            depth_format,
            color: RenderTarget::new(device, "GBuffer Color", width, height, COLOR_FORMAT),
            normal: RenderTarget::new(device, "GBuffer Normal", width, height, NORMAL_FORMAT),
            depth: RenderTarget::new(device, "GBuffer Depth", width, height, depth_format),
            light: RenderTarget::new(device, "GBuffer Light", width, height, LIGHT_FORMAT),
            depth_stencil: RenderTarget::new(
                device,
                "GBuffer Depth Stencil",
                width,
                height,
                DEPTH_STENCIL_FORMAT,
            ),
            depth_debug: RenderTarget::new(
                device,
                "GBuffer Depth Debug",
                width,
                height,
                DEPTH_DEBUG_FORMAT,
            ),
        }
    }

    /// Shared size of every target.
    #[must_use]
    pub fn size(&self) -> TargetSize {
        self.size
    }

    /// Format of the [`depth`](Self::depth) target.
    #[must_use]
    pub fn depth_format(&self) -> wgpu::TextureFormat {
        self.depth_format
    }

    /// `(0.5 / width, 0.5 / height)`.
    #[must_use]
    pub fn half_pixel(&self) -> Vec2 {
        self.size.half_pixel()
    }

    /// Albedo + emissive.
    #[must_use]
    pub fn color(&self) -> &RenderTarget {
        &self.color
    }

    /// Packed normal + specular intensity.
    #[must_use]
    pub fn normal(&self) -> &RenderTarget {
        &self.normal
    }

    /// NDC depth.
    #[must_use]
    pub fn depth(&self) -> &RenderTarget {
        &self.depth
    }

    /// Accumulated light.
    #[must_use]
    pub fn light(&self) -> &RenderTarget {
        &self.light
    }

    /// Depth visualization, refreshed after lighting when debug buffers are
    /// shown.
    #[must_use]
    pub fn depth_debug(&self) -> &RenderTarget {
        &self.depth_debug
    }

    /// Bind color, normal and depth (plus the depth-stencil attachment) as
    /// the scene pass's render targets.
    ///
    /// Color attachments are loaded, not cleared: [`GBufferClear`] writes
    /// them with a full-screen draw because the normal channel carries
    /// packed data. The depth attachment is cleared to far.
    pub fn begin_scene_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("GBuffer Scene Pass"),
            color_attachments: &[
                loaded_attachment(&self.color.view),
                loaded_attachment(&self.normal.view),
                loaded_attachment(&self.depth.view),
            ],
            depth_stencil_attachment: Some(
                wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_stencil.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                },
            ),
            ..Default::default()
        })
    }

    /// End the scene pass; the targets become readable as textures by the
    /// passes recorded after it.
    pub fn resolve(pass: wgpu::RenderPass<'_>) {
        drop(pass);
    }
}

fn loaded_attachment(
    view: &wgpu::TextureView,
) -> Option<wgpu::RenderPassColorAttachment<'_>> {
    Some(wgpu::RenderPassColorAttachment {
        view,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Load,
            store: wgpu::StoreOp::Store,
        },
        depth_slice: None,
    })
}

/// Full-screen pass that resets the GBuffer at the start of the scene pass.
pub struct GBufferClear {
    pipeline: wgpu::RenderPipeline,
}

impl GBufferClear {
    /// Build the clear pipeline against the frame uniform layout.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::ShaderLoad`] if the program fails to compose.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        frame_layout: &wgpu::BindGroupLayout,
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self, DeferredError> {
        let shader = composer.compose(device, ShaderName::ClearGBuffer)?;
        let layout = pipeline_layout(device, "ClearGBuffer", &[frame_layout]);
        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("ClearGBuffer Pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &gbuffer_color_targets(depth_format),
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                // The attachment is cleared natively; the clear draw must
                // neither test nor write depth.
                depth_stencil: Some(wgpu::DepthStencilState {
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::Always,
                    ..gbuffer_depth_stencil()
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
        Ok(Self { pipeline })
    }

    /// Write clear color, packed zero normal and far depth to every pixel.
    pub fn clear(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        frame_bind_group: &wgpu::BindGroup,
    ) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, frame_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_pixel_matches_size() {
        let size = TargetSize::new(1920, 1080);
        assert_eq!(size.half_pixel(), Vec2::new(0.5 / 1920.0, 0.5 / 1080.0));
    }

    #[test]
    fn zero_sized_viewport_clamps_to_one() {
        assert_eq!(TargetSize::new(0, 0), TargetSize::new(1, 1));
        assert_eq!(TargetSize::new(1, 1).halved(), TargetSize::new(1, 1));
    }

    #[test]
    fn targets_created_when_missing() {
        assert!(needs_render_targets(None, TargetSize::new(800, 600)));
    }

    #[test]
    fn targets_recreated_only_on_size_change() {
        let size = TargetSize::new(800, 600);
        assert!(!needs_render_targets(Some(size), size));
        assert!(needs_render_targets(Some(size), TargetSize::new(1920, 1080)));
        assert!(needs_render_targets(Some(size), TargetSize::new(800, 601)));
    }

    #[test]
    fn scene_targets_follow_attachment_order() {
        let formats: Vec<_> = gbuffer_color_targets(DEPTH_FORMAT)
            .iter()
            .map(|t| t.as_ref().map(|t| t.format))
            .collect();
        assert_eq!(
            formats,
            vec![Some(COLOR_FORMAT), Some(NORMAL_FORMAT), Some(DEPTH_FORMAT)]
        );
    }

    #[test]
    fn depth_falls_back_when_r32_is_not_renderable() {
        assert_eq!(select_depth_format(true), DEPTH_FORMAT);
        assert_eq!(select_depth_format(false), FALLBACK_DEPTH_FORMAT);
        let targets = gbuffer_color_targets(FALLBACK_DEPTH_FORMAT);
        assert_eq!(
            targets[2].as_ref().map(|t| t.format),
            Some(FALLBACK_DEPTH_FORMAT)
        );
    }

    #[test]
    fn scene_depth_uses_standard_less_test() {
        let state = gbuffer_depth_stencil();
        assert_eq!(state.format, DEPTH_STENCIL_FORMAT);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::Less);
        assert!(state.depth_write_enabled);
    }
}
