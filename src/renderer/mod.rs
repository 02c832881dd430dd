//! The deferred renderer and its stages.
//!
//! [`Renderer`] owns every GPU stage and drives one frame per
//! [`draw`](Renderer::draw): GBuffer clear, scene and billboards, light
//! accumulation, post-process composite. [`present`](Renderer::present)
//! then layers the final target onto an output texture.

mod accessors;
pub mod billboard;
mod draw;
pub mod frame;
pub mod gbuffer;
pub mod light_volume;
pub mod lighting;
pub mod mesh;
pub mod postprocess;
pub mod present;
pub(crate) mod uniforms;

use std::sync::Arc;

pub use billboard::BillboardMaterial;
pub use frame::FramePhase;
pub use gbuffer::{GBuffer, TargetSize};
pub use light_volume::LightVolumeMesh;
pub use postprocess::{PostProcessPath, RenderTargetSet};
pub use present::Rect;

use self::billboard::BillboardStage;
use self::frame::FrameCycle;
use self::gbuffer::GBufferClear;
use self::lighting::LightingStage;
use self::postprocess::Compositor;
use self::present::Presenter;
use self::uniforms::FrameBindings;
use crate::error::DeferredError;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::options::Options;
use crate::submission::{
    BillboardSubmission, LightSubmission, SubmissionQueue,
    MAX_VISIBLE_BILLBOARDS, MAX_VISIBLE_LIGHTS,
};

/// Deferred rendering pipeline bound to one device.
///
/// Per frame, call [`update`](Self::update), submit lights and billboards,
/// then [`draw`](Self::draw) and [`present`](Self::present):
/// ```ignore
/// renderer.update();
/// renderer.submit_light(light, entity);
/// renderer.draw(&context, &scene)?;
/// renderer.present_to_surface(&context, wgpu::Color::BLACK)?;
/// ```
pub struct Renderer {
    options: Options,
    path: PostProcessPath,
    frame_bindings: FrameBindings,
    gbuffer_clear: GBufferClear,
    lighting: LightingStage,
    billboards: BillboardStage,
    compositor: Compositor,
    presenter: Presenter,
    depth_format: wgpu::TextureFormat,
    gbuffer: Option<GBuffer>,
    targets: Option<RenderTargetSet>,
    viewport: TargetSize,
    generation: u64,
    light_queue: SubmissionQueue<LightSubmission>,
    billboard_queue: SubmissionQueue<BillboardSubmission>,
    cycle: FrameCycle,
}

impl Renderer {
    /// Compose every shader program and build every pipeline. Render
    /// targets are allocated lazily by the first [`draw`](Self::draw).
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::ShaderLoad`] if a program fails to compose
    /// and [`DeferredError::PipelineCreation`] if the device rejects a
    /// pipeline.
    pub fn new(
        context: &RenderContext,
        options: Options,
    ) -> Result<Self, DeferredError> {
        let mut composer = ShaderComposer::new()?;
        let output_format = context.format();
        let depth_format = gbuffer::depth_format_for(context);
        let built = context
            .scoped(wgpu::ErrorFilter::Validation, |device| {
                build_stages(
                    device,
                    &mut composer,
                    output_format,
                    depth_format,
                    &options,
                )
            })
            .map_err(|e| DeferredError::PipelineCreation(e.to_string()))??;
        let path = PostProcessPath::from_options(&options.post_processing);
        log::info!(
            "deferred renderer ready: output {output_format:?}, {path:?}, \
             {MAX_VISIBLE_LIGHTS} lights, {MAX_VISIBLE_BILLBOARDS} billboards"
        );

        Ok(Self {
            options,
            path,
            frame_bindings: built.frame_bindings,
            gbuffer_clear: built.gbuffer_clear,
            lighting: built.lighting,
            billboards: built.billboards,
            compositor: built.compositor,
            presenter: built.presenter,
            depth_format,
            gbuffer: None,
            targets: None,
            viewport: TargetSize::from(context.viewport_size()),
            generation: 0,
            light_queue: SubmissionQueue::new("light", MAX_VISIBLE_LIGHTS),
            billboard_queue: SubmissionQueue::new(
                "billboard",
                MAX_VISIBLE_BILLBOARDS,
            ),
            cycle: FrameCycle::default(),
        })
    }

    /// Replace the options. Optional post-process targets are created or
    /// dropped to match the new path and bloom parameters are re-uploaded.
    pub fn set_options(&mut self, context: &RenderContext, options: Options) {
        let post = &options.post_processing;
        self.compositor.set_bloom_params(
            &context.queue,
            post.bloom_threshold,
            post.bloom_intensity,
        );
        let path = PostProcessPath::from_options(post);
        self.options = options;
        if path == self.path {
            return;
        }
        log::debug!("post-process path {:?} -> {path:?}", self.path);
        self.path = path;
        if let Some(targets) = &mut self.targets {
            if targets.sync_optional(&context.device, path) {
                self.compositor.bind_optional(
                    &context.device,
                    &context.queue,
                    targets,
                );
            }
        }
    }

    /// Replace the point-light volume mesh.
    pub fn set_light_volume(
        &mut self,
        device: &wgpu::Device,
        mesh: &LightVolumeMesh,
    ) {
        self.lighting.set_volume(device, mesh);
    }

    /// Wrap a texture view in a billboard material.
    #[must_use]
    pub fn create_billboard_material(
        &self,
        device: &wgpu::Device,
        label: &str,
        view: &wgpu::TextureView,
    ) -> Arc<BillboardMaterial> {
        self.billboards.create_material(device, label, view)
    }
}

struct Stages {
    frame_bindings: FrameBindings,
    gbuffer_clear: GBufferClear,
    lighting: LightingStage,
    billboards: BillboardStage,
    compositor: Compositor,
    presenter: Presenter,
}

fn build_stages(
    device: &wgpu::Device,
    composer: &mut ShaderComposer,
    output_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    options: &Options,
) -> Result<Stages, DeferredError> {
    let frame_bindings = FrameBindings::new(device);
    let frame_layout = frame_bindings.layout();
    Ok(Stages {
        gbuffer_clear: GBufferClear::new(
            device,
            composer,
            frame_layout,
            depth_format,
        )?,
        lighting: LightingStage::new(
            device,
            composer,
            frame_layout,
            MAX_VISIBLE_LIGHTS,
        )?,
        billboards: BillboardStage::new(
            device,
            composer,
            frame_layout,
            depth_format,
            MAX_VISIBLE_BILLBOARDS,
        )?,
        compositor: Compositor::new(
            device,
            composer,
            frame_layout,
            frame_bindings.bind_group(),
            &options.post_processing,
        )?,
        presenter: Presenter::new(device, composer, output_format)?,
        frame_bindings,
    })
}
