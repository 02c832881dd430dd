//! Frame driving: submissions, `draw`, `present` and target recreation.

use std::sync::Arc;

use glam::{Vec2, Vec3};

use super::frame::FramePhase;
use super::gbuffer::{needs_render_targets, GBuffer, TargetSize};
use super::postprocess::RenderTargetSet;
use super::uniforms::FrameUniforms;
use super::{BillboardMaterial, Renderer};
use crate::error::DeferredError;
use crate::gpu::pipeline_helpers::cleared_attachment;
use crate::gpu::render_context::RenderContext;
use crate::scene::{EntityHandle, Scene};
use crate::submission::{BillboardSubmission, Light, LightSubmission};

// ── Submissions ──

impl Renderer {
    /// Start a new frame: empty both queues and return to
    /// [`FramePhase::Idle`], discarding any unpresented frame.
    pub fn update(&mut self) {
        self.light_queue.reset();
        self.billboard_queue.reset();
        self.cycle.reset();
    }

    /// Queue a light for this frame. Dropped silently once the queue is
    /// full.
    pub fn submit_light(&mut self, light: Light, entity: EntityHandle) {
        let _ = self.light_queue.push(LightSubmission { light, entity });
    }

    /// Queue a billboard for this frame. Dropped silently once the queue is
    /// full.
    pub fn submit_billboard(
        &mut self,
        material: Arc<BillboardMaterial>,
        position: Vec3,
        size: Vec2,
    ) {
        let _ = self.billboard_queue.push(BillboardSubmission {
            material,
            position,
            size,
        });
    }
}

// ── Draw ──

impl Renderer {
    /// Render one frame into the final target.
    ///
    /// Recreates every render target first if the viewport changed size.
    /// Legal from [`FramePhase::Idle`], [`FramePhase::Resolved`] or
    /// [`FramePhase::Presented`]; ends in `Resolved`. Submissions are kept
    /// until the next [`update`](Self::update). A failed draw leaves the
    /// driver in `Idle`.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::FrameOrder`] if called out of order and
    /// [`DeferredError::TargetAllocation`] if target recreation fails.
    pub fn draw(
        &mut self,
        context: &RenderContext,
        scene: &dyn Scene,
    ) -> Result<(), DeferredError> {
        self.cycle.begin_draw()?;
        let result = self.encode_frame(context, scene);
        if result.is_err() {
            self.cycle.reset();
        }
        result
    }

    fn encode_frame(
        &mut self,
        context: &RenderContext,
        scene: &dyn Scene,
    ) -> Result<(), DeferredError> {
        let viewport = TargetSize::from(context.viewport_size());
        self.viewport = viewport;
        let current = self.gbuffer.as_ref().map(GBuffer::size);
        if needs_render_targets(current, viewport) {
            self.recreate_targets(context, viewport)?;
        }
        let (Some(gbuffer), Some(targets)) = (&self.gbuffer, &self.targets)
        else {
            return Err(DeferredError::TargetAllocation(
                "render targets missing after recreation".to_owned(),
            ));
        };

        let device = &context.device;
        let queue = &context.queue;
        let camera = scene.camera();
        self.frame_bindings.write(
            queue,
            &FrameUniforms::new(
                &camera,
                gbuffer.size(),
                self.options.frame.clear_color,
            ),
        );
        self.lighting.prepare(
            device,
            queue,
            self.light_queue.as_slice(),
            scene,
            camera.position,
        );
        self.billboards
            .prepare(device, queue, self.billboard_queue.as_slice());

        let frame_bind_group = self.frame_bindings.bind_group();
        let mut encoder = context.create_encoder("Deferred Frame Encoder");
        {
            let mut pass = gbuffer.begin_scene_pass(&mut encoder);
            self.gbuffer_clear.clear(&mut pass, frame_bind_group);
            scene.draw(&mut pass);
            self.billboards.render(
                &mut pass,
                frame_bind_group,
                self.billboard_queue.as_slice(),
            );
            GBuffer::resolve(pass);
        }
        self.cycle.advance(FramePhase::SceneDrawn)?;

        self.lighting.render(&mut encoder, gbuffer, frame_bind_group);
        if self.options.debug.show_debug_buffers {
            self.lighting
                .snapshot_depth(&mut encoder, gbuffer, frame_bind_group);
        }
        self.cycle.advance(FramePhase::Lit)?;

        self.compositor.compose(
            &mut encoder,
            self.path,
            targets,
            self.options.frame.wgpu_clear_color(),
        )?;
        self.cycle.advance(FramePhase::Composed)?;

        context.submit(encoder);
        self.cycle.advance(FramePhase::Resolved)
    }

    /// Reallocate the GBuffer and target set at the current viewport size,
    /// as after a device reset. Any drawn but unpresented frame is lost.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::TargetAllocation`] if the device runs out of
    /// memory.
    pub fn on_device_reset(
        &mut self,
        context: &RenderContext,
    ) -> Result<(), DeferredError> {
        log::info!("device reset: recreating render targets");
        self.cycle.reset();
        self.viewport = TargetSize::from(context.viewport_size());
        self.recreate_targets(context, self.viewport)
    }

    fn recreate_targets(
        &mut self,
        context: &RenderContext,
        size: TargetSize,
    ) -> Result<(), DeferredError> {
        let path = self.path;
        let depth_format = self.depth_format;
        let (gbuffer, targets) = context
            .scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
                (
                    GBuffer::create(device, size, depth_format),
                    RenderTargetSet::create(device, size, path),
                )
            })
            .map_err(|e| DeferredError::TargetAllocation(e.to_string()))?;

        self.lighting.bind_gbuffer(&context.device, &gbuffer);
        self.compositor.bind_targets(
            &context.device,
            &context.queue,
            &gbuffer,
            &targets,
        );
        self.presenter
            .rebind(&context.device, targets.final_target(), &gbuffer);
        self.gbuffer = Some(gbuffer);
        self.targets = Some(targets);
        self.generation += 1;
        Ok(())
    }
}

// ── Present ──

impl Renderer {
    /// Alpha-blend the final target over `output`, then draw debug tiles if
    /// enabled. `output` must have the context's surface format.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::FrameOrder`] unless the frame is
    /// [`FramePhase::Resolved`].
    pub fn present(
        &mut self,
        context: &RenderContext,
        output: &wgpu::TextureView,
    ) -> Result<(), DeferredError> {
        self.cycle.begin_present()?;
        let mut encoder = context.create_encoder("Present Encoder");
        self.presenter.present(
            &mut encoder,
            output,
            self.output_rect(),
            self.options.debug.show_debug_buffers,
        );
        context.submit(encoder);
        self.cycle.advance(FramePhase::Presented)
    }

    /// Acquire the next surface texture, clear it to `background`,
    /// [`present`](Self::present) into it and show it.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Surface`] if the surface texture cannot be
    /// acquired, or any error from [`present`](Self::present).
    pub fn present_to_surface(
        &mut self,
        context: &RenderContext,
        background: wgpu::Color,
    ) -> Result<(), DeferredError> {
        self.cycle.begin_present()?;
        let frame = context.get_next_frame()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        // Acquired surface textures hold undefined contents.
        let mut encoder = context.create_encoder("Surface Clear Encoder");
        let _ = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Surface Clear"),
            color_attachments: &[Some(cleared_attachment(&view, background))],
            ..Default::default()
        });
        context.submit(encoder);
        self.present(context, &view)?;
        frame.present();
        Ok(())
    }
}
