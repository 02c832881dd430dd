//! Read-only queries on [`Renderer`].

use super::frame::FramePhase;
use super::gbuffer::GBuffer;
use super::postprocess::{PostProcessPath, RenderTargetSet};
use super::present::Rect;
use super::Renderer;
use crate::options::Options;

// ── Submissions ──

impl Renderer {
    /// Lights queued this frame.
    #[must_use]
    pub fn visible_lights_count(&self) -> usize {
        self.light_queue.len()
    }

    /// Billboards queued this frame.
    #[must_use]
    pub fn visible_billboards_count(&self) -> usize {
        self.billboard_queue.len()
    }

    /// Lights rejected this frame because the queue was full.
    #[must_use]
    pub fn dropped_lights_count(&self) -> usize {
        self.light_queue.dropped()
    }

    /// Billboards rejected this frame because the queue was full.
    #[must_use]
    pub fn dropped_billboards_count(&self) -> usize {
        self.billboard_queue.dropped()
    }

    /// Lights actually shaded by the last draw (point lights whose entity
    /// could not be resolved are skipped).
    #[must_use]
    pub fn drawn_lights_count(&self) -> usize {
        self.lighting.drawn_count()
    }
}

// ── Targets ──

impl Renderer {
    /// The GBuffer, once the first draw has allocated it.
    #[must_use]
    pub fn gbuffer(&self) -> Option<&GBuffer> {
        self.gbuffer.as_ref()
    }

    /// Final composite and optional post-process sources.
    #[must_use]
    pub fn render_targets(&self) -> Option<&RenderTargetSet> {
        self.targets.as_ref()
    }

    /// The composited frame, valid after [`draw`](Self::draw).
    #[must_use]
    pub fn final_texture(&self) -> Option<&wgpu::Texture> {
        self.targets.as_ref().map(|t| &t.final_target().texture)
    }

    /// Source rectangle of [`present`](Self::present): the render-target
    /// extent.
    #[must_use]
    pub fn render_target_rect(&self) -> Rect {
        self.gbuffer.as_ref().map_or_else(Rect::default, |gbuffer| {
            let size = gbuffer.size();
            Rect::from_size(size.width, size.height)
        })
    }

    /// Destination rectangle of [`present`](Self::present): the viewport
    /// seen by the last draw.
    #[must_use]
    pub fn output_rect(&self) -> Rect {
        Rect::from_size(self.viewport.width, self.viewport.height)
    }

    /// Format of the GBuffer depth target. Scene pipelines pass it to
    /// [`gbuffer_color_targets`](crate::renderer::gbuffer::gbuffer_color_targets).
    #[must_use]
    pub fn gbuffer_depth_format(&self) -> wgpu::TextureFormat {
        self.depth_format
    }

    /// Incremented every time the render targets are recreated.
    #[must_use]
    pub fn render_target_generation(&self) -> u64 {
        self.generation
    }
}

// ── State ──

impl Renderer {
    /// Current frame phase.
    #[must_use]
    pub fn phase(&self) -> FramePhase {
        self.cycle.phase()
    }

    /// Post-process path the next draw will run.
    #[must_use]
    pub fn post_process_path(&self) -> PostProcessPath {
        self.path
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }
}
