//! Render target set: the final composite target plus the optional FXAA
//! and bloom sources, all at GBuffer resolution.

use crate::gpu::texture::RenderTarget;
use crate::renderer::gbuffer::TargetSize;

use super::compositor::PostProcessPath;

/// Format of every post-process target (HDR so bloom has headroom).
pub const POST_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Names a target within the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSlot {
    /// The presentable composite.
    Final,
    /// Input of FXAA.
    FxaaSource,
    /// Input of bloom.
    BloomSource,
}

/// Post-process targets owned by the renderer.
pub struct RenderTargetSet {
    size: TargetSize,
    final_target: RenderTarget,
    fxaa_source: Option<RenderTarget>,
    bloom_source: Option<RenderTarget>,
}

impl RenderTargetSet {
    /// Create the final target and whichever optional targets `path`
    /// needs.
    #[must_use]
    pub fn create(
        device: &wgpu::Device,
        size: TargetSize,
        path: PostProcessPath,
    ) -> Self {
        log::info!(
            "creating render targets {}x{} for {path:?}",
            size.width,
            size.height
        );
        let mut set = Self {
            size,
            final_target: RenderTarget::new(
                device,
                "Final Target",
                size.width,
                size.height,
                POST_FORMAT,
            ),
            fxaa_source: None,
            bloom_source: None,
        };
        let _ = set.sync_optional(device, path);
        set
    }

    /// Create or drop the optional targets to match `path`. Returns `true`
    /// if anything changed.
    pub fn sync_optional(
        &mut self,
        device: &wgpu::Device,
        path: PostProcessPath,
    ) -> bool {
        let size = self.size;
        let make = |label| {
            RenderTarget::new(device, label, size.width, size.height, POST_FORMAT)
        };
        let mut changed = false;
        if path.needs_fxaa_source() != self.fxaa_source.is_some() {
            self.fxaa_source =
                path.needs_fxaa_source().then(|| make("FXAA Source"));
            changed = true;
        }
        if path.needs_bloom_source() != self.bloom_source.is_some() {
            self.bloom_source =
                path.needs_bloom_source().then(|| make("Bloom Source"));
            changed = true;
        }
        changed
    }

    /// Shared size of every target.
    #[must_use]
    pub fn size(&self) -> TargetSize {
        self.size
    }

    /// The presentable composite.
    #[must_use]
    pub fn final_target(&self) -> &RenderTarget {
        &self.final_target
    }

    /// FXAA input, when FXAA is enabled.
    #[must_use]
    pub fn fxaa_source(&self) -> Option<&RenderTarget> {
        self.fxaa_source.as_ref()
    }

    /// Bloom input, when bloom is enabled.
    #[must_use]
    pub fn bloom_source(&self) -> Option<&RenderTarget> {
        self.bloom_source.as_ref()
    }

    /// View of `slot`, if that target exists.
    #[must_use]
    pub fn view(&self, slot: TargetSlot) -> Option<&wgpu::TextureView> {
        match slot {
            TargetSlot::Final => Some(&self.final_target.view),
            TargetSlot::FxaaSource => self.fxaa_source.as_ref().map(|t| &t.view),
            TargetSlot::BloomSource => {
                self.bloom_source.as_ref().map(|t| &t.view)
            }
        }
    }
}
