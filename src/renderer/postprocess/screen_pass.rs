//! Shared interface of the compositor's full-screen passes.

/// Uniform interface for full-screen post-processing passes.
pub trait ScreenPass {
    /// Encode the pass, clearing `target` to `clear` and overwriting it.
    /// Inputs are bound beforehand via pass-specific setters.
    fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        clear: wgpu::Color,
    );
}
