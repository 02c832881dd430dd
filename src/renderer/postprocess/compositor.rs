//! Post-process path selection and dispatch.
//!
//! The path is a pure function of the two effect flags and expands to a
//! fixed step list; every step clears and fully overwrites its destination,
//! and the last step always writes the final target.

use crate::error::DeferredError;
use crate::gpu::shader_composer::ShaderComposer;
use crate::options::PostProcessingOptions;
use crate::renderer::gbuffer::GBuffer;

use super::bloom::BloomPass;
use super::combine::CombinePass;
use super::fxaa::FxaaPass;
use super::screen_pass::ScreenPass;
use super::targets::{RenderTargetSet, TargetSlot};

/// Which optional effects run after the GBuffer is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostProcessPath {
    /// Combine straight into the final target.
    None,
    /// Combine into the FXAA source, FXAA into final.
    FxaaOnly,
    /// Combine into the bloom source, bloom into final.
    BloomOnly,
    /// Combine into the FXAA source, FXAA into the bloom source, bloom into
    /// final.
    Both,
}

/// One full-screen pass of a path, named by its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeStep {
    /// GBuffer color x light into the destination.
    Combine(TargetSlot),
    /// FXAA reading [`TargetSlot::FxaaSource`].
    Fxaa(TargetSlot),
    /// Bloom reading [`TargetSlot::BloomSource`].
    Bloom(TargetSlot),
}

impl CompositeStep {
    /// Target the step writes.
    #[must_use]
    pub const fn destination(self) -> TargetSlot {
        match self {
            Self::Combine(slot) | Self::Fxaa(slot) | Self::Bloom(slot) => slot,
        }
    }

    /// Post-process target the step reads, if any.
    #[must_use]
    pub const fn source(self) -> Option<TargetSlot> {
        match self {
            Self::Combine(_) => None,
            Self::Fxaa(_) => Some(TargetSlot::FxaaSource),
            Self::Bloom(_) => Some(TargetSlot::BloomSource),
        }
    }
}

impl PostProcessPath {
    /// Path for the given effect flags.
    #[must_use]
    pub const fn from_flags(fxaa_enabled: bool, bloom_enabled: bool) -> Self {
        match (fxaa_enabled, bloom_enabled) {
            (false, false) => Self::None,
            (true, false) => Self::FxaaOnly,
            (false, true) => Self::BloomOnly,
            (true, true) => Self::Both,
        }
    }

    /// Path selected by `options`.
    #[must_use]
    pub const fn from_options(options: &PostProcessingOptions) -> Self {
        Self::from_flags(options.fxaa_enabled, options.bloom_enabled)
    }

    /// Passes to run, in order.
    #[must_use]
    pub const fn steps(self) -> &'static [CompositeStep] {
        use CompositeStep::{Bloom, Combine, Fxaa};
        use TargetSlot::{BloomSource, Final, FxaaSource};
        match self {
            Self::None => &[Combine(Final)],
            Self::FxaaOnly => &[Combine(FxaaSource), Fxaa(Final)],
            Self::BloomOnly => &[Combine(BloomSource), Bloom(Final)],
            Self::Both => {
                &[Combine(FxaaSource), Fxaa(BloomSource), Bloom(Final)]
            }
        }
    }

    /// The FXAA source target must exist.
    #[must_use]
    pub const fn needs_fxaa_source(self) -> bool {
        matches!(self, Self::FxaaOnly | Self::Both)
    }

    /// The bloom source target must exist.
    #[must_use]
    pub const fn needs_bloom_source(self) -> bool {
        matches!(self, Self::BloomOnly | Self::Both)
    }
}

/// Owns the combine, FXAA and bloom passes and runs a path through them.
pub struct Compositor {
    combine: CombinePass,
    fxaa: FxaaPass,
    bloom: BloomPass,
}

impl Compositor {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        frame_layout: &wgpu::BindGroupLayout,
        frame_bind_group: &wgpu::BindGroup,
        options: &PostProcessingOptions,
    ) -> Result<Self, DeferredError> {
        Ok(Self {
            combine: CombinePass::new(
                device,
                composer,
                frame_layout,
                frame_bind_group,
            )?,
            fxaa: FxaaPass::new(device, composer)?,
            bloom: BloomPass::new(
                device,
                composer,
                options.bloom_threshold,
                options.bloom_intensity,
            )?,
        })
    }

    /// Rebind every pass to the current GBuffer and target set.
    pub(crate) fn bind_targets(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        gbuffer: &GBuffer,
        targets: &RenderTargetSet,
    ) {
        self.combine.bind_gbuffer(device, gbuffer);
        self.bind_optional(device, queue, targets);
    }

    /// Rebind only the passes reading optional targets.
    pub(crate) fn bind_optional(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        targets: &RenderTargetSet,
    ) {
        self.fxaa.bind_source(device, queue, targets.fxaa_source());
        self.bloom.bind_source(device, queue, targets.bloom_source());
    }

    /// Update bloom threshold and intensity.
    pub(crate) fn set_bloom_params(
        &mut self,
        queue: &wgpu::Queue,
        threshold: f32,
        intensity: f32,
    ) {
        self.bloom.set_params(queue, threshold, intensity);
    }

    /// Run `path`, leaving the result in the final target.
    pub(crate) fn compose(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        path: PostProcessPath,
        targets: &RenderTargetSet,
        clear: wgpu::Color,
    ) -> Result<(), DeferredError> {
        for step in path.steps() {
            let slot = step.destination();
            let destination = targets.view(slot).ok_or_else(|| {
                DeferredError::TargetAllocation(format!(
                    "{slot:?} target missing for {path:?}"
                ))
            })?;
            let pass: &dyn ScreenPass = match step {
                CompositeStep::Combine(_) => &self.combine,
                CompositeStep::Fxaa(_) => &self.fxaa,
                CompositeStep::Bloom(_) => &self.bloom,
            };
            pass.render(encoder, destination, clear);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [PostProcessPath; 4] = [
        PostProcessPath::None,
        PostProcessPath::FxaaOnly,
        PostProcessPath::BloomOnly,
        PostProcessPath::Both,
    ];

    #[test]
    fn flags_select_four_distinct_paths() {
        assert_eq!(PostProcessPath::from_flags(false, false), PostProcessPath::None);
        assert_eq!(PostProcessPath::from_flags(true, false), PostProcessPath::FxaaOnly);
        assert_eq!(PostProcessPath::from_flags(false, true), PostProcessPath::BloomOnly);
        assert_eq!(PostProcessPath::from_flags(true, true), PostProcessPath::Both);
    }

    #[test]
    fn every_path_ends_in_final() {
        for path in ALL {
            let last = path.steps().last().copied().unwrap();
            assert_eq!(last.destination(), TargetSlot::Final, "{path:?}");
        }
    }

    #[test]
    fn every_path_starts_with_combine() {
        for path in ALL {
            assert!(matches!(path.steps()[0], CompositeStep::Combine(_)));
        }
    }

    #[test]
    fn each_step_reads_what_the_previous_wrote() {
        for path in ALL {
            for pair in path.steps().windows(2) {
                assert_eq!(
                    pair[1].source(),
                    Some(pair[0].destination()),
                    "{path:?}"
                );
            }
        }
    }

    #[test]
    fn no_step_reads_its_own_destination() {
        for path in ALL {
            for step in path.steps() {
                assert_ne!(step.source(), Some(step.destination()));
            }
        }
    }

    #[test]
    fn both_runs_fxaa_before_bloom() {
        assert_eq!(
            PostProcessPath::Both.steps(),
            &[
                CompositeStep::Combine(TargetSlot::FxaaSource),
                CompositeStep::Fxaa(TargetSlot::BloomSource),
                CompositeStep::Bloom(TargetSlot::Final),
            ]
        );
    }

    #[test]
    fn required_targets_cover_every_step() {
        for path in ALL {
            for step in path.steps() {
                for slot in [Some(step.destination()), step.source()]
                    .into_iter()
                    .flatten()
                {
                    let present = match slot {
                        TargetSlot::Final => true,
                        TargetSlot::FxaaSource => path.needs_fxaa_source(),
                        TargetSlot::BloomSource => path.needs_bloom_source(),
                    };
                    assert!(present, "{path:?} uses {slot:?}");
                }
            }
        }
    }

    #[test]
    fn options_drive_path() {
        let options = PostProcessingOptions {
            fxaa_enabled: false,
            ..PostProcessingOptions::default()
        };
        assert_eq!(
            PostProcessPath::from_options(&options),
            PostProcessPath::BloomOnly
        );
    }
}
