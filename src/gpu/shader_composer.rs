use std::borrow::Cow;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor,
    ShaderLanguage, ShaderType,
};

use crate::error::DeferredError;

/// Named shader programs used by the pipeline.
///
/// Every program is looked up by name at construction time; a program that
/// fails to compose is a fatal construction error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderName {
    /// Full-screen GBuffer clear.
    ClearGBuffer,
    /// Albedo x light composition into the first post-process target.
    CombineFinal,
    /// Full-screen directional light.
    DirectionalLight,
    /// Sphere-volume point light.
    PointLight,
    /// Emissive contribution from the color buffer alpha.
    EmissiveLight,
    /// Forward billboard quads written into the GBuffer.
    RenderBillboards,
    /// Fast approximate anti-aliasing.
    Fxaa,
    /// Bloom bright-pass extraction.
    BloomThreshold,
    /// Separable Gaussian blur.
    BloomBlur,
    /// Additive bloom re-composite.
    BloomCombine,
    /// Blit of a texture onto the output surface.
    Present,
    /// Depth visualization snapshot.
    DepthDebug,
}

impl ShaderName {
    /// All named programs, in pipeline order.
    pub const ALL: [Self; 12] = [
        Self::ClearGBuffer,
        Self::CombineFinal,
        Self::DirectionalLight,
        Self::PointLight,
        Self::EmissiveLight,
        Self::RenderBillboards,
        Self::Fxaa,
        Self::BloomThreshold,
        Self::BloomBlur,
        Self::BloomCombine,
        Self::Present,
        Self::DepthDebug,
    ];

    /// Program name as it appears in labels and error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ClearGBuffer => "ClearGBuffer",
            Self::CombineFinal => "CombineFinal",
            Self::DirectionalLight => "DirectionalLight",
            Self::PointLight => "PointLight",
            Self::EmissiveLight => "EmissiveLight",
            Self::RenderBillboards => "RenderBillboards",
            Self::Fxaa => "FXAA",
            Self::BloomThreshold => "BloomThreshold",
            Self::BloomBlur => "BloomBlur",
            Self::BloomCombine => "BloomCombine",
            Self::Present => "Present",
            Self::DepthDebug => "DepthDebug",
        }
    }

    const fn file_path(self) -> &'static str {
        match self {
            Self::ClearGBuffer => "screen/clear_gbuffer.wgsl",
            Self::CombineFinal => "screen/combine_final.wgsl",
            Self::DirectionalLight => "screen/directional_light.wgsl",
            Self::PointLight => "screen/point_light.wgsl",
            Self::EmissiveLight => "screen/emissive_light.wgsl",
            Self::RenderBillboards => "raster/billboard.wgsl",
            Self::Fxaa => "screen/fxaa.wgsl",
            Self::BloomThreshold => "screen/bloom_threshold.wgsl",
            Self::BloomBlur => "screen/bloom_blur.wgsl",
            Self::BloomCombine => "screen/bloom_combine.wgsl",
            Self::Present => "screen/present.wgsl",
            Self::DepthDebug => "screen/depth_debug.wgsl",
        }
    }

    const fn source(self) -> &'static str {
        match self {
            Self::ClearGBuffer => {
                include_str!("../../assets/shaders/screen/clear_gbuffer.wgsl")
            }
            Self::CombineFinal => {
                include_str!("../../assets/shaders/screen/combine_final.wgsl")
            }
            Self::DirectionalLight => include_str!(
                "../../assets/shaders/screen/directional_light.wgsl"
            ),
            Self::PointLight => {
                include_str!("../../assets/shaders/screen/point_light.wgsl")
            }
            Self::EmissiveLight => {
                include_str!("../../assets/shaders/screen/emissive_light.wgsl")
            }
            Self::RenderBillboards => {
                include_str!("../../assets/shaders/raster/billboard.wgsl")
            }
            Self::Fxaa => include_str!("../../assets/shaders/screen/fxaa.wgsl"),
            Self::BloomThreshold => include_str!(
                "../../assets/shaders/screen/bloom_threshold.wgsl"
            ),
            Self::BloomBlur => {
                include_str!("../../assets/shaders/screen/bloom_blur.wgsl")
            }
            Self::BloomCombine => {
                include_str!("../../assets/shaders/screen/bloom_combine.wgsl")
            }
            Self::Present => {
                include_str!("../../assets/shaders/screen/present.wgsl")
            }
            Self::DepthDebug => {
                include_str!("../../assets/shaders/screen/depth_debug.wgsl")
            }
        }
    }
}

/// Shared module definition: (source, file_path)
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Shared modules in dependency order.
const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
        file_path: "modules/fullscreen.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/frame.wgsl"),
        file_path: "modules/frame.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/gbuffer.wgsl"),
        file_path: "modules/gbuffer.wgsl",
    },
];

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Pre-loads the shared WGSL modules at construction time. Consuming shaders
/// use `#import deep::module_name` to pull in shared code. The composer
/// produces `naga::Module` IR directly, skipping WGSL re-parse at runtime.
pub struct ShaderComposer {
    composer: Composer,
}

impl ShaderComposer {
    /// Composer with every shared module registered.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::ShaderLoad`] if a shared module fails to
    /// parse.
    pub fn new() -> Result<Self, DeferredError> {
        let mut composer = Composer::default();
        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| DeferredError::ShaderLoad {
                    name: m.file_path,
                    message: e.to_string(),
                })?;
        }
        Ok(Self { composer })
    }

    /// Compose a named program into a `wgpu::ShaderModule`.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::ShaderLoad`] naming the program if
    /// composition fails.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        name: ShaderName,
    ) -> Result<wgpu::ShaderModule, DeferredError> {
        let module = self.compose_naga(name.source(), name.file_path())
            .map_err(|e| DeferredError::ShaderLoad {
                name: name.label(),
                message: e.to_string(),
            })?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name.label()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        }))
    }

    /// Compose caller-supplied WGSL (which may `#import deep::gbuffer` and
    /// friends) into a `wgpu::ShaderModule`. Scene implementations use this
    /// to build pipelines that write the GBuffer layout.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::ShaderLoad`] if composition fails.
    pub fn compose_source(
        &mut self,
        device: &wgpu::Device,
        label: &'static str,
        source: &str,
        file_path: &str,
    ) -> Result<wgpu::ShaderModule, DeferredError> {
        let module = self.compose_naga(source, file_path).map_err(|e| {
            DeferredError::ShaderLoad {
                name: label,
                message: e.to_string(),
            }
        })?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Naga(Cow::Owned(module)),
        }))
    }

    /// Compose a shader source into a `naga::Module` without creating a wgpu
    /// shader module. Useful for testing shader composition without a GPU
    /// device.
    ///
    /// # Errors
    ///
    /// Returns the composer error if the source fails to compose.
    pub fn compose_naga(
        &mut self,
        source: &str,
        file_path: &str,
    ) -> Result<naga::Module, Box<naga_oil::compose::ComposerError>> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source,
                file_path,
                shader_type: ShaderType::Wgsl,
                ..Default::default()
            })
            .map_err(Box::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_named_programs_compose() {
        let mut composer = ShaderComposer::new().unwrap();
        for name in ShaderName::ALL {
            let _ = composer
                .compose_naga(name.source(), name.file_path())
                .unwrap_or_else(|e| {
                    panic!("shader '{}' failed to compose: {e}", name.label())
                });
        }
    }

    #[test]
    fn composed_programs_validate() {
        let mut composer = ShaderComposer::new().unwrap();
        for name in ShaderName::ALL {
            let module = composer
                .compose_naga(name.source(), name.file_path())
                .unwrap();
            let mut validator = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::all(),
            );
            let _ = validator.validate(&module).unwrap_or_else(|e| {
                panic!("shader '{}' failed validation: {e:?}", name.label())
            });
        }
    }

    #[test]
    fn scene_mesh_shader_composes_against_gbuffer_module() {
        let mut composer = ShaderComposer::new().unwrap();
        let module = composer
            .compose_naga(
                include_str!("../../assets/shaders/raster/gbuffer_mesh.wgsl"),
                "raster/gbuffer_mesh.wgsl",
            )
            .unwrap();
        assert!(module.entry_points.iter().any(|ep| ep.name == "fs_main"));
    }

    #[test]
    fn labels_are_unique() {
        let mut labels: Vec<_> =
            ShaderName::ALL.iter().map(|n| n.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), ShaderName::ALL.len());
    }
}
