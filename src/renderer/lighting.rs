//! Lighting stage: accumulates every queued light into the GBuffer light
//! target, then adds the emissive term.
//!
//! Light records live in one storage buffer uploaded per frame; each draw
//! selects its record through `instance_index`, so lights are shaded in
//! submission order with no per-light uniform writes.

use glam::{Mat4, Quat, Vec3};

use crate::error::DeferredError;
use crate::gpu::dynamic_buffer::TypedBuffer;
use crate::gpu::pipeline_helpers::{
    cleared_attachment, create_screen_space_pipeline, pipeline_layout,
    read_only_storage, texture_2d, texture_2d_unfilterable, ADDITIVE_BLEND,
};
use crate::gpu::shader_composer::{ShaderComposer, ShaderName};
use crate::renderer::gbuffer::{GBuffer, DEPTH_DEBUG_FORMAT, LIGHT_FORMAT};
use crate::renderer::light_volume::{LightVolume, LightVolumeMesh};
use crate::scene::Scene;
use crate::submission::{LightKind, LightSubmission};

/// Winding of the light-volume triangles that survive culling, as seen from
/// the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceCulling {
    /// Front faces only: the camera is outside the volume.
    CounterClockwise,
    /// Back faces only: the camera is inside the volume, where front faces
    /// would be behind it.
    Clockwise,
}

impl FaceCulling {
    /// Culling for a point light of `radius` at `center`. A camera exactly
    /// on the surface counts as outside.
    #[must_use]
    pub fn for_point_light(camera: Vec3, center: Vec3, radius: f32) -> Self {
        if camera.distance(center) < radius {
            Self::Clockwise
        } else {
            Self::CounterClockwise
        }
    }

    /// Face to discard for a counter-clockwise-fronted mesh.
    #[must_use]
    pub fn cull_face(self) -> wgpu::Face {
        match self {
            Self::CounterClockwise => wgpu::Face::Back,
            Self::Clockwise => wgpu::Face::Front,
        }
    }

    const fn pipeline_index(self) -> usize {
        match self {
            Self::CounterClockwise => 0,
            Self::Clockwise => 1,
        }
    }
}

/// CPU mirror of the WGSL `GpuLight` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct GpuLight {
    world: [[f32; 4]; 4],
    vector: [f32; 4],
    color: [f32; 4],
}

/// How one uploaded light record is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LightDraw {
    Directional,
    Point(FaceCulling),
}

/// Resolve submissions into GPU records and draw commands, index-aligned.
///
/// Point lights are placed by their entity's world transform; lights whose
/// entity no longer resolves are skipped.
pub(crate) fn prepare_lights(
    submissions: &[LightSubmission],
    scene: &dyn Scene,
    camera_position: Vec3,
    records: &mut Vec<GpuLight>,
    draws: &mut Vec<LightDraw>,
) {
    records.clear();
    draws.clear();
    for submission in submissions {
        let light = &submission.light;
        let color = light.color.extend(light.intensity).to_array();
        match light.kind {
            LightKind::Directional { direction } => {
                records.push(GpuLight {
                    world: Mat4::IDENTITY.to_cols_array_2d(),
                    vector: direction.extend(0.0).to_array(),
                    color,
                });
                draws.push(LightDraw::Directional);
            }
            LightKind::Point { position, radius } => {
                let Some(entity_world) =
                    scene.entity_transform(submission.entity)
                else {
                    log::warn!(
                        "skipping point light: entity {:?} not found",
                        submission.entity
                    );
                    continue;
                };
                let center = entity_world.transform_point3(position);
                let world = Mat4::from_scale_rotation_translation(
                    Vec3::splat(radius),
                    Quat::IDENTITY,
                    center,
                );
                records.push(GpuLight {
                    world: world.to_cols_array_2d(),
                    vector: center.extend(radius).to_array(),
                    color,
                });
                draws.push(LightDraw::Point(FaceCulling::for_point_light(
                    camera_position,
                    center,
                    radius,
                )));
            }
        }
    }
}

/// Pipelines and per-frame buffers of the lighting stage.
pub struct LightingStage {
    directional_pipeline: wgpu::RenderPipeline,
    point_pipelines: [wgpu::RenderPipeline; 2],
    emissive_pipeline: wgpu::RenderPipeline,
    depth_debug_pipeline: wgpu::RenderPipeline,
    lights_layout: wgpu::BindGroupLayout,
    gbuffer_layout: wgpu::BindGroupLayout,
    lights: TypedBuffer<GpuLight>,
    lights_bind_group: wgpu::BindGroup,
    gbuffer_bind_group: Option<wgpu::BindGroup>,
    volume: LightVolume,
    records: Vec<GpuLight>,
    draws: Vec<LightDraw>,
}

impl LightingStage {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        frame_layout: &wgpu::BindGroupLayout,
        capacity: usize,
    ) -> Result<Self, DeferredError> {
        let lights_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Light Records Layout"),
                entries: &[read_only_storage(0)],
            });
        let gbuffer_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Lighting GBuffer Layout"),
                entries: &[
                    texture_2d(0),
                    texture_2d(1),
                    texture_2d_unfilterable(2),
                ],
            });
        let layouts = [frame_layout, &lights_layout, &gbuffer_layout];

        let directional = composer.compose(device, ShaderName::DirectionalLight)?;
        let directional_pipeline = create_screen_space_pipeline(
            device,
            "DirectionalLight",
            &directional,
            LIGHT_FORMAT,
            Some(ADDITIVE_BLEND),
            &layouts,
        );

        let point = composer.compose(device, ShaderName::PointLight)?;
        let point_layout = pipeline_layout(device, "PointLight", &layouts);
        let point_pipelines = [FaceCulling::CounterClockwise, FaceCulling::Clockwise]
            .map(|culling| {
                create_point_pipeline(device, &point_layout, &point, culling)
            });

        let emissive = composer.compose(device, ShaderName::EmissiveLight)?;
        let emissive_pipeline = create_screen_space_pipeline(
            device,
            "EmissiveLight",
            &emissive,
            LIGHT_FORMAT,
            Some(ADDITIVE_BLEND),
            &layouts,
        );

        let depth_debug = composer.compose(device, ShaderName::DepthDebug)?;
        let depth_debug_pipeline = create_screen_space_pipeline(
            device,
            "DepthDebug",
            &depth_debug,
            DEPTH_DEBUG_FORMAT,
            None,
            &layouts,
        );

        let lights = TypedBuffer::with_capacity(
            device,
            "Light Records",
            capacity,
            wgpu::BufferUsages::STORAGE,
        );
        let lights_bind_group =
            create_lights_bind_group(device, &lights_layout, &lights);

        Ok(Self {
            directional_pipeline,
            point_pipelines,
            emissive_pipeline,
            depth_debug_pipeline,
            lights_layout,
            gbuffer_layout,
            lights,
            lights_bind_group,
            gbuffer_bind_group: None,
            volume: LightVolume::new(device, &LightVolumeMesh::default()),
            records: Vec::with_capacity(capacity),
            draws: Vec::with_capacity(capacity),
        })
    }

    /// Replace the point-light volume mesh.
    pub(crate) fn set_volume(
        &mut self,
        device: &wgpu::Device,
        mesh: &LightVolumeMesh,
    ) {
        self.volume = LightVolume::new(device, mesh);
    }

    /// Point the GBuffer bind group at freshly created targets.
    pub(crate) fn bind_gbuffer(&mut self, device: &wgpu::Device, gbuffer: &GBuffer) {
        self.gbuffer_bind_group =
            Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Lighting GBuffer Bind Group"),
                layout: &self.gbuffer_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(
                            &gbuffer.color().view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::TextureView(
                            &gbuffer.normal().view,
                        ),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(
                            &gbuffer.depth().view,
                        ),
                    },
                ],
            }));
    }

    /// Resolve and upload this frame's lights.
    pub(crate) fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        submissions: &[LightSubmission],
        scene: &dyn Scene,
        camera_position: Vec3,
    ) {
        prepare_lights(
            submissions,
            scene,
            camera_position,
            &mut self.records,
            &mut self.draws,
        );
        if self.lights.write(device, queue, &self.records) {
            self.lights_bind_group =
                create_lights_bind_group(device, &self.lights_layout, &self.lights);
        }
    }

    /// Lights drawn by the last `prepare`.
    pub(crate) fn drawn_count(&self) -> usize {
        self.draws.len()
    }

    /// Clear the light target, draw every prepared light, then the emissive
    /// pass.
    pub(crate) fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        frame_bind_group: &wgpu::BindGroup,
    ) {
        let Some(gbuffer_bind_group) = &self.gbuffer_bind_group else {
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lighting Pass"),
            color_attachments: &[Some(cleared_attachment(
                &gbuffer.light().view,
                wgpu::Color::TRANSPARENT,
            ))],
            ..Default::default()
        });
        pass.set_bind_group(0, frame_bind_group, &[]);
        pass.set_bind_group(1, &self.lights_bind_group, &[]);
        pass.set_bind_group(2, gbuffer_bind_group, &[]);

        for (index, draw) in self.draws.iter().enumerate() {
            let instance = index as u32;
            match draw {
                LightDraw::Directional => {
                    pass.set_pipeline(&self.directional_pipeline);
                    pass.draw(0..3, instance..instance + 1);
                }
                LightDraw::Point(culling) => {
                    pass.set_pipeline(
                        &self.point_pipelines[culling.pipeline_index()],
                    );
                    self.volume.bind(&mut pass);
                    pass.draw_indexed(
                        0..self.volume.index_count(),
                        0,
                        instance..instance + 1,
                    );
                }
            }
        }

        pass.set_pipeline(&self.emissive_pipeline);
        pass.draw(0..3, 0..1);
    }

    /// Refresh the depth visualization target.
    pub(crate) fn snapshot_depth(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        gbuffer: &GBuffer,
        frame_bind_group: &wgpu::BindGroup,
    ) {
        let Some(gbuffer_bind_group) = &self.gbuffer_bind_group else {
            return;
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Depth Debug Pass"),
            color_attachments: &[Some(cleared_attachment(
                &gbuffer.depth_debug().view,
                wgpu::Color::BLACK,
            ))],
            ..Default::default()
        });
        pass.set_pipeline(&self.depth_debug_pipeline);
        pass.set_bind_group(0, frame_bind_group, &[]);
        pass.set_bind_group(1, &self.lights_bind_group, &[]);
        pass.set_bind_group(2, gbuffer_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_lights_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    lights: &TypedBuffer<GpuLight>,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Light Records Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: lights.buffer().as_entire_binding(),
        }],
    })
}

fn create_point_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    culling: FaceCulling,
) -> wgpu::RenderPipeline {
    let label = match culling {
        FaceCulling::CounterClockwise => "PointLight Outside Pipeline",
        FaceCulling::Clockwise => "PointLight Inside Pipeline",
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[LightVolume::VERTEX_LAYOUT],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: LIGHT_FORMAT,
                blend: Some(ADDITIVE_BLEND),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(culling.cull_face()),
            ..Default::default()
        },
        // No depth attachment: volumes are never depth tested.
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{EntityHandle, FrameCamera};
    use crate::submission::Light;

    struct Entities(Vec<Mat4>);

    impl Scene for Entities {
        fn camera(&self) -> FrameCamera {
            FrameCamera::default()
        }

        fn entity_transform(&self, entity: EntityHandle) -> Option<Mat4> {
            self.0.get(entity.0 as usize).copied()
        }

        fn draw(&self, _pass: &mut wgpu::RenderPass<'_>) {}
    }

    fn point(position: Vec3, radius: f32, entity: u32) -> LightSubmission {
        LightSubmission {
            light: Light::point(position, radius, Vec3::ONE, 1.0),
            entity: EntityHandle(entity),
        }
    }

    #[test]
    fn culling_flips_inside_volume() {
        let center = Vec3::new(0.0, 0.0, 0.0);
        assert_eq!(
            FaceCulling::for_point_light(Vec3::new(0.5, 0.0, 0.0), center, 1.0),
            FaceCulling::Clockwise
        );
        assert_eq!(
            FaceCulling::for_point_light(Vec3::new(3.0, 0.0, 0.0), center, 1.0),
            FaceCulling::CounterClockwise
        );
    }

    #[test]
    fn camera_on_surface_counts_as_outside() {
        assert_eq!(
            FaceCulling::for_point_light(Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO, 2.0),
            FaceCulling::CounterClockwise
        );
    }

    #[test]
    fn inside_culls_front_faces() {
        assert_eq!(FaceCulling::Clockwise.cull_face(), wgpu::Face::Front);
        assert_eq!(FaceCulling::CounterClockwise.cull_face(), wgpu::Face::Back);
    }

    #[test]
    fn point_light_is_placed_by_entity_transform() {
        let scene = Entities(vec![Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0))]);
        let mut records = Vec::new();
        let mut draws = Vec::new();
        prepare_lights(
            &[point(Vec3::new(0.0, 1.0, 0.0), 2.0, 0)],
            &scene,
            Vec3::new(10.0, 1.5, 0.0),
            &mut records,
            &mut draws,
        );
        assert_eq!(records[0].vector, [10.0, 1.0, 0.0, 2.0]);
        let world = Mat4::from_cols_array_2d(&records[0].world);
        assert!(world
            .transform_point3(Vec3::X)
            .abs_diff_eq(Vec3::new(12.0, 1.0, 0.0), 1e-5));
        // Camera is 0.5 from the center, inside the radius.
        assert_eq!(draws, vec![LightDraw::Point(FaceCulling::Clockwise)]);
    }

    #[test]
    fn unresolved_entities_are_skipped_keeping_order() {
        let scene = Entities(vec![Mat4::IDENTITY]);
        let sun = LightSubmission {
            light: Light::directional(Vec3::NEG_Y, Vec3::ONE, 0.5),
            entity: EntityHandle(99),
        };
        let mut records = Vec::new();
        let mut draws = Vec::new();
        prepare_lights(
            &[sun, point(Vec3::ZERO, 1.0, 7), point(Vec3::ZERO, 1.0, 0)],
            &scene,
            Vec3::new(0.0, 0.0, 5.0),
            &mut records,
            &mut draws,
        );
        assert_eq!(
            draws,
            vec![
                LightDraw::Directional,
                LightDraw::Point(FaceCulling::CounterClockwise)
            ]
        );
        assert_eq!(records[0].vector, [0.0, -1.0, 0.0, 0.0]);
        assert_eq!(records[0].color, [1.0, 1.0, 1.0, 0.5]);
    }

    #[test]
    fn prepare_reuses_scratch_between_frames() {
        let scene = Entities(vec![Mat4::IDENTITY]);
        let mut records = Vec::new();
        let mut draws = Vec::new();
        let lights = vec![point(Vec3::ZERO, 1.0, 0); 4];
        prepare_lights(&lights, &scene, Vec3::ZERO, &mut records, &mut draws);
        prepare_lights(&lights[..1], &scene, Vec3::ZERO, &mut records, &mut draws);
        assert_eq!(records.len(), 1);
        assert_eq!(draws.len(), 1);
    }

    #[test]
    fn record_layout_matches_wgsl() {
        assert_eq!(size_of::<GpuLight>(), 96);
    }
}
