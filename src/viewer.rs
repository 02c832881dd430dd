//! Standalone demo window backed by winit.
//!
//! Renders a ground plane lit by one directional light and a ring of
//! orbiting point lights, with a checkered billboard floating above it.
//! `F1` toggles the debug buffer tiles, `F2` FXAA and `F3` bloom.
//!
//! ```no_run
//! # use deep_deferred::viewer::Viewer;
//! Viewer::builder().with_title("deferred").build().run().unwrap();
//! ```

use std::sync::Arc;
use std::time::Instant;

use glam::{Mat4, Vec2, Vec3};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::DeferredError;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::options::Options;
use crate::renderer::mesh::{plane, MeshBatch, MeshPipeline};
use crate::renderer::{BillboardMaterial, Renderer};
use crate::scene::{EntityHandle, FrameCamera, Scene};
use crate::submission::Light;

const POINT_LIGHTS: usize = 6;
const ORBIT_RADIUS: f32 = 4.0;
const CHECKER_SIZE: u32 = 64;
const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.02,
    g: 0.02,
    b: 0.03,
    a: 1.0,
};

// ── Builder ──────────────────────────────────────────────────────────────

/// Fluent builder for [`Viewer`].
pub struct ViewerBuilder {
    options: Option<Options>,
    title: String,
}

impl ViewerBuilder {
    fn new() -> Self {
        Self {
            options: None,
            title: "deep-deferred".into(),
        }
    }

    /// Override the default options.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Consume the builder and produce a [`Viewer`].
    #[must_use]
    pub fn build(self) -> Viewer {
        Viewer {
            options: self.options.unwrap_or_default(),
            title: self.title,
        }
    }
}

// ── Viewer ───────────────────────────────────────────────────────────────

/// A window running the demo scene through the full frame loop.
pub struct Viewer {
    options: Options,
    title: String,
}

impl Viewer {
    /// Start a new builder.
    #[must_use]
    pub fn builder() -> ViewerBuilder {
        ViewerBuilder::new()
    }

    /// Open the window and run the event loop. Blocks until the window is
    /// closed.
    ///
    /// # Errors
    ///
    /// Returns [`DeferredError::Viewer`] if the event loop fails.
    pub fn run(self) -> Result<(), DeferredError> {
        let event_loop =
            EventLoop::new().map_err(|e| DeferredError::Viewer(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = ViewerApp {
            window: None,
            state: None,
            options: self.options,
            title: self.title,
            started: Instant::now(),
        };
        event_loop
            .run_app(&mut app)
            .map_err(|e| DeferredError::Viewer(e.to_string()))
    }
}

// ── Demo scene ───────────────────────────────────────────────────────────

struct DemoScene {
    camera: FrameCamera,
    // 0: world, 1..: point light orbits
    entities: Vec<Mat4>,
    mesh_pipeline: MeshPipeline,
    ground: MeshBatch,
}

impl DemoScene {
    fn new(
        context: &RenderContext,
        renderer: &Renderer,
    ) -> Result<Self, DeferredError> {
        let mut composer = ShaderComposer::new()?;
        let mesh_pipeline = MeshPipeline::new(
            &context.device,
            &mut composer,
            renderer.gbuffer_depth_format(),
        )?;
        let (vertices, indices) = plane(8.0, 0.0, [0.7, 0.7, 0.75, 0.0]);
        Ok(Self {
            camera: FrameCamera::default(),
            entities: vec![Mat4::IDENTITY; POINT_LIGHTS + 1],
            mesh_pipeline,
            ground: MeshBatch::new(&context.device, "Ground", &vertices, &indices),
        })
    }

    fn advance(&mut self, queue: &wgpu::Queue, seconds: f32, aspect: f32) {
        let eye = Vec3::new(
            9.0 * (seconds * 0.1).cos(),
            5.0,
            9.0 * (seconds * 0.1).sin(),
        );
        self.camera = FrameCamera::look_at(
            eye,
            Vec3::ZERO,
            std::f32::consts::FRAC_PI_4,
            aspect,
            0.1,
            100.0,
        );
        self.mesh_pipeline.set_view_proj(queue, self.camera.view_proj());
        for (i, transform) in self.entities.iter_mut().skip(1).enumerate() {
            let angle = seconds * 0.6
                + i as f32 * std::f32::consts::TAU / POINT_LIGHTS as f32;
            *transform = Mat4::from_rotation_y(angle)
                * Mat4::from_translation(Vec3::new(ORBIT_RADIUS, 0.5, 0.0));
        }
    }
}

impl Scene for DemoScene {
    fn camera(&self) -> FrameCamera {
        self.camera
    }

    fn entity_transform(&self, entity: EntityHandle) -> Option<Mat4> {
        self.entities.get(entity.0 as usize).copied()
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.mesh_pipeline.draw(pass, &[&self.ground]);
    }
}

fn light_color(index: usize) -> Vec3 {
    const PALETTE: [Vec3; 3] = [
        Vec3::new(1.0, 0.35, 0.2),
        Vec3::new(0.2, 0.8, 1.0),
        Vec3::new(0.9, 0.9, 0.3),
    ];
    PALETTE[index % PALETTE.len()]
}

fn checker_material(
    context: &RenderContext,
    renderer: &Renderer,
) -> Arc<BillboardMaterial> {
    let texels: Vec<u8> = (0..CHECKER_SIZE * CHECKER_SIZE)
        .flat_map(|i| {
            let (x, y) = (i % CHECKER_SIZE / 8, i / CHECKER_SIZE / 8);
            if (x + y) % 2 == 0 {
                [255, 255, 255, 255]
            } else {
                [40, 40, 200, 255]
            }
        })
        .collect();
    let size = wgpu::Extent3d {
        width: CHECKER_SIZE,
        height: CHECKER_SIZE,
        depth_or_array_layers: 1,
    };
    let texture = context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Checker Texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    context.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &texels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * CHECKER_SIZE),
            rows_per_image: Some(CHECKER_SIZE),
        },
        size,
    );
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    renderer.create_billboard_material(&context.device, "Checker", &view)
}

// ── Winit app ────────────────────────────────────────────────────────────

struct ViewerState {
    context: RenderContext,
    renderer: Renderer,
    scene: DemoScene,
    checker: Arc<BillboardMaterial>,
}

impl ViewerState {
    fn new(
        window: Arc<Window>,
        options: Options,
    ) -> Result<Self, DeferredError> {
        let inner = window.inner_size();
        let context = pollster::block_on(RenderContext::new(
            window,
            (inner.width.max(1), inner.height.max(1)),
        ))?;
        let renderer = Renderer::new(&context, options)?;
        let scene = DemoScene::new(&context, &renderer)?;
        let checker = checker_material(&context, &renderer);
        Ok(Self {
            context,
            renderer,
            scene,
            checker,
        })
    }

    fn frame(&mut self, seconds: f32) -> Result<(), DeferredError> {
        let (width, height) = self.context.viewport_size();
        self.scene.advance(
            &self.context.queue,
            seconds,
            width as f32 / height.max(1) as f32,
        );

        self.renderer.update();
        self.renderer.submit_light(
            Light::directional(
                Vec3::new(-0.3, -1.0, -0.2).normalize(),
                Vec3::splat(0.6),
                0.8,
            ),
            EntityHandle(0),
        );
        for i in 0..POINT_LIGHTS {
            self.renderer.submit_light(
                Light::point(Vec3::ZERO, 3.0, light_color(i), 2.0),
                EntityHandle(i as u32 + 1),
            );
        }
        self.renderer.submit_billboard(
            Arc::clone(&self.checker),
            Vec3::new(0.0, 2.0 + (seconds * 1.5).sin() * 0.3, 0.0),
            Vec2::splat(1.5),
        );

        self.renderer.draw(&self.context, &self.scene)?;
        self.renderer.present_to_surface(&self.context, BACKGROUND)
    }

    fn toggle(&mut self, key: KeyCode) {
        let mut options = self.renderer.options().clone();
        match key {
            KeyCode::F1 => {
                options.debug.show_debug_buffers =
                    !options.debug.show_debug_buffers;
            }
            KeyCode::F2 => {
                options.post_processing.fxaa_enabled =
                    !options.post_processing.fxaa_enabled;
            }
            KeyCode::F3 => {
                options.post_processing.bloom_enabled =
                    !options.post_processing.bloom_enabled;
            }
            _ => return,
        }
        self.renderer.set_options(&self.context, options);
        log::info!(
            "path {:?}, debug buffers {}",
            self.renderer.post_process_path(),
            self.renderer.options().debug.show_debug_buffers
        );
    }
}

struct ViewerApp {
    window: Option<Arc<Window>>,
    state: Option<ViewerState>,
    options: Options,
    title: String,
    started: Instant,
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match ViewerState::new(Arc::clone(&window), self.options.clone()) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                log::error!("failed to initialize renderer: {e}");
                event_loop.exit();
                return;
            }
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        if matches!(event, WindowEvent::CloseRequested) {
            event_loop.exit();
            return;
        }
        let (Some(window), Some(state)) = (&self.window, &mut self.state)
        else {
            return;
        };

        match event {
            WindowEvent::Resized(size) => {
                state.context.resize(size.width, size.height);
            }

            WindowEvent::RedrawRequested => {
                let seconds = self.started.elapsed().as_secs_f32();
                match state.frame(seconds) {
                    Ok(()) => {}
                    Err(DeferredError::Surface(
                        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost,
                    )) => {
                        let inner = window.inner_size();
                        state.context.resize(inner.width, inner.height);
                    }
                    Err(e) => log::error!("frame failed: {e}"),
                }
                window.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed {
                    return;
                }
                if let PhysicalKey::Code(code) = event.physical_key {
                    state.toggle(code);
                }
            }

            _ => (),
        }
    }
}
