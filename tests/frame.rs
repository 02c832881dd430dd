//! Headless frame tests. Each test returns early when no GPU adapter is
//! available.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use deep_deferred::gpu::render_context::RenderContext;
use deep_deferred::gpu::shader_composer::ShaderComposer;
use deep_deferred::options::Options;
use deep_deferred::renderer::gbuffer::depth_format_for;
use deep_deferred::renderer::mesh::{plane, MeshBatch, MeshPipeline};
use deep_deferred::renderer::present::{DEBUG_TILE_HEIGHT, DEBUG_TILE_WIDTH};
use deep_deferred::renderer::{FramePhase, PostProcessPath, Renderer};
use deep_deferred::scene::{EntityHandle, FrameCamera, Scene};
use deep_deferred::submission::{Light, MAX_VISIBLE_LIGHTS};
use deep_deferred::DeferredError;
use glam::{Mat4, Vec2, Vec3};

const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

fn headless(width: u32, height: u32) -> Option<RenderContext> {
    pollster::block_on(RenderContext::headless(OUTPUT_FORMAT, width, height))
        .ok()
}

fn options(fxaa_enabled: bool, bloom_enabled: bool) -> Options {
    let mut options = Options::default();
    options.post_processing.fxaa_enabled = fxaa_enabled;
    options.post_processing.bloom_enabled = bloom_enabled;
    options
}

const FLOOR_EYE: Vec3 = Vec3::new(0.0, 5.0, 5.0);

fn camera(aspect: f32) -> FrameCamera {
    FrameCamera::look_at(
        FLOOR_EYE,
        Vec3::ZERO,
        std::f32::consts::FRAC_PI_4,
        aspect,
        0.1,
        100.0,
    )
}

struct EmptyScene;

impl Scene for EmptyScene {
    fn camera(&self) -> FrameCamera {
        camera(1.0)
    }

    fn entity_transform(&self, _entity: EntityHandle) -> Option<Mat4> {
        None
    }

    fn draw(&self, _pass: &mut wgpu::RenderPass<'_>) {}
}

/// A large white floor facing +Y under the camera.
struct FloorScene {
    camera: FrameCamera,
    pipeline: MeshPipeline,
    floor: MeshBatch,
}

impl FloorScene {
    fn new(context: &RenderContext) -> Self {
        let (width, height) = context.viewport_size();
        let camera = camera(width as f32 / height as f32);
        let mut composer = ShaderComposer::new().unwrap();
        let pipeline = MeshPipeline::new(
            &context.device,
            &mut composer,
            depth_format_for(context),
        )
        .unwrap();
        pipeline.set_view_proj(&context.queue, camera.view_proj());
        let (vertices, indices) = plane(50.0, 0.0, [1.0, 1.0, 1.0, 0.0]);
        let floor = MeshBatch::new(&context.device, "Floor", &vertices, &indices);
        Self {
            camera,
            pipeline,
            floor,
        }
    }
}

impl Scene for FloorScene {
    fn camera(&self) -> FrameCamera {
        self.camera
    }

    fn entity_transform(&self, _entity: EntityHandle) -> Option<Mat4> {
        Some(Mat4::IDENTITY)
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.pipeline.draw(pass, &[&self.floor]);
    }
}

/// Copy `texture` back to the CPU, one `texel_size`-byte chunk per pixel
/// in row-major order.
fn read_texels(
    context: &RenderContext,
    texture: &wgpu::Texture,
    texel_size: u32,
) -> Vec<Vec<u8>> {
    let (width, height) = (texture.width(), texture.height());
    let unpadded = width * texel_size;
    let padded = unpadded.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
        * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback"),
        size: u64::from(padded * height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });
    let mut encoder = context.create_encoder("Readback Encoder");
    encoder.copy_texture_to_buffer(
        texture.as_image_copy(),
        wgpu::TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded),
                rows_per_image: Some(height),
            },
        },
        texture.size(),
    );
    context.submit(encoder);

    let slice = buffer.slice(..);
    slice.map_async(wgpu::MapMode::Read, |_| {});
    let _ = context.device.poll(wgpu::PollType::Wait);
    let data = slice.get_mapped_range();
    let texels: Vec<Vec<u8>> = data
        .chunks(padded as usize)
        .flat_map(|row| row[..unpadded as usize].chunks(texel_size as usize))
        .map(<[u8]>::to_vec)
        .collect();
    drop(data);
    texels
}

/// Copy an `Rgba16Float` texture back to the CPU.
fn read_rgba16f(context: &RenderContext, texture: &wgpu::Texture) -> Vec<[f32; 4]> {
    read_texels(context, texture, 8)
        .iter()
        .map(|texel| {
            std::array::from_fn(|i| {
                half::f16::from_le_bytes([texel[2 * i], texel[2 * i + 1]]).to_f32()
            })
        })
        .collect()
}

/// Copy an `Rgba8Unorm` texture back to the CPU.
fn read_rgba8(context: &RenderContext, texture: &wgpu::Texture) -> Vec<[u8; 4]> {
    read_texels(context, texture, 4)
        .iter()
        .map(|texel| [texel[0], texel[1], texel[2], texel[3]])
        .collect()
}

fn output_texture(context: &RenderContext) -> wgpu::Texture {
    let (width, height) = context.viewport_size();
    context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Output"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OUTPUT_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}

fn brightness(pixel: [f32; 4]) -> f32 {
    pixel[0] + pixel[1] + pixel[2]
}

#[test]
fn empty_frame_is_transparent_on_every_path() {
    let Some(context) = headless(64, 64) else {
        return;
    };
    for (fxaa, bloom) in [(false, false), (true, false), (false, true), (true, true)] {
        let mut renderer = Renderer::new(&context, options(fxaa, bloom)).unwrap();
        renderer.update();
        renderer.draw(&context, &EmptyScene).unwrap();

        let pixels = read_rgba16f(&context, renderer.final_texture().unwrap());
        assert_eq!(pixels.len(), 64 * 64);
        assert!(
            pixels.iter().all(|p| p.iter().all(|&c| c == 0.0)),
            "{:?} left non-zero pixels",
            renderer.post_process_path()
        );
    }
}

#[test]
fn directional_brightness_grows_with_intensity() {
    let Some(context) = headless(64, 64) else {
        return;
    };
    let scene = FloorScene::new(&context);
    let mut renderer = Renderer::new(&context, options(false, false)).unwrap();

    let mut previous = -1.0;
    for intensity in [0.0, 0.5, 1.0, 2.0] {
        renderer.update();
        renderer.submit_light(
            Light::directional(Vec3::new(0.0, -1.0, 0.0), Vec3::ONE, intensity),
            EntityHandle(0),
        );
        renderer.draw(&context, &scene).unwrap();

        let gbuffer = renderer.gbuffer().unwrap();
        let pixels = read_rgba16f(&context, &gbuffer.light().texture);
        let total = brightness(pixels[32 * 64 + 32]);
        if intensity == 0.0 {
            assert_eq!(total, 0.0);
        }
        assert!(
            total > previous,
            "intensity {intensity}: {total} <= {previous}"
        );
        previous = total;
    }
}

#[test]
fn resize_recreates_every_target() {
    let Some(mut context) = headless(800, 600) else {
        return;
    };
    let mut renderer = Renderer::new(&context, options(true, true)).unwrap();
    renderer.update();
    renderer.draw(&context, &EmptyScene).unwrap();
    assert_eq!(renderer.gbuffer().unwrap().size().width, 800);

    context.resize(1920, 1080);
    renderer.update();
    renderer.draw(&context, &EmptyScene).unwrap();

    let gbuffer = renderer.gbuffer().unwrap();
    assert_eq!(gbuffer.color().size(), (1920, 1080));
    assert_eq!(gbuffer.light().size(), (1920, 1080));
    assert_eq!(
        gbuffer.half_pixel(),
        Vec2::new(0.5 / 1920.0, 0.5 / 1080.0)
    );
    let targets = renderer.render_targets().unwrap();
    assert_eq!(targets.final_target().size(), (1920, 1080));
    assert_eq!(targets.fxaa_source().unwrap().size(), (1920, 1080));
    assert_eq!(targets.bloom_source().unwrap().size(), (1920, 1080));
    assert_eq!(renderer.render_target_generation(), 2);
}

#[test]
fn unchanged_viewport_keeps_targets() {
    let Some(context) = headless(320, 240) else {
        return;
    };
    let mut renderer = Renderer::new(&context, Options::default()).unwrap();
    for _ in 0..3 {
        renderer.update();
        renderer.draw(&context, &EmptyScene).unwrap();
    }
    assert_eq!(renderer.render_target_generation(), 1);
    assert_eq!(renderer.render_target_rect(), renderer.output_rect());

    renderer.on_device_reset(&context).unwrap();
    assert_eq!(renderer.render_target_generation(), 2);
    assert_eq!(renderer.phase(), FramePhase::Idle);
}

#[test]
fn options_toggle_optional_targets() {
    let Some(context) = headless(128, 128) else {
        return;
    };
    let mut renderer = Renderer::new(&context, options(false, false)).unwrap();
    renderer.update();
    renderer.draw(&context, &EmptyScene).unwrap();
    let targets = renderer.render_targets().unwrap();
    assert!(targets.fxaa_source().is_none());
    assert!(targets.bloom_source().is_none());

    renderer.set_options(&context, options(false, true));
    assert_eq!(renderer.post_process_path(), PostProcessPath::BloomOnly);
    let targets = renderer.render_targets().unwrap();
    assert!(targets.fxaa_source().is_none());
    assert!(targets.bloom_source().is_some());

    renderer.update();
    renderer.draw(&context, &EmptyScene).unwrap();
    assert_eq!(renderer.render_target_generation(), 1);
}

#[test]
fn frame_calls_must_follow_the_cycle() {
    let Some(context) = headless(64, 64) else {
        return;
    };
    let output = output_texture(&context);
    let view = output.create_view(&wgpu::TextureViewDescriptor::default());
    let mut renderer = Renderer::new(&context, Options::default()).unwrap();

    assert!(matches!(
        renderer.present(&context, &view),
        Err(DeferredError::FrameOrder {
            expected: FramePhase::Resolved,
            found: FramePhase::Idle,
        })
    ));

    renderer.draw(&context, &EmptyScene).unwrap();
    assert_eq!(renderer.phase(), FramePhase::Resolved);
    // Redrawing without presenting discards the first frame.
    renderer.draw(&context, &EmptyScene).unwrap();
    renderer.present(&context, &view).unwrap();
    assert_eq!(renderer.phase(), FramePhase::Presented);
    assert!(matches!(
        renderer.present(&context, &view),
        Err(DeferredError::FrameOrder {
            expected: FramePhase::Resolved,
            found: FramePhase::Presented,
        })
    ));

    // Presented leads back to Idle, so the next draw may start directly.
    renderer.draw(&context, &EmptyScene).unwrap();
    assert_eq!(renderer.phase(), FramePhase::Resolved);
    renderer.update();
    assert_eq!(renderer.phase(), FramePhase::Idle);
    renderer.draw(&context, &EmptyScene).unwrap();
}

#[test]
fn overflow_and_unresolved_lights_are_dropped() {
    let Some(context) = headless(64, 64) else {
        return;
    };
    let mut renderer = Renderer::new(&context, Options::default()).unwrap();
    renderer.update();
    for _ in 0..MAX_VISIBLE_LIGHTS + 10 {
        renderer.submit_light(
            Light::directional(Vec3::NEG_Y, Vec3::ONE, 0.1),
            EntityHandle(0),
        );
    }
    assert_eq!(renderer.visible_lights_count(), MAX_VISIBLE_LIGHTS);
    assert_eq!(renderer.dropped_lights_count(), 10);
    renderer.draw(&context, &EmptyScene).unwrap();
    assert_eq!(renderer.drawn_lights_count(), MAX_VISIBLE_LIGHTS);

    renderer.update();
    assert_eq!(renderer.visible_lights_count(), 0);
    assert_eq!(renderer.dropped_lights_count(), 0);
    renderer.submit_light(
        Light::point(Vec3::ZERO, 2.0, Vec3::ONE, 1.0),
        EntityHandle(7),
    );
    renderer.draw(&context, &EmptyScene).unwrap();
    assert_eq!(renderer.visible_lights_count(), 1);
    assert_eq!(renderer.drawn_lights_count(), 0);
}

#[test]
fn opaque_clear_color_fills_uncovered_pixels() {
    let Some(context) = headless(64, 64) else {
        return;
    };
    let blue = [0.0, 0.0, 1.0, 1.0];
    for fxaa in [false, true] {
        let mut options = options(fxaa, false);
        options.frame.clear_color = blue;
        let mut renderer = Renderer::new(&context, options).unwrap();
        renderer.update();
        renderer.draw(&context, &EmptyScene).unwrap();

        let pixels = read_rgba16f(&context, renderer.final_texture().unwrap());
        assert!(
            pixels.iter().all(|&p| p == blue),
            "{:?}: corner {:?}",
            renderer.post_process_path(),
            pixels[0]
        );
    }
}

/// Camera straight down -Z at a billboard filling the whole view.
struct BillboardScene;

impl Scene for BillboardScene {
    fn camera(&self) -> FrameCamera {
        FrameCamera::look_at(
            Vec3::new(0.0, 0.0, 3.0),
            Vec3::ZERO,
            std::f32::consts::FRAC_PI_4,
            1.0,
            0.1,
            100.0,
        )
    }

    fn entity_transform(&self, _entity: EntityHandle) -> Option<Mat4> {
        Some(Mat4::IDENTITY)
    }

    fn draw(&self, _pass: &mut wgpu::RenderPass<'_>) {}
}

#[test]
fn billboards_show_texture_color_unlit() {
    let Some(context) = headless(64, 64) else {
        return;
    };
    let mut renderer = Renderer::new(&context, options(false, false)).unwrap();

    let grey = context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Grey"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    context.queue.write_texture(
        grey.as_image_copy(),
        &[128, 128, 128, 255],
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4),
            rows_per_image: Some(1),
        },
        grey.size(),
    );
    let view = grey.create_view(&wgpu::TextureViewDescriptor::default());
    let material = renderer.create_billboard_material(&context.device, "Grey", &view);
    let expected = 128.0 / 255.0;

    for lights in [vec![], vec![Light::directional(Vec3::NEG_Z, Vec3::ONE, 1.0)]] {
        renderer.update();
        for light in &lights {
            renderer.submit_light(*light, EntityHandle(0));
        }
        renderer.submit_billboard(material.clone(), Vec3::ZERO, Vec2::splat(10.0));
        renderer.draw(&context, &BillboardScene).unwrap();
        assert_eq!(renderer.visible_billboards_count(), 1);

        let pixels = read_rgba16f(&context, renderer.final_texture().unwrap());
        let center = pixels[32 * 64 + 32];
        for channel in &center[..3] {
            assert!(
                (channel - expected).abs() < 0.01,
                "{} lights: {center:?}",
                lights.len()
            );
        }
        assert_eq!(center[3], 1.0);
    }
}

#[test]
fn point_light_volume_shades_floor_inside_and_outside() {
    let Some(context) = headless(64, 64) else {
        return;
    };
    let scene = FloorScene::new(&context);
    let mut renderer = Renderer::new(&context, options(false, false)).unwrap();

    // (center, radius, camera inside, floor under the view center lit)
    let cases = [
        (Vec3::new(0.0, 1.0, 0.0), 3.0, false, true),
        (Vec3::new(0.0, 4.0, 4.0), 10.0, true, true),
        (Vec3::new(20.0, 1.0, 0.0), 2.0, false, false),
    ];
    for (center, radius, inside, lit) in cases {
        assert_eq!(FLOOR_EYE.distance(center) < radius, inside);
        renderer.update();
        renderer.submit_light(
            Light::point(center, radius, Vec3::ONE, 1.0),
            EntityHandle(0),
        );
        renderer.draw(&context, &scene).unwrap();
        assert_eq!(renderer.drawn_lights_count(), 1);

        let gbuffer = renderer.gbuffer().unwrap();
        let pixels = read_rgba16f(&context, &gbuffer.light().texture);
        let total = brightness(pixels[32 * 64 + 32]);
        assert_eq!(total > 0.0, lit, "light at {center} (inside: {inside}): {total}");
    }
}

#[test]
fn present_overlays_debug_tiles() {
    let Some(context) = headless(640, 480) else {
        return;
    };
    let scene = FloorScene::new(&context);
    let mut options = options(false, false);
    options.debug.show_debug_buffers = true;
    let mut renderer = Renderer::new(&context, options).unwrap();
    let output = output_texture(&context);
    let view = output.create_view(&wgpu::TextureViewDescriptor::default());

    renderer.update();
    renderer.submit_light(
        Light::directional(Vec3::NEG_Y, Vec3::ONE, 1.0),
        EntityHandle(0),
    );
    renderer.draw(&context, &scene).unwrap();
    renderer.present(&context, &view).unwrap();

    let pixels = read_rgba8(&context, &output);
    let at = |x: u32, y: u32| pixels[(y * 640 + x) as usize];
    let (mid_x, mid_y) = (DEBUG_TILE_WIDTH / 2, DEBUG_TILE_HEIGHT / 2);

    // Tile 0: white floor albedo.
    let color = at(mid_x, mid_y);
    assert!(color[..3].iter().all(|&c| c >= 250), "color tile {color:?}");
    // Tile 1: +Y normal packed to (0.5, 1.0, 0.5).
    let normal = at(mid_x, DEBUG_TILE_HEIGHT + mid_y);
    assert!(normal[1] >= 250, "normal tile {normal:?}");
    assert!(normal[0].abs_diff(128) <= 2, "normal tile {normal:?}");
    assert!(normal[2].abs_diff(128) <= 2, "normal tile {normal:?}");
    // Right of the tiles: the lit final image.
    let lit = at(480, 240);
    assert!(lit[..3].iter().any(|&c| c > 0), "final image {lit:?}");
    assert_eq!(lit[3], 255);
}
