//! Per-frame submission and dispatch costs.

#![allow(missing_docs, unused_results)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use deep_deferred::renderer::lighting::FaceCulling;
use deep_deferred::renderer::PostProcessPath;
use deep_deferred::scene::EntityHandle;
use deep_deferred::submission::{
    Light, LightSubmission, SubmissionQueue, MAX_VISIBLE_LIGHTS,
};
use glam::Vec3;

fn light(i: usize) -> LightSubmission {
    LightSubmission {
        light: Light::point(
            Vec3::new(i as f32, 0.0, 0.0),
            2.0,
            Vec3::ONE,
            1.0,
        ),
        entity: EntityHandle(i as u32),
    }
}

fn queue_fill_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("light_queue_frame");
    for count in [64, 512, 1024] {
        let mut queue = SubmissionQueue::new("light", MAX_VISIBLE_LIGHTS);
        group.bench_function(format!("{count}_submissions"), |b| {
            b.iter(|| {
                queue.reset();
                for i in 0..count {
                    black_box(queue.push(light(i)));
                }
                black_box(queue.len())
            })
        });
    }
    group.finish();
}

fn culling_benchmark(c: &mut Criterion) {
    let centers: Vec<Vec3> =
        (0..MAX_VISIBLE_LIGHTS).map(|i| Vec3::splat(i as f32 * 0.01)).collect();
    c.bench_function("point_light_culling", |b| {
        b.iter(|| {
            centers
                .iter()
                .map(|&center| {
                    FaceCulling::for_point_light(black_box(Vec3::ONE), center, 2.0)
                })
                .filter(|&culling| culling == FaceCulling::Clockwise)
                .count()
        })
    });
}

fn path_benchmark(c: &mut Criterion) {
    c.bench_function("post_process_path_steps", |b| {
        b.iter(|| {
            let path = PostProcessPath::from_flags(black_box(true), black_box(true));
            black_box(path.steps().len())
        })
    });
}

criterion_group!(benches, queue_fill_benchmark, culling_benchmark, path_benchmark);
criterion_main!(benches);
