use criterion::{Criterion, criterion_group, criterion_main};
use glam::{Quat, Vec3};
use std::hint::black_box;
use tryon::Settings;
use tryon::models::Transform;
use tryon::services::frame_adapter::{AuthoredTransform, FrameAdapter, authored_to_engine_rotation};

fn frame_adapter_benchmark(c: &mut Criterion) {
    let settings = Settings::default();
    let authored = settings
        .model("wristDemo")
        .map(AuthoredTransform::from)
        .unwrap_or_default();

    c.bench_function("plan_wrist_demo", |b| {
        b.iter(|| FrameAdapter::plan(black_box(&authored)))
    });

    c.bench_function("apply_wrist_demo", |b| {
        b.iter(|| {
            let mut transform = Transform::IDENTITY;
            FrameAdapter::apply(black_box(&authored), &mut transform);
            transform
        })
    });

    let rotation = Quat::from_xyzw(0.1, 0.2, 0.3, 0.9);
    c.bench_function("map_rotation", |b| {
        b.iter(|| authored_to_engine_rotation(black_box(rotation)))
    });

    c.bench_function("translate_batch_1k", |b| {
        let offsets: Vec<Vec3> = (0..1000)
            .map(|i| Vec3::new(i as f32, -(i as f32), 0.5))
            .collect();
        b.iter(|| {
            let mut transform = Transform::IDENTITY;
            for offset in &offsets {
                let authored = AuthoredTransform {
                    offset: Some(*offset),
                    ..AuthoredTransform::default()
                };
                FrameAdapter::apply(&authored, &mut transform);
            }
            black_box(transform)
        })
    });
}

criterion_group!(benches, frame_adapter_benchmark);
criterion_main!(benches);
