//! Performance benchmarks for the per-frame gaze pipeline

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gaze_mirror::{
    actuator::PupilActuator,
    animator::EyeAnimator,
    camera::CameraIntrinsics,
    constants::{LEFT_PUPIL, MIN_MESH_LANDMARKS, RIGHT_PUPIL},
    direction::create_strategy,
    face_model::FaceModel,
    landmarks::{Landmark, LandmarkSet, FACE_SUBSET},
    pose_estimation::HeadPose,
    source::parse_event,
};
use nalgebra::{Point2, Vector3};
use std::time::Duration;

/// Frontal face at half a meter with both pupils shifted by `shift` pixels
fn synthetic_landmarks(shift: f64) -> LandmarkSet {
    let k = CameraIntrinsics::from_frame(640, 480).expect("Invalid frame");
    let pose = HeadPose::frontal(Vector3::new(0.0, 0.0, 500.0));
    let model = FaceModel::canonical();
    let normalized = |p: Point2<f64>| Landmark::new(p.x / 640.0, p.y / 480.0, 0.0);
    let project = |p| pose.project(&p, &k).expect("Point behind camera");

    let mut points = vec![normalized(project(model.points()[0])); MIN_MESH_LANDMARKS];
    for (&index, &p) in FACE_SUBSET.iter().zip(model.points()) {
        points[index] = normalized(project(p));
    }
    for (index, eyeball) in [(LEFT_PUPIL, model.left_eyeball()), (RIGHT_PUPIL, model.right_eyeball())] {
        let pupil = project(eyeball + Vector3::new(0.0, 0.0, 12.0));
        points[index] = normalized(Point2::new(pupil.x + shift, pupil.y));
    }
    LandmarkSet::new(points)
}

fn bench_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("strategies");
    group.measurement_time(Duration::from_secs(10));

    let landmarks = synthetic_landmarks(12.0);
    for name in ["reprojection", "quantized", "iris", "face"] {
        let strategy = create_strategy(name).expect("Unknown strategy");
        group.bench_with_input(BenchmarkId::new("estimate", name), &landmarks, |b, landmarks| {
            b.iter(|| {
                let _ = black_box(strategy.estimate(black_box(landmarks), 640, 480));
            });
        });
    }

    group.finish();
}

fn bench_animator(c: &mut Criterion) {
    let mut group = c.benchmark_group("animator");

    // Alternate gaze left and right so the actuator never settles
    let frames: Vec<LandmarkSet> = (0..30)
        .map(|i| synthetic_landmarks(if i % 2 == 0 { 15.0 } else { -15.0 }))
        .collect();

    group.bench_function("process_30_frames", |b| {
        let strategy = create_strategy("quantized").expect("Unknown strategy");
        let mut animator = EyeAnimator::new(strategy, PupilActuator::default());
        b.iter(|| {
            for frame in &frames {
                black_box(animator.process_frame(Some(frame), 640, 480));
            }
        });
    });

    group.bench_function("process_no_face", |b| {
        let strategy = create_strategy("quantized").expect("Unknown strategy");
        let mut animator = EyeAnimator::new(strategy, PupilActuator::default());
        b.iter(|| black_box(animator.process_frame(None, 640, 480)));
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("source");

    let landmarks = synthetic_landmarks(0.0);
    let points: Vec<[f64; 3]> = landmarks.points().iter().map(|l| [l.x, l.y, l.z]).collect();
    let line = format!(
        "{{\"width\": 640, \"height\": 480, \"landmarks\": {}}}",
        serde_json::to_string(&points).expect("Serialization failed")
    );

    group.bench_function("parse_478_landmarks", |b| {
        b.iter(|| black_box(parse_event(black_box(&line), 1)));
    });

    group.finish();
}

criterion_group!(benches, bench_strategies, bench_animator, bench_parse);
criterion_main!(benches);
