use codegen::{compile, lower, Environment, Interpreter, KernelOptions};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec3;
use sdf::shape::{mandelbulb, sierpinski, sphere, tetrahedron, translate, tree, union};
use sdf::{Material, Scene};

fn scene() -> Scene {
    Scene::builder()
        .entity(mandelbulb(8.0, 8), Material::new())
        .entity(
            translate([3.0, 0.0, 0.0], sierpinski(6, tetrahedron())),
            Material::new(),
        )
        .entity(
            union(tree(6), translate([0.0, -1.0, 0.0], sphere(0.5))),
            Material::new().with_color([0.4, 0.8, 0.3]),
        )
        .build()
}

fn bench_compile(c: &mut Criterion) {
    let scene = scene();
    let options = KernelOptions::default();
    c.bench_function("compile", |b| {
        b.iter(|| compile(black_box(&scene), &options).unwrap());
    });
}

fn bench_closest(c: &mut Criterion) {
    let program = lower(&scene(), &KernelOptions::default()).unwrap();
    let mut interpreter = Interpreter::new(&program, Environment::default());
    c.bench_function("calculate_closest", |b| {
        b.iter(|| interpreter.calculate_closest(black_box(Vec3::new(0.5, 0.25, -1.5))));
    });
}

criterion_group!(benches, bench_compile, bench_closest);
criterion_main!(benches);
