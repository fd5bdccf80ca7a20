mod common;

use codegen::{compile, KernelOptions};
use sdf::shape::sphere;
use sdf::{Material, Scene};

fn assert_valid(scene: &Scene, options: &KernelOptions) {
    let kernel = compile(scene, options).unwrap();
    if let Err(report) = common::validate(kernel.source()) {
        panic!("{report}\n\n{}", kernel.source());
    }
}

#[test]
fn empty_scene_is_valid() {
    assert_valid(&Scene::default(), &KernelOptions::default());
}

#[test]
fn single_sphere_is_valid() {
    let scene = Scene::builder().entity(sphere(1.0), Material::new()).build();
    assert_valid(&scene, &KernelOptions::default());
}

#[test]
fn every_combinator_is_valid() {
    assert_valid(&common::kitchen_sink(), &KernelOptions::default());
}

#[test]
fn fractals_are_valid() {
    assert_valid(&common::fractals(), &KernelOptions::default());
}

#[test]
fn spotlight_and_orbit_are_valid() {
    assert_valid(&common::lit(), &KernelOptions::default());
}

#[test]
fn cheap_normals_are_valid() {
    let options = KernelOptions {
        cheap_normals: true,
        iterations: 4,
        memory: 0.95,
        ..KernelOptions::default()
    };
    assert_valid(&common::two_spheres(), &options);
}
