#![allow(dead_code)]

use std::f32::consts::PI;

use glam::Vec3;
use sdf::shape::{
    cuboid, cylinder, difference, dodecahedron, expand, intersection, mandelbulb, mirror, octahedron,
    plane, repeat, rotate_y, scale, sierpinski, smooth_box, smooth_difference, smooth_intersection,
    smooth_union, sphere, stretch, tetrahedron, torus, translate, tree, truchet, twist_y, union,
    wrap_x,
};
use sdf::{orbit, spotlight, Camera, Material, OrbitOptions, Scene, SpotlightOptions};

/// Parses and validates `source`, returning naga's report on failure.
pub fn validate(source: &str) -> Result<(), String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| e.emit_to_string(source))?;
    Ok(())
}

pub fn two_spheres() -> Scene {
    Scene::builder()
        .entity(
            translate([-1.0, 0.0, 0.0], sphere(0.75)),
            Material::new().with_color([0.9, 0.2, 0.2]),
        )
        .entity(
            translate([1.0, 0.0, 0.0], sphere(0.75)),
            Material::new()
                .with_smoothness(0.9)
                .with_emissivity([0.5, 0.5, 0.5]),
        )
        .camera(Camera::new([0.0, 0.0, -5.0], [0.0, 0.0, 0.0]))
        .build()
}

/// Every combinator and primitive at least once.
pub fn kitchen_sink() -> Scene {
    let blend = smooth_union(
        0.3,
        sphere(0.6),
        smooth_intersection(0.1, cuboid([0.5, 0.5, 0.5]), octahedron()),
    );
    let carved = smooth_difference(0.1, smooth_box([1.0, 0.5, 0.5], 0.1), cylinder(0.2));
    Scene::builder()
        .entity(blend, Material::new().with_color([0.8, 0.8, 0.8]))
        .entity(
            translate([2.0, 0.0, 0.0], carved),
            Material::new().with_transmittance(0.9).with_refraction(1.5),
        )
        .entity(
            difference(twist_y(0.5, torus(1.0, 0.25)), tetrahedron()),
            Material::new().with_scatter(4.0),
        )
        .entity(
            union(
                scale(0.5, dodecahedron()),
                intersection(stretch([1.0, 2.0, 1.0], sphere(0.5)), expand(0.1, octahedron())),
            ),
            Material::new(),
        )
        .entity(
            mirror([1.0, 0.0, 0.0], rotate_y(PI / 4.0, wrap_x(cylinder(0.1)))),
            Material::new().with_color([0.1, 0.9, 0.1]),
        )
        .entity(repeat(4.0, sphere(0.3)), Material::new())
        .entity(plane([0.0, 1.0, 0.0], -2.0), Material::new())
        .camera(Camera::new([0.0, 2.0, -8.0], Vec3::ZERO).with_aperture(0.05))
        .air(Material::new().with_color([0.6, 0.7, 0.9]).with_refraction(1.0))
        .build()
}

pub fn fractals() -> Scene {
    Scene::builder()
        .entity(mandelbulb(8.0, 8), Material::new())
        .entity(
            translate([3.0, 0.0, 0.0], sierpinski(6, tetrahedron())),
            Material::new(),
        )
        .entity(translate([-3.0, 0.0, 0.0], tree(5)), Material::new())
        .entity(truchet(), Material::new())
        .build()
}

pub fn lit() -> Scene {
    Scene::builder()
        .entity(cuboid([0.5, 0.5, 0.5]), Material::new())
        .entity(
            sdf::shape::translate([0.0, 5.0, 0.0], sphere(1.0)),
            spotlight(SpotlightOptions {
                direction: Vec3::new(0.0, -1.0, 0.0).into(),
                ..SpotlightOptions::default()
            }),
        )
        .camera(orbit(OrbitOptions {
            radius: 6.0.into(),
            ..OrbitOptions::default()
        }))
        .build()
}
