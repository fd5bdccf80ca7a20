//! Built-in scenes for the command line.

use clap::ValueEnum;
use codegen::KernelOptions;
use glam::Vec3;
use sdf::shape::{
    difference, mandelbulb, plane, sierpinski, smooth_union, sphere, tetrahedron, translate, tree,
    union,
};
use sdf::{
    orbit, spotlight, Axis, Camera, Material, OrbitOptions, Param, Scene, Shape, SpotlightOptions,
    Unary, Var,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum)]
pub enum DemoScene {
    /// Three spheres on a floor under a bright sky
    Spheres,
    /// A mirror ball inside a box of coloured lights
    MirrorBox,
    /// A glass ball in front of a striped light
    Glass,
    /// Smooth and hard unions side by side
    Blend,
    Tree,
    Mandelbulb,
    Sierpinski,
}

impl DemoScene {
    pub const ALL: [Self; 7] = [
        Self::Spheres,
        Self::MirrorBox,
        Self::Glass,
        Self::Blend,
        Self::Tree,
        Self::Mandelbulb,
        Self::Sierpinski,
    ];

    pub fn build(self) -> Scene {
        match self {
            Self::Spheres => spheres(),
            Self::MirrorBox => mirror_box(),
            Self::Glass => glass(),
            Self::Blend => blend(),
            Self::Tree => lit(subject(translate([0.0, 0.2, 0.0], tree(6))), 5.0),
            Self::Mandelbulb => {
                lit(subject(translate([0.0, 0.2, 0.0], mandelbulb(8.0, 8))), 3.0)
            }
            Self::Sierpinski => lit(subject(sierpinski(8, tetrahedron())), 3.0),
        }
    }

    /// Options the scene renders well with.
    pub fn options(self) -> KernelOptions {
        let defaults = KernelOptions::default();
        match self {
            // Both fields overestimate distance away from the surface.
            Self::Mandelbulb | Self::Sierpinski => KernelOptions {
                steps: 200,
                step_factor: 0.6,
                epsilon: 1e-4,
                ..defaults
            },
            Self::Tree => KernelOptions {
                steps: 150,
                step_factor: 0.8,
                ..defaults
            },
            Self::Glass => KernelOptions {
                bounces: 12,
                ..defaults
            },
            Self::Spheres | Self::MirrorBox | Self::Blend => defaults,
        }
    }
}

fn orbiting(radius: f32) -> Camera {
    orbit(OrbitOptions {
        radius: radius.into(),
        offset: Vec3::new(0.0, -0.3, 0.0).into(),
        ..OrbitOptions::default()
    })
}

fn floor() -> Shape {
    plane([0.0, 1.0, 0.0], 1.0)
}

fn spheres() -> Scene {
    Scene::builder()
        .entity(floor(), Material::new().with_color([0.7, 0.7, 0.7]))
        .entity(
            translate([-1.5, 0.0, 0.0], sphere(1.0)),
            Material::new().with_color([0.9, 0.3, 0.2]),
        )
        .entity(sphere(1.0), Material::new().with_smoothness(1.0))
        .entity(
            translate([1.5, -0.5, -1.0], sphere(0.5)),
            Material::new()
                .with_color(Vec3::ZERO)
                .with_emissivity([4.0, 3.5, 2.5]),
        )
        .camera(orbiting(6.0))
        .air(Material::new().with_color([0.6, 0.75, 1.0]))
        .build()
}

/// Six emissive walls of distinct colours around a mirror ball.
fn mirror_box() -> Scene {
    let walls = [
        (Vec3::X, Vec3::new(1.0, 0.2, 0.2)),
        (Vec3::NEG_X, Vec3::new(0.2, 1.0, 0.2)),
        (Vec3::Y, Vec3::new(1.0, 1.0, 1.0)),
        (Vec3::NEG_Y, Vec3::new(0.3, 0.3, 0.3)),
        (Vec3::Z, Vec3::new(0.2, 0.2, 1.0)),
        (Vec3::NEG_Z, Vec3::new(1.0, 1.0, 0.2)),
    ];
    let mut builder = Scene::builder();
    for (side, light) in walls {
        builder.push(
            plane(-side, 3.0),
            Material::new().with_color(Vec3::ZERO).with_emissivity(light),
        );
    }
    builder
        .entity(sphere(1.2), Material::new().with_smoothness(1.0))
        .camera(orbiting(2.5))
        .build()
}

/// Light stripes along x on a backdrop, seen through a glass ball.
fn glass() -> Scene {
    let stripes = Param::new(|cx| {
        let p = cx.var(Var::Position);
        let x = cx.component(p, Axis::X);
        let period = cx.splat(0.5);
        let cells = cx.mul(x, period);
        let phase = cx.unary(Unary::Fract, cells);
        let half = cx.splat(0.5);
        let on = cx.splat(2.0);
        let off = cx.splat(0.05);
        cx.select(phase, half, on, off)
    });
    Scene::builder()
        .entity(
            plane([0.0, 0.0, -1.0], 6.0),
            Material::new().with_color(Vec3::ZERO).with_emissivity(stripes),
        )
        .entity(
            translate([0.0, 0.5, 0.0], sphere(1.5)),
            Material::new()
                .with_transmittance(0.9)
                .with_smoothness(1.0)
                .with_refraction(1.4),
        )
        .entity(floor(), Material::new().with_color([0.5, 0.5, 0.5]))
        .camera(Camera::new([0.0, 0.5, -6.0], Vec3::ZERO))
        .air(Material::new().with_color([0.05, 0.05, 0.08]))
        .build()
}

fn blend() -> Scene {
    let pair = |x: f32| {
        (
            translate([x, 0.0, -0.45], sphere(0.6)),
            translate([x, 0.0, 0.45], sphere(0.6)),
        )
    };
    let (a, b) = pair(-1.2);
    let (c, d) = pair(1.2);
    lit(
        vec![
            (
                smooth_union(0.4, a, b),
                Material::new().with_color([0.3, 0.6, 0.9]),
            ),
            (union(c, d), Material::new().with_color([0.9, 0.6, 0.3])),
        ],
        5.0,
    )
}

fn subject(shape: Shape) -> Vec<(Shape, Material)> {
    vec![(shape, Material::new().with_color([0.85, 0.8, 0.75]))]
}

/// `subjects` on a floor under a spotlit dome.
fn lit(subjects: Vec<(Shape, Material)>, distance: f32) -> Scene {
    let mut builder = Scene::builder();
    for (shape, material) in subjects {
        builder.push(shape, material);
    }
    builder
        .entity(floor(), Material::new().with_color([0.5, 0.5, 0.5]))
        .entity(
            difference(sphere(40.0), sphere(30.0)),
            spotlight(SpotlightOptions {
                direction: Vec3::new(0.3, 1.0, -0.4).into(),
                color: Vec3::splat(3.0).into(),
                spread: 0.2.into(),
                ambient: Vec3::splat(0.2).into(),
            }),
        )
        .camera(orbiting(distance))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_clap() {
        for scene in DemoScene::ALL {
            let value = scene.to_possible_value().unwrap();
            assert_eq!(DemoScene::from_str(value.get_name(), false).unwrap(), scene);
        }
        assert_eq!(
            DemoScene::from_str("mirror-box", false).unwrap(),
            DemoScene::MirrorBox
        );
    }

    #[test]
    fn every_scene_has_entities_and_valid_options() {
        for scene in DemoScene::ALL {
            assert!(!scene.build().entities.is_empty(), "{scene:?}");
            assert!(scene.options().validate().is_ok(), "{scene:?}");
        }
    }
}
