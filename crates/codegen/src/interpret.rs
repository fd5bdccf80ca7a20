//! Host evaluation of the generated procedures.
//!
//! Mirrors what the emitted kernel computes: per-entity distance, normal and
//! material procedures, and the three dispatch procedures over them.

use glam::{Vec2, Vec3};
use sdf::{Bindings, Evaluator, Expr, MAX_VALUE};

use crate::program::{EntityProgram, Program};

/// Uniform inputs shared by every procedure in a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Environment {
    pub mouse: Vec2,
    pub time: f32,
}

/// Result of `calculate_closest`. `id` is zero when nothing is in range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Closest {
    pub id: u32,
    pub distance: f32,
}

impl Closest {
    pub const NONE: Self = Self {
        id: 0,
        distance: MAX_VALUE,
    };
}

/// A material evaluated at one point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceMaterial {
    pub transmittance: f32,
    pub smoothness: f32,
    pub refraction: f32,
    pub scatter: f32,
    pub color: Vec3,
    pub emissivity: Vec3,
}

impl SurfaceMaterial {
    /// Returned for ids with no entity: black, never emits, never transmits.
    pub const ABSORBER: Self = Self {
        transmittance: 0.0,
        smoothness: 1.0,
        refraction: 1.0,
        scatter: MAX_VALUE,
        color: Vec3::ZERO,
        emissivity: Vec3::ZERO,
    };
}

/// Camera and air for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub eye: Vec3,
    pub look_at: Vec3,
    pub up_hint: Vec3,
    pub field_of_view: f32,
    pub aperture: f32,
    pub focal_factor: f32,
    pub air: SurfaceMaterial,
}

/// Evaluates a [`Program`]. Each worker thread should own one.
pub struct Interpreter<'a> {
    program: &'a Program,
    evaluator: Evaluator<'a>,
    environment: Environment,
}

impl<'a> Interpreter<'a> {
    pub fn new(program: &'a Program, environment: Environment) -> Self {
        Self {
            program,
            evaluator: Evaluator::new(&program.nodes),
            environment,
        }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    fn bindings(&self, position: Vec3, normal: Vec3, direction: Vec3) -> Bindings {
        Bindings {
            position,
            normal,
            direction,
            mouse: self.environment.mouse,
            time: self.environment.time,
        }
    }

    /// Signed distance from `p` to one entity.
    pub fn distance(&mut self, entity: &EntityProgram, p: Vec3) -> f32 {
        let bindings = self.bindings(p, Vec3::ZERO, Vec3::ZERO);
        self.evaluator
            .evaluate(&entity.distance.order, entity.distance.root, &bindings)
            .x
    }

    /// Entity with the smallest absolute distance. Ties keep the lower id.
    pub fn calculate_closest(&mut self, p: Vec3) -> Closest {
        let program = self.program;
        let mut closest = Closest::NONE;
        for entity in &program.entities {
            let d = self.distance(entity, p).abs();
            if d < closest.distance {
                closest = Closest {
                    id: entity.id.get(),
                    distance: d,
                };
            }
        }
        closest
    }

    /// Unit gradient of entity `id` at `p`, zero for unknown ids.
    pub fn calculate_normal(&mut self, id: u32, p: Vec3) -> Vec3 {
        let program = self.program;
        let Some(entity) = program.entity(id) else {
            return Vec3::ZERO;
        };
        let h = program.options.normal_epsilon;
        if program.options.cheap_normals {
            let taps = [
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::ONE,
            ];
            let mut gradient = Vec3::ZERO;
            for k in taps {
                gradient += k * self.distance(entity, p + k * h);
            }
            gradient.normalize()
        } else {
            let mut gradient = Vec3::ZERO;
            for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
                let e = axis * h;
                let slope = self.distance(entity, p + e) - self.distance(entity, p - e);
                gradient += axis * slope;
            }
            gradient.normalize()
        }
    }

    pub fn calculate_material(&mut self, id: u32, p: Vec3, n: Vec3, d: Vec3) -> SurfaceMaterial {
        let program = self.program;
        let Some(entity) = program.entity(id) else {
            return SurfaceMaterial::ABSORBER;
        };
        let bindings = self.bindings(p, n, d);
        self.evaluator.run(&entity.material.order, &bindings);
        self.read_material(&entity.material.fields)
    }

    /// Camera parameters and the air material.
    pub fn frame(&mut self) -> Frame {
        let program = self.program;
        let bindings = self.bindings(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);
        self.evaluator.run(&program.frame.order, &bindings);
        let [eye, look_at, up_hint, fov, aperture, focal] =
            program.frame.camera.map(|e| self.evaluator.get(e));
        Frame {
            eye,
            look_at,
            up_hint,
            field_of_view: fov.x,
            aperture: aperture.x,
            focal_factor: focal.x,
            air: self.read_material(&program.frame.air),
        }
    }

    fn read_material(&self, fields: &[Expr; 6]) -> SurfaceMaterial {
        let [transmittance, smoothness, refraction, scatter, color, emissivity] =
            fields.map(|e| self.evaluator.get(e));
        SurfaceMaterial {
            transmittance: transmittance.x,
            smoothness: smoothness.x,
            refraction: refraction.x,
            scatter: scatter.x,
            color,
            emissivity,
        }
    }
}
