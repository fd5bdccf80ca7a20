//! Per-pixel path tracing over a lowered [`Program`].
//!
//! Follows the generated `main` entry point step for step so CPU and GPU
//! renders of a scene converge to the same image.

use std::f32::consts::PI;

use codegen::{Closest, Environment, Frame, Interpreter, KernelOptions, Program};
use glam::{Vec2, Vec3, Vec4};
use sdf::MAX_VALUE;

use super::sampling::{reflect, refract, sample_hemisphere, sample_sphere, Pcg};
use crate::FrameUniforms;

/// Free path used for media that never scatter.
pub const UNBOUNDED: f32 = 3.0e38;

/// Outcome of marching one ray segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum March {
    Hit { closest: Closest, point: Vec3 },
    /// The sampled free path ended before any surface.
    Scattered,
    /// Step budget ran out.
    Escaped,
}

/// Orthonormal camera frame.
#[derive(Clone, Copy, Debug)]
struct Basis {
    look: Vec3,
    up: Vec3,
    right: Vec3,
}

pub struct PathTracer<'a> {
    interpreter: Interpreter<'a>,
    options: KernelOptions,
    uniforms: FrameUniforms,
    view: Frame,
    basis: Basis,
    resolution: Vec2,
}

impl<'a> PathTracer<'a> {
    pub fn new(program: &'a Program, uniforms: &FrameUniforms) -> Self {
        let environment = Environment {
            mouse: Vec2::from(uniforms.mouse),
            time: uniforms.time,
        };
        let mut interpreter = Interpreter::new(program, environment);
        let view = interpreter.frame();
        let look = (view.look_at - view.eye).normalize();
        let up = (view.up_hint - look.dot(view.up_hint) * look).normalize();
        let basis = Basis {
            look,
            up,
            right: look.cross(up),
        };
        Self {
            interpreter,
            options: program.options,
            uniforms: *uniforms,
            view,
            basis,
            resolution: Vec2::from(uniforms.resolution),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.view
    }

    /// Marches from `origin` along `direction` until a surface is closer than
    /// epsilon, the distance travelled reaches `scatter`, or the step budget
    /// runs out.
    pub fn march(&mut self, origin: Vec3, direction: Vec3, scatter: f32) -> March {
        let mut point = origin;
        let mut travelled = 0.0;
        for _ in 0..self.options.steps {
            let closest = self.interpreter.calculate_closest(point);
            if closest.distance < self.options.epsilon {
                return March::Hit { closest, point };
            }
            travelled += closest.distance * self.options.step_factor;
            point = origin + direction * travelled;
            if scatter > 0.0 && travelled >= scatter {
                return March::Scattered;
            }
        }
        March::Escaped
    }

    /// Primary ray through pixel `(x, y)`, with lens and sub-pixel jitter.
    #[allow(clippy::cast_precision_loss)]
    pub fn camera_ray(&self, x: u32, y: u32, rng: &mut Pcg) -> (Vec3, Vec3) {
        let Basis { look, up, right } = self.basis;
        let view = &self.view;
        let res = self.resolution;
        let aspect = res.x / res.y;
        let uv = Vec2::new(
            (x as f32 + 0.5) / res.x * 2.0 - 1.0,
            1.0 - (y as f32 + 0.5) / res.y * 2.0,
        );

        let lens = rng.next_vec2();
        let jitter = rng.next_vec2();
        let turn = lens.y * 2.0 * PI;
        let lens_offset = lens.x * view.aperture * Vec2::new(turn.cos(), turn.sin());
        let origin = view.eye + lens_offset.x * right + lens_offset.y * up;

        let angle = (uv * 0.5 + (jitter - 0.5) / res) * view.field_of_view * Vec2::new(aspect, 1.0);
        let screen = Vec3::new(
            angle.y.cos() * angle.x.sin(),
            angle.y.sin(),
            angle.y.cos() * angle.x.cos(),
        );
        let focus = view.eye
            + view.focal_factor
                * (view.look_at - view.eye).length()
                * (right * screen.x + up * screen.y + look * screen.z);
        (origin, (focus - origin).normalize())
    }

    /// Radiance carried back along one path.
    pub fn trace(&mut self, mut origin: Vec3, mut direction: Vec3, rng: &mut Pcg) -> Vec3 {
        let air = self.view.air;
        let epsilon = self.options.epsilon;
        let mut total = Vec3::ZERO;
        let mut throughput = Vec3::ONE;
        let mut current = air;

        for _ in 0..self.options.bounces {
            // A zero mean free path never scatters.
            let scatter = if current.scatter > 0.0 && current.scatter < MAX_VALUE {
                -(1.0 - rng.next_f32()).ln() * current.scatter
            } else {
                UNBOUNDED
            };

            let (closest, hit_point) = match self.march(origin, direction, scatter) {
                March::Hit { closest, point } => (closest, point),
                March::Scattered => {
                    origin += direction * scatter;
                    direction = sample_sphere(rng.next_vec2());
                    total += throughput * current.emissivity;
                    throughput *= current.color;
                    continue;
                }
                March::Escaped => {
                    total += throughput * air.color;
                    break;
                }
            };

            let mut normal = self.interpreter.calculate_normal(closest.id, hit_point);
            // Degenerate gradients end the path; NaN lands here too.
            let length_squared = normal.length_squared();
            if length_squared.is_nan() || length_squared <= 0.5 {
                break;
            }
            let backface = direction.dot(normal) > 0.0;
            if backface {
                normal = -normal;
            }
            let material = self
                .interpreter
                .calculate_material(closest.id, hit_point, normal, direction);
            total += throughput * material.emissivity;
            if material.color == Vec3::ZERO {
                break;
            }

            normal = sample_hemisphere(normal, material.smoothness, rng.next_vec2());
            if rng.next_f32() < material.transmittance {
                let eta = if backface {
                    material.refraction / air.refraction
                } else {
                    current.refraction / material.refraction
                };
                let refracted = refract(direction, normal, eta);
                if refracted != Vec3::ZERO {
                    origin = hit_point - 5.0 * epsilon * normal;
                    direction = refracted.normalize();
                    current = if backface { air } else { material };
                    continue;
                }
            }

            throughput *= material.color;
            origin = hit_point + 5.0 * epsilon * normal;
            direction = reflect(direction, normal);
        }
        total
    }

    /// Sum of this frame's samples at `(x, y)`. Negative or NaN totals count
    /// as zero.
    pub fn radiance(&mut self, x: u32, y: u32) -> Vec3 {
        let mut rng = Pcg::for_pixel(&self.uniforms, x, y);
        let mut total = Vec3::ZERO;
        for _ in 0..self.options.iterations {
            let (origin, direction) = self.camera_ray(x, y, &mut rng);
            total += self.trace(origin, direction, &mut rng);
        }
        if total.cmpge(Vec3::ZERO).all() {
            total
        } else {
            Vec3::ZERO
        }
    }

    /// Next accumulation value for a pixel whose history is `history`.
    #[allow(clippy::cast_precision_loss)]
    pub fn accumulate(&mut self, x: u32, y: u32, history: Vec4) -> Vec4 {
        let radiance = self.radiance(x, y);
        let history = if self.uniforms.clicked == 0 {
            history
        } else {
            history * 0.5
        };
        history * self.options.memory + radiance.extend(self.options.iterations as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegen::lower;
    use sdf::shape::sphere;
    use sdf::{Camera, Material, Scene};

    fn program(scene: &Scene) -> Program {
        lower(scene, &KernelOptions::default()).unwrap()
    }

    #[test]
    fn center_ray_points_at_target() {
        let scene = Scene::builder()
            .camera(Camera::new([0.0, 0.0, -4.0], [0.0, 0.0, 0.0]))
            .build();
        let program = program(&scene);
        let uniforms = FrameUniforms::new(65, 65);
        let tracer = PathTracer::new(&program, &uniforms);
        let mut rng = Pcg::new(1);
        let (origin, direction) = tracer.camera_ray(32, 32, &mut rng);
        assert_eq!(origin, Vec3::new(0.0, 0.0, -4.0));
        assert!((direction - Vec3::Z).length() < 0.05);
    }

    #[test]
    fn top_row_looks_up() {
        let scene = Scene::builder()
            .camera(Camera::new([0.0, 0.0, -4.0], [0.0, 0.0, 0.0]))
            .build();
        let program = program(&scene);
        let uniforms = FrameUniforms::new(4, 4);
        let tracer = PathTracer::new(&program, &uniforms);
        let mut rng = Pcg::new(1);
        let (_, top) = tracer.camera_ray(1, 0, &mut rng);
        let (_, bottom) = tracer.camera_ray(1, 3, &mut rng);
        assert!(top.y > 0.0);
        assert!(bottom.y < 0.0);
    }

    #[test]
    fn march_hits_sphere_straight_ahead() {
        let scene = Scene::builder().entity(sphere(1.0), Material::new()).build();
        let program = program(&scene);
        let mut tracer = PathTracer::new(&program, &FrameUniforms::new(1, 1));
        match tracer.march(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, UNBOUNDED) {
            March::Hit { closest, point } => {
                assert_eq!(closest.id, 1);
                assert!((point.z + 1.0).abs() < 1e-3);
            }
            other => panic!("expected a hit, got {other:?}"),
        }
        assert_eq!(
            tracer.march(Vec3::new(0.0, 0.0, -5.0), -Vec3::Z, UNBOUNDED),
            March::Escaped
        );
        assert_eq!(
            tracer.march(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, 2.0),
            March::Scattered
        );
    }
}
