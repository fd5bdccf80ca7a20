//! Random numbers and direction sampling, matching the kernel's helpers bit
//! for bit where integer arithmetic is involved.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::FrameUniforms;

/// PCG hash generator. The state advances by hashing itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pcg {
    state: u32,
}

impl Pcg {
    pub fn hash(v: u32) -> u32 {
        let state = v.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
        let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
        (word >> 22) ^ word
    }

    pub fn new(state: u32) -> Self {
        Self { state }
    }

    /// Seed for pixel `(x, y)` of the frame described by `uniforms`.
    pub fn for_pixel(uniforms: &FrameUniforms, x: u32, y: u32) -> Self {
        let salt = Self::hash(uniforms.seed ^ uniforms.time.to_bits());
        let frame = Self::hash(uniforms.frame.wrapping_add(salt));
        let row = Self::hash(y.wrapping_add(frame));
        Self::new(Self::hash(x.wrapping_add(row)))
    }

    /// Uniform in `[0, 1)` with 24 bits of precision.
    #[allow(clippy::cast_precision_loss)]
    pub fn next_f32(&mut self) -> f32 {
        self.state = Self::hash(self.state);
        (self.state >> 8) as f32 / 16_777_216.0
    }

    pub fn next_vec2(&mut self) -> Vec2 {
        let a = self.next_f32();
        let b = self.next_f32();
        Vec2::new(a, b)
    }
}

fn ortho(v: Vec3) -> Vec3 {
    if v.x.abs() > v.z.abs() {
        Vec3::new(-v.y, v.x, 0.0)
    } else {
        Vec3::new(0.0, -v.z, v.y)
    }
}

/// Cosine-power lobe around `normal`. Smoothness `0` is Lambertian, `1`
/// returns `normal` itself.
pub fn sample_hemisphere(normal: Vec3, smoothness: f32, noise: Vec2) -> Vec3 {
    let s = smoothness.clamp(0.0, 1.0);
    let o1 = ortho(normal).normalize();
    let o2 = normal.cross(o1).normalize();
    let phi = noise.x * 2.0 * PI;
    let cos_theta = (s + (1.0 - s) * noise.y).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    sin_theta * (phi.cos() * o1 + phi.sin() * o2) + cos_theta * normal
}

/// Uniform direction on the unit sphere.
pub fn sample_sphere(noise: Vec2) -> Vec3 {
    let phi = noise.x * 2.0 * PI;
    let z = noise.y * 2.0 - 1.0;
    let q = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(q * phi.cos(), q * phi.sin(), z)
}

pub fn reflect(incident: Vec3, normal: Vec3) -> Vec3 {
    incident - 2.0 * normal.dot(incident) * normal
}

/// Snell refraction with index ratio `eta`. Zero on total internal
/// reflection.
pub fn refract(incident: Vec3, normal: Vec3, eta: f32) -> Vec3 {
    let cos = normal.dot(incident);
    let k = 1.0 - eta * eta * (1.0 - cos * cos);
    if k < 0.0 {
        Vec3::ZERO
    } else {
        eta * incident - (eta * cos + k.sqrt()) * normal
    }
}
