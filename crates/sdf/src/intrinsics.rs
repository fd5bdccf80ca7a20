//! Host implementations of the loop intrinsics. Code generators emit the same
//! algorithms, so CPU and GPU renders of a scene agree.

use glam::Vec3;

/// Bail-out radius for the mandelbulb iteration.
pub const MANDELBULB_BAILOUT: f32 = 2.0;

const FOLD_SCALE: f32 = 0.5;

/// Mirror normals of the tetrahedral fold.
pub fn sierpinski_normals() -> [Vec3; 3] {
    let s = std::f32::consts::FRAC_1_SQRT_2;
    [
        Vec3::new(s, s, 0.0),
        Vec3::new(0.0, s, s),
        Vec3::new(s, 0.0, s),
    ]
}

/// Offset applied after scaling in every fold round.
pub fn sierpinski_offset() -> Vec3 {
    Vec3::splat(0.5 * 3.0_f32.sqrt())
}

/// Distance scale accumulated by `iterations` fold rounds.
#[allow(clippy::cast_possible_wrap)]
pub fn sierpinski_scale(iterations: u32) -> f32 {
    FOLD_SCALE.powi(iterations.min(i32::MAX as u32) as i32)
}

/// Reflects `p` onto the positive side of the plane through the origin with
/// normal `n`.
pub fn mirror(p: Vec3, n: Vec3) -> Vec3 {
    p - 2.0 * p.dot(n).min(0.0) * n
}

pub fn sierpinski_fold(mut p: Vec3, iterations: u32) -> Vec3 {
    let [n1, n2, n3] = sierpinski_normals();
    let offset = sierpinski_offset();
    for _ in 0..iterations {
        p = mirror(p, n1);
        p = mirror(p, n2);
        p = mirror(p, n3);
        p = p / FOLD_SCALE - offset;
    }
    p
}

/// Rodrigues rotation of `p` by `angle` radians about `axis`.
pub fn rotate_axis(p: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    let k = axis.normalize();
    let (s, c) = angle.sin_cos();
    p * c + k.cross(p) * s + k * k.dot(p) * (1.0 - c)
}

/// Cheap hash of a position into `[0, 1)`.
pub fn hash_noise(seed: Vec3) -> f32 {
    let d = (seed + 1000.0).dot(Vec3::new(12.9898, 78.233, 26.724));
    let v = d.sin() * 43758.5453;
    (v - v.floor()).min(1.0 - f32::EPSILON)
}

/// Distance estimate for the power-`power` mandelbulb.
pub fn mandelbulb(p: Vec3, power: f32, iterations: u32) -> f32 {
    let mut z = p;
    let mut dr = 1.0_f32;
    let mut r = 0.0_f32;
    for _ in 0..iterations {
        r = z.length();
        if r > MANDELBULB_BAILOUT {
            break;
        }
        let safe = r.max(1e-6);
        let theta = (z.z / safe).clamp(-1.0, 1.0).acos() * power;
        let phi = z.y.atan2(z.x) * power;
        dr = safe.powf(power - 1.0) * power * dr + 1.0;
        let zr = safe.powf(power);
        z = zr * Vec3::new(theta.sin() * phi.cos(), phi.sin() * theta.sin(), theta.cos()) + p;
    }
    0.5 * r.max(1e-6).ln() * r / dr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_quarter_turn_about_z() {
        let r = rotate_axis(Vec3::X, Vec3::Z, std::f32::consts::FRAC_PI_2);
        assert!((r - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn mirror_keeps_positive_side() {
        let n = Vec3::Y;
        assert_eq!(mirror(Vec3::new(1.0, 2.0, 3.0), n), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mirror(Vec3::new(1.0, -2.0, 3.0), n), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn noise_stays_in_unit_interval() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..1000 {
            let p = Vec3::new(rng.f32(), rng.f32(), rng.f32()) * 200.0 - 100.0;
            let v = hash_noise(p);
            assert!((0.0..1.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn mandelbulb_is_positive_far_away() {
        assert!(mandelbulb(Vec3::new(3.0, 0.0, 0.0), 8.0, 8) > 0.5);
    }
}
