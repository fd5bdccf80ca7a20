//! Signed distance functions and the combinators that compose them.
//!
//! A [`Shape`] builds the distance expression for a symbolic position. The
//! distance is read from the `x` lane of the returned expression.

use std::f32::consts::{FRAC_1_SQRT_2, PI};
use std::fmt;
use std::rc::Rc;

use glam::Vec3;

use crate::eval::{Bindings, Evaluator};
use crate::expr::{Axis, Context, Expr, Op, Param, Var};
use crate::intrinsics;
use crate::{ExprError, MAX_VALUE};

/// Deepest `tree` that will be unrolled. Each level doubles the node count.
pub const MAX_TREE_DEPTH: u32 = 8;

type ShapeFn = dyn Fn(&mut Context, Expr) -> Expr;

/// A distance function, built on demand at a given position expression.
#[derive(Clone)]
pub struct Shape(Rc<ShapeFn>);

impl Shape {
    pub fn new(call: impl Fn(&mut Context, Expr) -> Expr + 'static) -> Self {
        Self(Rc::new(call))
    }

    /// Builds the distance expression at `position`.
    pub fn call(&self, cx: &mut Context, position: Expr) -> Expr {
        (self.0)(cx, position)
    }

    /// Evaluates the distance at a concrete point on the host.
    pub fn distance_at(&self, point: Vec3) -> Result<f32, ExprError> {
        let mut cx = Context::new();
        let p = cx.var(Var::Position);
        let d = self.call(&mut cx, p);
        let order = cx.flatten(&[d])?;
        let mut ev = Evaluator::new(cx.nodes());
        Ok(ev.evaluate(&order, d, &Bindings::at(point)).x)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Shape(..)")
    }
}

/// Empty space.
pub fn zero() -> Shape {
    Shape::new(|cx, _| cx.splat(MAX_VALUE))
}

/// Solid everywhere.
pub fn unit() -> Shape {
    Shape::new(|cx, _| cx.splat(-MAX_VALUE))
}

pub fn sphere(radius: impl Into<Param>) -> Shape {
    let radius = radius.into();
    Shape::new(move |cx, p| {
        let l = cx.length(p);
        let r = radius.build(cx);
        cx.sub(l, r)
    })
}

/// Half-space `dot(p, normal) + offset <= 0`.
pub fn plane(normal: impl Into<Param>, offset: impl Into<Param>) -> Shape {
    let normal = normal.into();
    let offset = offset.into();
    Shape::new(move |cx, p| {
        let n = normal.build(cx);
        let d = cx.dot(p, n);
        let o = offset.build(cx);
        cx.add(d, o)
    })
}

/// Axis-aligned box with the given half extents. Negative inside.
pub fn cuboid(half_extents: impl Into<Param>) -> Shape {
    let half_extents = half_extents.into();
    Shape::new(move |cx, p| {
        let h = half_extents.build(cx);
        let a = cx.abs(p);
        let d = cx.sub(a, h);
        let zero = cx.splat(0.0);
        let positive = cx.max(d, zero);
        let outside = cx.length(positive);
        let largest = cx.max_component(d);
        let inside = cx.min(largest, zero);
        cx.add(inside, outside)
    })
}

/// Infinite cylinder along the y axis.
pub fn cylinder(radius: impl Into<Param>) -> Shape {
    let radius = radius.into();
    Shape::new(move |cx, p| {
        let xz = planar(cx, p, Axis::X, Axis::Z);
        let l = cx.length(xz);
        let r = radius.build(cx);
        cx.sub(l, r)
    })
}

/// Torus in the xz plane.
pub fn torus(major: impl Into<Param>, minor: impl Into<Param>) -> Shape {
    let major = major.into();
    let minor = minor.into();
    Shape::new(move |cx, p| {
        let xz = planar(cx, p, Axis::X, Axis::Z);
        let l = cx.length(xz);
        let big = major.build(cx);
        let ring = cx.sub(l, big);
        let y = cx.component(p, Axis::Y);
        let zero = cx.splat(0.0);
        let q = cx.compose(ring, y, zero);
        let lq = cx.length(q);
        let small = minor.build(cx);
        cx.sub(lq, small)
    })
}

/// `(p.a, p.b, 0)`.
fn planar(cx: &mut Context, p: Expr, a: Axis, b: Axis) -> Expr {
    let u = cx.component(p, a);
    let v = cx.component(p, b);
    let zero = cx.splat(0.0);
    cx.compose(u, v, zero)
}

fn polyhedron(normals: Vec<Vec3>) -> Shape {
    normals
        .into_iter()
        .fold(unit(), |s, n| intersection(s, plane(n, -0.5)))
}

/// Tetrahedron with circumscribed diameter 1.
pub fn tetrahedron() -> Shape {
    let l = 1.0 / 3.0_f32.sqrt();
    polyhedron(vec![
        Vec3::new(-l, -l, -l),
        Vec3::new(-l, l, l),
        Vec3::new(l, -l, l),
        Vec3::new(l, l, -l),
    ])
}

/// Cube of width 1.
pub fn cube() -> Shape {
    polyhedron(vec![
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::Z,
        Vec3::NEG_Z,
    ])
}

/// Octahedron with circumscribed diameter 1.
pub fn octahedron() -> Shape {
    let l = 1.0 / 3.0_f32.sqrt();
    let mut normals = Vec::with_capacity(8);
    for x in [l, -l] {
        for y in [l, -l] {
            for z in [l, -l] {
                normals.push(Vec3::new(x, y, z));
            }
        }
    }
    polyhedron(normals)
}

/// Dodecahedron with circumscribed diameter 1.
pub fn dodecahedron() -> Shape {
    let phi = 0.5 * (1.0 + 5.0_f32.sqrt());
    let l = (phi * phi + 1.0).sqrt();
    let (a, b) = (phi / l, 1.0 / l);
    polyhedron(vec![
        Vec3::new(a, b, 0.0),
        Vec3::new(a, -b, 0.0),
        Vec3::new(0.0, a, b),
        Vec3::new(0.0, a, -b),
        Vec3::new(b, 0.0, a),
        Vec3::new(-b, 0.0, a),
        Vec3::new(-a, b, 0.0),
        Vec3::new(-a, -b, 0.0),
        Vec3::new(0.0, -a, b),
        Vec3::new(0.0, -a, -b),
        Vec3::new(b, 0.0, -a),
        Vec3::new(-b, 0.0, -a),
    ])
}

/// Sphere whose radius is a function of the sample position.
pub fn spheroid(radius: impl Fn(&mut Context, Expr) -> Expr + 'static) -> Shape {
    Shape::new(move |cx, p| {
        let l = cx.length(p);
        let r = radius(cx, p);
        cx.sub(l, r)
    })
}

/// Box of the given full `dimensions` with edges rounded by `radius`.
pub fn smooth_box(dimensions: impl Into<Param>, radius: impl Into<Param>) -> Shape {
    let dimensions = dimensions.into();
    let radius = radius.into();
    let r = radius.clone();
    let corner = Param::new(move |cx| {
        let d = dimensions.build(cx);
        let r = r.build(cx);
        let inset = cx.sub(d, r);
        let half = cx.splat(0.5);
        cx.mul(half, inset)
    });
    mirror(
        Vec3::X,
        mirror(
            Vec3::Y,
            mirror(
                Vec3::Z,
                translate(corner, clamp_positive(scale(radius, sphere(0.5)))),
            ),
        ),
    )
}

pub fn mandelbulb(power: impl Into<Param>, iterations: u32) -> Shape {
    let power = power.into();
    Shape::new(move |cx, p| {
        let power = power.build(cx);
        cx.intern(Op::Mandelbulb {
            point: p,
            power,
            iterations,
        })
    })
}

/// Sierpinski fractal: `iterations` tetrahedral folds applied before `base`.
pub fn sierpinski(iterations: u32, base: Shape) -> Shape {
    let factor = intrinsics::sierpinski_scale(iterations);
    Shape::new(move |cx, p| {
        let folded = cx.intern(Op::SierpinskiFold {
            point: p,
            iterations,
        });
        let d = base.call(cx, folded);
        let s = cx.splat(factor);
        cx.mul(d, s)
    })
}

/// Recursive branching tree. Levels beyond [`MAX_TREE_DEPTH`] are dropped.
pub fn tree(iterations: u32) -> Shape {
    tree_with(iterations, rounded_bar())
}

/// [`tree`] grown from `leaf` instead of a rounded box. `leaf` should span
/// the same trunk segment, a bar of half-height 1.2 centred on the origin.
pub fn tree_with(iterations: u32, leaf: Shape) -> Shape {
    let depth = if iterations > MAX_TREE_DEPTH {
        tracing::warn!(iterations, max = MAX_TREE_DEPTH, "tree depth clamped");
        MAX_TREE_DEPTH
    } else {
        iterations
    };
    tree_level(depth, &leaf)
}

const TREE_LENGTH: f32 = 1.2;
const TREE_WIDTH: f32 = 0.1;

fn rounded_bar() -> Shape {
    smooth_box([TREE_WIDTH, TREE_LENGTH, TREE_WIDTH], TREE_WIDTH)
}

#[allow(clippy::cast_possible_wrap)]
fn tree_level(level: u32, leaf: &Shape) -> Shape {
    const FACTOR: f32 = 0.58;
    const SMOOTHING: f32 = 0.15;
    let angle = 50.0_f32.to_radians();

    if level <= 1 {
        return leaf.clone();
    }
    let trunk = tree_level(level - 1, leaf);
    let offset = Vec3::new(
        TREE_LENGTH * FACTOR / 2.0 * angle.sin(),
        TREE_WIDTH + TREE_LENGTH / 2.0 * (1.0 + FACTOR / 2.0 * angle.cos()),
        0.0,
    );
    let branch = mirror(
        Vec3::new(FRAC_1_SQRT_2, 0.0, FRAC_1_SQRT_2),
        mirror(
            Vec3::new(FRAC_1_SQRT_2, 0.0, -FRAC_1_SQRT_2),
            translate(
                offset,
                scale(FACTOR, rotate_y(-0.1, rotate_z(-angle, trunk.clone()))),
            ),
        ),
    );
    smooth_union(SMOOTHING * FACTOR.powi(level as i32), trunk, branch)
}

pub fn translate(offset: impl Into<Param>, a: Shape) -> Shape {
    let offset = offset.into();
    Shape::new(move |cx, p| {
        let o = offset.build(cx);
        let q = cx.sub(p, o);
        a.call(cx, q)
    })
}

/// Uniform scale by the `x` lane of `factor`.
pub fn scale(factor: impl Into<Param>, a: Shape) -> Shape {
    let factor = factor.into();
    Shape::new(move |cx, p| {
        let f = factor.build(cx);
        let s = cx.component(f, Axis::X);
        let q = cx.div(p, s);
        let d = a.call(cx, q);
        cx.mul(d, s)
    })
}

/// Non-uniform scale. The distance is corrected by the smallest factor so it
/// stays a lower bound.
pub fn stretch(factor: impl Into<Param>, a: Shape) -> Shape {
    let factor = factor.into();
    Shape::new(move |cx, p| {
        let f = factor.build(cx);
        let q = cx.div(p, f);
        let d = a.call(cx, q);
        let m = cx.min_component(f);
        cx.mul(d, m)
    })
}

/// Infinite repetition with cell size `period`, cells centred on multiples of
/// the period.
pub fn repeat(period: impl Into<Param>, a: Shape) -> Shape {
    let period = period.into();
    Shape::new(move |cx, p| {
        let x = period.build(cx);
        let half_factor = cx.splat(0.5);
        let half = cx.mul(x, half_factor);
        let shifted = cx.sub(p, half);
        let wrapped = cx.modulo(shifted, x);
        let q = cx.sub(wrapped, half);
        a.call(cx, q)
    })
}

/// Repetition where the cell index selects the shape built for that cell.
/// A `buffer`-padded cell boundary keeps the march from skipping cells.
pub fn modulate(
    period: impl Into<Param>,
    buffer: impl Into<Param>,
    cell: impl Fn(&mut Context, Expr) -> Shape + 'static,
) -> Shape {
    let period = period.into();
    let buffer = buffer.into();
    Shape::new(move |cx, p| {
        let x = period.build(cx);
        let half_factor = cx.splat(0.5);
        let half = cx.mul(x, half_factor);
        let shifted = cx.add(p, half);
        let scaled = cx.div(shifted, x);
        let index = cx.floor(scaled);
        let center = cx.mul(index, x);
        let local = cx.sub(p, center);

        let pad = buffer.build(cx);
        let extent = cx.add(pad, half);
        let a = cx.abs(local);
        let room = cx.sub(extent, a);
        let mask = cx.min_component(room);

        let inner = cell(cx, index).call(cx, local);
        cx.min(mask, inner)
    })
}

/// Picks `shapes[i]` where `i / len <= selector.x < (i + 1) / len`.
#[allow(clippy::cast_precision_loss)]
pub fn choose(selector: impl Into<Param>, shapes: Vec<Shape>) -> Shape {
    let selector = selector.into();
    Shape::new(move |cx, p| {
        let x = selector.build(cx);
        let count = shapes.len() as f32;
        let mut result = cx.splat(0.0);
        for (i, shape) in shapes.iter().enumerate().rev() {
            let d = shape.call(cx, p);
            let bound = cx.splat((i + 1) as f32 / count);
            result = cx.select(x, bound, d, result);
        }
        result
    })
}

/// Random tiling of quarter-torus cells.
pub fn truchet() -> Shape {
    let ring = || torus(0.5, 0.1);
    let base = intersection(
        cube(),
        union(
            union(
                translate([0.5, 0.0, 0.5], ring()),
                translate([-0.5, 0.5, 0.0], rotate_x(PI / 2.0, ring())),
            ),
            translate([0.0, -0.5, -0.5], rotate_z(PI / 2.0, ring())),
        ),
    );
    modulate(1.0, 0.01, move |cx, index| {
        let selector = cx.random(index);
        let seed = Param::new(move |_| selector);
        choose(
            seed,
            vec![
                base.clone(),
                rotate_x(PI / 2.0, base.clone()),
                rotate_x(PI, base.clone()),
                rotate_x(3.0 * PI / 2.0, base.clone()),
            ],
        )
    })
}

pub fn union(a: Shape, b: Shape) -> Shape {
    Shape::new(move |cx, p| {
        let da = a.call(cx, p);
        let db = b.call(cx, p);
        cx.min(da, db)
    })
}

pub fn intersection(a: Shape, b: Shape) -> Shape {
    Shape::new(move |cx, p| {
        let da = a.call(cx, p);
        let db = b.call(cx, p);
        cx.max(da, db)
    })
}

/// `a` with `b` carved out.
pub fn difference(a: Shape, b: Shape) -> Shape {
    Shape::new(move |cx, p| {
        let da = a.call(cx, p);
        let db = b.call(cx, p);
        let nb = cx.neg(db);
        cx.max(da, nb)
    })
}

fn smooth_min(cx: &mut Context, k: Expr, a: Expr, b: Expr) -> Expr {
    let half = cx.splat(0.5);
    let zero = cx.splat(0.0);
    let one = cx.splat(1.0);
    let delta = cx.sub(b, a);
    let ratio = cx.div(delta, k);
    let scaled = cx.mul(half, ratio);
    let biased = cx.add(half, scaled);
    let h = cx.clamp(biased, zero, one);
    let blend = cx.mix(b, a, h);
    let rest = cx.sub(one, h);
    let kh = cx.mul(k, h);
    let bump = cx.mul(kh, rest);
    cx.sub(blend, bump)
}

fn smooth_max(cx: &mut Context, k: Expr, a: Expr, b: Expr) -> Expr {
    let half = cx.splat(0.5);
    let zero = cx.splat(0.0);
    let one = cx.splat(1.0);
    let delta = cx.sub(b, a);
    let ratio = cx.div(delta, k);
    let scaled = cx.mul(half, ratio);
    let biased = cx.sub(half, scaled);
    let h = cx.clamp(biased, zero, one);
    let blend = cx.mix(b, a, h);
    let rest = cx.sub(one, h);
    let kh = cx.mul(k, h);
    let bump = cx.mul(kh, rest);
    cx.add(blend, bump)
}

/// Union with a blend region of size `k`.
pub fn smooth_union(k: impl Into<Param>, a: Shape, b: Shape) -> Shape {
    let k = k.into();
    Shape::new(move |cx, p| {
        let k = k.build(cx);
        let da = a.call(cx, p);
        let db = b.call(cx, p);
        smooth_min(cx, k, da, db)
    })
}

pub fn smooth_intersection(k: impl Into<Param>, a: Shape, b: Shape) -> Shape {
    let k = k.into();
    Shape::new(move |cx, p| {
        let k = k.build(cx);
        let da = a.call(cx, p);
        let db = b.call(cx, p);
        smooth_max(cx, k, da, db)
    })
}

pub fn smooth_difference(k: impl Into<Param>, a: Shape, b: Shape) -> Shape {
    let k = k.into();
    Shape::new(move |cx, p| {
        let k = k.build(cx);
        let da = a.call(cx, p);
        let db = b.call(cx, p);
        let nb = cx.neg(db);
        smooth_max(cx, k, da, nb)
    })
}

/// Grows the surface outward by the `x` lane of `amount`.
pub fn expand(amount: impl Into<Param>, a: Shape) -> Shape {
    let amount = amount.into();
    Shape::new(move |cx, p| {
        let d = a.call(cx, p);
        let k = amount.build(cx);
        let kx = cx.component(k, Axis::X);
        cx.sub(d, kx)
    })
}

/// Evaluates `a` with every coordinate clamped to be non-negative.
pub fn clamp_positive(a: Shape) -> Shape {
    Shape::new(move |cx, p| {
        let zero = cx.splat(0.0);
        let q = cx.max(p, zero);
        a.call(cx, q)
    })
}

/// Displaces `a` by a position-dependent offset.
pub fn offset(displacement: impl Fn(&mut Context, Expr) -> Expr + 'static, a: Shape) -> Shape {
    Shape::new(move |cx, p| {
        let o = displacement(cx, p);
        let q = cx.sub(p, o);
        a.call(cx, q)
    })
}

/// Folds the negative side of the plane with `normal` onto the positive side.
pub fn mirror(normal: impl Into<Param>, a: Shape) -> Shape {
    let normal = normal.into();
    Shape::new(move |cx, p| {
        let n = normal.build(cx);
        let zero = cx.splat(0.0);
        let two = cx.splat(2.0);
        let along = cx.dot(p, n);
        let behind = cx.min(zero, along);
        let twice = cx.mul(two, behind);
        let shift = cx.mul(twice, n);
        let q = cx.sub(p, shift);
        a.call(cx, q)
    })
}

type AngleFn = Rc<dyn Fn(&mut Context, Expr) -> Expr>;

fn rotate_with(axis: Param, angle: AngleFn, a: Shape) -> Shape {
    Shape::new(move |cx, p| {
        let k = axis.build(cx);
        let theta = angle(cx, p);
        let back = cx.neg(theta);
        let q = cx.rotate(p, k, back);
        a.call(cx, q)
    })
}

/// Rotates `a` by the `x` lane of `angle` radians about `axis`, right handed:
/// with the axis pointing at the viewer, positive angles turn the shape
/// counter-clockwise. The child is evaluated at the position rotated by
/// `-angle`.
pub fn rotate(axis: impl Into<Param>, angle: impl Into<Param>, a: Shape) -> Shape {
    let angle = angle.into();
    rotate_with(axis.into(), Rc::new(move |cx, _| angle.build(cx)), a)
}

/// [`rotate`] about +x. A quarter turn carries +y onto +z.
pub fn rotate_x(angle: impl Into<Param>, a: Shape) -> Shape {
    rotate(Vec3::X, angle, a)
}

/// [`rotate`] about +y. A quarter turn carries +z onto +x.
pub fn rotate_y(angle: impl Into<Param>, a: Shape) -> Shape {
    rotate(Vec3::Y, angle, a)
}

/// [`rotate`] about +z. A quarter turn carries +x onto +y.
pub fn rotate_z(angle: impl Into<Param>, a: Shape) -> Shape {
    rotate(Vec3::Z, angle, a)
}

fn twist(axis: Axis, rate: Param, a: Shape) -> Shape {
    let angle: AngleFn = Rc::new(move |cx, p| {
        let along = cx.component(p, axis);
        let r = rate.build(cx);
        cx.mul(along, r)
    });
    rotate_with(axis.unit().into(), angle, a)
}

/// Rotates each slice perpendicular to x by `rate * p.x` radians, with the
/// same handedness as [`rotate_x`].
pub fn twist_x(rate: impl Into<Param>, a: Shape) -> Shape {
    twist(Axis::X, rate.into(), a)
}

/// Slices perpendicular to y turn by `rate * p.y` radians, as [`rotate_y`].
pub fn twist_y(rate: impl Into<Param>, a: Shape) -> Shape {
    twist(Axis::Y, rate.into(), a)
}

/// Slices perpendicular to z turn by `rate * p.z` radians, as [`rotate_z`].
pub fn twist_z(rate: impl Into<Param>, a: Shape) -> Shape {
    twist(Axis::Z, rate.into(), a)
}

/// Bends the y axis of `a` around the x axis, turning a linear repetition
/// along y into a radial one.
pub fn wrap_x(a: Shape) -> Shape {
    Shape::new(move |cx, p| {
        let yz = planar(cx, p, Axis::Y, Axis::Z);
        let c = cx.length(yz);
        let tiny = cx.splat(1e-6);
        let safe = cx.max(c, tiny);
        let y = cx.component(p, Axis::Y);
        let ratio = cx.div(y, safe);
        let lo = cx.splat(-1.0);
        let hi = cx.splat(1.0);
        let clamped = cx.clamp(ratio, lo, hi);
        let angle = cx.unary(crate::Unary::Asin, clamped);
        let x = cx.component(p, Axis::X);
        let q = cx.compose(x, angle, c);
        let d = a.call(cx, q);

        let z = cx.component(p, Axis::Z);
        let az = cx.abs(z);
        let floor = cx.splat(0.01);
        let lifted = cx.max(floor, az);
        let correction = cx.min(hi, lifted);
        cx.mul(d, correction)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_is_zero_on_surface() {
        let d = sphere(1.0).distance_at(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn sub_shapes_are_shared() {
        let s = sphere(0.5);
        let both = union(s.clone(), s);
        let mut cx = Context::new();
        let p = cx.var(Var::Position);
        both.call(&mut cx, p);
        // position, length, radius, difference, min
        assert_eq!(cx.len(), 5);
    }

    #[test]
    fn tree_depth_is_clamped() {
        let mut cx = Context::new();
        let p = cx.var(Var::Position);
        let deep = tree(MAX_TREE_DEPTH + 4).call(&mut cx, p);
        let mut cx2 = Context::new();
        let p2 = cx2.var(Var::Position);
        let capped = tree(MAX_TREE_DEPTH).call(&mut cx2, p2);
        assert_eq!(cx.nodes()[deep.index()].hash, cx2.nodes()[capped.index()].hash);
    }
}
