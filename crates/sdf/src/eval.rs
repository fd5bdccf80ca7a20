//! Host interpreter for flattened expression graphs.

use glam::{Vec2, Vec3};

use crate::expr::{Binary, Expr, Node, Op, Unary, Var};
use crate::intrinsics;

/// Values bound to the symbolic [`Var`]s for one evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bindings {
    pub position: Vec3,
    pub normal: Vec3,
    pub direction: Vec3,
    pub mouse: Vec2,
    pub time: f32,
}

impl Bindings {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    fn var(&self, var: Var) -> Vec3 {
        match var {
            Var::Position => self.position,
            Var::Normal => self.normal,
            Var::Direction => self.direction,
            Var::Mouse => self.mouse.extend(0.0),
            Var::Time => Vec3::splat(self.time),
        }
    }
}

/// Evaluates node lists produced by `flatten`. Holds one value slot per node
/// so repeated evaluations reuse the allocation.
pub struct Evaluator<'a> {
    nodes: &'a [Node],
    values: Vec<Vec3>,
}

impl<'a> Evaluator<'a> {
    pub fn new(nodes: &'a [Node]) -> Self {
        Self {
            nodes,
            values: vec![Vec3::ZERO; nodes.len()],
        }
    }

    /// Evaluates `order`, which must list every dependency before its users.
    pub fn run(&mut self, order: &[Expr], bindings: &Bindings) {
        for &expr in order {
            let value = self.apply(&self.nodes[expr.index()].op, bindings);
            self.values[expr.index()] = value;
        }
    }

    /// Runs `order` and returns the value of `root`.
    pub fn evaluate(&mut self, order: &[Expr], root: Expr, bindings: &Bindings) -> Vec3 {
        self.run(order, bindings);
        self.get(root)
    }

    pub fn get(&self, expr: Expr) -> Vec3 {
        self.values[expr.index()]
    }

    fn apply(&self, op: &Op, bindings: &Bindings) -> Vec3 {
        let v = |e: Expr| self.values[e.index()];
        match *op {
            Op::Var(var) => bindings.var(var),
            Op::Constant(_) => op.constant_value().unwrap_or(Vec3::ZERO),
            Op::Unary(u, a) => unary(u, v(a)),
            Op::Binary(b, lhs, rhs) => binary(b, v(lhs), v(rhs)),
            Op::Clamp { value, low, high } => v(value).max(v(low)).min(v(high)),
            Op::Mix { a, b, t } => {
                let t = v(t);
                v(a) * (Vec3::ONE - t) + v(b) * t
            }
            Op::Select {
                lhs,
                rhs,
                then,
                otherwise,
            } => {
                if v(lhs).x < v(rhs).x {
                    v(then)
                } else {
                    v(otherwise)
                }
            }
            Op::Component(a, axis) => Vec3::splat(v(a)[axis.index()]),
            Op::Compose(x, y, z) => Vec3::new(v(x).x, v(y).x, v(z).x),
            Op::Rotate { point, axis, angle } => {
                intrinsics::rotate_axis(v(point), v(axis), v(angle).x)
            }
            Op::Random(seed) => Vec3::splat(intrinsics::hash_noise(v(seed))),
            Op::Mandelbulb {
                point,
                power,
                iterations,
            } => Vec3::splat(intrinsics::mandelbulb(v(point), v(power).x, iterations)),
            Op::SierpinskiFold { point, iterations } => {
                intrinsics::sierpinski_fold(v(point), iterations)
            }
        }
    }
}

fn unary(op: Unary, a: Vec3) -> Vec3 {
    let each = |f: fn(f32) -> f32| Vec3::new(f(a.x), f(a.y), f(a.z));
    match op {
        Unary::Neg => -a,
        Unary::Abs => a.abs(),
        Unary::Floor => a.floor(),
        Unary::Fract => a - a.floor(),
        Unary::Sin => each(f32::sin),
        Unary::Cos => each(f32::cos),
        Unary::Asin => each(f32::asin),
        Unary::Acos => each(f32::acos),
        Unary::Exp => each(f32::exp),
        Unary::Log => each(f32::ln),
        Unary::Sqrt => each(f32::sqrt),
        Unary::Normalize => a.normalize(),
        Unary::Length => Vec3::splat(a.length()),
    }
}

fn binary(op: Binary, a: Vec3, b: Vec3) -> Vec3 {
    match op {
        Binary::Add => a + b,
        Binary::Sub => a - b,
        Binary::Mul => a * b,
        Binary::Div => a / b,
        Binary::Min => a.min(b),
        Binary::Max => a.max(b),
        Binary::Mod => a - b * (a / b).floor(),
        Binary::Dot => Vec3::splat(a.dot(b)),
        Binary::Cross => a.cross(b),
        Binary::Pow => Vec3::new(a.x.powf(b.x), a.y.powf(b.y), a.z.powf(b.z)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;

    #[test]
    fn modulo_is_floored() {
        let mut cx = Context::new();
        let a = cx.constant(Vec3::new(-1.0, 5.5, 3.0));
        let b = cx.splat(2.0);
        let m = cx.modulo(a, b);
        let order = cx.flatten(&[m]).unwrap();
        let mut ev = Evaluator::new(cx.nodes());
        let r = ev.evaluate(&order, m, &Bindings::default());
        assert_eq!(r, Vec3::new(1.0, 1.5, 1.0));
    }

    #[test]
    fn scalar_results_are_splatted() {
        let mut cx = Context::new();
        let p = cx.var(Var::Position);
        let l = cx.length(p);
        let order = cx.flatten(&[l]).unwrap();
        let mut ev = Evaluator::new(cx.nodes());
        let r = ev.evaluate(&order, l, &Bindings::at(Vec3::new(3.0, 4.0, 0.0)));
        assert_eq!(r, Vec3::splat(5.0));
    }

    #[test]
    fn mouse_binding_has_zero_z() {
        let mut cx = Context::new();
        let m = cx.var(Var::Mouse);
        let order = cx.flatten(&[m]).unwrap();
        let mut ev = Evaluator::new(cx.nodes());
        let bindings = Bindings {
            mouse: Vec2::new(0.25, 0.75),
            ..Bindings::default()
        };
        assert_eq!(ev.evaluate(&order, m, &bindings), Vec3::new(0.25, 0.75, 0.0));
    }
}
