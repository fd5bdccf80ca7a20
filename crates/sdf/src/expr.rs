//! Expression IR.
//!
//! Every value is a 3-vector of `f32`. Scalar-valued operations (`Length`,
//! `Dot`, `Component`, the distance intrinsics) splat their result across all
//! three lanes and consumers read the `x` lane, so any node can feed any other.
//!
//! Nodes live in a [`Context`] arena. Interning an [`Op`] that is already
//! present returns the existing handle, which gives common-subexpression
//! elimination for free: a translated sphere referenced from three places in
//! a scene is built once.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use glam::Vec3;

use crate::ExprError;

/// Upper bound on pending nodes during [`Context::flatten`].
pub const MAX_TRAVERSAL: usize = 1 << 20;

/// Handle to a node in a [`Context`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Expr(u32);

impl Expr {
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Symbolic inputs available to generated procedures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Var {
    /// Sample position `p`.
    Position,
    /// Surface normal `n`, only bound inside material procedures.
    Normal,
    /// Incoming ray direction `d`, only bound inside material procedures.
    Direction,
    /// Pointer position in `[0, 1]^2`, `z` is zero.
    Mouse,
    /// Seconds since start, splatted.
    Time,
}

impl Var {
    pub const fn name(self) -> &'static str {
        match self {
            Var::Position => "position",
            Var::Normal => "normal",
            Var::Direction => "direction",
            Var::Mouse => "mouse",
            Var::Time => "time",
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
            Axis::Z => Vec3::Z,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Swizzle letter used by shading languages.
    pub const fn lane(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unary {
    Neg,
    Abs,
    Floor,
    Fract,
    Sin,
    Cos,
    Asin,
    Acos,
    Exp,
    Log,
    Sqrt,
    Normalize,
    /// Euclidean length, splatted.
    Length,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binary {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    /// Floored modulo, `a - b * floor(a / b)`. Always has the sign of `b`.
    Mod,
    /// Dot product, splatted.
    Dot,
    Cross,
    Pow,
}

/// One operation in the IR. Operand arity is fixed by the variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Var(Var),
    /// Constant vector stored as raw `f32` bits so the op stays hashable.
    Constant([u32; 3]),
    Unary(Unary, Expr),
    Binary(Binary, Expr, Expr),
    Clamp {
        value: Expr,
        low: Expr,
        high: Expr,
    },
    Mix {
        a: Expr,
        b: Expr,
        t: Expr,
    },
    /// `then` when `lhs.x < rhs.x`, otherwise `otherwise`.
    Select {
        lhs: Expr,
        rhs: Expr,
        then: Expr,
        otherwise: Expr,
    },
    /// One lane of a vector, splatted.
    Component(Expr, Axis),
    /// `(x.x, y.x, z.x)`.
    Compose(Expr, Expr, Expr),
    /// Rodrigues rotation of `point` by `angle.x` radians about `axis`.
    Rotate {
        point: Expr,
        axis: Expr,
        angle: Expr,
    },
    /// Hash of a vector into `[0, 1)`, splatted.
    Random(Expr),
    /// Mandelbulb distance estimate, splatted.
    Mandelbulb {
        point: Expr,
        power: Expr,
        iterations: u32,
    },
    /// Position after `iterations` rounds of the tetrahedral fold used by the
    /// Sierpinski fractal.
    SierpinskiFold {
        point: Expr,
        iterations: u32,
    },
}

/// Operands of an [`Op`], in evaluation order.
#[derive(Clone, Copy, Debug)]
pub struct Dependencies {
    items: [Expr; 4],
    len: usize,
}

impl Dependencies {
    fn of(items: &[Expr]) -> Self {
        let mut out = Self {
            items: [Expr(0); 4],
            len: items.len(),
        };
        out.items[..items.len()].copy_from_slice(items);
        out
    }
}

impl Deref for Dependencies {
    type Target = [Expr];

    fn deref(&self) -> &[Expr] {
        &self.items[..self.len]
    }
}

impl Op {
    pub fn constant(value: Vec3) -> Self {
        Op::Constant([value.x.to_bits(), value.y.to_bits(), value.z.to_bits()])
    }

    /// Value of a `Constant` op.
    pub fn constant_value(&self) -> Option<Vec3> {
        match *self {
            Op::Constant([x, y, z]) => Some(Vec3::new(
                f32::from_bits(x),
                f32::from_bits(y),
                f32::from_bits(z),
            )),
            _ => None,
        }
    }

    pub fn dependencies(&self) -> Dependencies {
        match *self {
            Op::Var(_) | Op::Constant(_) => Dependencies::of(&[]),
            Op::Unary(_, a)
            | Op::Component(a, _)
            | Op::Random(a)
            | Op::SierpinskiFold { point: a, .. } => Dependencies::of(&[a]),
            Op::Binary(_, a, b) | Op::Mandelbulb { point: a, power: b, .. } => {
                Dependencies::of(&[a, b])
            }
            Op::Clamp { value, low, high } => Dependencies::of(&[value, low, high]),
            Op::Mix { a, b, t } => Dependencies::of(&[a, b, t]),
            Op::Compose(x, y, z) => Dependencies::of(&[x, y, z]),
            Op::Rotate { point, axis, angle } => Dependencies::of(&[point, axis, angle]),
            Op::Select {
                lhs,
                rhs,
                then,
                otherwise,
            } => Dependencies::of(&[lhs, rhs, then, otherwise]),
        }
    }

    /// Tag bytes identifying the operation kind, excluding operands.
    fn tag(&self) -> [u8; 2] {
        match *self {
            Op::Var(v) => [0, v as u8],
            Op::Constant(_) => [1, 0],
            Op::Unary(u, _) => [2, u as u8],
            Op::Binary(b, _, _) => [3, b as u8],
            Op::Clamp { .. } => [4, 0],
            Op::Mix { .. } => [5, 0],
            Op::Select { .. } => [6, 0],
            Op::Component(_, axis) => [7, axis as u8],
            Op::Compose(..) => [8, 0],
            Op::Rotate { .. } => [9, 0],
            Op::Random(_) => [10, 0],
            Op::Mandelbulb { .. } => [11, 0],
            Op::SierpinskiFold { .. } => [12, 0],
        }
    }

    fn loop_count(&self) -> Option<u32> {
        match *self {
            Op::Mandelbulb { iterations, .. } | Op::SierpinskiFold { iterations, .. } => {
                Some(iterations)
            }
            _ => None,
        }
    }
}

/// A node in the arena together with its content hash.
#[derive(Clone, Copy, Debug)]
pub struct Node {
    pub op: Op,
    /// FNV-1a over the op tag, constant bits, loop counts and operand hashes.
    /// Stable across runs and platforms.
    pub hash: u64,
}

impl Node {
    /// Identifier used for this node in generated code.
    pub fn name(&self) -> String {
        format!("v{:016x}", self.hash)
    }
}

struct Fnv(u64);

impl Fnv {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= u64::from(b);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }
}

/// 64-bit FNV-1a of `bytes`, the hash behind node names. Stable across
/// toolchains, unlike `std`'s `DefaultHasher`.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut h = Fnv(Fnv::OFFSET);
    h.write(bytes);
    h.0
}

/// Arena of interned expression nodes.
#[derive(Default)]
pub struct Context {
    nodes: Vec<Node>,
    interned: HashMap<Op, Expr>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the handle for `op`, creating the node if it is new.
    #[allow(clippy::cast_possible_truncation)]
    pub fn intern(&mut self, op: Op) -> Expr {
        if let Some(&existing) = self.interned.get(&op) {
            return existing;
        }
        let hash = self.content_hash(&op);
        let id = Expr(self.nodes.len() as u32);
        self.nodes.push(Node { op, hash });
        self.interned.insert(op, id);
        id
    }

    fn content_hash(&self, op: &Op) -> u64 {
        let mut h = Fnv(Fnv::OFFSET);
        h.write(&op.tag());
        if let Op::Constant(bits) = op {
            for b in bits {
                h.write(&b.to_le_bytes());
            }
        }
        if let Some(n) = op.loop_count() {
            h.write(&n.to_le_bytes());
        }
        for dep in op.dependencies().iter() {
            let child = self.nodes.get(dep.index()).map_or(0, |n| n.hash);
            h.write(&child.to_le_bytes());
        }
        h.0
    }

    pub fn node(&self, expr: Expr) -> Option<&Node> {
        self.nodes.get(expr.index())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node reachable from `roots`, each exactly once, dependencies
    /// before dependents. Iterative so deep chains cannot overflow the stack.
    pub fn flatten(&self, roots: &[Expr]) -> Result<Vec<Expr>, ExprError> {
        flatten_nodes(&self.nodes, roots)
    }

    pub fn var(&mut self, var: Var) -> Expr {
        self.intern(Op::Var(var))
    }

    pub fn constant(&mut self, value: Vec3) -> Expr {
        self.intern(Op::constant(value))
    }

    /// A scalar splatted across all lanes.
    pub fn splat(&mut self, value: f32) -> Expr {
        self.constant(Vec3::splat(value))
    }

    pub fn unary(&mut self, op: Unary, a: Expr) -> Expr {
        self.intern(Op::Unary(op, a))
    }

    pub fn binary(&mut self, op: Binary, a: Expr, b: Expr) -> Expr {
        self.intern(Op::Binary(op, a, b))
    }

    pub fn add(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Add, a, b)
    }

    pub fn sub(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Sub, a, b)
    }

    pub fn mul(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Mul, a, b)
    }

    pub fn div(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Div, a, b)
    }

    pub fn min(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Min, a, b)
    }

    pub fn max(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Max, a, b)
    }

    pub fn modulo(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Mod, a, b)
    }

    pub fn dot(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Dot, a, b)
    }

    pub fn cross(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Cross, a, b)
    }

    pub fn pow(&mut self, a: Expr, b: Expr) -> Expr {
        self.binary(Binary::Pow, a, b)
    }

    pub fn neg(&mut self, a: Expr) -> Expr {
        self.unary(Unary::Neg, a)
    }

    pub fn abs(&mut self, a: Expr) -> Expr {
        self.unary(Unary::Abs, a)
    }

    pub fn floor(&mut self, a: Expr) -> Expr {
        self.unary(Unary::Floor, a)
    }

    pub fn length(&mut self, a: Expr) -> Expr {
        self.unary(Unary::Length, a)
    }

    pub fn normalize(&mut self, a: Expr) -> Expr {
        self.unary(Unary::Normalize, a)
    }

    pub fn component(&mut self, a: Expr, axis: Axis) -> Expr {
        self.intern(Op::Component(a, axis))
    }

    pub fn compose(&mut self, x: Expr, y: Expr, z: Expr) -> Expr {
        self.intern(Op::Compose(x, y, z))
    }

    pub fn clamp(&mut self, value: Expr, low: Expr, high: Expr) -> Expr {
        self.intern(Op::Clamp { value, low, high })
    }

    pub fn mix(&mut self, a: Expr, b: Expr, t: Expr) -> Expr {
        self.intern(Op::Mix { a, b, t })
    }

    pub fn select(&mut self, lhs: Expr, rhs: Expr, then: Expr, otherwise: Expr) -> Expr {
        self.intern(Op::Select {
            lhs,
            rhs,
            then,
            otherwise,
        })
    }

    pub fn rotate(&mut self, point: Expr, axis: Expr, angle: Expr) -> Expr {
        self.intern(Op::Rotate { point, axis, angle })
    }

    pub fn random(&mut self, seed: Expr) -> Expr {
        self.intern(Op::Random(seed))
    }

    /// Smallest lane, splatted.
    pub fn min_component(&mut self, a: Expr) -> Expr {
        let x = self.component(a, Axis::X);
        let y = self.component(a, Axis::Y);
        let z = self.component(a, Axis::Z);
        let yz = self.min(y, z);
        self.min(x, yz)
    }

    /// Largest lane, splatted.
    pub fn max_component(&mut self, a: Expr) -> Expr {
        let x = self.component(a, Axis::X);
        let y = self.component(a, Axis::Y);
        let z = self.component(a, Axis::Z);
        let yz = self.max(y, z);
        self.max(x, yz)
    }
}

/// Post-order walk shared by [`Context::flatten`] and consumers that only hold
/// the node slice.
pub fn flatten_nodes(nodes: &[Node], roots: &[Expr]) -> Result<Vec<Expr>, ExprError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        Active,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut order = Vec::new();
    let mut stack: Vec<(Expr, bool)> = Vec::new();

    for &root in roots {
        stack.push((root, false));
        while let Some((expr, expanded)) = stack.pop() {
            let Some(node) = nodes.get(expr.index()) else {
                return Err(ExprError::UnknownNode(expr.raw()));
            };
            if expanded {
                marks[expr.index()] = Mark::Done;
                order.push(expr);
                continue;
            }
            match marks[expr.index()] {
                Mark::Done => continue,
                Mark::Active => return Err(ExprError::Cycle(expr.raw())),
                Mark::Unvisited => {}
            }
            marks[expr.index()] = Mark::Active;
            stack.push((expr, true));
            for &dep in node.op.dependencies().iter().rev() {
                match marks.get(dep.index()) {
                    None => return Err(ExprError::UnknownNode(dep.raw())),
                    Some(Mark::Active) => return Err(ExprError::Cycle(dep.raw())),
                    Some(Mark::Done) => {}
                    Some(Mark::Unvisited) => stack.push((dep, false)),
                }
            }
            if stack.len() > MAX_TRAVERSAL {
                return Err(ExprError::DepthExceeded(MAX_TRAVERSAL));
            }
        }
    }
    Ok(order)
}

/// A lazily-built expression: shape, material and camera parameters are
/// turned into nodes only when a compiler builds the scene.
#[derive(Clone)]
pub struct Param(Rc<dyn Fn(&mut Context) -> Expr>);

impl Param {
    pub fn new(build: impl Fn(&mut Context) -> Expr + 'static) -> Self {
        Self(Rc::new(build))
    }

    pub fn var(var: Var) -> Self {
        Self::new(move |cx| cx.var(var))
    }

    pub fn build(&self, cx: &mut Context) -> Expr {
        (self.0)(cx)
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Param(..)")
    }
}

impl From<f32> for Param {
    fn from(value: f32) -> Self {
        Self::new(move |cx| cx.splat(value))
    }
}

impl From<Vec3> for Param {
    fn from(value: Vec3) -> Self {
        Self::new(move |cx| cx.constant(value))
    }
}

impl From<[f32; 3]> for Param {
    fn from(value: [f32; 3]) -> Self {
        Vec3::from(value).into()
    }
}

impl From<Var> for Param {
    fn from(var: Var) -> Self {
        Self::var(var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
        assert_eq!(fnv1a(b"foobar"), 0x8594_4171_f739_67e8);
    }

    #[test]
    fn interning_is_structural() {
        let mut cx = Context::new();
        let p = cx.var(Var::Position);
        let a = cx.length(p);
        let b = cx.length(p);
        assert_eq!(a, b);
        assert_eq!(cx.len(), 2);
    }

    #[test]
    fn constants_compare_by_bits() {
        let mut cx = Context::new();
        let zero = cx.splat(0.0);
        let neg_zero = cx.splat(-0.0);
        assert_ne!(zero, neg_zero);
        assert_ne!(cx.nodes()[zero.index()].hash, cx.nodes()[neg_zero.index()].hash);
    }

    #[test]
    fn hash_depends_on_operand_order() {
        let mut cx = Context::new();
        let p = cx.var(Var::Position);
        let one = cx.splat(1.0);
        let a = cx.sub(p, one);
        let b = cx.sub(one, p);
        assert_ne!(cx.nodes()[a.index()].hash, cx.nodes()[b.index()].hash);
    }

    #[test]
    fn hashes_are_reproducible_across_contexts() {
        let build = || {
            let mut cx = Context::new();
            let p = cx.var(Var::Position);
            let r = cx.splat(0.5);
            let l = cx.length(p);
            let d = cx.sub(l, r);
            cx.nodes()[d.index()].hash
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn flatten_detects_cycles() {
        let mut cx = Context::new();
        let p = cx.var(Var::Position);
        let looped = Expr(1);
        cx.nodes.push(Node {
            op: Op::Binary(Binary::Add, p, looped),
            hash: 1,
        });
        assert_eq!(cx.flatten(&[looped]), Err(ExprError::Cycle(1)));
    }

    #[test]
    fn flatten_rejects_foreign_handles() {
        let cx = Context::new();
        assert_eq!(cx.flatten(&[Expr(7)]), Err(ExprError::UnknownNode(7)));
    }

    #[test]
    fn flatten_handles_deep_chains() {
        let mut cx = Context::new();
        let mut e = cx.var(Var::Position);
        for _ in 0..50_000 {
            e = cx.unary(Unary::Neg, e);
            e = cx.unary(Unary::Abs, e);
        }
        let order = cx.flatten(&[e]).unwrap();
        assert_eq!(order.len(), cx.len());
        assert_eq!(*order.last().unwrap(), e);
    }
}
