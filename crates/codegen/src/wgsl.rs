//! WGSL emission for lowered programs.
//!
//! Every IR node becomes one `let` binding named after its content hash, so
//! a procedure that uses a sub-expression several times computes it once.

use std::collections::BTreeSet;
use std::fmt::Write;

use sdf::intrinsics;
use sdf::{Expr, Op, Unary, Var, MAX_VALUE};

use crate::program::{EntityProgram, Program};
use crate::CompileError;

const COMMON: &str = include_str!("shaders/common.wgsl");
const INTEGRATOR: &str = include_str!("shaders/integrator.wgsl");

/// Side length of the square workgroup declared by the entry point.
pub const WORKGROUP_SIZE: u32 = 8;

/// Emits the complete compute module for `program`.
pub fn emit(program: &Program) -> Result<String, CompileError> {
    Emitter::new(program).module()
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Helper {
    Mandelbulb(u32),
    SierpinskiFold(u32),
}

struct Emitter<'a> {
    program: &'a Program,
    names: Vec<String>,
    out: String,
}

fn float(v: f32) -> String {
    format!("{v:?}")
}

fn vector(v: glam::Vec3) -> String {
    if v.x.to_bits() == v.y.to_bits() && v.y.to_bits() == v.z.to_bits() {
        format!("vec3<f32>({})", float(v.x))
    } else {
        format!(
            "vec3<f32>({}, {}, {})",
            float(v.x),
            float(v.y),
            float(v.z)
        )
    }
}

impl<'a> Emitter<'a> {
    fn new(program: &'a Program) -> Self {
        Self {
            program,
            names: program.nodes.iter().map(sdf::Node::name).collect(),
            out: String::new(),
        }
    }

    fn module(mut self) -> Result<String, CompileError> {
        self.constants()?;
        self.out.push_str(COMMON);
        self.helpers()?;
        let program = self.program;
        for entity in &program.entities {
            self.distance(entity)?;
            self.normal(entity)?;
            self.material(entity)?;
        }
        self.dispatch()?;
        self.frame()?;
        self.out.push('\n');
        self.out.push_str(INTEGRATOR);
        Ok(self.out)
    }

    fn constants(&mut self) -> Result<(), CompileError> {
        let o = &self.program.options;
        let out = &mut self.out;
        writeln!(out, "const MAX_VALUE: f32 = {};", float(MAX_VALUE))?;
        writeln!(out, "const EPSILON: f32 = {};", float(o.epsilon))?;
        writeln!(out, "const NORMAL_EPSILON: f32 = {};", float(o.normal_epsilon))?;
        writeln!(out, "const STEPS: i32 = {};", o.steps)?;
        writeln!(out, "const BOUNCES: i32 = {};", o.bounces)?;
        writeln!(out, "const ITERATIONS: i32 = {};", o.iterations)?;
        writeln!(out, "const STEP_FACTOR: f32 = {};", float(o.step_factor))?;
        writeln!(out, "const MEMORY: f32 = {};", float(o.memory))?;
        writeln!(out)?;
        Ok(())
    }

    /// Loop intrinsics, one specialisation per iteration count in use.
    fn helpers(&mut self) -> Result<(), CompileError> {
        let needed: BTreeSet<Helper> = self
            .program
            .nodes
            .iter()
            .filter_map(|node| match node.op {
                Op::Mandelbulb { iterations, .. } => Some(Helper::Mandelbulb(iterations)),
                Op::SierpinskiFold { iterations, .. } => Some(Helper::SierpinskiFold(iterations)),
                _ => None,
            })
            .collect();
        for helper in needed {
            match helper {
                Helper::Mandelbulb(n) => self.mandelbulb(n)?,
                Helper::SierpinskiFold(n) => self.sierpinski_fold(n)?,
            }
        }
        Ok(())
    }

    fn mandelbulb(&mut self, iterations: u32) -> Result<(), CompileError> {
        let out = &mut self.out;
        writeln!(out)?;
        writeln!(out, "fn mandelbulb_{iterations}(p: vec3<f32>, power: f32) -> f32 {{")?;
        writeln!(out, "    var z = p;")?;
        writeln!(out, "    var dr = 1.0;")?;
        writeln!(out, "    var r = 0.0;")?;
        writeln!(out, "    for (var i = 0u; i < {iterations}u; i++) {{")?;
        writeln!(out, "        r = length(z);")?;
        writeln!(
            out,
            "        if (r > {}) {{",
            float(intrinsics::MANDELBULB_BAILOUT)
        )?;
        writeln!(out, "            break;")?;
        writeln!(out, "        }}")?;
        writeln!(out, "        let safe_r = max(r, 1e-6);")?;
        writeln!(
            out,
            "        let theta = acos(clamp(z.z / safe_r, -1.0, 1.0)) * power;"
        )?;
        writeln!(out, "        let phi = atan2(z.y, z.x) * power;")?;
        writeln!(
            out,
            "        dr = pow(safe_r, power - 1.0) * power * dr + 1.0;"
        )?;
        writeln!(
            out,
            "        z = pow(safe_r, power) * vec3<f32>(sin(theta) * cos(phi), sin(phi) * sin(theta), cos(theta)) + p;"
        )?;
        writeln!(out, "    }}")?;
        writeln!(out, "    return 0.5 * log(max(r, 1e-6)) * r / dr;")?;
        writeln!(out, "}}")?;
        Ok(())
    }

    fn sierpinski_fold(&mut self, iterations: u32) -> Result<(), CompileError> {
        let [n1, n2, n3] = intrinsics::sierpinski_normals();
        let offset = intrinsics::sierpinski_offset();
        let out = &mut self.out;
        writeln!(out)?;
        writeln!(out, "fn sierpinski_fold_{iterations}(p: vec3<f32>) -> vec3<f32> {{")?;
        writeln!(out, "    let n1 = {};", vector(n1))?;
        writeln!(out, "    let n2 = {};", vector(n2))?;
        writeln!(out, "    let n3 = {};", vector(n3))?;
        writeln!(out, "    var q = p;")?;
        writeln!(out, "    for (var i = 0u; i < {iterations}u; i++) {{")?;
        for n in ["n1", "n2", "n3"] {
            writeln!(out, "        q = q - 2.0 * min(0.0, dot(q, {n})) * {n};")?;
        }
        writeln!(out, "        q = q * 2.0 - {};", vector(offset))?;
        writeln!(out, "    }}")?;
        writeln!(out, "    return q;")?;
        writeln!(out, "}}")?;
        Ok(())
    }

    fn name(&self, expr: Expr) -> &str {
        &self.names[expr.index()]
    }

    fn expression(&self, op: &Op) -> String {
        let n = |e: Expr| self.name(e);
        match *op {
            Op::Var(var) => match var {
                Var::Position => "p".to_owned(),
                Var::Normal => "n".to_owned(),
                Var::Direction => "d".to_owned(),
                Var::Mouse => "vec3<f32>(uniforms.mouse, 0.0)".to_owned(),
                Var::Time => "vec3<f32>(uniforms.time)".to_owned(),
            },
            Op::Constant(_) => vector(op.constant_value().unwrap_or_default()),
            Op::Unary(unary, a) => {
                let a = n(a);
                match unary {
                    Unary::Neg => format!("-{a}"),
                    Unary::Length => format!("vec3<f32>(length({a}))"),
                    other => format!("{}({a})", unary_function(other)),
                }
            }
            Op::Binary(binary, a, b) => {
                let (a, b) = (n(a), n(b));
                match binary {
                    sdf::Binary::Add => format!("{a} + {b}"),
                    sdf::Binary::Sub => format!("{a} - {b}"),
                    sdf::Binary::Mul => format!("{a} * {b}"),
                    sdf::Binary::Div => format!("{a} / {b}"),
                    sdf::Binary::Min => format!("min({a}, {b})"),
                    sdf::Binary::Max => format!("max({a}, {b})"),
                    sdf::Binary::Mod => format!("{a} - {b} * floor({a} / {b})"),
                    sdf::Binary::Dot => format!("vec3<f32>(dot({a}, {b}))"),
                    sdf::Binary::Cross => format!("cross({a}, {b})"),
                    sdf::Binary::Pow => format!("pow({a}, {b})"),
                }
            }
            Op::Clamp { value, low, high } => {
                format!("clamp({}, {}, {})", n(value), n(low), n(high))
            }
            Op::Mix { a, b, t } => format!("mix({}, {}, {})", n(a), n(b), n(t)),
            Op::Select {
                lhs,
                rhs,
                then,
                otherwise,
            } => format!(
                "select({}, {}, {}.x < {}.x)",
                n(otherwise),
                n(then),
                n(lhs),
                n(rhs)
            ),
            Op::Component(a, axis) => format!("vec3<f32>({}.{})", n(a), axis.lane()),
            Op::Compose(x, y, z) => format!("vec3<f32>({}.x, {}.x, {}.x)", n(x), n(y), n(z)),
            Op::Rotate { point, axis, angle } => {
                format!("rotate_axis({}, {}, {}.x)", n(point), n(axis), n(angle))
            }
            Op::Random(seed) => format!("vec3<f32>(hash_noise({}))", n(seed)),
            Op::Mandelbulb {
                point,
                power,
                iterations,
            } => format!(
                "vec3<f32>(mandelbulb_{iterations}({}, {}.x))",
                n(point),
                n(power)
            ),
            Op::SierpinskiFold { point, iterations } => {
                format!("sierpinski_fold_{iterations}({})", n(point))
            }
        }
    }

    fn bindings(&mut self, order: &[Expr]) -> Result<(), CompileError> {
        for &expr in order {
            let line = self.expression(&self.program.node(expr).op);
            writeln!(self.out, "    let {} = {line};", self.names[expr.index()])?;
        }
        Ok(())
    }

    fn distance(&mut self, entity: &EntityProgram) -> Result<(), CompileError> {
        let id = entity.id;
        writeln!(self.out)?;
        writeln!(self.out, "fn distance{id}(p: vec3<f32>) -> f32 {{")?;
        self.bindings(&entity.distance.order)?;
        let root = self.name(entity.distance.root).to_owned();
        writeln!(self.out, "    return {root}.x;")?;
        writeln!(self.out, "}}")?;
        Ok(())
    }

    fn normal(&mut self, entity: &EntityProgram) -> Result<(), CompileError> {
        let id = entity.id;
        let out = &mut self.out;
        writeln!(out)?;
        writeln!(out, "fn normal{id}(p: vec3<f32>) -> vec3<f32> {{")?;
        if self.program.options.cheap_normals {
            writeln!(out, "    let k = vec2<f32>(1.0, -1.0);")?;
            writeln!(out, "    return normalize(")?;
            writeln!(out, "        k.xyy * distance{id}(p + k.xyy * NORMAL_EPSILON) +")?;
            writeln!(out, "        k.yyx * distance{id}(p + k.yyx * NORMAL_EPSILON) +")?;
            writeln!(out, "        k.yxy * distance{id}(p + k.yxy * NORMAL_EPSILON) +")?;
            writeln!(out, "        k.xxx * distance{id}(p + k.xxx * NORMAL_EPSILON));")?;
        } else {
            writeln!(out, "    let e = vec2<f32>(NORMAL_EPSILON, 0.0);")?;
            writeln!(out, "    return normalize(vec3<f32>(")?;
            writeln!(out, "        distance{id}(p + e.xyy) - distance{id}(p - e.xyy),")?;
            writeln!(out, "        distance{id}(p + e.yxy) - distance{id}(p - e.yxy),")?;
            writeln!(out, "        distance{id}(p + e.yyx) - distance{id}(p - e.yyx)));")?;
        }
        writeln!(out, "}}")?;
        Ok(())
    }

    fn material_literal(&self, fields: &[Expr; 6]) -> String {
        let [transmittance, smoothness, refraction, scatter, color, emissivity] =
            fields.map(|e| self.name(e));
        format!(
            "Material({transmittance}.x, {smoothness}.x, {refraction}.x, {scatter}.x, {color}, {emissivity})"
        )
    }

    fn material(&mut self, entity: &EntityProgram) -> Result<(), CompileError> {
        let id = entity.id;
        writeln!(self.out)?;
        writeln!(
            self.out,
            "fn material{id}(p: vec3<f32>, n: vec3<f32>, d: vec3<f32>) -> Material {{"
        )?;
        self.bindings(&entity.material.order)?;
        let literal = self.material_literal(&entity.material.fields);
        writeln!(self.out, "    return {literal};")?;
        writeln!(self.out, "}}")?;
        Ok(())
    }

    /// `calculateClosest`, `calculateNormal` and `calculateMaterial`.
    fn dispatch(&mut self) -> Result<(), CompileError> {
        let ids: Vec<u32> = self.program.entities.iter().map(|e| e.id.get()).collect();
        let out = &mut self.out;

        writeln!(out)?;
        writeln!(out, "fn calculateClosest(p: vec3<f32>) -> Closest {{")?;
        writeln!(out, "    var closest = Closest(0, MAX_VALUE);")?;
        for id in &ids {
            writeln!(out, "    let d{id} = abs(distance{id}(p));")?;
            writeln!(out, "    if (d{id} < closest.dist) {{")?;
            writeln!(out, "        closest = Closest({id}, d{id});")?;
            writeln!(out, "    }}")?;
        }
        writeln!(out, "    return closest;")?;
        writeln!(out, "}}")?;

        writeln!(out)?;
        writeln!(out, "fn calculateNormal(id: i32, p: vec3<f32>) -> vec3<f32> {{")?;
        for id in &ids {
            writeln!(out, "    if (id == {id}) {{")?;
            writeln!(out, "        return normal{id}(p);")?;
            writeln!(out, "    }}")?;
        }
        writeln!(out, "    return vec3<f32>(0.0);")?;
        writeln!(out, "}}")?;

        writeln!(out)?;
        writeln!(
            out,
            "fn calculateMaterial(id: i32, p: vec3<f32>, n: vec3<f32>, d: vec3<f32>) -> Material {{"
        )?;
        for id in &ids {
            writeln!(out, "    if (id == {id}) {{")?;
            writeln!(out, "        return material{id}(p, n, d);")?;
            writeln!(out, "    }}")?;
        }
        writeln!(
            out,
            "    return Material(0.0, 1.0, 1.0, MAX_VALUE, vec3<f32>(0.0), vec3<f32>(0.0));"
        )?;
        writeln!(out, "}}")?;
        Ok(())
    }

    fn frame(&mut self) -> Result<(), CompileError> {
        let program = self.program;
        let frame = &program.frame;
        writeln!(self.out)?;
        writeln!(self.out, "fn frame_setup() -> Frame {{")?;
        self.bindings(&frame.order)?;
        let [eye, look_at, up, fov, aperture, focal] = frame.camera.map(|e| self.name(e).to_owned());
        let air = self.material_literal(&frame.air);
        writeln!(
            self.out,
            "    return Frame({eye}, {look_at}, {up}, {fov}.x, {aperture}.x, {focal}.x, {air});"
        )?;
        writeln!(self.out, "}}")?;
        Ok(())
    }
}

fn unary_function(op: Unary) -> &'static str {
    match op {
        Unary::Abs => "abs",
        Unary::Floor => "floor",
        Unary::Fract => "fract",
        Unary::Sin => "sin",
        Unary::Cos => "cos",
        Unary::Asin => "asin",
        Unary::Acos => "acos",
        Unary::Exp => "exp",
        Unary::Log => "log",
        Unary::Sqrt => "sqrt",
        Unary::Normalize => "normalize",
        Unary::Neg => "-",
        Unary::Length => "length",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_always_look_like_floats() {
        assert_eq!(float(1.0), "1.0");
        assert_eq!(float(0.5), "0.5");
        for v in [1e10, 1e-5, 3e38, -0.125, 1234.5] {
            let text = float(v);
            assert!(text.contains('.') || text.contains('e'), "{text}");
            assert_eq!(text.parse::<f32>().unwrap().to_bits(), v.to_bits(), "{text}");
        }
    }

    #[test]
    fn splatted_vectors_are_compact() {
        assert_eq!(vector(glam::Vec3::splat(2.0)), "vec3<f32>(2.0)");
        assert_eq!(
            vector(glam::Vec3::new(1.0, 0.0, -1.0)),
            "vec3<f32>(1.0, 0.0, -1.0)"
        );
    }
}
