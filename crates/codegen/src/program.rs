//! Lowering a [`Scene`] into flattened per-procedure node lists.

use std::collections::HashMap;

use sdf::expr::flatten_nodes;
use sdf::{Context, EntityId, Expr, Node, Op, Scene, Var};

use crate::{CompileError, KernelOptions};

/// A procedure producing a single value.
#[derive(Clone, Debug)]
pub struct Procedure {
    /// Nodes to evaluate, dependencies first.
    pub order: Vec<Expr>,
    pub root: Expr,
}

/// A procedure producing the six material fields, in the order
/// transmittance, smoothness, refraction, scatter, color, emissivity.
#[derive(Clone, Debug)]
pub struct MaterialProcedure {
    pub order: Vec<Expr>,
    pub fields: [Expr; 6],
}

#[derive(Clone, Debug)]
pub struct EntityProgram {
    pub id: EntityId,
    pub distance: Procedure,
    pub material: MaterialProcedure,
}

/// Per-frame values computed once before tracing: the camera (eye, target,
/// up, field of view, aperture, focal factor) and the air material.
#[derive(Clone, Debug)]
pub struct FrameProcedure {
    pub order: Vec<Expr>,
    pub camera: [Expr; 6],
    pub air: [Expr; 6],
}

/// A scene lowered to plain data, shareable across threads.
#[derive(Clone, Debug)]
pub struct Program {
    pub nodes: Vec<Node>,
    /// Sorted by id.
    pub entities: Vec<EntityProgram>,
    pub frame: FrameProcedure,
    pub options: KernelOptions,
}

impl Program {
    pub fn node(&self, expr: Expr) -> &Node {
        &self.nodes[expr.index()]
    }

    pub fn entity(&self, id: u32) -> Option<&EntityProgram> {
        self.entities
            .binary_search_by_key(&id, |e| e.id.get())
            .ok()
            .map(|i| &self.entities[i])
    }
}

const DISTANCE_SCOPE: &[Var] = &[Var::Position, Var::Time, Var::Mouse];
const MATERIAL_SCOPE: &[Var] = &[
    Var::Position,
    Var::Normal,
    Var::Direction,
    Var::Time,
    Var::Mouse,
];
const FRAME_SCOPE: &[Var] = &[Var::Time, Var::Mouse];

/// Builds every shape, material and camera expression of `scene` into one
/// shared arena and flattens each generated procedure.
pub fn lower(scene: &Scene, options: &KernelOptions) -> Result<Program, CompileError> {
    options.validate()?;

    let mut cx = Context::new();
    let p = cx.var(Var::Position);

    let mut roots = Vec::with_capacity(scene.entities.len());
    for entity in &scene.entities {
        let distance = entity.shape.call(&mut cx, p);
        let material = entity.material.fields().map(|f| f.build(&mut cx));
        roots.push((entity.id, distance, material));
    }
    let camera = scene.camera.fields().map(|f| f.build(&mut cx));
    let air = scene.air.fields().map(|f| f.build(&mut cx));

    let nodes = cx.into_nodes();
    check_names(&nodes)?;

    roots.sort_by_key(|(id, ..)| *id);
    if let Some(w) = roots.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(CompileError::DuplicateEntity(w[0].0));
    }

    let mut entities = Vec::with_capacity(roots.len());
    for (id, distance, material) in roots {
        let distance_order = flatten_nodes(&nodes, &[distance])?;
        check_scope(&nodes, &distance_order, DISTANCE_SCOPE, || format!("distance{id}"))?;
        let material_order = flatten_nodes(&nodes, &material)?;
        check_scope(&nodes, &material_order, MATERIAL_SCOPE, || format!("material{id}"))?;
        entities.push(EntityProgram {
            id,
            distance: Procedure {
                order: distance_order,
                root: distance,
            },
            material: MaterialProcedure {
                order: material_order,
                fields: material,
            },
        });
    }

    let frame_roots: Vec<Expr> = camera.iter().chain(air.iter()).copied().collect();
    let frame_order = flatten_nodes(&nodes, &frame_roots)?;
    check_scope(&nodes, &frame_order, FRAME_SCOPE, || "the camera or air material".to_owned())?;

    tracing::debug!(
        nodes = nodes.len(),
        entities = entities.len(),
        "lowered scene"
    );

    Ok(Program {
        nodes,
        entities,
        frame: FrameProcedure {
            order: frame_order,
            camera,
            air,
        },
        options: *options,
    })
}

fn check_scope(
    nodes: &[Node],
    order: &[Expr],
    scope: &[Var],
    procedure: impl Fn() -> String,
) -> Result<(), CompileError> {
    for expr in order {
        if let Op::Var(variable) = nodes[expr.index()].op {
            if !scope.contains(&variable) {
                return Err(CompileError::UnboundVariable {
                    variable,
                    procedure: procedure(),
                });
            }
        }
    }
    Ok(())
}

/// Generated code names nodes by content hash, so distinct nodes must hash
/// differently and constants must be representable.
fn check_names(nodes: &[Node]) -> Result<(), CompileError> {
    let mut seen: HashMap<u64, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        if seen.insert(node.hash, i).is_some() {
            return Err(CompileError::HashCollision { name: node.name() });
        }
        if let Some(value) = node.op.constant_value() {
            if !value.is_finite() {
                return Err(CompileError::NonFiniteConstant { name: node.name() });
            }
        }
    }
    Ok(())
}
