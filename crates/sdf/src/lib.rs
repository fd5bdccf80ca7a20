//! Scene description for signed-distance-field path tracing.
//!
//! Shapes, materials and cameras are described as lazily-built expressions
//! over a shared [`Context`]. Nothing is evaluated until a compiler asks a
//! shape to build itself at a symbolic position; structurally equal
//! sub-expressions collapse to a single node.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

mod error;

pub mod camera;
pub mod eval;
pub mod expr;
pub mod intrinsics;
pub mod material;
pub mod scene;
pub mod shape;

pub use camera::{orbit, Camera, OrbitOptions};
pub use error::ExprError;
pub use eval::{Bindings, Evaluator};
pub use expr::{Axis, Binary, Context, Expr, Node, Op, Param, Unary, Var};
pub use material::{spotlight, Material, SpotlightOptions};
pub use scene::{Entity, EntityId, Scene, SceneBuilder};
pub use shape::Shape;

/// Distance reported for "nothing here". Large enough to dominate any
/// scene, small enough to stay finite through a few multiplications.
pub const MAX_VALUE: f32 = 1e10;
