//! Compiles [`sdf::Scene`]s into WGSL path-tracing kernels.
//!
//! A scene is lowered into a [`Program`] of flattened per-entity procedures,
//! which is then emitted as a single compute module. The same program can be
//! evaluated on the host through an [`Interpreter`].

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

mod error;
mod options;

pub mod interpret;
pub mod program;
pub mod wgsl;

use std::sync::Arc;

use sdf::Scene;

pub use error::CompileError;
pub use interpret::{Closest, Environment, Frame, Interpreter, SurfaceMaterial};
pub use options::KernelOptions;
pub use program::{lower, Program};
pub use wgsl::WORKGROUP_SIZE;

/// A compiled scene: WGSL source plus the lowered program it was emitted from.
#[derive(Clone, Debug)]
pub struct Kernel {
    source: String,
    program: Arc<Program>,
    hash: u64,
}

impl Kernel {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Shared handle for backends that render on worker threads.
    pub fn shared_program(&self) -> Arc<Program> {
        Arc::clone(&self.program)
    }

    pub fn options(&self) -> &KernelOptions {
        &self.program.options
    }

    /// FNV-1a of the source, usable as a pipeline cache key.
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// Compiles `scene` with `options`. Identical inputs yield byte-identical
/// source.
pub fn compile(scene: &Scene, options: &KernelOptions) -> Result<Kernel, CompileError> {
    let program = lower(scene, options)?;
    let source = wgsl::emit(&program)?;
    let hash = sdf::expr::fnv1a(source.as_bytes());
    tracing::debug!(
        entities = program.entities.len(),
        bytes = source.len(),
        hash = format_args!("{hash:016x}"),
        "compiled kernel"
    );
    Ok(Kernel {
        source,
        program: Arc::new(program),
        hash,
    })
}
