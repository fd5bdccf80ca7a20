use std::fmt;

use sdf::{EntityId, ExprError, Var};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error(transparent)]
    Expression(#[from] ExprError),
    #[error("`{variable}` is not available in {procedure}")]
    UnboundVariable {
        variable: Var,
        procedure: String,
    },
    #[error("constant {name} is not finite")]
    NonFiniteConstant { name: String },
    #[error("distinct expressions share the name {name}")]
    HashCollision { name: String },
    #[error("entity {0} appears more than once")]
    DuplicateEntity(EntityId),
    #[error("invalid option `{name}`: {reason}")]
    InvalidOption {
        name: &'static str,
        reason: &'static str,
    },
    #[error("failed to write kernel source")]
    Format(#[from] fmt::Error),
}
