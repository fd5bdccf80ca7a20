use thiserror::Error;

/// Structural problems found while walking an expression graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("expression graph contains a cycle through node {0}")]
    Cycle(u32),
    #[error("expression graph exceeds the traversal limit of {0} pending nodes")]
    DepthExceeded(usize),
    #[error("expression handle {0} does not belong to this context")]
    UnknownNode(u32),
}
