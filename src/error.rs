//! Crate error type.
//!
//! Only graph construction is fallible. The simulation itself recovers
//! every degenerate case locally (coincident particles, non-convergence,
//! interruption) and never surfaces an error.

use crate::graph::VertexId;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unknown vertex: {0}")]
    UnknownVertex(VertexId),

    #[error("self-loop edge on {0}")]
    SelfLoop(VertexId),
}
