//! The graph model consumed by the layout engine.
//!
//! This module provides the caller-facing graph structure using petgraph's
//! StableGraph for stable vertex/edge indices. Vertices carry a mutable
//! position and a pinned flag; edges carry a weight that scales the
//! traction force of the edge during simulation.

mod edge;
mod model;
mod vertex;

pub use edge::EdgeId;
pub use model::Graph;
pub use vertex::VertexId;
