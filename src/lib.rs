//! Quiver Layout - force-directed graph layout engine.
//!
//! This crate computes stable 2D coordinates for graph vertices from an
//! iterative physics simulation: pairwise repulsion keeps all vertices
//! apart while per-edge traction springs pull connected vertices toward a
//! preferred rest length. Runs are driven by a self-correcting background
//! scheduler and bounded by a watchdog, so every layout request completes
//! and reports back exactly once.
//!
//! # Architecture
//!
//! - `graph`: caller-facing graph model using petgraph's StableGraph
//! - `geometry`: 2D point/vector arithmetic and the layout bounds
//! - `sim`: particles, force functions, and the per-run arena
//! - `schedule`: the adaptive rate scheduler, stop signal, and watchdog
//! - `engine`: the public orchestrator tying a graph to a simulation run
//!
//! # Example
//!
//! ```
//! use quiver_layout::{Graph, LayoutEngine, Point};
//! use std::sync::mpsc;
//!
//! let mut graph = Graph::new();
//! let a = graph.add_vertex(Point::ZERO);
//! let b = graph.add_vertex(Point::ZERO);
//! graph.add_edge(a, b, 1.0).unwrap();
//!
//! let mut engine = LayoutEngine::new();
//! let (tx, rx) = mpsc::channel();
//! engine.layout(&graph, false, move |result| {
//!     tx.send(result).unwrap();
//! });
//! let result = rx.recv().unwrap();
//! result.apply_to(&mut graph);
//! ```

pub mod engine;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod schedule;
pub mod sim;

pub use engine::{LayoutConfig, LayoutEngine, LayoutResult, RunOutcome};
pub use error::{Error, Result};
pub use geometry::{Bounds, Point};
pub use graph::{EdgeId, Graph, VertexId};
pub use sim::ForceConfig;
