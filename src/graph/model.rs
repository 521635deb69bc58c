//! Graph model backed by petgraph's StableGraph.
//!
//! The graph stores topology in a StableGraph and maintains maps between
//! stable caller-visible IDs and internal petgraph indices, so IDs survive
//! removals. Layout edges have no direction, so the graph is undirected.

use std::collections::HashMap;

use petgraph::Undirected;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};

use super::{EdgeId, VertexId};
use crate::error::{Error, Result};
use crate::geometry::{Bounds, Point};

/// Per-vertex payload stored in the graph.
#[derive(Debug, Clone, Copy)]
struct VertexData {
    id: VertexId,
    position: Point,
    pinned: bool,
}

/// The graph consumed by the layout engine.
///
/// This struct manages:
/// - Undirected topology via petgraph
/// - Per-vertex position and pinned state
/// - Per-edge weight (scales the edge's traction impact)
/// - ID mapping between stable IDs and internal indices
#[derive(Debug, Default)]
pub struct Graph {
    graph: StableGraph<VertexData, f32, Undirected>,

    /// Map from stable VertexId to petgraph NodeIndex
    vertex_id_to_index: HashMap<VertexId, NodeIndex>,

    /// Map from stable EdgeId to petgraph EdgeIndex
    edge_id_to_index: HashMap<EdgeId, EdgeIndex>,

    /// Reverse map from petgraph EdgeIndex to stable EdgeId (for O(1) lookup during removal)
    edge_index_to_id: HashMap<EdgeIndex, EdgeId>,

    next_vertex_id: u32,
    next_edge_id: u32,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a graph with pre-allocated capacity.
    pub fn with_capacity(vertex_capacity: usize, edge_capacity: usize) -> Self {
        Self {
            graph: StableGraph::with_capacity(vertex_capacity, edge_capacity),
            vertex_id_to_index: HashMap::with_capacity(vertex_capacity),
            edge_id_to_index: HashMap::with_capacity(edge_capacity),
            edge_index_to_id: HashMap::with_capacity(edge_capacity),
            next_vertex_id: 0,
            next_edge_id: 0,
        }
    }

    // =========================================================================
    // Vertex Operations
    // =========================================================================

    /// Add a movable vertex at the specified position.
    pub fn add_vertex(&mut self, position: Point) -> VertexId {
        let id = VertexId(self.next_vertex_id);
        self.next_vertex_id += 1;

        let index = self.graph.add_node(VertexData {
            id,
            position,
            pinned: false,
        });
        self.vertex_id_to_index.insert(id, index);
        id
    }

    /// Add a pinned ("user positioned") vertex at the specified position.
    pub fn add_pinned_vertex(&mut self, position: Point) -> VertexId {
        let id = self.add_vertex(position);
        self.set_pinned(id, true);
        id
    }

    /// Remove a vertex and all its connected edges.
    pub fn remove_vertex(&mut self, id: VertexId) -> bool {
        if let Some(index) = self.vertex_id_to_index.remove(&id) {
            let edges: Vec<_> = self.graph.edges(index).map(|e| e.id()).collect();
            for edge_index in edges {
                if let Some(edge_id) = self.edge_index_to_id.remove(&edge_index) {
                    self.edge_id_to_index.remove(&edge_id);
                }
            }
            self.graph.remove_node(index);
            true
        } else {
            false
        }
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get the number of non-pinned vertices.
    pub fn movable_count(&self) -> usize {
        self.graph
            .node_weights()
            .filter(|data| !data.pinned)
            .count()
    }

    /// Get a vertex's position.
    pub fn position(&self, id: VertexId) -> Option<Point> {
        self.vertex_id_to_index
            .get(&id)
            .map(|&index| self.graph[index].position)
    }

    /// Set a vertex's position.
    pub fn set_position(&mut self, id: VertexId, position: Point) {
        if let Some(&index) = self.vertex_id_to_index.get(&id) {
            self.graph[index].position = position;
        }
    }

    /// Pin or unpin a vertex. Pinned vertices are excluded from simulation.
    pub fn set_pinned(&mut self, id: VertexId, pinned: bool) {
        if let Some(&index) = self.vertex_id_to_index.get(&id) {
            self.graph[index].pinned = pinned;
        }
    }

    /// Check if a vertex is pinned.
    pub fn is_pinned(&self, id: VertexId) -> bool {
        self.vertex_id_to_index
            .get(&id)
            .map(|&index| self.graph[index].pinned)
            .unwrap_or(false)
    }

    /// Iterate over all vertices as `(id, position, pinned)`.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, Point, bool)> + '_ {
        self.graph
            .node_weights()
            .map(|data| (data.id, data.position, data.pinned))
    }

    // =========================================================================
    // Edge Operations
    // =========================================================================

    /// Add an edge between two vertices with the given weight.
    ///
    /// The weight scales the edge's traction impact during simulation;
    /// use 1.0 for uniform edges.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId, weight: f32) -> Result<EdgeId> {
        if a == b {
            return Err(Error::SelfLoop(a));
        }
        let a_index = *self
            .vertex_id_to_index
            .get(&a)
            .ok_or(Error::UnknownVertex(a))?;
        let b_index = *self
            .vertex_id_to_index
            .get(&b)
            .ok_or(Error::UnknownVertex(b))?;

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;

        let index = self.graph.add_edge(a_index, b_index, weight);
        self.edge_id_to_index.insert(id, index);
        self.edge_index_to_id.insert(index, id);

        Ok(id)
    }

    /// Remove an edge.
    pub fn remove_edge(&mut self, id: EdgeId) -> bool {
        if let Some(index) = self.edge_id_to_index.remove(&id) {
            self.edge_index_to_id.remove(&index);
            self.graph.remove_edge(index);
            true
        } else {
            false
        }
    }

    /// Get the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate over all edges as `(endpoint a, endpoint b, weight)`.
    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId, f32)> + '_ {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].id,
                self.graph[e.target()].id,
                *e.weight(),
            )
        })
    }

    /// Get neighbors of a vertex.
    pub fn neighbors(&self, id: VertexId) -> Vec<VertexId> {
        self.vertex_id_to_index
            .get(&id)
            .map(|&index| {
                self.graph
                    .neighbors(index)
                    .map(|n| self.graph[n].id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the degree of a vertex.
    pub fn degree(&self, id: VertexId) -> usize {
        self.vertex_id_to_index
            .get(&id)
            .map(|&index| self.graph.neighbors(index).count())
            .unwrap_or(0)
    }

    // =========================================================================
    // Utilities
    // =========================================================================

    /// Get the bounding box of all vertices, or None if the graph is empty.
    pub fn bounding_box(&self) -> Option<Bounds> {
        let mut min = Point::new(f32::INFINITY, f32::INFINITY);
        let mut max = Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for data in self.graph.node_weights() {
            min.x = min.x.min(data.position.x);
            min.y = min.y.min(data.position.y);
            max.x = max.x.max(data.position.x);
            max.y = max.y.max(data.position.y);
        }

        if min.x == f32::INFINITY {
            return None;
        }
        Some(Bounds::new(min, max))
    }

    /// Clear all vertices and edges, resetting the graph to its initial state.
    pub fn clear(&mut self) {
        self.graph.clear();
        self.vertex_id_to_index.clear();
        self.edge_id_to_index.clear();
        self.edge_index_to_id.clear();
        self.next_vertex_id = 0;
        self.next_edge_id = 0;
    }
}
