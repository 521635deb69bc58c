//! Vertex identifier.
//!
//! Vertices are the caller-visible graph entities. Each vertex has:
//! - A stable unique identifier (survives graph mutations)
//! - Position (x, y) in layout space
//! - Pinned state (excluded from simulation when true)

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable vertex identifier.
///
/// This ID remains valid even after other vertices are removed from the
/// graph. It wraps a u32 for efficient storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexId(pub u32);

impl VertexId {
    /// Create a new VertexId from a raw u32.
    #[inline]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw u32 value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vertex({})", self.0)
    }
}

impl From<u32> for VertexId {
    #[inline]
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<VertexId> for u32 {
    #[inline]
    fn from(id: VertexId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_id() {
        let id = VertexId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.0, 42);
        assert_eq!(format!("{}", id), "Vertex(42)");
    }

    #[test]
    fn test_vertex_id_conversion() {
        let id: VertexId = 123.into();
        let raw: u32 = id.into();
        assert_eq!(raw, 123);
    }
}
