//! Local addressing of sub-elements.
//!
//! Corners, edges and facets are never stored as references into the mesh.
//! They are small `Copy` values pairing an element index with a local index
//! inside that element, one newtype per address kind so a
//! [`PolygonVertex`] cannot be passed where a [`PolyhedronVertex`] is
//! expected.
//!
//! Local indices are cyclic: the `k`-th edge of a polygon starts at its
//! `k`-th vertex and ends at vertex `(k + 1) % n`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::topology::index::{Index, LocalIndex, NO_ID, NO_LID};

/// The `vertex_id`-th corner of polygon `polygon_id`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolygonVertex {
    pub polygon_id: Index,
    pub vertex_id: LocalIndex,
}

/// The edge of polygon `polygon_id` starting at local vertex `edge_id`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolygonEdge {
    pub polygon_id: Index,
    pub edge_id: LocalIndex,
}

/// The `vertex_id`-th vertex of polyhedron `polyhedron_id`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolyhedronVertex {
    pub polyhedron_id: Index,
    pub vertex_id: LocalIndex,
}

/// The `facet_id`-th facet of polyhedron `polyhedron_id`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolyhedronFacet {
    pub polyhedron_id: Index,
    pub facet_id: LocalIndex,
}

/// The `vertex_id`-th vertex of a polyhedron facet.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PolyhedronFacetVertex {
    pub polyhedron_facet: PolyhedronFacet,
    pub vertex_id: LocalIndex,
}

impl PolygonVertex {
    #[inline]
    pub const fn new(polygon_id: Index, vertex_id: LocalIndex) -> Self {
        Self {
            polygon_id,
            vertex_id,
        }
    }

    /// True unless this is the unset address.
    #[inline]
    pub const fn is_defined(&self) -> bool {
        self.polygon_id != NO_ID && self.vertex_id != NO_LID
    }
}

impl PolygonEdge {
    #[inline]
    pub const fn new(polygon_id: Index, edge_id: LocalIndex) -> Self {
        Self {
            polygon_id,
            edge_id,
        }
    }
}

impl PolyhedronVertex {
    #[inline]
    pub const fn new(polyhedron_id: Index, vertex_id: LocalIndex) -> Self {
        Self {
            polyhedron_id,
            vertex_id,
        }
    }

    #[inline]
    pub const fn is_defined(&self) -> bool {
        self.polyhedron_id != NO_ID && self.vertex_id != NO_LID
    }
}

impl PolyhedronFacet {
    #[inline]
    pub const fn new(polyhedron_id: Index, facet_id: LocalIndex) -> Self {
        Self {
            polyhedron_id,
            facet_id,
        }
    }
}

impl PolyhedronFacetVertex {
    #[inline]
    pub const fn new(polyhedron_facet: PolyhedronFacet, vertex_id: LocalIndex) -> Self {
        Self {
            polyhedron_facet,
            vertex_id,
        }
    }
}

// -----------------------------------------------------------------------------
// Unset defaults
// -----------------------------------------------------------------------------

impl Default for PolygonVertex {
    fn default() -> Self {
        Self::new(NO_ID, NO_LID)
    }
}

impl Default for PolygonEdge {
    fn default() -> Self {
        Self::new(NO_ID, NO_LID)
    }
}

impl Default for PolyhedronVertex {
    fn default() -> Self {
        Self::new(NO_ID, NO_LID)
    }
}

impl Default for PolyhedronFacet {
    fn default() -> Self {
        Self::new(NO_ID, NO_LID)
    }
}

impl Default for PolyhedronFacetVertex {
    fn default() -> Self {
        Self::new(PolyhedronFacet::default(), NO_LID)
    }
}

// -----------------------------------------------------------------------------
// Corner <-> edge conversions
// -----------------------------------------------------------------------------

/// An edge is identified by its starting corner.
impl From<PolygonVertex> for PolygonEdge {
    fn from(pv: PolygonVertex) -> Self {
        Self::new(pv.polygon_id, pv.vertex_id)
    }
}

impl From<PolygonEdge> for PolygonVertex {
    fn from(pe: PolygonEdge) -> Self {
        Self::new(pe.polygon_id, pe.edge_id)
    }
}

// -----------------------------------------------------------------------------
// Formatting traits
// -----------------------------------------------------------------------------

impl fmt::Debug for PolygonVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PolygonVertex({}, {})", self.polygon_id, self.vertex_id)
    }
}

impl fmt::Debug for PolygonEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PolygonEdge({}, {})", self.polygon_id, self.edge_id)
    }
}

impl fmt::Debug for PolyhedronVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PolyhedronVertex({}, {})", self.polyhedron_id, self.vertex_id)
    }
}

impl fmt::Debug for PolyhedronFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PolyhedronFacet({}, {})", self.polyhedron_id, self.facet_id)
    }
}

impl fmt::Debug for PolyhedronFacetVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PolyhedronFacetVertex({}, {}, {})",
            self.polyhedron_facet.polyhedron_id, self.polyhedron_facet.facet_id, self.vertex_id
        )
    }
}

#[cfg(test)]
mod layout_tests {
    //! Local addresses are two packed indices.
    use super::*;
    use static_assertions::{assert_eq_size, assert_impl_all};

    assert_eq_size!(PolygonVertex, u64);
    assert_eq_size!(PolygonEdge, u64);
    assert_eq_size!(PolyhedronVertex, u64);
    assert_eq_size!(PolyhedronFacet, u64);
    assert_impl_all!(PolygonVertex: Copy, Send, Sync);
}
