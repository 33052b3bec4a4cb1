//! Vertex container: an element count carried by its attribute manager.
//!
//! Vertices have no data of their own. Coordinates, vertex-to-element
//! back-pointers and user attributes are all columns of the vertex
//! [`AttributeManager`], so creating, deleting or permuting vertices is a
//! single broadcast.

use crate::data::manager::AttributeManager;
use crate::mesh_error::{ElementKind, MeshError};
use crate::topology::index::Index;

#[derive(Debug, Default, Clone)]
pub struct VertexSet {
    vertex_attributes: AttributeManager,
}

impl VertexSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_manager(vertex_attributes: AttributeManager) -> Self {
        Self { vertex_attributes }
    }

    #[inline]
    pub fn nb_vertices(&self) -> Index {
        self.vertex_attributes.nb_elements()
    }

    pub fn vertex_attribute_manager(&self) -> &AttributeManager {
        &self.vertex_attributes
    }

    /// Mutable access for registering user columns.
    ///
    /// Structural calls on the returned manager bypass any mesh built on this
    /// set; use the mesh builders to create or delete vertices.
    pub fn vertex_attribute_manager_mut(&mut self) -> &mut AttributeManager {
        &mut self.vertex_attributes
    }

    pub fn check_vertex(&self, vertex: Index) -> Result<(), MeshError> {
        if vertex >= self.nb_vertices() {
            return Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Vertex,
                index: vertex,
                len: self.nb_vertices(),
            });
        }
        Ok(())
    }

    /// Append one vertex and return its index.
    pub fn create_vertex(&mut self) -> Index {
        self.create_vertices(1)
    }

    /// Append `nb` vertices and return the index of the first one.
    pub fn create_vertices(&mut self, nb: Index) -> Index {
        let first = self.nb_vertices();
        self.vertex_attributes.resize(first + nb);
        first
    }

    /// Remove masked vertices; returns the `old2new` table.
    pub fn delete_vertices(&mut self, to_delete: &[bool]) -> Result<Vec<Index>, MeshError> {
        self.vertex_attributes.delete_elements(to_delete)
    }

    /// Reorder vertices so that new vertex `i` is old vertex `permutation[i]`.
    pub fn permute_vertices(&mut self, permutation: &[Index]) -> Result<(), MeshError> {
        self.vertex_attributes.permute_elements(permutation)
    }
}
