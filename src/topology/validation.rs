//! Topology validation for surface and solid meshes.
//!
//! Two levels of checking:
//! - `validate_structure`: column lengths, index ranges and vertex
//!   representatives. Cheap enough to run after every builder operation.
//! - `validate_adjacency_symmetry`: every adjacency entry is mirrored by
//!   the neighbour. Builders may leave one-sided links while editing, so
//!   this only runs through [`DebugInvariants::validate_invariants`].

use crate::debug_invariants::DebugInvariants;
use crate::data::value::AttributeValue;
use crate::mesh_error::{ElementKind, MeshError};
use crate::topology::index::{Index, NO_ID, indices};
use crate::topology::local::{PolygonEdge, PolyhedronFacet};
use crate::topology::solid::SolidMesh;
use crate::topology::surface::SurfaceMesh;

/// Options for adjacency computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacencyOptions {
    /// How to handle edges/facets shared by more than two elements.
    pub non_manifold: NonManifoldHandling,
}

impl AdjacencyOptions {
    /// Refuse non-manifold input.
    pub fn strict() -> Self {
        Self {
            non_manifold: NonManifoldHandling::Error,
        }
    }
}

/// Behavior for non-manifold detection.
///
/// Under `Ignore` and `Warn` the first matching candidate is linked and the
/// others stay on border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonManifoldHandling {
    /// Link the first candidate silently.
    #[default]
    Ignore,
    /// Link the first candidate and log a warning.
    Warn,
    /// Return an error before any adjacency is written.
    Error,
}

fn vertex_out_of_range(index: Index, len: Index) -> MeshError {
    MeshError::IndexOutOfRange {
        kind: ElementKind::Vertex,
        index,
        len,
    }
}

impl<const D: usize> SurfaceMesh<D>
where
    [f64; D]: AttributeValue,
{
    /// Check column lengths, polygon definitions and vertex representatives.
    pub fn validate_structure(&self) -> Result<(), MeshError> {
        self.vertex_attribute_manager().validate_invariants()?;
        self.polygon_attributes.validate_invariants()?;

        let nb_vertices = self.nb_vertices();
        let nb_polygons = self.nb_polygons();
        let lists = self.polygon_vertices.read();
        let adjacents = self.polygon_adjacents.read();
        for polygon in indices(nb_polygons) {
            let vertices = lists.value(polygon);
            if vertices.len() < 3 {
                return Err(MeshError::InvalidPolygon(format!(
                    "polygon {polygon} has {} vertices",
                    vertices.len()
                )));
            }
            let links = adjacents.value(polygon);
            if links.len() != vertices.len() {
                return Err(MeshError::InvalidPolygon(format!(
                    "polygon {polygon} has {} vertices but {} adjacency entries",
                    vertices.len(),
                    links.len()
                )));
            }
            if let Some(&v) = vertices.iter().find(|&&v| v >= nb_vertices) {
                return Err(vertex_out_of_range(v, nb_vertices));
            }
            if let Some(&adjacent) = links.iter().find(|&&a| a != NO_ID && a >= nb_polygons) {
                return Err(MeshError::InconsistentAdjacency {
                    kind: ElementKind::Polygon,
                    element: polygon,
                    adjacent,
                });
            }
        }

        let corners = self.polygon_around_vertex.read();
        for vertex in indices(nb_vertices) {
            let corner = *corners.value(vertex);
            if !corner.is_defined() {
                continue;
            }
            let resolved = (corner.polygon_id < nb_polygons)
                .then(|| lists.value(corner.polygon_id).get(corner.vertex_id as usize))
                .flatten();
            if resolved != Some(&vertex) {
                return Err(MeshError::InvalidPolygon(format!(
                    "vertex {vertex} points at corner {corner:?} which does not hold it"
                )));
            }
        }
        Ok(())
    }

    /// Check that every adjacency is mirrored across the shared edge.
    pub fn validate_adjacency_symmetry(&self) -> Result<(), MeshError> {
        for polygon in indices(self.nb_polygons()) {
            for e in 0..self.nb_polygon_edges(polygon)? {
                let edge = PolygonEdge::new(polygon, e);
                let Some(other) = self.polygon_adjacent_edge(edge)? else {
                    continue;
                };
                if self.polygon_adjacent(other)? != Some(polygon) {
                    return Err(MeshError::InconsistentAdjacency {
                        kind: ElementKind::Polygon,
                        element: polygon,
                        adjacent: other.polygon_id,
                    });
                }
            }
        }
        Ok(())
    }
}

impl<const D: usize> DebugInvariants for SurfaceMesh<D>
where
    [f64; D]: AttributeValue,
{
    fn validate_invariants(&self) -> Result<(), MeshError> {
        self.validate_structure()?;
        self.validate_adjacency_symmetry()
    }
}

impl SolidMesh {
    /// Check column lengths, polyhedron definitions and vertex
    /// representatives.
    pub fn validate_structure(&self) -> Result<(), MeshError> {
        self.vertex_attribute_manager().validate_invariants()?;
        self.polyhedron_attributes.validate_invariants()?;

        let nb_vertices = self.nb_vertices();
        let nb_polyhedra = self.nb_polyhedra();
        for polyhedron in indices(nb_polyhedra) {
            let kind = self.polyhedron_kind(polyhedron)?;
            let vertices = self.polyhedron_vertices.read().value(polyhedron).clone();
            if let Some(expected) = kind.nb_vertices() {
                if vertices.len() != expected as usize {
                    return Err(MeshError::InvalidPolyhedron(format!(
                        "{kind:?} {polyhedron} has {} vertices",
                        vertices.len()
                    )));
                }
            }
            let facets = self.polyhedron_facet_definitions(polyhedron)?;
            if facets.len() < 4 {
                return Err(MeshError::InvalidPolyhedron(format!(
                    "polyhedron {polyhedron} has {} facets",
                    facets.len()
                )));
            }
            let bad_facet = facets.iter().any(|facet| {
                facet.len() < 3 || facet.iter().any(|&local| local as usize >= vertices.len())
            });
            if bad_facet {
                return Err(MeshError::InvalidPolyhedron(format!(
                    "polyhedron {polyhedron} has a malformed facet"
                )));
            }
            let links = self.polyhedron_adjacents.read().value(polyhedron).clone();
            if links.len() != facets.len() {
                return Err(MeshError::InvalidPolyhedron(format!(
                    "polyhedron {polyhedron} has {} facets but {} adjacency entries",
                    facets.len(),
                    links.len()
                )));
            }
            if let Some(&v) = vertices.iter().find(|&&v| v >= nb_vertices) {
                return Err(vertex_out_of_range(v, nb_vertices));
            }
            if let Some(&adjacent) = links.iter().find(|&&a| a != NO_ID && a >= nb_polyhedra) {
                return Err(MeshError::InconsistentAdjacency {
                    kind: ElementKind::Polyhedron,
                    element: polyhedron,
                    adjacent,
                });
            }
        }

        let corners = self.polyhedron_around_vertex.read();
        let lists = self.polyhedron_vertices.read();
        for vertex in indices(nb_vertices) {
            let corner = *corners.value(vertex);
            if !corner.is_defined() {
                continue;
            }
            let resolved = (corner.polyhedron_id < nb_polyhedra)
                .then(|| lists.value(corner.polyhedron_id).get(corner.vertex_id as usize))
                .flatten();
            if resolved != Some(&vertex) {
                return Err(MeshError::InvalidPolyhedron(format!(
                    "vertex {vertex} points at corner {corner:?} which does not hold it"
                )));
            }
        }
        Ok(())
    }

    /// Check that every adjacency is mirrored across the shared facet.
    pub fn validate_adjacency_symmetry(&self) -> Result<(), MeshError> {
        for polyhedron in indices(self.nb_polyhedra()) {
            for f in 0..self.nb_polyhedron_facets(polyhedron)? {
                let facet = PolyhedronFacet::new(polyhedron, f);
                let Some(other) = self.polyhedron_adjacent_facet(facet)? else {
                    continue;
                };
                if self.polyhedron_adjacent(other)? != Some(polyhedron) {
                    return Err(MeshError::InconsistentAdjacency {
                        kind: ElementKind::Polyhedron,
                        element: polyhedron,
                        adjacent: other.polyhedron_id,
                    });
                }
            }
        }
        Ok(())
    }
}

impl DebugInvariants for SolidMesh {
    fn validate_invariants(&self) -> Result<(), MeshError> {
        self.validate_structure()?;
        self.validate_adjacency_symmetry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::cell_type::PolyhedronKind;
    use crate::topology::surface::SurfaceMesh2D;

    fn square() -> SurfaceMesh2D {
        let mut mesh = SurfaceMesh2D::new();
        let mut builder = mesh.builder();
        builder.create_vertices(4);
        builder
            .create_polygons(&[vec![0u32, 1, 2], vec![0u32, 2, 3]])
            .unwrap();
        builder.compute_polygon_adjacencies().unwrap();
        mesh
    }

    #[test]
    fn consistent_surface_passes() {
        let mesh = square();
        assert!(mesh.validate_invariants().is_ok());
    }

    #[test]
    fn one_sided_link_breaks_symmetry_only() {
        let mut mesh = square();
        mesh.builder()
            .unset_polygon_adjacent(PolygonEdge::new(1, 0))
            .unwrap();
        assert!(mesh.validate_structure().is_ok());
        assert!(matches!(
            mesh.validate_adjacency_symmetry(),
            Err(MeshError::InconsistentAdjacency { element: 0, adjacent: 1, .. })
        ));
    }

    #[test]
    fn degenerate_polygon_is_reported() {
        let mesh = square();
        mesh.polygon_vertices.write().set_value(1, vec![0, 2]);
        assert!(matches!(
            mesh.validate_structure(),
            Err(MeshError::InvalidPolygon(_))
        ));
    }

    #[test]
    fn stale_representative_is_reported() {
        let mesh = square();
        // Vertex 1 is represented by corner (0, 1), which now holds 3.
        mesh.polygon_vertices.write().set_value(0, vec![0, 3, 2]);
        assert!(matches!(
            mesh.validate_structure(),
            Err(MeshError::InvalidPolygon(_))
        ));
    }

    #[test]
    fn solid_pair_passes_and_detects_bad_kind() {
        let mut solid = SolidMesh::new();
        let mut builder = solid.builder();
        builder.create_vertices(5);
        builder.create_tetrahedron([0, 1, 2, 3]).unwrap();
        builder.create_tetrahedron([1, 2, 3, 4]).unwrap();
        builder.compute_polyhedron_adjacencies().unwrap();
        assert!(solid.validate_invariants().is_ok());

        solid
            .polyhedron_kinds
            .write()
            .set_value(1, PolyhedronKind::Hexahedron);
        assert!(matches!(
            solid.validate_structure(),
            Err(MeshError::InvalidPolyhedron(_))
        ));
    }
}
