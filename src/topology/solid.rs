//! Polyhedral solid meshes.
//!
//! Same layout as [`SurfaceMesh`](crate::topology::surface::SurfaceMesh),
//! one dimension up. The polyhedron manager stores
//! [`POLYHEDRON_VERTICES_ATTRIBUTE`], [`POLYHEDRON_ADJACENTS_ATTRIBUTE`]
//! (one entry per facet), [`POLYHEDRON_KIND_ATTRIBUTE`] and, for
//! [`PolyhedronKind::Polyhedron`] only, explicit facets in the sparse
//! [`POLYHEDRON_FACETS_ATTRIBUTE`]. The vertex manager stores
//! [`POLYHEDRON_AROUND_VERTEX_ATTRIBUTE`] and the points.
//!
//! Facets are outward oriented. Two polyhedra are adjacent through a facet
//! when both list a facet over the same vertex set.

use std::collections::VecDeque;
use std::fmt;

use hashbrown::HashSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::algs::parallel::try_map_elements;
use crate::data::archive::{AttributeTypeRegistry, ManagerArchive};
use crate::data::attribute::AttributeHandle;
use crate::data::dense::DenseAttribute;
use crate::data::manager::AttributeManager;
use crate::data::sparse::SparseAttribute;
use crate::geometry::metrics;
use crate::mesh_error::{ElementKind, MeshError};
use crate::topology::cell_type::PolyhedronKind;
use crate::topology::coordinates::Coordinates;
use crate::topology::index::{Index, LocalIndex, NO_ID, to_index};
use crate::topology::local::{PolyhedronFacet, PolyhedronFacetVertex, PolyhedronVertex};
use crate::topology::surface::{IndexListColumn, attach_index_lists, topology_properties};
use crate::topology::vertex_set::VertexSet;

pub const POLYHEDRON_VERTICES_ATTRIBUTE: &str = "polyhedron_vertices";
pub const POLYHEDRON_ADJACENTS_ATTRIBUTE: &str = "polyhedron_adjacents";
pub const POLYHEDRON_KIND_ATTRIBUTE: &str = "polyhedron_kind";
pub const POLYHEDRON_FACETS_ATTRIBUTE: &str = "polyhedron_facets";
pub const POLYHEDRON_AROUND_VERTEX_ATTRIBUTE: &str = "polyhedron_around_vertex";

pub const SOLID_ARCHIVE_VERSION: u32 = 1;
pub const SOLID_TYPE_NAME: &str = "SolidMesh3D";

/// Explicit facets of one polyhedron, as local vertex indices.
pub type FacetList = Vec<Vec<LocalIndex>>;

pub struct SolidMesh {
    pub(crate) vertices: VertexSet,
    pub(crate) polyhedron_attributes: AttributeManager,
    pub(crate) coordinates: Coordinates<3>,
    pub(crate) polyhedron_vertices: AttributeHandle<IndexListColumn>,
    pub(crate) polyhedron_adjacents: AttributeHandle<IndexListColumn>,
    pub(crate) polyhedron_kinds: AttributeHandle<DenseAttribute<PolyhedronKind>>,
    pub(crate) polyhedron_facets: AttributeHandle<SparseAttribute<FacetList>>,
    pub(crate) polyhedron_around_vertex: AttributeHandle<DenseAttribute<PolyhedronVertex>>,
}

impl fmt::Debug for SolidMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolidMesh")
            .field("nb_vertices", &self.nb_vertices())
            .field("nb_polyhedra", &self.nb_polyhedra())
            .finish()
    }
}

impl Default for SolidMesh {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SolidMesh {
    /// Deep copy: the clone owns independent columns.
    fn clone(&self) -> Self {
        Self::from_managers(
            self.vertices.vertex_attribute_manager().clone(),
            self.polyhedron_attributes.clone(),
        )
    }
}

impl SolidMesh {
    pub fn new() -> Self {
        Self::from_managers(AttributeManager::new(), AttributeManager::new())
    }

    fn from_managers(mut vertices: AttributeManager, mut polyhedra: AttributeManager) -> Self {
        let coordinates = Coordinates::attach(&mut vertices);
        let polyhedron_around_vertex = vertices
            .attach_column::<PolyhedronVertex, _>(POLYHEDRON_AROUND_VERTEX_ATTRIBUTE, |name, nb| {
                DenseAttribute::new(name, PolyhedronVertex::default(), topology_properties(), nb)
            });
        let polyhedron_vertices = attach_index_lists(&mut polyhedra, POLYHEDRON_VERTICES_ATTRIBUTE);
        let polyhedron_adjacents =
            attach_index_lists(&mut polyhedra, POLYHEDRON_ADJACENTS_ATTRIBUTE);
        let polyhedron_kinds = polyhedra
            .attach_column::<PolyhedronKind, _>(POLYHEDRON_KIND_ATTRIBUTE, |name, nb| {
                DenseAttribute::new(name, PolyhedronKind::default(), topology_properties(), nb)
            });
        let polyhedron_facets = polyhedra
            .attach_column::<FacetList, _>(POLYHEDRON_FACETS_ATTRIBUTE, |name, nb| {
                SparseAttribute::new(name, FacetList::new(), topology_properties(), nb)
            });
        Self {
            vertices: VertexSet::from_manager(vertices),
            polyhedron_attributes: polyhedra,
            coordinates,
            polyhedron_vertices,
            polyhedron_adjacents,
            polyhedron_kinds,
            polyhedron_facets,
            polyhedron_around_vertex,
        }
    }

    // ------------------------------------------------------------------
    // Counts and managers
    // ------------------------------------------------------------------

    #[inline]
    pub fn nb_vertices(&self) -> Index {
        self.vertices.nb_vertices()
    }

    #[inline]
    pub fn nb_polyhedra(&self) -> Index {
        self.polyhedron_attributes.nb_elements()
    }

    pub fn vertex_attribute_manager(&self) -> &AttributeManager {
        self.vertices.vertex_attribute_manager()
    }

    pub fn vertex_attribute_manager_mut(&mut self) -> &mut AttributeManager {
        self.vertices.vertex_attribute_manager_mut()
    }

    pub fn polyhedron_attribute_manager(&self) -> &AttributeManager {
        &self.polyhedron_attributes
    }

    pub fn polyhedron_attribute_manager_mut(&mut self) -> &mut AttributeManager {
        &mut self.polyhedron_attributes
    }

    pub fn coordinates(&self) -> &Coordinates<3> {
        &self.coordinates
    }

    pub fn point(&self, vertex: Index) -> Result<[f64; 3], MeshError> {
        self.coordinates.point(vertex)
    }

    // ------------------------------------------------------------------
    // Polyhedron queries
    // ------------------------------------------------------------------

    pub(crate) fn check_vertex(&self, vertex: Index) -> Result<(), MeshError> {
        self.vertices.check_vertex(vertex)
    }

    pub(crate) fn check_polyhedron(&self, polyhedron: Index) -> Result<(), MeshError> {
        if polyhedron >= self.nb_polyhedra() {
            return Err(MeshError::IndexOutOfRange {
                kind: ElementKind::Polyhedron,
                index: polyhedron,
                len: self.nb_polyhedra(),
            });
        }
        Ok(())
    }

    fn local_out_of_range(polyhedron: Index, local: LocalIndex, len: usize) -> MeshError {
        MeshError::LocalIndexOutOfRange {
            kind: ElementKind::Polyhedron,
            element: polyhedron,
            local,
            len: to_index(len),
        }
    }

    pub fn polyhedron_kind(&self, polyhedron: Index) -> Result<PolyhedronKind, MeshError> {
        self.check_polyhedron(polyhedron)?;
        Ok(*self.polyhedron_kinds.read().value(polyhedron))
    }

    pub fn nb_polyhedron_vertices(&self, polyhedron: Index) -> Result<LocalIndex, MeshError> {
        self.check_polyhedron(polyhedron)?;
        Ok(to_index(self.polyhedron_vertices.read().value(polyhedron).len()))
    }

    /// Facets of `polyhedron` as local vertex indices.
    pub fn polyhedron_facet_definitions(&self, polyhedron: Index) -> Result<FacetList, MeshError> {
        let kind = self.polyhedron_kind(polyhedron)?;
        Ok(match kind.facets() {
            Some(table) => table.iter().map(|facet| facet.to_vec()).collect(),
            None => self.polyhedron_facets.read().value(polyhedron).clone(),
        })
    }

    pub fn nb_polyhedron_facets(&self, polyhedron: Index) -> Result<LocalIndex, MeshError> {
        let kind = self.polyhedron_kind(polyhedron)?;
        Ok(match kind.facets() {
            Some(table) => to_index(table.len()),
            None => to_index(self.polyhedron_facets.read().value(polyhedron).len()),
        })
    }

    fn facet_definition(&self, facet: PolyhedronFacet) -> Result<Vec<LocalIndex>, MeshError> {
        let mut facets = self.polyhedron_facet_definitions(facet.polyhedron_id)?;
        let len = facets.len();
        if facet.facet_id as usize >= len {
            return Err(Self::local_out_of_range(facet.polyhedron_id, facet.facet_id, len));
        }
        Ok(facets.swap_remove(facet.facet_id as usize))
    }

    pub fn nb_polyhedron_facet_vertices(
        &self,
        facet: PolyhedronFacet,
    ) -> Result<LocalIndex, MeshError> {
        Ok(to_index(self.facet_definition(facet)?.len()))
    }

    pub fn polyhedron_vertex(&self, vertex: PolyhedronVertex) -> Result<Index, MeshError> {
        self.check_polyhedron(vertex.polyhedron_id)?;
        let lists = self.polyhedron_vertices.read();
        let list = lists.value(vertex.polyhedron_id);
        list.get(vertex.vertex_id as usize)
            .copied()
            .ok_or_else(|| Self::local_out_of_range(vertex.polyhedron_id, vertex.vertex_id, list.len()))
    }

    pub fn polyhedron_vertices(&self, polyhedron: Index) -> Result<Vec<Index>, MeshError> {
        self.check_polyhedron(polyhedron)?;
        Ok(self.polyhedron_vertices.read().value(polyhedron).clone())
    }

    pub fn polyhedron_facet_vertex(
        &self,
        facet_vertex: PolyhedronFacetVertex,
    ) -> Result<Index, MeshError> {
        let facet = facet_vertex.polyhedron_facet;
        let definition = self.facet_definition(facet)?;
        let local = definition
            .get(facet_vertex.vertex_id as usize)
            .copied()
            .ok_or_else(|| {
                Self::local_out_of_range(facet.polyhedron_id, facet_vertex.vertex_id, definition.len())
            })?;
        self.polyhedron_vertex(PolyhedronVertex::new(facet.polyhedron_id, local))
    }

    pub fn polyhedron_facet_vertices(&self, facet: PolyhedronFacet) -> Result<Vec<Index>, MeshError> {
        let definition = self.facet_definition(facet)?;
        let vertices = self.polyhedron_vertices(facet.polyhedron_id)?;
        definition
            .iter()
            .map(|&local| {
                vertices.get(local as usize).copied().ok_or_else(|| {
                    Self::local_out_of_range(facet.polyhedron_id, local, vertices.len())
                })
            })
            .collect()
    }

    /// Polyhedron across `facet`, `None` on border.
    pub fn polyhedron_adjacent(&self, facet: PolyhedronFacet) -> Result<Option<Index>, MeshError> {
        self.check_polyhedron(facet.polyhedron_id)?;
        let adjacents = self.polyhedron_adjacents.read();
        let list = adjacents.value(facet.polyhedron_id);
        let adjacent = list
            .get(facet.facet_id as usize)
            .copied()
            .ok_or_else(|| Self::local_out_of_range(facet.polyhedron_id, facet.facet_id, list.len()))?;
        Ok((adjacent != NO_ID).then_some(adjacent))
    }

    /// The adjacent polyhedron's facet over the same vertices listed in
    /// the opposite orientation, `None` on border.
    pub fn polyhedron_adjacent_facet(
        &self,
        facet: PolyhedronFacet,
    ) -> Result<Option<PolyhedronFacet>, MeshError> {
        let Some(adjacent) = self.polyhedron_adjacent(facet)? else {
            return Ok(None);
        };
        let vertices = self.polyhedron_facet_vertices(facet)?;
        for other in 0..self.nb_polyhedron_facets(adjacent)? {
            let candidate = PolyhedronFacet::new(adjacent, other);
            if facets_are_opposite(&vertices, &self.polyhedron_facet_vertices(candidate)?) {
                return Ok(Some(candidate));
            }
        }
        Err(MeshError::InconsistentAdjacency {
            kind: ElementKind::Polyhedron,
            element: facet.polyhedron_id,
            adjacent,
        })
    }

    pub fn is_polyhedron_facet_on_border(&self, facet: PolyhedronFacet) -> Result<bool, MeshError> {
        Ok(self.polyhedron_adjacent(facet)?.is_none())
    }

    pub fn polyhedron_facets_on_border(
        &self,
        polyhedron: Index,
    ) -> Result<Vec<PolyhedronFacet>, MeshError> {
        self.check_polyhedron(polyhedron)?;
        let adjacents = self.polyhedron_adjacents.read();
        Ok(adjacents
            .value(polyhedron)
            .iter()
            .enumerate()
            .filter(|&(_, &adjacent)| adjacent == NO_ID)
            .map(|(f, _)| PolyhedronFacet::new(polyhedron, to_index(f)))
            .collect())
    }

    // ------------------------------------------------------------------
    // Vertex to polyhedron queries
    // ------------------------------------------------------------------

    /// Representative polyhedron vertex of `vertex`, `None` when isolated.
    pub fn polyhedron_around_vertex(
        &self,
        vertex: Index,
    ) -> Result<Option<PolyhedronVertex>, MeshError> {
        self.check_vertex(vertex)?;
        let corner = *self.polyhedron_around_vertex.read().value(vertex);
        Ok(corner.is_defined().then_some(corner))
    }

    /// Every polyhedron vertex reachable from the representative of
    /// `vertex` through facets containing it. Breadth-first.
    pub fn polyhedra_around_vertex(
        &self,
        vertex: Index,
    ) -> Result<Vec<PolyhedronVertex>, MeshError> {
        let Some(first) = self.polyhedron_around_vertex(vertex)? else {
            return Ok(Vec::new());
        };
        let mut result = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([first.polyhedron_id]);
        visited.insert(first.polyhedron_id);
        while let Some(polyhedron) = queue.pop_front() {
            let Some(local) = self.vertex_in_polyhedron(polyhedron, vertex)? else {
                return Err(MeshError::InconsistentAdjacency {
                    kind: ElementKind::Polyhedron,
                    element: polyhedron,
                    adjacent: vertex,
                });
            };
            result.push(PolyhedronVertex::new(polyhedron, local));
            let adjacents = self.polyhedron_adjacents.read().value(polyhedron).clone();
            for (facet, definition) in self.polyhedron_facet_definitions(polyhedron)?.iter().enumerate() {
                let adjacent = adjacents.get(facet).copied().unwrap_or(NO_ID);
                if adjacent == NO_ID || !definition.contains(&local) {
                    continue;
                }
                if visited.insert(adjacent) {
                    queue.push_back(adjacent);
                }
            }
        }
        Ok(result)
    }

    pub fn vertex_in_polyhedron(
        &self,
        polyhedron: Index,
        vertex: Index,
    ) -> Result<Option<LocalIndex>, MeshError> {
        self.check_polyhedron(polyhedron)?;
        let lists = self.polyhedron_vertices.read();
        Ok(lists
            .value(polyhedron)
            .iter()
            .position(|&v| v == vertex)
            .map(to_index))
    }

    pub fn isolated_vertex(&self, vertex: Index) -> Result<bool, MeshError> {
        Ok(self.polyhedron_around_vertex(vertex)?.is_none())
    }

    // ------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------

    fn polyhedron_points(&self, polyhedron: Index) -> Result<Vec<[f64; 3]>, MeshError> {
        self.coordinates.gather(&self.polyhedron_vertices(polyhedron)?)
    }

    pub fn polyhedron_barycenter(&self, polyhedron: Index) -> Result<[f64; 3], MeshError> {
        Ok(metrics::barycenter(&self.polyhedron_points(polyhedron)?))
    }

    pub fn polyhedron_barycenters(&self) -> Result<Vec<[f64; 3]>, MeshError> {
        try_map_elements(self.nb_polyhedra(), |polyhedron| {
            self.polyhedron_barycenter(polyhedron)
        })
    }

    pub fn polyhedron_volume(&self, polyhedron: Index) -> Result<f64, MeshError> {
        let points = self.polyhedron_points(polyhedron)?;
        let facets = self.polyhedron_facet_definitions(polyhedron)?;
        Ok(metrics::polyhedron_volume(&points, &facets))
    }

    pub fn bounding_box(&self) -> Option<([f64; 3], [f64; 3])> {
        metrics::bounding_box(&self.coordinates.points())
    }

    // ------------------------------------------------------------------
    // Archives
    // ------------------------------------------------------------------

    pub fn save(&self) -> Result<SolidArchive, MeshError> {
        Ok(SolidArchive {
            version: SOLID_ARCHIVE_VERSION,
            type_name: SOLID_TYPE_NAME.to_string(),
            vertices: self.vertex_attribute_manager().save()?,
            polyhedra: self.polyhedron_attributes.save()?,
        })
    }

    pub fn load(archive: &SolidArchive, registry: &AttributeTypeRegistry) -> Result<Self, MeshError> {
        if archive.version != SOLID_ARCHIVE_VERSION {
            return Err(MeshError::UnsupportedArchiveVersion {
                found: archive.version,
                supported: SOLID_ARCHIVE_VERSION,
            });
        }
        if archive.type_name != SOLID_TYPE_NAME {
            return Err(MeshError::Serialization(format!(
                "archive holds a {}, expected a {SOLID_TYPE_NAME}",
                archive.type_name
            )));
        }
        let vertices = AttributeManager::load(&archive.vertices, registry)?;
        let polyhedra = AttributeManager::load(&archive.polyhedra, registry)?;
        let mesh = Self::from_managers(vertices, polyhedra);
        mesh.validate_structure()?;
        log::debug!(
            "loaded {SOLID_TYPE_NAME}: {} vertices, {} polyhedra",
            mesh.nb_vertices(),
            mesh.nb_polyhedra()
        );
        Ok(mesh)
    }
}

/// Order-independent identity of a facet.
pub(crate) fn facet_key(mut vertices: Vec<Index>) -> Vec<Index> {
    vertices.sort_unstable();
    vertices
}

/// Whether `b` walks the vertices of `a` backwards from some starting
/// corner, i.e. both list the same face seen from its two sides.
pub(crate) fn facets_are_opposite(a: &[Index], b: &[Index]) -> bool {
    let n = a.len();
    if n == 0 || n != b.len() {
        return false;
    }
    (0..n).any(|offset| (0..n).all(|v| a[v] == b[(n - v + offset) % n]))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidArchive {
    pub version: u32,
    pub type_name: String,
    pub vertices: ManagerArchive,
    pub polyhedra: ManagerArchive,
}

impl SolidArchive {
    pub fn to_bytes(&self) -> Result<Vec<u8>, MeshError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MeshError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl Serialize for SolidMesh {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.save()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SolidMesh {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let archive = SolidArchive::deserialize(deserializer)?;
        Self::load(&archive, AttributeTypeRegistry::global()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_facets_walk_backwards() {
        assert!(facets_are_opposite(&[1, 2, 3], &[1, 3, 2]));
        assert!(facets_are_opposite(&[1, 2, 3], &[2, 1, 3]));
        assert!(!facets_are_opposite(&[1, 2, 3], &[2, 3, 1]));
        assert!(facets_are_opposite(&[4, 5, 6, 7], &[4, 7, 6, 5]));
        // Same vertex set, different cycle.
        assert!(!facets_are_opposite(&[0, 1, 2, 3], &[0, 2, 1, 3]));
        assert!(!facets_are_opposite(&[0, 1, 2], &[0, 2, 1, 3]));
        assert_eq!(facet_key(vec![0, 2, 1, 3]), facet_key(vec![0, 1, 2, 3]));
    }
}
